use std::fs::{File, OpenOptions};
use std::io::Write;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use crate::diff::diff_json;
use crate::protocol::WriteTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLogMode {
    /// Every house fetch is written whole.
    Full,
    /// The first fetch is written whole, later ones as changed leaves.
    Diffed,
}

/// Appends one JSON object per line for each request, write and house fetch.
pub(crate) struct MessageLogger {
    mode: MessageLogMode,
    file: File,
    previous_house: Option<Value>,
}

impl MessageLogger {
    pub fn new(mode: MessageLogMode, path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            mode,
            file,
            previous_house: None,
        })
    }

    pub fn log_request(&mut self, method: &str, path: &str) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "req",
            "method": method,
            "path": path,
        });
        self.write_line(&entry);
    }

    pub fn log_command(&mut self, endpoint: &str, target: WriteTarget, body: &Value) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "cmd",
            "endpoint": endpoint,
            "target": target.kind(),
            "id": target.id(),
            "body": body,
        });
        self.write_line(&entry);
    }

    pub fn log_house(&mut self, status: u16, body: &Value) {
        let entry = match (self.mode, self.previous_house.as_ref()) {
            (MessageLogMode::Full, _) => json!({
                "ts": Utc::now().to_rfc3339(),
                "dir": "house",
                "status": status,
                "body": body,
            }),
            (MessageLogMode::Diffed, None) => json!({
                "ts": Utc::now().to_rfc3339(),
                "dir": "house",
                "status": status,
                "full": true,
                "body": body,
            }),
            (MessageLogMode::Diffed, Some(prev)) => {
                let mut changes = Vec::new();
                diff_json(prev, body, "", &mut changes);
                let changes: Vec<Value> = changes
                    .into_iter()
                    .map(|c| json!({ "path": c.path, "old": c.old, "new": c.new }))
                    .collect();
                json!({
                    "ts": Utc::now().to_rfc3339(),
                    "dir": "house",
                    "status": status,
                    "changes": changes,
                })
            }
        };
        self.write_line(&entry);
        if self.mode == MessageLogMode::Diffed {
            self.previous_house = Some(body.clone());
        }
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write message log entry: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn read_lines(path: &str) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn log_request_writes_ndjson() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Full, path).unwrap();
        logger.log_request("GET", "/houses/123456");

        let lines = read_lines(path);
        assert_eq!(lines[0]["dir"], "req");
        assert_eq!(lines[0]["method"], "GET");
        assert!(lines[0]["ts"].as_str().is_some());
    }

    #[test]
    fn log_command_records_target() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Full, path).unwrap();
        logger.log_command("zone_mode", WriteTarget::Zone(83394130), &json!({"value": "HEAT"}));

        let lines = read_lines(path);
        assert_eq!(lines[0]["dir"], "cmd");
        assert_eq!(lines[0]["endpoint"], "zone_mode");
        assert_eq!(lines[0]["target"], "zone");
        assert_eq!(lines[0]["id"], 83394130);
        assert_eq!(lines[0]["body"]["value"], "HEAT");
    }

    #[test]
    fn full_mode_writes_every_body() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Full, path).unwrap();
        let body = json!({"result": {"name": "House"}});
        logger.log_house(200, &body);
        logger.log_house(200, &body);

        let lines = read_lines(path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["body"], body);
    }

    #[test]
    fn diffed_mode_logs_full_first_then_changes() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Diffed, path).unwrap();

        logger.log_house(200, &json!({"zones": [{"temperature": 71}]}));
        logger.log_house(200, &json!({"zones": [{"temperature": 72}]}));
        logger.log_house(200, &json!({"zones": [{"temperature": 72}]}));

        let lines = read_lines(path);
        assert_eq!(lines[0]["full"], true);
        assert!(lines[0]["body"].is_object());
        assert_eq!(lines[1]["changes"][0]["path"], "zones.0.temperature");
        assert_eq!(lines[1]["changes"][0]["new"], 72);
        assert_eq!(lines[2]["changes"].as_array().unwrap().len(), 0);
    }
}
