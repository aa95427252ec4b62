use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::client::{DEFAULT_TIMEOUT, HttpApi};
use crate::coordinator::DEFAULT_UPDATE_INTERVAL;
use crate::logger::MessageLogMode;
use crate::protocol::DEFAULT_BASE_URL;
use crate::{Error, Result};

/// Integration settings, usually read from a JSON file.
///
/// ```json
/// { "house_id": 123456, "mobile_id": "...", "api_key": "...", "scan_interval": 120 }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NexiaConfig {
    pub house_id: u64,
    pub mobile_id: String,
    pub api_key: String,
    /// Seconds between house refreshes.
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,
    /// Seconds before an HTTP request is abandoned.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub message_log: Option<MessageLogConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageLogConfig {
    pub mode: MessageLogMode,
    pub path: String,
}

fn default_scan_interval() -> u64 {
    DEFAULT_UPDATE_INTERVAL.as_secs()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl NexiaConfig {
    pub fn new(house_id: u64, mobile_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            house_id,
            mobile_id: mobile_id.into(),
            api_key: api_key.into(),
            scan_interval: default_scan_interval(),
            timeout: default_timeout(),
            base_url: default_base_url(),
            message_log: None,
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.mobile_id.trim().is_empty() || self.api_key.trim().is_empty() {
            return Err(Error::InvalidValue("mobile_id and api_key are required".to_string()));
        }
        if self.scan_interval == 0 {
            return Err(Error::InvalidValue("scan_interval must be at least 1 second".to_string()));
        }
        if self.timeout == 0 {
            return Err(Error::InvalidValue("timeout must be at least 1 second".to_string()));
        }
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval)
    }

    pub fn http_api(&self) -> Result<HttpApi> {
        let mut builder = HttpApi::builder(self.house_id, &self.mobile_id, &self.api_key)
            .base_url(&self.base_url)
            .timeout(Duration::from_secs(self.timeout));
        if let Some(log) = &self.message_log {
            builder = builder.message_log(log.mode, &log.path);
        }
        builder.build()
    }
}
