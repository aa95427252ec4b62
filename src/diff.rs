use serde_json::{Map, Value};

/// One leaf that differs between two house documents.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Change {
    pub path: String,
    pub old: Value,
    pub new: Value,
}

/// Walk `current` against `previous` and collect changed leaves.
///
/// Arrays are compared by index (`items.0.zones.1.temperature`), which is
/// stable for the house document because the service keeps thermostats and
/// zones in a fixed order. Keys that disappear are not reported.
pub(crate) fn diff_json(previous: &Value, current: &Value, path_prefix: &str, changes: &mut Vec<Change>) {
    match (previous, current) {
        (Value::Object(prev_map), Value::Object(curr_map)) => {
            for (key, curr_val) in curr_map {
                let path = join(path_prefix, key);
                match prev_map.get(key) {
                    Some(prev_val) => diff_json(prev_val, curr_val, &path, changes),
                    None if curr_val.is_object() => {
                        diff_json(&Value::Object(Map::new()), curr_val, &path, changes)
                    }
                    None => changes.push(Change {
                        path,
                        old: Value::Null,
                        new: curr_val.clone(),
                    }),
                }
            }
        }
        (Value::Array(prev_items), Value::Array(curr_items)) if prev_items.len() == curr_items.len() => {
            for (idx, (prev_val, curr_val)) in prev_items.iter().zip(curr_items).enumerate() {
                diff_json(prev_val, curr_val, &join(path_prefix, &idx.to_string()), changes);
            }
        }
        (prev, curr) if prev != curr => changes.push(Change {
            path: path_prefix.to_string(),
            old: prev.clone(),
            new: curr.clone(),
        }),
        _ => {}
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn diff(a: &Value, b: &Value) -> Vec<Change> {
        let mut changes = Vec::new();
        diff_json(a, b, "", &mut changes);
        changes
    }

    #[test]
    fn identical_houses_have_no_changes() {
        let house = json!({"items": [{"id": 1, "system_status": "Cooling"}]});
        assert!(diff(&house, &house).is_empty());
    }

    #[test]
    fn zone_temperature_change_is_indexed() {
        let before = json!({"items": [{"zones": [{"temperature": 71}, {"temperature": 77}]}]});
        let after = json!({"items": [{"zones": [{"temperature": 71}, {"temperature": 78}]}]});
        let changes = diff(&before, &after);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "items.0.zones.1.temperature");
        assert_eq!(changes[0].old, json!(77));
        assert_eq!(changes[0].new, json!(78));
    }

    #[test]
    fn new_nested_object_reports_its_leaves() {
        let before = json!({"id": 1});
        let after = json!({"id": 1, "setpoints": {"heat": 63, "cool": 71}});
        let mut paths: Vec<String> = diff(&before, &after).into_iter().map(|c| c.path).collect();
        paths.sort();
        assert_eq!(paths, vec!["setpoints.cool", "setpoints.heat"]);
    }

    #[test]
    fn resized_array_is_one_change() {
        let before = json!({"zones": [1]});
        let after = json!({"zones": [1, 2]});
        let changes = diff(&before, &after);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "zones");
    }
}
