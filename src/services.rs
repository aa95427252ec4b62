//! The two integration services and their request schemas.
//!
//! Data is validated in full before any device is touched, so a rejected
//! call never produces a partial write.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::climate::ZoneClimate;
use crate::entity::Entity;
use crate::{Error, Result};

pub const SERVICE_SET_AIRCLEANER_MODE: &str = "set_aircleaner_mode";
pub const SERVICE_SET_HUMIDIFY_SETPOINT: &str = "set_humidify_setpoint";

pub const HUMIDIFY_SETPOINT_MIN: i64 = 35;
pub const HUMIDIFY_SETPOINT_MAX: i64 = 65;

/// `entity_id` accepts one id, a comma-separated list or an array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EntityIdField {
    One(String),
    Many(Vec<String>),
}

impl EntityIdField {
    fn normalize(self) -> Result<Vec<String>> {
        let raw = match self {
            EntityIdField::One(s) => s.split(',').map(str::to_string).collect(),
            EntityIdField::Many(v) => v,
        };
        raw.into_iter()
            .map(|id| {
                let id = id.trim().to_lowercase();
                match id.split_once('.') {
                    Some((platform, object)) if !platform.is_empty() && !object.is_empty() => Ok(id),
                    _ => Err(Error::Validation(format!("entity id {id:?} is not platform.object_id"))),
                }
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HumidifySetpointData {
    #[serde(default)]
    entity_id: Option<EntityIdField>,
    humidity: Value,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AirCleanerModeData {
    #[serde(default)]
    entity_id: Option<EntityIdField>,
    aircleaner_mode: Value,
}

/// A validated service call.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceCall {
    /// Humidify setpoint in whole percent, 35 to 65.
    SetHumidifySetpoint {
        entity_ids: Option<Vec<String>>,
        humidity: i64,
    },
    SetAirCleanerMode {
        entity_ids: Option<Vec<String>>,
        mode: String,
    },
}

impl ServiceCall {
    pub fn parse(service: &str, data: &Value) -> Result<Self> {
        let invalid = |e: serde_json::Error| Error::Validation(e.to_string());
        match service {
            SERVICE_SET_HUMIDIFY_SETPOINT => {
                let data = HumidifySetpointData::deserialize(data).map_err(invalid)?;
                let humidity = coerce_int(&data.humidity)?;
                if !(HUMIDIFY_SETPOINT_MIN..=HUMIDIFY_SETPOINT_MAX).contains(&humidity) {
                    return Err(Error::Validation(format!(
                        "humidity {humidity} must be between {HUMIDIFY_SETPOINT_MIN} and {HUMIDIFY_SETPOINT_MAX}"
                    )));
                }
                Ok(ServiceCall::SetHumidifySetpoint {
                    entity_ids: data.entity_id.map(EntityIdField::normalize).transpose()?,
                    humidity,
                })
            }
            SERVICE_SET_AIRCLEANER_MODE => {
                let data = AirCleanerModeData::deserialize(data).map_err(invalid)?;
                let mode = match data.aircleaner_mode {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    other => {
                        return Err(Error::Validation(format!(
                            "aircleaner_mode must be a string, got {other}"
                        )));
                    }
                };
                Ok(ServiceCall::SetAirCleanerMode {
                    entity_ids: data.entity_id.map(EntityIdField::normalize).transpose()?,
                    mode,
                })
            }
            other => Err(Error::UnknownService(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ServiceCall::SetHumidifySetpoint { .. } => SERVICE_SET_HUMIDIFY_SETPOINT,
            ServiceCall::SetAirCleanerMode { .. } => SERVICE_SET_AIRCLEANER_MODE,
        }
    }

    fn entity_ids(&self) -> Option<&[String]> {
        match self {
            ServiceCall::SetHumidifySetpoint { entity_ids, .. }
            | ServiceCall::SetAirCleanerMode { entity_ids, .. } => entity_ids.as_deref(),
        }
    }
}

/// Integers, integral floats and numeric strings; floats truncate.
fn coerce_int(value: &Value) -> Result<i64> {
    let coerced = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    };
    coerced.ok_or_else(|| Error::Validation(format!("expected int for humidity, got {value}")))
}

/// Pick one climate entity per thermostat among those the call targets,
/// keeping the first matching zone of each.
fn targets<'a>(climates: &'a [ZoneClimate], entity_ids: Option<&[String]>) -> Vec<&'a ZoneClimate> {
    let mut seen = HashSet::new();
    climates
        .iter()
        .filter(|c| entity_ids.is_none_or(|ids| ids.iter().any(|id| id == c.entity_id())))
        .filter(|c| seen.insert(c.thermostat_id()))
        .collect()
}

/// Run a validated call against the integration's climate entities.
pub async fn handle(call: &ServiceCall, climates: &[ZoneClimate]) -> Result<()> {
    let targets = targets(climates, call.entity_ids());
    debug!(service = call.name(), targets = targets.len(), "service call");
    match call {
        ServiceCall::SetHumidifySetpoint { humidity, .. } => {
            for climate in targets {
                if !climate.supports_humidify()? {
                    debug!(thermostat = climate.thermostat_id(), "no humidify support, skipping");
                    continue;
                }
                info!(thermostat = climate.thermostat_id(), humidity, "setting humidify setpoint");
                climate.set_humidify_setpoint(*humidity as f64).await?;
            }
        }
        ServiceCall::SetAirCleanerMode { mode, .. } => {
            for climate in targets {
                info!(thermostat = climate.thermostat_id(), mode = %mode, "setting air cleaner mode");
                climate.set_aircleaner_mode(mode).await?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn humidity_is_coerced_and_bounded() {
        let call = ServiceCall::parse(SERVICE_SET_HUMIDIFY_SETPOINT, &json!({"humidity": "45"})).unwrap();
        assert_eq!(
            call,
            ServiceCall::SetHumidifySetpoint {
                entity_ids: None,
                humidity: 45
            }
        );
        let call = ServiceCall::parse(SERVICE_SET_HUMIDIFY_SETPOINT, &json!({"humidity": 50.9})).unwrap();
        assert!(matches!(call, ServiceCall::SetHumidifySetpoint { humidity: 50, .. }));

        for bad in [json!({"humidity": 70}), json!({"humidity": 34}), json!({"humidity": "high"}), json!({})] {
            assert!(matches!(
                ServiceCall::parse(SERVICE_SET_HUMIDIFY_SETPOINT, &bad),
                Err(Error::Validation(_))
            ));
        }
    }

    #[test]
    fn entity_ids_accept_string_list_or_array() {
        let call = ServiceCall::parse(
            SERVICE_SET_AIRCLEANER_MODE,
            &json!({"entity_id": "climate.Master, climate.bath_closet", "aircleaner_mode": "allergy"}),
        )
        .unwrap();
        assert_eq!(
            call,
            ServiceCall::SetAirCleanerMode {
                entity_ids: Some(vec!["climate.master".into(), "climate.bath_closet".into()]),
                mode: "allergy".into(),
            }
        );

        let call = ServiceCall::parse(
            SERVICE_SET_AIRCLEANER_MODE,
            &json!({"entity_id": ["climate.master"], "aircleaner_mode": "quick"}),
        )
        .unwrap();
        assert_eq!(call.entity_ids(), Some(&["climate.master".to_string()][..]));
    }

    #[test]
    fn schema_rejects_bad_data() {
        assert!(matches!(
            ServiceCall::parse(SERVICE_SET_AIRCLEANER_MODE, &json!({"aircleaner_mode": "auto", "extra": 1})),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            ServiceCall::parse(SERVICE_SET_AIRCLEANER_MODE, &json!({"entity_id": "master", "aircleaner_mode": "auto"})),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            ServiceCall::parse(SERVICE_SET_AIRCLEANER_MODE, &json!({"aircleaner_mode": null})),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            ServiceCall::parse("set_fan_min_on_time", &json!({})),
            Err(Error::UnknownService(_))
        ));
    }
}
