use serde_json::Value;
use tracing::debug;

use crate::api::NexiaApi;
use crate::protocol::{self, WriteTarget, value_data};
use crate::types::*;
use crate::zone::Zone;
use crate::{Error, Result};

/// Find the entry in a list of objects whose `key` equals `name`.
pub(crate) fn find_entry<'a>(list: Option<&'a Value>, key: &str, name: &str) -> Option<&'a Value> {
    list?
        .as_array()?
        .iter()
        .find(|entry| entry.get(key).and_then(Value::as_str) == Some(name))
}

/// Numbers arrive either as JSON numbers or as numeric strings.
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Presence test for optional keys: null, false, zero and empty values
/// mean the capability is absent.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Read-only view of one thermostat in the current house document.
///
/// Writes go through the [`NexiaApi`] passed in and never touch the
/// document; the coordinator's next refresh picks up the result.
#[derive(Debug, Clone, Copy)]
pub struct Thermostat<'a> {
    json: &'a Value,
    id: u64,
}

impl<'a> Thermostat<'a> {
    /// `None` when the item has no numeric id.
    pub fn new(json: &'a Value) -> Option<Self> {
        let id = json.get("id")?.as_u64()?;
        Some(Self { json, id })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn json(&self) -> &'a Value {
        self.json
    }

    fn missing(&self, what: &str) -> Error {
        Error::MissingField(format!("thermostat {}: {what}", self.id))
    }

    fn key(&self, key: &str) -> Result<&'a Value> {
        self.json.get(key).ok_or_else(|| self.missing(key))
    }

    fn key_str(&self, key: &str) -> Result<&'a str> {
        self.key(key)?.as_str().ok_or_else(|| self.missing(key))
    }

    fn feature_opt(&self, name: &str) -> Option<&'a Value> {
        find_entry(self.json.get("features"), "name", name)
    }

    fn feature(&self, name: &str) -> Result<&'a Value> {
        self.feature_opt(name)
            .ok_or_else(|| self.missing(&format!("features[{name}]")))
    }

    fn setting_opt(&self, kind: &str) -> Option<&'a Value> {
        find_entry(self.json.get("settings"), "type", kind)
    }

    fn setting(&self, kind: &str) -> Result<&'a Value> {
        self.setting_opt(kind)
            .ok_or_else(|| self.missing(&format!("settings[{kind}]")))
    }

    fn setting_number(&self, kind: &str) -> Result<f64> {
        self.setting(kind)?
            .get("current_value")
            .and_then(as_number)
            .ok_or_else(|| self.missing(&format!("settings[{kind}].current_value")))
    }

    fn thermostat_feature_number(&self, field: &str) -> Result<f64> {
        self.feature("thermostat")?
            .get(field)
            .and_then(as_number)
            .ok_or_else(|| self.missing(&format!("features[thermostat].{field}")))
    }

    fn advanced_info(&self, label: &str) -> Result<&'a str> {
        let info = self.feature("advanced_info")?;
        find_entry(info.get("items"), "label", label)
            .and_then(|item| item.get("value"))
            .and_then(Value::as_str)
            .ok_or_else(|| self.missing(&format!("advanced_info[{label}]")))
    }

    // Identity

    pub fn name(&self) -> Result<&'a str> {
        self.key_str("name")
    }

    pub fn model(&self) -> Result<&'a str> {
        self.advanced_info("Model")
    }

    /// Same as the model on XL thermostats, e.g. `XL1050`.
    pub fn thermostat_type(&self) -> Result<&'a str> {
        self.model()
    }

    pub fn firmware(&self) -> Result<&'a str> {
        self.advanced_info("Firmware Version")
    }

    pub fn dev_build_number(&self) -> Result<&'a str> {
        self.advanced_info("Firmware Build Number")
    }

    pub fn device_id(&self) -> Result<&'a str> {
        self.advanced_info("AUID")
    }

    // Capabilities

    pub fn has_outdoor_temperature(&self) -> bool {
        self.json.get("has_outdoor_temperature").is_some_and(truthy)
    }

    pub fn has_relative_humidity(&self) -> bool {
        self.json.get("indoor_humidity").is_some_and(truthy)
    }

    pub fn has_variable_speed_compressor(&self) -> bool {
        true
    }

    pub fn has_emergency_heat(&self) -> bool {
        self.json.get("emergency_heat_supported").is_some_and(truthy)
    }

    pub fn has_variable_fan_speed(&self) -> bool {
        self.setting_opt("fan_speed").is_some()
    }

    pub fn has_zones(&self) -> bool {
        self.json.get("zones").is_some_and(truthy)
    }

    pub fn has_dehumidify_support(&self) -> bool {
        self.setting_opt("dehumidify").is_some()
    }

    pub fn has_humidify_support(&self) -> bool {
        self.setting_opt("humidify").is_some()
    }

    // Limits and units

    pub fn unit(&self) -> Result<TemperatureUnit> {
        let scale = self
            .feature("thermostat")?
            .get("scale")
            .and_then(Value::as_str)
            .ok_or_else(|| self.missing("features[thermostat].scale"))?;
        TemperatureUnit::from_scale(scale)
            .ok_or_else(|| Error::InvalidValue(format!("temperature scale {scale:?}")))
    }

    /// Minimum gap between heat and cool setpoints, in the thermostat's unit.
    pub fn deadband(&self) -> Result<f64> {
        self.thermostat_feature_number("setpoint_delta")
    }

    /// `(lowest heat setpoint, highest cool setpoint)`.
    pub fn setpoint_limits(&self) -> Result<(f64, f64)> {
        Ok((
            self.thermostat_feature_number("setpoint_heat_min")?,
            self.thermostat_feature_number("setpoint_cool_max")?,
        ))
    }

    pub fn variable_fan_speed_limits(&self) -> Result<(f64, f64)> {
        let setting = self
            .setting_opt("fan_speed")
            .ok_or(Error::NotSupported("variable fan speed"))?;
        let values = setting
            .get("values")
            .and_then(Value::as_array)
            .ok_or_else(|| self.missing("settings[fan_speed].values"))?;
        match (values.first().and_then(as_number), values.last().and_then(as_number)) {
            (Some(lo), Some(hi)) => Ok((lo, hi)),
            _ => Err(self.missing("settings[fan_speed].values")),
        }
    }

    pub fn humidity_setpoint_limits(&self) -> (f64, f64) {
        (HUMIDITY_MIN, HUMIDITY_MAX)
    }

    pub fn round_temp(&self, temperature: f64) -> Result<f64> {
        Ok(self.unit()?.round(temperature))
    }

    // State

    pub fn system_status(&self) -> Result<&'a str> {
        self.key_str("system_status")
    }

    pub fn is_blower_active(&self) -> Result<bool> {
        let status = self.system_status()?;
        Ok(status != SYSTEM_STATUS_WAIT && status != SYSTEM_STATUS_IDLE)
    }

    pub fn is_emergency_heat_active(&self) -> Result<bool> {
        if !self.has_emergency_heat() {
            return Err(Error::NotSupported("emergency heat"));
        }
        Ok(self
            .setting("emergency_heat_active")?
            .get("current_value")
            .is_some_and(truthy))
    }

    pub fn fan_mode(&self) -> Result<FanMode> {
        let raw = self
            .setting("fan_mode")?
            .get("current_value")
            .and_then(Value::as_str)
            .ok_or_else(|| self.missing("settings[fan_mode].current_value"))?;
        FanMode::from_nexia_str(raw).ok_or_else(|| Error::InvalidValue(format!("fan mode {raw:?}")))
    }

    pub fn fan_speed_setpoint(&self) -> Result<f64> {
        if !self.has_variable_fan_speed() {
            return Err(Error::NotSupported("variable fan speed"));
        }
        self.setting_number("fan_speed")
    }

    /// `Ok(None)` when the sensor reports something non-numeric, such as `--`.
    pub fn outdoor_temperature(&self) -> Result<Option<f64>> {
        if !self.has_outdoor_temperature() {
            return Err(Error::NotSupported("outdoor temperature"));
        }
        Ok(as_number(self.key("outdoor_temperature")?))
    }

    /// Indoor relative humidity as a fraction.
    pub fn relative_humidity(&self) -> Result<f64> {
        if !self.has_relative_humidity() {
            return Err(Error::NotSupported("relative humidity"));
        }
        let raw = self.key("indoor_humidity")?;
        as_number(raw)
            .map(|pct| pct / 100.0)
            .ok_or_else(|| Error::InvalidValue(format!("indoor humidity {raw}")))
    }

    /// Compressor speed as a fraction; 0 when the feature is absent.
    pub fn current_compressor_speed(&self) -> Result<f64> {
        Ok(self
            .feature_opt("thermostat_compressor_speed")
            .and_then(|f| f.get("compressor_speed"))
            .and_then(as_number)
            .unwrap_or(0.0))
    }

    /// The service does not report a separate requested speed.
    pub fn requested_compressor_speed(&self) -> Result<f64> {
        self.current_compressor_speed()
    }

    pub fn dehumidify_setpoint(&self) -> Result<f64> {
        if !self.has_dehumidify_support() {
            return Err(Error::NotSupported("dehumidifying"));
        }
        self.setting_number("dehumidify")
    }

    pub fn humidify_setpoint(&self) -> Result<f64> {
        if !self.has_humidify_support() {
            return Err(Error::NotSupported("humidifying"));
        }
        self.setting_number("humidify")
    }

    pub fn air_cleaner_mode(&self) -> Result<&'a str> {
        self.setting("air_cleaner_mode")?
            .get("current_value")
            .and_then(Value::as_str)
            .ok_or_else(|| self.missing("settings[air_cleaner_mode].current_value"))
    }

    // Zones

    pub fn zones(&self) -> Vec<Zone<'a>> {
        self.json
            .get("zones")
            .and_then(Value::as_array)
            .map(|zones| zones.iter().filter_map(|z| Zone::new(*self, z)).collect())
            .unwrap_or_default()
    }

    pub fn zone_ids(&self) -> Vec<u64> {
        self.zones().iter().map(Zone::id).collect()
    }

    pub fn zone(&self, zone_id: u64) -> Result<Zone<'a>> {
        self.zones()
            .into_iter()
            .find(|z| z.id() == zone_id)
            .ok_or(Error::UnknownZone(zone_id))
    }

    /// Round both setpoints and check them against the deadband and limits.
    pub fn check_heat_cool_setpoints(&self, heat: Option<f64>, cool: Option<f64>) -> Result<()> {
        let deadband = self.deadband()?;
        let (min_temp, max_temp) = self.setpoint_limits()?;
        let heat = heat.map(|t| self.round_temp(t)).transpose()?;
        let cool = cool.map(|t| self.round_temp(t)).transpose()?;

        if let (Some(heat), Some(cool)) = (heat, cool) {
            if heat >= cool {
                return Err(Error::InvalidSetpoints(format!(
                    "heat setpoint {heat} must be lower than cool setpoint {cool}"
                )));
            }
            if cool - heat < deadband {
                return Err(Error::InvalidSetpoints(format!(
                    "heat {heat} and cool {cool} must be at least {deadband} apart"
                )));
            }
        }
        if let Some(heat) = heat
            && heat > max_temp
        {
            return Err(Error::InvalidSetpoints(format!(
                "heat setpoint {heat} is above the maximum {max_temp}"
            )));
        }
        if let Some(cool) = cool
            && cool < min_temp
        {
            return Err(Error::InvalidSetpoints(format!(
                "cool setpoint {cool} is below the minimum {min_temp}"
            )));
        }
        Ok(())
    }

    // Writes

    fn target(&self) -> WriteTarget {
        WriteTarget::Thermostat(self.id)
    }

    pub async fn set_fan_mode(&self, api: &dyn NexiaApi, mode: FanMode) -> Result<()> {
        api.post(self.target(), protocol::FAN_MODE, value_data(mode.as_nexia_str()))
            .await
    }

    /// Speed as a fraction within [`variable_fan_speed_limits`](Self::variable_fan_speed_limits).
    pub async fn set_fan_setpoint(&self, api: &dyn NexiaApi, speed: f64) -> Result<()> {
        let (lo, hi) = self.variable_fan_speed_limits()?;
        if !(lo..=hi).contains(&speed) {
            return Err(Error::InvalidValue(format!(
                "fan speed {speed} outside {lo}..={hi}"
            )));
        }
        api.post(self.target(), protocol::FAN_SPEED, value_data(speed)).await
    }

    pub async fn set_air_cleaner(&self, api: &dyn NexiaApi, mode: &str) -> Result<()> {
        let mode = AirCleanerMode::from_nexia_str(mode)
            .ok_or_else(|| Error::InvalidValue(format!("air cleaner mode {mode:?}")))?;
        if self
            .air_cleaner_mode()
            .is_ok_and(|current| current.eq_ignore_ascii_case(mode.as_nexia_str()))
        {
            debug!(thermostat = self.id, mode = mode.as_nexia_str(), "air cleaner already set");
            return Ok(());
        }
        api.post(
            self.target(),
            protocol::AIR_CLEANER_MODE,
            value_data(mode.as_nexia_str()),
        )
        .await
    }

    pub async fn set_follow_schedule(&self, api: &dyn NexiaApi, follow: bool) -> Result<()> {
        let value = if follow { "true" } else { "false" };
        api.post(self.target(), protocol::SCHEDULING_ENABLED, value_data(value))
            .await
    }

    pub async fn set_emergency_heat(&self, api: &dyn NexiaApi, on: bool) -> Result<()> {
        if !self.has_emergency_heat() {
            return Err(Error::NotSupported("emergency heat"));
        }
        api.post(self.target(), protocol::EMERGENCY_HEAT, value_data(on)).await
    }

    pub async fn set_humidify_setpoint(&self, api: &dyn NexiaApi, humidity: f64) -> Result<()> {
        self.set_humidity_setpoints(api, None, Some(humidity)).await
    }

    pub async fn set_dehumidify_setpoint(&self, api: &dyn NexiaApi, humidity: f64) -> Result<()> {
        self.set_humidity_setpoints(api, Some(humidity), None).await
    }

    /// Humidity setpoints are fractions, rounded to 0.05 and bounded by
    /// [`humidity_setpoint_limits`](Self::humidity_setpoint_limits). When both
    /// directions are supported the humidify setpoint may not exceed the
    /// dehumidify one; the side not being written keeps its current value.
    pub async fn set_humidity_setpoints(
        &self,
        api: &dyn NexiaApi,
        dehumidify: Option<f64>,
        humidify: Option<f64>,
    ) -> Result<()> {
        if dehumidify.is_none() && humidify.is_none() {
            return Ok(());
        }
        if !self.has_relative_humidity() {
            return Err(Error::NotSupported("setting target humidity"));
        }
        let can_dehumidify = self.has_dehumidify_support();
        let can_humidify = self.has_humidify_support();
        if dehumidify.is_some() && !can_dehumidify {
            return Err(Error::NotSupported("dehumidifying"));
        }
        if humidify.is_some() && !can_humidify {
            return Err(Error::NotSupported("humidifying"));
        }

        let dehumidify_value = match dehumidify {
            Some(v) => round_humidity(v),
            None if can_dehumidify => self.dehumidify_setpoint()?,
            None => 0.0,
        };
        let humidify_value = match humidify {
            Some(v) => round_humidity(v),
            None if can_humidify => self.humidify_setpoint()?,
            None => 0.0,
        };

        let (min, max) = self.humidity_setpoint_limits();
        let in_range = |v: f64| (min..=max).contains(&v);
        if can_dehumidify && can_humidify {
            if !(in_range(humidify_value) && in_range(dehumidify_value) && humidify_value <= dehumidify_value) {
                return Err(Error::InvalidValue(format!(
                    "humidify {humidify_value} and dehumidify {dehumidify_value} must satisfy \
                     {min} <= humidify <= dehumidify <= {max}"
                )));
            }
        } else if can_dehumidify && !in_range(dehumidify_value) {
            return Err(Error::InvalidValue(format!(
                "dehumidify setpoint {dehumidify_value} outside {min}..={max}"
            )));
        } else if can_humidify && !in_range(humidify_value) {
            return Err(Error::InvalidValue(format!(
                "humidify setpoint {humidify_value} outside {min}..={max}"
            )));
        }

        if humidify.is_some() {
            api.post(self.target(), protocol::HUMIDIFY, value_data(humidify_value))
                .await?;
        }
        if dehumidify.is_some() {
            api.post(self.target(), protocol::DEHUMIDIFY, value_data(dehumidify_value))
                .await?;
        }
        Ok(())
    }
}

/// Nearest 0.05, kept to two decimals.
fn round_humidity(value: f64) -> f64 {
    ((value / 0.05).round_ties_even() * 5.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn thermostat_json() -> Value {
        json!({
            "id": 2059661,
            "name": "Downstairs East Wing",
            "system_status": "System Idle",
            "has_outdoor_temperature": true,
            "outdoor_temperature": "88",
            "indoor_humidity": "36",
            "emergency_heat_supported": false,
            "features": [
                {"name": "advanced_info", "items": [
                    {"label": "Model", "value": "XL1050"},
                    {"label": "AUID", "value": "02853E08"},
                    {"label": "Firmware Build Number", "value": "1581321824"},
                    {"label": "Firmware Version", "value": "5.9.1"}
                ]},
                {"name": "thermostat", "scale": "f", "setpoint_delta": 3,
                 "setpoint_heat_min": 55, "setpoint_cool_max": 99},
                {"name": "thermostat_compressor_speed", "compressor_speed": 0.0}
            ],
            "settings": [
                {"type": "fan_mode", "current_value": "auto"},
                {"type": "fan_speed", "current_value": 0.35, "values": [0.35, 0.5, 0.65, 1.0]},
                {"type": "air_cleaner_mode", "current_value": "auto"},
                {"type": "dehumidify", "current_value": 0.5}
            ],
            "zones": [{"id": 83261002, "name": "Living East"}]
        })
    }

    #[test]
    fn identity_comes_from_advanced_info() {
        let json = thermostat_json();
        let t = Thermostat::new(&json).unwrap();
        assert_eq!(t.name().unwrap(), "Downstairs East Wing");
        assert_eq!(t.model().unwrap(), "XL1050");
        assert_eq!(t.thermostat_type().unwrap(), "XL1050");
        assert_eq!(t.firmware().unwrap(), "5.9.1");
        assert_eq!(t.dev_build_number().unwrap(), "1581321824");
        assert_eq!(t.device_id().unwrap(), "02853E08");
    }

    #[test]
    fn capabilities() {
        let json = thermostat_json();
        let t = Thermostat::new(&json).unwrap();
        assert!(t.has_outdoor_temperature());
        assert!(t.has_relative_humidity());
        assert!(t.has_variable_speed_compressor());
        assert!(!t.has_emergency_heat());
        assert!(t.has_variable_fan_speed());
        assert!(t.has_zones());
        assert!(t.has_dehumidify_support());
        assert!(!t.has_humidify_support());
    }

    #[test]
    fn limits_and_state() {
        let json = thermostat_json();
        let t = Thermostat::new(&json).unwrap();
        assert_eq!(t.unit().unwrap(), TemperatureUnit::Fahrenheit);
        assert_eq!(t.deadband().unwrap(), 3.0);
        assert_eq!(t.setpoint_limits().unwrap(), (55.0, 99.0));
        assert_eq!(t.variable_fan_speed_limits().unwrap(), (0.35, 1.0));
        assert_eq!(t.outdoor_temperature().unwrap(), Some(88.0));
        assert_eq!(t.relative_humidity().unwrap(), 0.36);
        assert_eq!(t.fan_mode().unwrap(), FanMode::Auto);
        assert!(!t.is_blower_active().unwrap());
        assert_eq!(t.current_compressor_speed().unwrap(), 0.0);
        assert!(matches!(t.is_emergency_heat_active(), Err(Error::NotSupported(_))));
        assert_eq!(t.zone_ids(), vec![83261002]);
    }

    #[test]
    fn non_numeric_outdoor_temperature_is_unknown() {
        let mut json = thermostat_json();
        json["outdoor_temperature"] = json!("--");
        let t = Thermostat::new(&json).unwrap();
        assert_eq!(t.outdoor_temperature().unwrap(), None);
    }

    #[test]
    fn missing_compressor_feature_reads_zero() {
        let mut json = thermostat_json();
        json["features"].as_array_mut().unwrap().pop();
        let t = Thermostat::new(&json).unwrap();
        assert_eq!(t.current_compressor_speed().unwrap(), 0.0);
        assert_eq!(t.requested_compressor_speed().unwrap(), 0.0);
    }

    #[test]
    fn setpoint_checks() {
        let json = thermostat_json();
        let t = Thermostat::new(&json).unwrap();
        assert!(t.check_heat_cool_setpoints(Some(63.0), Some(71.0)).is_ok());
        assert!(t.check_heat_cool_setpoints(Some(70.0), Some(72.0)).is_err());
        assert!(t.check_heat_cool_setpoints(Some(72.0), Some(70.0)).is_err());
        assert!(t.check_heat_cool_setpoints(Some(100.0), None).is_err());
        assert!(t.check_heat_cool_setpoints(None, Some(50.0)).is_err());
        assert!(t.check_heat_cool_setpoints(None, None).is_ok());
    }

    #[test]
    fn humidity_rounding() {
        assert_eq!(round_humidity(0.44), 0.45);
        assert_eq!(round_humidity(0.42), 0.4);
        assert_eq!(round_humidity(0.5), 0.5);
    }

    #[test]
    fn items_without_id_are_not_thermostats() {
        assert!(Thermostat::new(&json!({"name": "x"})).is_none());
    }
}
