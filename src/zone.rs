use serde_json::Value;
use tracing::debug;

use crate::api::NexiaApi;
use crate::protocol::{self, WriteTarget, empty_data, setpoints_data, value_data};
use crate::thermostat::{Thermostat, as_number, find_entry, truthy};
use crate::types::*;
use crate::{Error, Result};

/// Read-only view of one zone, carrying the thermostat it belongs to for
/// unit, deadband and limit lookups.
#[derive(Debug, Clone, Copy)]
pub struct Zone<'a> {
    thermostat: Thermostat<'a>,
    json: &'a Value,
    id: u64,
}

impl<'a> Zone<'a> {
    pub fn new(thermostat: Thermostat<'a>, json: &'a Value) -> Option<Self> {
        let id = json.get("id")?.as_u64()?;
        Some(Self {
            thermostat,
            json,
            id,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn thermostat(&self) -> &Thermostat<'a> {
        &self.thermostat
    }

    fn missing(&self, what: &str) -> Error {
        Error::MissingField(format!("zone {}: {what}", self.id))
    }

    fn number_at(&self, pointer: &str) -> Result<f64> {
        self.json
            .pointer(pointer)
            .and_then(as_number)
            .ok_or_else(|| self.missing(pointer))
    }

    fn setting(&self, kind: &str) -> Result<&'a Value> {
        find_entry(self.json.get("settings"), "type", kind)
            .ok_or_else(|| self.missing(&format!("settings[{kind}]")))
    }

    fn feature(&self, name: &str) -> Result<&'a Value> {
        find_entry(self.json.get("features"), "name", name)
            .ok_or_else(|| self.missing(&format!("features[{name}]")))
    }

    fn current_value_str(&self, kind: &str) -> Result<&'a str> {
        self.setting(kind)?
            .get("current_value")
            .and_then(Value::as_str)
            .ok_or_else(|| self.missing(&format!("settings[{kind}].current_value")))
    }

    pub fn name(&self) -> Result<&'a str> {
        self.json
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| self.missing("name"))
    }

    pub fn temperature(&self) -> Result<f64> {
        self.number_at("/temperature")
    }

    pub fn heating_setpoint(&self) -> Result<f64> {
        self.number_at("/setpoints/heat")
    }

    pub fn cooling_setpoint(&self) -> Result<f64> {
        self.number_at("/setpoints/cool")
    }

    /// Mode the zone is running in right now.
    pub fn current_mode(&self) -> Result<OperationMode> {
        OperationMode::parse(self.current_value_str("zone_mode")?)
    }

    /// Mode the user asked for.
    pub fn requested_mode(&self) -> Result<OperationMode> {
        let raw = self
            .feature("thermostat_mode")?
            .get("value")
            .and_then(Value::as_str)
            .ok_or_else(|| self.missing("features[thermostat_mode].value"))?;
        OperationMode::parse(raw)
    }

    pub fn presets(&self) -> Result<Vec<&'a str>> {
        let options = self
            .setting("preset_selected")?
            .get("options")
            .and_then(Value::as_array)
            .ok_or_else(|| self.missing("settings[preset_selected].options"))?;
        Ok(options
            .iter()
            .filter_map(|o| o.get("label").and_then(Value::as_str))
            .collect())
    }

    pub fn preset(&self) -> Result<&'a str> {
        let setting = self.setting("preset_selected")?;
        let index = setting
            .get("current_value")
            .and_then(Value::as_u64)
            .ok_or_else(|| self.missing("settings[preset_selected].current_value"))?;
        setting
            .get("labels")
            .and_then(|labels| labels.get(index as usize))
            .and_then(Value::as_str)
            .ok_or_else(|| self.missing(&format!("settings[preset_selected].labels[{index}]")))
    }

    pub fn status(&self) -> Result<&'a str> {
        self.json
            .get("zone_status")
            .and_then(Value::as_str)
            .ok_or_else(|| self.missing("zone_status"))
    }

    pub fn run_mode(&self) -> Result<RunMode> {
        let raw = self.current_value_str("run_mode")?;
        RunMode::from_nexia_str(raw).ok_or_else(|| Error::InvalidValue(format!("run mode {raw:?}")))
    }

    pub fn is_in_permanent_hold(&self) -> Result<bool> {
        Ok(self.current_value_str("run_mode")? == RunMode::PermanentHold.as_nexia_str())
    }

    /// "Holding Permanently", or "Following Schedule - Home" style text with
    /// the active preset appended unless it is "None".
    pub fn setpoint_status(&self) -> Result<String> {
        let run_mode = self.setting("run_mode")?;
        let current = self.current_value_str("run_mode")?;
        let label = find_entry(run_mode.get("options"), "value", current)
            .and_then(|o| o.get("label"))
            .and_then(Value::as_str)
            .ok_or_else(|| self.missing(&format!("settings[run_mode].options[{current}]")))?;

        if current == RunMode::PermanentHold.as_nexia_str() {
            return Ok(label.to_string());
        }
        match self.preset()? {
            PRESET_NONE => Ok(label.to_string()),
            preset => Ok(format!("{label} - {preset}")),
        }
    }

    /// True while the zone damper is calling for conditioning.
    pub fn is_calling(&self) -> bool {
        self.json.get("operating_state").is_some_and(truthy)
    }

    // Writes

    fn target(&self) -> WriteTarget {
        WriteTarget::Zone(self.id)
    }

    pub async fn call_return_to_schedule(&self, api: &dyn NexiaApi) -> Result<()> {
        api.post(self.target(), protocol::RETURN_TO_SCHEDULE, empty_data())
            .await
    }

    /// No write when the zone already holds.
    pub async fn call_permanent_hold(&self, api: &dyn NexiaApi) -> Result<()> {
        if self.is_in_permanent_hold()? {
            debug!(zone = self.id, "already in permanent hold");
            return Ok(());
        }
        api.post(
            self.target(),
            protocol::RUN_MODE,
            value_data(RunMode::PermanentHold.as_nexia_str()),
        )
        .await
    }

    pub async fn set_mode(&self, api: &dyn NexiaApi, mode: OperationMode) -> Result<()> {
        api.post(self.target(), protocol::ZONE_MODE, value_data(mode.as_nexia_str()))
            .await
    }

    /// Select a preset by label. No write when it is already active.
    pub async fn set_preset(&self, api: &dyn NexiaApi, preset: &str) -> Result<()> {
        if self.preset()? == preset {
            debug!(zone = self.id, preset, "preset already active");
            return Ok(());
        }
        let setting = self.setting("preset_selected")?;
        let value = find_entry(setting.get("options"), "label", preset)
            .and_then(|o| o.get("value"))
            .cloned()
            .ok_or_else(|| Error::InvalidValue(format!("unknown preset {preset:?}")))?;
        api.post(self.target(), protocol::PRESET_SELECTED, value_data(value))
            .await
    }

    /// Resolve and write heat and cool setpoints.
    ///
    /// With `set_temperature` the zone's current mode decides: COOL and HEAT
    /// move one side and push the other out by the deadband if needed, any
    /// other mode centres the band on the target. Without it, a missing side
    /// is derived from the given one the same way.
    pub async fn set_heat_cool_temp(
        &self,
        api: &dyn NexiaApi,
        heat: Option<f64>,
        cool: Option<f64>,
        set_temperature: Option<f64>,
    ) -> Result<()> {
        let unit = self.thermostat.unit()?;
        let deadband = self.thermostat.deadband()?;
        let current_heat = self.heating_setpoint()?;
        let current_cool = self.cooling_setpoint()?;

        let (heat, cool) = match set_temperature {
            None => {
                let heat = match (heat, cool) {
                    (Some(h), _) => unit.round(h),
                    (None, Some(c)) => current_heat.min(unit.round(c) - deadband),
                    (None, None) => {
                        return Err(Error::InvalidSetpoints(
                            "no heat, cool or target temperature given".to_string(),
                        ));
                    }
                };
                let cool = match cool {
                    Some(c) => unit.round(c),
                    None => current_cool.max(heat + deadband),
                };
                (heat, cool)
            }
            Some(target) => {
                let target = unit.round(target);
                match self.current_mode()? {
                    OperationMode::Cool => (current_heat.min(target - deadband), target),
                    OperationMode::Heat => (target, current_cool.max(target + deadband)),
                    OperationMode::Auto | OperationMode::Off => {
                        let half = (deadband / 2.0).ceil();
                        (target - half, target + half)
                    }
                }
            }
        };

        self.thermostat
            .check_heat_cool_setpoints(Some(heat), Some(cool))?;
        api.post(self.target(), protocol::SETPOINTS, setpoints_data(heat, cool))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn thermostat_json() -> Value {
        json!({
            "id": 2293892,
            "name": "Master Suite",
            "features": [
                {"name": "thermostat", "scale": "f", "setpoint_delta": 3,
                 "setpoint_heat_min": 55, "setpoint_cool_max": 99}
            ],
            "zones": [{
                "id": 83394130,
                "name": "Master",
                "temperature": 73,
                "zone_status": "Damper Open",
                "operating_state": "Damper Open",
                "setpoints": {"heat": 63, "cool": 71},
                "features": [{"name": "thermostat_mode", "value": "AUTO"}],
                "settings": [
                    {"type": "zone_mode", "current_value": "AUTO"},
                    {"type": "preset_selected", "current_value": 0,
                     "labels": ["None", "Home", "Away", "Sleep"],
                     "options": [
                        {"value": 0, "label": "None"},
                        {"value": 1, "label": "Home"},
                        {"value": 2, "label": "Away"},
                        {"value": 3, "label": "Sleep"}
                     ]},
                    {"type": "run_mode", "current_value": "permanent_hold",
                     "options": [
                        {"value": "permanent_hold", "label": "Permanent Hold"},
                        {"value": "run_schedule", "label": "Run Schedule"}
                     ]}
                ]
            }]
        })
    }

    #[test]
    fn reads() {
        let json = thermostat_json();
        let t = Thermostat::new(&json).unwrap();
        let zone = t.zone(83394130).unwrap();
        assert_eq!(zone.name().unwrap(), "Master");
        assert_eq!(zone.temperature().unwrap(), 73.0);
        assert_eq!(zone.heating_setpoint().unwrap(), 63.0);
        assert_eq!(zone.cooling_setpoint().unwrap(), 71.0);
        assert_eq!(zone.current_mode().unwrap(), OperationMode::Auto);
        assert_eq!(zone.requested_mode().unwrap(), OperationMode::Auto);
        assert_eq!(zone.presets().unwrap(), vec!["None", "Home", "Away", "Sleep"]);
        assert_eq!(zone.preset().unwrap(), "None");
        assert_eq!(zone.status().unwrap(), "Damper Open");
        assert_eq!(zone.run_mode().unwrap(), RunMode::PermanentHold);
        assert!(zone.is_in_permanent_hold().unwrap());
        assert_eq!(zone.setpoint_status().unwrap(), "Permanent Hold");
        assert!(zone.is_calling());
    }

    #[test]
    fn setpoint_status_appends_preset_when_following_schedule() {
        let mut json = thermostat_json();
        let settings = &mut json["zones"][0]["settings"];
        settings[2]["current_value"] = json!("run_schedule");
        assert_eq!(
            Thermostat::new(&json).unwrap().zone(83394130).unwrap().setpoint_status().unwrap(),
            "Run Schedule"
        );

        json["zones"][0]["settings"][1]["current_value"] = json!(2);
        assert_eq!(
            Thermostat::new(&json).unwrap().zone(83394130).unwrap().setpoint_status().unwrap(),
            "Run Schedule - Away"
        );
    }

    #[test]
    fn unknown_vendor_mode_is_reported() {
        let mut json = thermostat_json();
        json["zones"][0]["settings"][0]["current_value"] = json!("EMERGENCY");
        let t = Thermostat::new(&json).unwrap();
        match t.zone(83394130).unwrap().current_mode() {
            Err(Error::UnsupportedMode { mode, supported }) => {
                assert_eq!(mode, "EMERGENCY");
                assert_eq!(supported, vec!["AUTO", "COOL", "HEAT", "OFF"]);
            }
            other => panic!("expected UnsupportedMode, got {other:?}"),
        }
    }

    #[test]
    fn empty_operating_state_is_not_calling() {
        let mut json = thermostat_json();
        json["zones"][0]["operating_state"] = json!("");
        let t = Thermostat::new(&json).unwrap();
        assert!(!t.zone(83394130).unwrap().is_calling());
    }
}
