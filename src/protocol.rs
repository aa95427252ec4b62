use serde_json::{Value, json};

pub const DEFAULT_BASE_URL: &str = "https://www.mynexia.com/mobile";

pub const HEADER_MOBILE_ID: &str = "X-MobileId";
pub const HEADER_API_KEY: &str = "X-ApiKey";

// Thermostat endpoints
pub const FAN_MODE: &str = "fan_mode";
pub const FAN_SPEED: &str = "fan_speed";
pub const AIR_CLEANER_MODE: &str = "air_cleaner_mode";
pub const SCHEDULING_ENABLED: &str = "scheduling_enabled";
pub const EMERGENCY_HEAT: &str = "emergency_heat";
pub const HUMIDIFY: &str = "humidify";
pub const DEHUMIDIFY: &str = "dehumidify";

// Zone endpoints
pub const RETURN_TO_SCHEDULE: &str = "return_to_schedule";
pub const RUN_MODE: &str = "run_mode";
pub const ZONE_MODE: &str = "zone_mode";
pub const PRESET_SELECTED: &str = "preset_selected";
pub const SETPOINTS: &str = "setpoints";

/// Which side of the mobile API a write goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTarget {
    Thermostat(u64),
    Zone(u64),
}

impl WriteTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            WriteTarget::Thermostat(_) => "thermostat",
            WriteTarget::Zone(_) => "zone",
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            WriteTarget::Thermostat(id) | WriteTarget::Zone(id) => *id,
        }
    }

    pub fn path(&self, endpoint: &str) -> String {
        match self {
            WriteTarget::Thermostat(id) => format!("/xxl_thermostats/{id}/{endpoint}"),
            WriteTarget::Zone(id) => format!("/xxl_zones/{id}/{endpoint}"),
        }
    }
}

pub fn house_path(house_id: u64) -> String {
    format!("/houses/{house_id}")
}

pub fn value_data(value: impl Into<Value>) -> Value {
    json!({ "value": value.into() })
}

pub fn setpoints_data(heat: f64, cool: f64) -> Value {
    json!({ "heat": heat, "cool": cool })
}

pub fn empty_data() -> Value {
    json!({})
}

/// The thermostat list inside a house response body.
pub fn thermostat_items(house: &Value) -> Option<&Vec<Value>> {
    house
        .pointer("/result/_links/child/0/data/items")
        .and_then(|v| v.as_array())
}
