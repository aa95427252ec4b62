use std::fmt;

use crate::{Error, Result};

pub const SYSTEM_STATUS_COOL: &str = "Cooling";
pub const SYSTEM_STATUS_HEAT: &str = "Heating";
pub const SYSTEM_STATUS_WAIT: &str = "Waiting...";
pub const SYSTEM_STATUS_IDLE: &str = "System Idle";

pub const PRESET_NONE: &str = "None";

/// Fixed humidity setpoint range shared by all XL thermostats, as fractions.
pub const HUMIDITY_MIN: f64 = 0.35;
pub const HUMIDITY_MAX: f64 = 0.65;

/// Display unit of a thermostat. Setpoints and temperatures in the house
/// data are already expressed in this unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn from_scale(scale: &str) -> Option<Self> {
        match scale.to_ascii_uppercase().as_str() {
            "C" => Some(TemperatureUnit::Celsius),
            "F" => Some(TemperatureUnit::Fahrenheit),
            _ => None,
        }
    }

    /// Unit string the host displays.
    pub fn host_unit(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "\u{00b0}C",
            TemperatureUnit::Fahrenheit => "\u{00b0}F",
        }
    }

    pub fn target_temp_step(&self) -> f64 {
        match self {
            TemperatureUnit::Celsius => 0.5,
            TemperatureUnit::Fahrenheit => 1.0,
        }
    }

    /// Round to thermostat precision: C to 0.5 increments, F to whole degrees.
    /// Ties go to even, matching the cloud service.
    pub fn round(&self, temperature: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => (temperature * 2.0).round_ties_even() / 2.0,
            TemperatureUnit::Fahrenheit => temperature.round_ties_even(),
        }
    }
}

/// Zone operation mode as the vendor names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationMode {
    Auto,
    Cool,
    Heat,
    Off,
}

impl OperationMode {
    pub const ALL: [OperationMode; 4] = [
        OperationMode::Auto,
        OperationMode::Cool,
        OperationMode::Heat,
        OperationMode::Off,
    ];

    pub fn as_nexia_str(&self) -> &'static str {
        match self {
            OperationMode::Auto => "AUTO",
            OperationMode::Cool => "COOL",
            OperationMode::Heat => "HEAT",
            OperationMode::Off => "OFF",
        }
    }

    pub fn from_nexia_str(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_nexia_str().eq_ignore_ascii_case(s))
    }

    pub fn supported() -> Vec<&'static str> {
        Self::ALL.iter().map(|m| m.as_nexia_str()).collect()
    }

    /// Like [`from_nexia_str`](Self::from_nexia_str) but fails with
    /// [`Error::UnsupportedMode`] listing the known modes.
    pub fn parse(s: &str) -> Result<Self> {
        Self::from_nexia_str(s).ok_or_else(|| Error::UnsupportedMode {
            mode: s.to_string(),
            supported: Self::supported(),
        })
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_nexia_str())
    }
}

/// HVAC mode as the host presents it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HvacMode {
    Off,
    Auto,
    HeatCool,
    Heat,
    Cool,
}

impl HvacMode {
    pub const ALL: [HvacMode; 5] = [
        HvacMode::Off,
        HvacMode::Auto,
        HvacMode::HeatCool,
        HvacMode::Heat,
        HvacMode::Cool,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HvacMode::Off => "off",
            HvacMode::Auto => "auto",
            HvacMode::HeatCool => "heat_cool",
            HvacMode::Heat => "heat",
            HvacMode::Cool => "cool",
        }
    }

    pub fn from_host_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == s)
    }

    /// Map a zone's requested vendor mode and hold flag to the host mode.
    /// `AUTO` under a permanent hold is a fixed heat/cool band, not the schedule.
    pub fn from_vendor(mode: OperationMode, permanent_hold: bool) -> Self {
        match mode {
            OperationMode::Off => HvacMode::Off,
            OperationMode::Auto if !permanent_hold => HvacMode::Auto,
            OperationMode::Auto => HvacMode::HeatCool,
            OperationMode::Heat => HvacMode::Heat,
            OperationMode::Cool => HvacMode::Cool,
        }
    }

    /// Vendor mode written for this host mode.
    pub fn to_vendor(&self) -> OperationMode {
        match self {
            HvacMode::Off => OperationMode::Off,
            HvacMode::Auto | HvacMode::HeatCool => OperationMode::Auto,
            HvacMode::Heat => OperationMode::Heat,
            HvacMode::Cool => OperationMode::Cool,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HvacAction {
    Off,
    Idle,
    Heating,
    Cooling,
}

impl HvacAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HvacAction::Off => "off",
            HvacAction::Idle => "idle",
            HvacAction::Heating => "heating",
            HvacAction::Cooling => "cooling",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanMode {
    Auto,
    On,
    Circulate,
}

impl FanMode {
    pub const ALL: [FanMode; 3] = [FanMode::Auto, FanMode::On, FanMode::Circulate];

    pub fn as_nexia_str(&self) -> &'static str {
        match self {
            FanMode::Auto => "auto",
            FanMode::On => "on",
            FanMode::Circulate => "circulate",
        }
    }

    pub fn from_nexia_str(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_nexia_str().eq_ignore_ascii_case(s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AirCleanerMode {
    Auto,
    Quick,
    Allergy,
}

impl AirCleanerMode {
    pub const ALL: [AirCleanerMode; 3] = [
        AirCleanerMode::Auto,
        AirCleanerMode::Quick,
        AirCleanerMode::Allergy,
    ];

    pub fn as_nexia_str(&self) -> &'static str {
        match self {
            AirCleanerMode::Auto => "auto",
            AirCleanerMode::Quick => "quick",
            AirCleanerMode::Allergy => "allergy",
        }
    }

    pub fn from_nexia_str(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_nexia_str().eq_ignore_ascii_case(s))
    }
}

/// Zone run mode: following the schedule, or holding until cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    PermanentHold,
    RunSchedule,
}

impl RunMode {
    pub fn as_nexia_str(&self) -> &'static str {
        match self {
            RunMode::PermanentHold => "permanent_hold",
            RunMode::RunSchedule => "run_schedule",
        }
    }

    pub fn from_nexia_str(s: &str) -> Option<Self> {
        match s {
            "permanent_hold" => Some(RunMode::PermanentHold),
            "run_schedule" => Some(RunMode::RunSchedule),
            _ => None,
        }
    }
}
