use std::sync::Arc;

use serde_json::{Map, Value};

use crate::coordinator::Coordinator;
use crate::entity::*;
use crate::thermostat::Thermostat;
use crate::zone::Zone;
use crate::{Error, Result};

pub const DEVICE_CLASS_TEMPERATURE: &str = "temperature";
pub const DEVICE_CLASS_HUMIDITY: &str = "humidity";

/// A raw sensor value before display conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Number(f64),
    Text(String),
    /// The device reported something unusable, such as `--`.
    Unknown,
}

impl Reading {
    fn text(s: &str) -> Self {
        Reading::Text(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorUnit {
    None,
    /// Reading is a fraction, shown as 0-100.
    Percent,
    /// The thermostat's display unit.
    Temperature,
}

pub struct ThermostatSensorDescription {
    /// Suffix of the unique id.
    pub key: &'static str,
    pub name: &'static str,
    pub device_class: Option<&'static str>,
    pub unit: SensorUnit,
    pub read: fn(&Thermostat<'_>) -> Result<Reading>,
    pub supported: fn(&Thermostat<'_>) -> bool,
}

pub struct ZoneSensorDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub device_class: Option<&'static str>,
    pub unit: SensorUnit,
    pub read: fn(&Zone<'_>) -> Result<Reading>,
}

fn always(_: &Thermostat<'_>) -> bool {
    true
}

fn system_status(t: &Thermostat<'_>) -> Result<Reading> {
    t.system_status().map(Reading::text)
}

fn air_cleaner_mode(t: &Thermostat<'_>) -> Result<Reading> {
    t.air_cleaner_mode().map(Reading::text)
}

fn current_compressor_speed(t: &Thermostat<'_>) -> Result<Reading> {
    t.current_compressor_speed().map(Reading::Number)
}

fn requested_compressor_speed(t: &Thermostat<'_>) -> Result<Reading> {
    t.requested_compressor_speed().map(Reading::Number)
}

fn outdoor_temperature(t: &Thermostat<'_>) -> Result<Reading> {
    Ok(t.outdoor_temperature()?.map_or(Reading::Unknown, Reading::Number))
}

fn relative_humidity(t: &Thermostat<'_>) -> Result<Reading> {
    t.relative_humidity().map(Reading::Number)
}

fn has_compressor(t: &Thermostat<'_>) -> bool {
    t.has_variable_speed_compressor()
}

fn has_outdoor(t: &Thermostat<'_>) -> bool {
    t.has_outdoor_temperature()
}

fn has_humidity(t: &Thermostat<'_>) -> bool {
    t.has_relative_humidity()
}

pub static THERMOSTAT_SENSORS: &[ThermostatSensorDescription] = &[
    ThermostatSensorDescription {
        key: "get_system_status",
        name: "System Status",
        device_class: None,
        unit: SensorUnit::None,
        read: system_status,
        supported: always,
    },
    ThermostatSensorDescription {
        key: "get_air_cleaner_mode",
        name: "Air Cleaner Mode",
        device_class: None,
        unit: SensorUnit::None,
        read: air_cleaner_mode,
        supported: always,
    },
    ThermostatSensorDescription {
        key: "get_current_compressor_speed",
        name: "Current Compressor Speed",
        device_class: None,
        unit: SensorUnit::Percent,
        read: current_compressor_speed,
        supported: has_compressor,
    },
    ThermostatSensorDescription {
        key: "get_requested_compressor_speed",
        name: "Requested Compressor Speed",
        device_class: None,
        unit: SensorUnit::Percent,
        read: requested_compressor_speed,
        supported: has_compressor,
    },
    ThermostatSensorDescription {
        key: "get_outdoor_temperature",
        name: "Outdoor Temperature",
        device_class: Some(DEVICE_CLASS_TEMPERATURE),
        unit: SensorUnit::Temperature,
        read: outdoor_temperature,
        supported: has_outdoor,
    },
    ThermostatSensorDescription {
        key: "get_relative_humidity",
        name: "Relative Humidity",
        device_class: Some(DEVICE_CLASS_HUMIDITY),
        unit: SensorUnit::Percent,
        read: relative_humidity,
        supported: has_humidity,
    },
];

fn zone_temperature(z: &Zone<'_>) -> Result<Reading> {
    z.temperature().map(Reading::Number)
}

fn zone_status(z: &Zone<'_>) -> Result<Reading> {
    z.status().map(Reading::text)
}

fn zone_setpoint_status(z: &Zone<'_>) -> Result<Reading> {
    z.setpoint_status().map(Reading::Text)
}

pub static ZONE_SENSORS: &[ZoneSensorDescription] = &[
    ZoneSensorDescription {
        key: "get_temperature",
        name: "Temperature",
        device_class: Some(DEVICE_CLASS_TEMPERATURE),
        unit: SensorUnit::Temperature,
        read: zone_temperature,
    },
    ZoneSensorDescription {
        key: "get_status",
        name: "Zone Status",
        device_class: None,
        unit: SensorUnit::None,
        read: zone_status,
    },
    ZoneSensorDescription {
        key: "get_setpoint_status",
        name: "Zone Setpoint Status",
        device_class: None,
        unit: SensorUnit::None,
        read: zone_setpoint_status,
    },
];

/// Percent readings are scaled to 0-100; numbers are rounded to one decimal.
fn display_state(reading: Reading, unit: SensorUnit) -> Value {
    match reading {
        Reading::Number(n) if unit == SensorUnit::Percent => round1(n * 100.0).into(),
        Reading::Number(n) => round1(n).into(),
        Reading::Text(s) => s.into(),
        Reading::Unknown => Value::Null,
    }
}

fn unit_of_measurement(unit: SensorUnit, thermostat: &Thermostat<'_>) -> Result<Option<&'static str>> {
    Ok(match unit {
        SensorUnit::None => None,
        SensorUnit::Percent => Some("%"),
        SensorUnit::Temperature => Some(thermostat.unit()?.host_unit()),
    })
}

/// A thermostat-level sensor backed by one table entry.
pub struct ThermostatSensor {
    link: CoordinatorLink,
    entity_id: String,
    thermostat_id: u64,
    description: &'static ThermostatSensorDescription,
}

impl ThermostatSensor {
    /// Fails when the thermostat lacks the capability or the first read errors.
    pub fn new(
        coordinator: Arc<Coordinator>,
        entity_id: String,
        thermostat_id: u64,
        description: &'static ThermostatSensorDescription,
    ) -> Result<Self> {
        let house = coordinator.snapshot()?;
        let thermostat = house.thermostat(thermostat_id)?;
        if !(description.supported)(&thermostat) {
            return Err(Error::NotSupported(description.name));
        }
        (description.read)(&thermostat)?;
        Ok(Self {
            link: CoordinatorLink::new(coordinator),
            entity_id,
            thermostat_id,
            description,
        })
    }

    pub fn link(&self) -> &CoordinatorLink {
        &self.link
    }

    pub fn description(&self) -> &'static ThermostatSensorDescription {
        self.description
    }

    fn read<T>(&self, f: impl FnOnce(&Thermostat<'_>) -> Result<T>) -> Result<T> {
        let house = self.link.coordinator().snapshot()?;
        let thermostat = house.thermostat(self.thermostat_id)?;
        f(&thermostat)
    }

    pub fn unit_of_measurement(&self) -> Result<Option<&'static str>> {
        self.read(|t| unit_of_measurement(self.description.unit, t))
    }

    pub fn device_class(&self) -> Option<&'static str> {
        self.description.device_class
    }
}

impl Entity for ThermostatSensor {
    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn unique_id(&self) -> String {
        format!("{}_{}", self.thermostat_id, self.description.key)
    }

    fn name(&self) -> Result<String> {
        self.read(|t| Ok(format!("{} {}", t.name()?, self.description.name)))
    }

    fn available(&self) -> bool {
        self.link.available()
    }

    fn state(&self) -> Result<Value> {
        self.read(|t| Ok(display_state((self.description.read)(t)?, self.description.unit)))
    }

    fn attributes(&self) -> Result<Map<String, Value>> {
        self.read(thermostat_attributes)
    }
}

/// A zone-level sensor backed by one table entry.
pub struct ZoneSensor {
    link: CoordinatorLink,
    entity_id: String,
    thermostat_id: u64,
    zone_id: u64,
    description: &'static ZoneSensorDescription,
}

impl ZoneSensor {
    pub fn new(
        coordinator: Arc<Coordinator>,
        entity_id: String,
        thermostat_id: u64,
        zone_id: u64,
        description: &'static ZoneSensorDescription,
    ) -> Result<Self> {
        let house = coordinator.snapshot()?;
        (description.read)(&house.zone(thermostat_id, zone_id)?)?;
        Ok(Self {
            link: CoordinatorLink::new(coordinator),
            entity_id,
            thermostat_id,
            zone_id,
            description,
        })
    }

    pub fn link(&self) -> &CoordinatorLink {
        &self.link
    }

    pub fn description(&self) -> &'static ZoneSensorDescription {
        self.description
    }

    fn read<T>(&self, f: impl FnOnce(&Zone<'_>) -> Result<T>) -> Result<T> {
        let house = self.link.coordinator().snapshot()?;
        let zone = house.zone(self.thermostat_id, self.zone_id)?;
        f(&zone)
    }

    pub fn unit_of_measurement(&self) -> Result<Option<&'static str>> {
        self.read(|z| unit_of_measurement(self.description.unit, z.thermostat()))
    }

    pub fn device_class(&self) -> Option<&'static str> {
        self.description.device_class
    }
}

impl Entity for ZoneSensor {
    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn unique_id(&self) -> String {
        format!("{}_{}", self.zone_id, self.description.key)
    }

    fn name(&self) -> Result<String> {
        self.read(|z| Ok(format!("{} {}", z.name()?, self.description.name)))
    }

    fn available(&self) -> bool {
        self.link.available()
    }

    fn state(&self) -> Result<Value> {
        self.read(|z| Ok(display_state((self.description.read)(z)?, self.description.unit)))
    }

    fn attributes(&self) -> Result<Map<String, Value>> {
        self.read(|z| {
            let mut attrs = thermostat_attributes(z.thermostat())?;
            attrs.insert(ATTR_ZONE_ID.into(), z.id().into());
            Ok(attrs)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_readings_are_scaled_and_rounded() {
        assert_eq!(display_state(Reading::Number(0.69), SensorUnit::Percent), Value::from(69.0));
        assert_eq!(display_state(Reading::Number(0.36), SensorUnit::Percent), Value::from(36.0));
        assert_eq!(display_state(Reading::Number(88.04), SensorUnit::Temperature), Value::from(88.0));
        assert_eq!(display_state(Reading::Unknown, SensorUnit::Temperature), Value::Null);
        assert_eq!(display_state(Reading::text("Cooling"), SensorUnit::None), Value::from("Cooling"));
    }

    #[test]
    fn keys_are_unique() {
        let mut keys: Vec<&str> = THERMOSTAT_SENSORS.iter().map(|d| d.key).collect();
        keys.extend(ZONE_SENSORS.iter().map(|d| d.key));
        let before = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), before);
    }
}
