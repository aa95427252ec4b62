use std::sync::Arc;

use serde_json::{Map, Value};

use crate::coordinator::Coordinator;
use crate::entity::*;
use crate::thermostat::Thermostat;
use crate::{Error, Result};

pub struct BinarySensorDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub read: fn(&Thermostat<'_>) -> Result<bool>,
    pub supported: fn(&Thermostat<'_>) -> bool,
}

fn blower_active(t: &Thermostat<'_>) -> Result<bool> {
    t.is_blower_active()
}

fn emergency_heat_active(t: &Thermostat<'_>) -> Result<bool> {
    t.is_emergency_heat_active()
}

fn always(_: &Thermostat<'_>) -> bool {
    true
}

fn has_emergency_heat(t: &Thermostat<'_>) -> bool {
    t.has_emergency_heat()
}

pub static BINARY_SENSORS: &[BinarySensorDescription] = &[
    BinarySensorDescription {
        key: "is_blower_active",
        name: "Blower Active",
        read: blower_active,
        supported: always,
    },
    BinarySensorDescription {
        key: "is_emergency_heat_active",
        name: "Emergency Heat Active",
        read: emergency_heat_active,
        supported: has_emergency_heat,
    },
];

pub struct ThermostatBinarySensor {
    link: CoordinatorLink,
    entity_id: String,
    thermostat_id: u64,
    description: &'static BinarySensorDescription,
}

impl ThermostatBinarySensor {
    pub fn new(
        coordinator: Arc<Coordinator>,
        entity_id: String,
        thermostat_id: u64,
        description: &'static BinarySensorDescription,
    ) -> Result<Self> {
        let house = coordinator.snapshot()?;
        let thermostat = house.thermostat(thermostat_id)?;
        if !(description.supported)(&thermostat) {
            return Err(Error::NotSupported(description.name));
        }
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

    fn read<T>(&self, f: impl FnOnce(&Thermostat<'_>) -> Result<T>) -> Result<T> {
        let house = self.link.coordinator().snapshot()?;
        let thermostat = house.thermostat(self.thermostat_id)?;
        f(&thermostat)
    }

    pub fn is_on(&self) -> Result<bool> {
        self.read(self.description.read)
    }
}

impl Entity for ThermostatBinarySensor {
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
        Ok(if self.is_on()? { "on" } else { "off" }.into())
    }

    fn attributes(&self) -> Result<Map<String, Value>> {
        self.read(thermostat_attributes)
    }
}
