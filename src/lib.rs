mod api;
mod binary_sensor;
mod clamp;
mod client;
mod climate;
mod config;
mod coordinator;
mod diff;
mod entity;
mod error;
mod integration;
mod logger;
mod protocol;
mod sensor;
mod services;
mod snapshot;
mod thermostat;
mod types;
mod zone;

pub use api::NexiaApi;
pub use binary_sensor::{BINARY_SENSORS, BinarySensorDescription, ThermostatBinarySensor};
pub use clamp::{SetpointBounds, SetpointRequest, clamp_setpoints};
pub use client::{DEFAULT_TIMEOUT, HttpApi, HttpApiBuilder};
pub use climate::{SetTemperature, ZoneClimate};
pub use config::{MessageLogConfig, NexiaConfig};
pub use coordinator::{Coordinator, DEFAULT_UPDATE_INTERVAL, ListenerId};
pub use entity::*;
pub use error::{Error, Result};
pub use integration::Integration;
pub use logger::MessageLogMode;
pub use protocol::{DEFAULT_BASE_URL, WriteTarget};
pub use sensor::{
    Reading, SensorUnit, THERMOSTAT_SENSORS, ThermostatSensor, ThermostatSensorDescription, ZONE_SENSORS,
    ZoneSensor, ZoneSensorDescription,
};
pub use services::{
    HUMIDIFY_SETPOINT_MAX, HUMIDIFY_SETPOINT_MIN, SERVICE_SET_AIRCLEANER_MODE, SERVICE_SET_HUMIDIFY_SETPOINT,
    ServiceCall,
};
pub use snapshot::{House, NEVER_UPDATED, SnapshotStore};
pub use thermostat::Thermostat;
pub use types::*;
pub use zone::Zone;

/// Endpoint names and payload builders for the mobile API.
pub mod endpoints {
    pub use crate::protocol::{
        AIR_CLEANER_MODE, DEHUMIDIFY, EMERGENCY_HEAT, FAN_MODE, FAN_SPEED, HUMIDIFY, PRESET_SELECTED,
        RETURN_TO_SCHEDULE, RUN_MODE, SCHEDULING_ENABLED, SETPOINTS, ZONE_MODE,
    };
}
