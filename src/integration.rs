use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::Result;
use crate::api::NexiaApi;
use crate::binary_sensor::{BINARY_SENSORS, ThermostatBinarySensor};
use crate::climate::ZoneClimate;
use crate::config::NexiaConfig;
use crate::coordinator::Coordinator;
use crate::entity::{Entity, EntityIds};
use crate::sensor::{THERMOSTAT_SENSORS, ThermostatSensor, ZONE_SENSORS, ZoneSensor};
use crate::services::{self, ServiceCall};

/// A running integration: one coordinator and the entities built from the
/// first house fetch.
pub struct Integration {
    coordinator: Arc<Coordinator>,
    climates: Vec<ZoneClimate>,
    sensors: Vec<ThermostatSensor>,
    zone_sensors: Vec<ZoneSensor>,
    binary_sensors: Vec<ThermostatBinarySensor>,
    poller: Option<JoinHandle<()>>,
}

impl Integration {
    pub async fn setup(config: &NexiaConfig) -> Result<Self> {
        config.validate()?;
        let api = config.http_api()?;
        Self::with_api(Arc::new(api), config.scan_interval()).await
    }

    /// Fetch the house once and build every entity it supports. The first
    /// fetch must succeed.
    pub async fn with_api(api: Arc<dyn NexiaApi>, update_interval: Duration) -> Result<Self> {
        let coordinator = Arc::new(Coordinator::new(api, update_interval));
        coordinator.refresh().await?;
        let house = coordinator.snapshot()?;

        let mut ids = EntityIds::default();
        let mut climates = Vec::new();
        let mut sensors = Vec::new();
        let mut zone_sensors = Vec::new();
        let mut binary_sensors = Vec::new();

        for thermostat in house.thermostats() {
            let tid = thermostat.id();
            let thermostat_name = thermostat.name()?;

            for desc in THERMOSTAT_SENSORS.iter().filter(|d| (d.supported)(&thermostat)) {
                let entity_id = ids.assign("sensor", &format!("{thermostat_name} {}", desc.name));
                match ThermostatSensor::new(Arc::clone(&coordinator), entity_id.clone(), tid, desc) {
                    Ok(sensor) => sensors.push(sensor),
                    Err(e) => {
                        warn!(thermostat = tid, sensor = desc.key, "sensor skipped: {e}");
                        ids.release(&entity_id);
                    }
                }
            }

            for desc in BINARY_SENSORS.iter().filter(|d| (d.supported)(&thermostat)) {
                let entity_id = ids.assign("binary_sensor", &format!("{thermostat_name} {}", desc.name));
                match ThermostatBinarySensor::new(Arc::clone(&coordinator), entity_id.clone(), tid, desc) {
                    Ok(sensor) => binary_sensors.push(sensor),
                    Err(e) => {
                        warn!(thermostat = tid, sensor = desc.key, "binary sensor skipped: {e}");
                        ids.release(&entity_id);
                    }
                }
            }

            for zone in thermostat.zones() {
                let zone_name = zone.name()?;
                let entity_id = ids.assign("climate", zone_name);
                climates.push(ZoneClimate::new(Arc::clone(&coordinator), entity_id, tid, zone.id()));

                for desc in ZONE_SENSORS {
                    let entity_id = ids.assign("sensor", &format!("{zone_name} {}", desc.name));
                    match ZoneSensor::new(Arc::clone(&coordinator), entity_id.clone(), tid, zone.id(), desc) {
                        Ok(sensor) => zone_sensors.push(sensor),
                        Err(e) => {
                            warn!(zone = zone.id(), sensor = desc.key, "zone sensor skipped: {e}");
                            ids.release(&entity_id);
                        }
                    }
                }
            }
        }

        info!(
            climates = climates.len(),
            sensors = sensors.len() + zone_sensors.len(),
            binary_sensors = binary_sensors.len(),
            "nexia integration ready"
        );

        Ok(Self {
            coordinator,
            climates,
            sensors,
            zone_sensors,
            binary_sensors,
            poller: None,
        })
    }

    /// Refresh on the coordinator's interval until dropped.
    pub fn start_polling(&mut self) {
        if self.poller.is_none() {
            self.poller = Some(self.coordinator.spawn());
        }
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    pub fn climates(&self) -> &[ZoneClimate] {
        &self.climates
    }

    pub fn climate(&self, entity_id: &str) -> Option<&ZoneClimate> {
        self.climates.iter().find(|c| c.entity_id() == entity_id)
    }

    pub fn sensors(&self) -> &[ThermostatSensor] {
        &self.sensors
    }

    pub fn zone_sensors(&self) -> &[ZoneSensor] {
        &self.zone_sensors
    }

    pub fn binary_sensors(&self) -> &[ThermostatBinarySensor] {
        &self.binary_sensors
    }

    pub fn entities(&self) -> Vec<&dyn Entity> {
        let mut all: Vec<&dyn Entity> = Vec::new();
        all.extend(self.climates.iter().map(|e| e as &dyn Entity));
        all.extend(self.sensors.iter().map(|e| e as &dyn Entity));
        all.extend(self.zone_sensors.iter().map(|e| e as &dyn Entity));
        all.extend(self.binary_sensors.iter().map(|e| e as &dyn Entity));
        all
    }

    /// Validate `data` against the service's schema, then run it.
    pub async fn call_service(&self, service: &str, data: &Value) -> Result<()> {
        let call = ServiceCall::parse(service, data)?;
        services::handle(&call, &self.climates).await
    }
}

impl Drop for Integration {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }
}
