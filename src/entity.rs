use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::Result;
use crate::coordinator::{Coordinator, ListenerId};
use crate::thermostat::Thermostat;

pub const DOMAIN: &str = "nexia";
pub const ATTRIBUTION: &str = "Data provided by mynexia.com";
pub const MANUFACTURER: &str = "Trane";

// Climate feature flags, bit-compatible with the host's climate platform.
pub const SUPPORT_TARGET_TEMPERATURE: u32 = 1;
pub const SUPPORT_TARGET_HUMIDITY: u32 = 4;
pub const SUPPORT_FAN_MODE: u32 = 8;
pub const SUPPORT_PRESET_MODE: u32 = 16;
pub const SUPPORT_AUX_HEAT: u32 = 64;

pub const ATTR_ATTRIBUTION: &str = "attribution";
pub const ATTR_MODEL: &str = "model";
pub const ATTR_FIRMWARE: &str = "firmware";
pub const ATTR_THERMOSTAT_NAME: &str = "thermostat_name";
pub const ATTR_THERMOSTAT_ID: &str = "thermostat_id";
pub const ATTR_ZONE_ID: &str = "zone_id";
pub const ATTR_FAN_MODE: &str = "fan_mode";
pub const ATTR_FAN_MODES: &str = "fan_modes";
pub const ATTR_HVAC_MODE: &str = "hvac_mode";
pub const ATTR_HVAC_MODES: &str = "hvac_modes";
pub const ATTR_TARGET_TEMP_HIGH: &str = "target_temp_high";
pub const ATTR_TARGET_TEMP_LOW: &str = "target_temp_low";
pub const ATTR_TARGET_TEMP_STEP: &str = "target_temp_step";
pub const ATTR_MIN_TEMP: &str = "min_temp";
pub const ATTR_MAX_TEMP: &str = "max_temp";
pub const ATTR_PRESET_MODE: &str = "preset_mode";
pub const ATTR_HOLD_MODES: &str = "hold_modes";
pub const ATTR_SETPOINT_STATUS: &str = "setpoint_status";
pub const ATTR_ZONE_STATUS: &str = "zone_status";
pub const ATTR_AUX_HEAT: &str = "aux_heat";
pub const ATTR_CURRENT_HUMIDITY: &str = "current_humidity";
pub const ATTR_MIN_HUMIDITY: &str = "min_humidity";
pub const ATTR_MAX_HUMIDITY: &str = "max_humidity";
pub const ATTR_HUMIDITY: &str = "humidity";
pub const ATTR_HUMIDIFY_SUPPORTED: &str = "humidify_supported";
pub const ATTR_DEHUMIDIFY_SUPPORTED: &str = "dehumidify_supported";
pub const ATTR_HUMIDIFY_SETPOINT: &str = "humidify_setpoint";
pub const ATTR_DEHUMIDIFY_SETPOINT: &str = "dehumidify_setpoint";

/// Device registry entry for a zone or thermostat.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub identifiers: Vec<(String, u64)>,
    pub name: String,
    pub model: String,
    pub sw_version: String,
    pub manufacturer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via_device: Option<(String, u64)>,
}

/// What the host needs from every entity. State is read from the
/// coordinator's current snapshot on each call.
pub trait Entity: Send + Sync {
    fn entity_id(&self) -> &str;

    fn unique_id(&self) -> String;

    fn name(&self) -> Result<String>;

    fn available(&self) -> bool;

    fn state(&self) -> Result<Value>;

    fn attributes(&self) -> Result<Map<String, Value>>;

    fn device_info(&self) -> Result<Option<DeviceInfo>> {
        Ok(None)
    }

    /// Entities are pushed by the coordinator, never polled.
    fn should_poll(&self) -> bool {
        false
    }
}

/// An entity's tie to the coordinator: availability and update subscription.
#[derive(Debug)]
pub struct CoordinatorLink {
    coordinator: Arc<Coordinator>,
    listener: Mutex<Option<ListenerId>>,
}

impl CoordinatorLink {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self {
            coordinator,
            listener: Mutex::new(None),
        }
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    pub fn available(&self) -> bool {
        self.coordinator.last_update_success()
    }

    /// Subscribe `on_update` to refreshes, replacing any earlier subscription.
    pub fn added_to_host(&self, on_update: impl Fn() + Send + Sync + 'static) {
        let id = self.coordinator.add_listener(on_update);
        if let Some(old) = self.listener.lock().replace(id) {
            self.coordinator.remove_listener(old);
        }
    }

    pub fn will_remove_from_host(&self) {
        if let Some(id) = self.listener.lock().take() {
            self.coordinator.remove_listener(id);
        }
    }
}

/// Serializable view of an entity, as the host would store it.
#[derive(Debug, Clone, Serialize)]
pub struct EntityState {
    pub entity_id: String,
    pub unique_id: String,
    pub name: String,
    pub available: bool,
    pub state: Value,
    pub attributes: Map<String, Value>,
}

impl EntityState {
    /// Unavailable entities report a null state and no attributes, and fall
    /// back to their entity id when no name can be read.
    pub fn read(entity: &dyn Entity) -> Result<Self> {
        let available = entity.available();
        let (state, attributes) = if available {
            (entity.state()?, entity.attributes()?)
        } else {
            (Value::Null, Map::new())
        };
        Ok(Self {
            entity_id: entity.entity_id().to_string(),
            unique_id: entity.unique_id(),
            name: entity
                .name()
                .unwrap_or_else(|_| entity.entity_id().to_string()),
            available,
            state,
            attributes,
        })
    }
}

/// Attributes every thermostat-level entity carries.
pub fn thermostat_attributes(thermostat: &Thermostat<'_>) -> Result<Map<String, Value>> {
    let mut attrs = Map::new();
    attrs.insert(ATTR_ATTRIBUTION.into(), ATTRIBUTION.into());
    attrs.insert(ATTR_MODEL.into(), thermostat.model()?.into());
    attrs.insert(ATTR_FIRMWARE.into(), thermostat.firmware()?.into());
    attrs.insert(ATTR_THERMOSTAT_NAME.into(), thermostat.name()?.into());
    attrs.insert(ATTR_THERMOSTAT_ID.into(), thermostat.id().into());
    Ok(attrs)
}

/// One decimal place, the precision the host displays.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `Living Room` -> `living_room`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let trimmed = slug.trim_end_matches('_');
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Hands out `platform.slug` ids, suffixing `_2`, `_3`, ... on collision.
#[derive(Debug, Default)]
pub struct EntityIds {
    taken: HashSet<String>,
}

impl EntityIds {
    pub fn assign(&mut self, platform: &str, name: &str) -> String {
        let base = format!("{platform}.{}", slugify(name));
        let mut candidate = base.clone();
        let mut n = 2;
        while !self.taken.insert(candidate.clone()) {
            candidate = format!("{base}_{n}");
            n += 1;
        }
        candidate
    }

    /// Give back an id whose entity was never created.
    pub fn release(&mut self, id: &str) {
        self.taken.remove(id);
    }
}
