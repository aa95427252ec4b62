use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;

use crate::protocol::thermostat_items;
use crate::thermostat::Thermostat;
use crate::zone::Zone;
use crate::{Error, Result};

/// Reported as the last update time before any fetch has succeeded.
pub const NEVER_UPDATED: &str = "0001-01-01T00:00:00";

/// One parsed house document. Immutable once built; a refresh replaces it.
#[derive(Debug, Clone)]
pub struct House {
    thermostats: Vec<Value>,
    fetched_at: DateTime<Utc>,
}

impl House {
    /// Build from a full house response body.
    pub fn from_response(body: &Value) -> Result<Self> {
        let items = thermostat_items(body)
            .ok_or_else(|| Error::MissingField("result._links.child[0].data.items".to_string()))?;
        Ok(Self::from_items(items.clone(), Utc::now()))
    }

    pub fn from_items(thermostats: Vec<Value>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            thermostats,
            fetched_at,
        }
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn last_update_iso(&self) -> String {
        self.fetched_at.format("%Y-%m-%dT%H:%M:%S").to_string()
    }

    /// Thermostat ids in document order. Items without a numeric id are skipped.
    pub fn thermostat_ids(&self) -> Vec<u64> {
        self.thermostats
            .iter()
            .filter_map(|t| t.get("id").and_then(Value::as_u64))
            .collect()
    }

    pub fn thermostats(&self) -> impl Iterator<Item = Thermostat<'_>> {
        self.thermostats.iter().filter_map(Thermostat::new)
    }

    pub fn thermostat(&self, id: u64) -> Result<Thermostat<'_>> {
        self.thermostats()
            .find(|t| t.id() == id)
            .ok_or(Error::UnknownThermostat(id))
    }

    pub fn zone(&self, thermostat_id: u64, zone_id: u64) -> Result<Zone<'_>> {
        self.thermostat(thermostat_id)?.zone(zone_id)
    }
}

/// Holds the current [`House`]. Readers clone the `Arc` and keep a
/// consistent document for as long as they need it.
#[derive(Default)]
pub struct SnapshotStore {
    current: RwLock<Option<Arc<House>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a new document, returning the one it replaced.
    pub fn replace(&self, house: House) -> Option<Arc<House>> {
        self.current.write().replace(Arc::new(house))
    }

    pub fn current(&self) -> Option<Arc<House>> {
        self.current.read().clone()
    }

    pub fn require(&self) -> Result<Arc<House>> {
        self.current().ok_or(Error::NoSnapshot)
    }

    pub fn last_update_iso(&self) -> String {
        self.current()
            .map(|h| h.last_update_iso())
            .unwrap_or_else(|| NEVER_UPDATED.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn house() -> House {
        House::from_items(
            vec![
                json!({"id": 2059661, "name": "Downstairs", "zones": [{"id": 83261002}]}),
                json!({"name": "no id"}),
                json!({"id": 2293892, "name": "Upstairs", "zones": []}),
            ],
            Utc.with_ymd_and_hms(2020, 3, 11, 15, 4, 5).unwrap(),
        )
    }

    #[test]
    fn ids_skip_items_without_id() {
        assert_eq!(house().thermostat_ids(), vec![2059661, 2293892]);
    }

    #[test]
    fn unknown_ids_are_errors() {
        let house = house();
        assert!(matches!(house.thermostat(1), Err(Error::UnknownThermostat(1))));
        assert!(matches!(house.zone(2059661, 7), Err(Error::UnknownZone(7))));
        assert_eq!(house.zone(2059661, 83261002).unwrap().id(), 83261002);
    }

    #[test]
    fn from_response_requires_items() {
        let err = House::from_response(&json!({"result": {}})).unwrap_err();
        assert!(matches!(err, Error::MissingField(_)));

        let body = json!({"result": {"_links": {"child": [{"data": {"items": [{"id": 5}]}}]}}});
        assert_eq!(House::from_response(&body).unwrap().thermostat_ids(), vec![5]);
    }

    #[test]
    fn store_replaces_and_reports_last_update() {
        let store = SnapshotStore::new();
        assert_eq!(store.last_update_iso(), NEVER_UPDATED);
        assert!(matches!(store.require(), Err(Error::NoSnapshot)));

        assert!(store.replace(house()).is_none());
        let held = store.require().unwrap();
        assert_eq!(store.last_update_iso(), "2020-03-11T15:04:05");

        let previous = store.replace(House::from_items(vec![], Utc::now())).unwrap();
        assert!(Arc::ptr_eq(&previous, &held));
        assert_eq!(held.thermostat_ids().len(), 2);
        assert!(store.require().unwrap().thermostat_ids().is_empty());
    }
}
