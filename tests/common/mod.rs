#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nexia_climate::endpoints::*;
use nexia_climate::{Error, Integration, NexiaApi, Result, WriteTarget};
use serde_json::{Value, json};

pub const DOWNSTAIRS: u64 = 2059661;
pub const MASTER_SUITE: u64 = 2293892;
pub const LIVING_EAST: u64 = 83261002;
pub const KITCHEN: u64 = 83261005;
pub const MASTER: u64 = 83394130;
pub const BATH_CLOSET: u64 = 83394133;

pub fn house_fixture() -> Value {
    serde_json::from_str(include_str!("../fixtures/house.json")).expect("fixture is valid JSON")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub target: WriteTarget,
    pub endpoint: String,
    pub data: Value,
}

/// In-memory cloud: serves one house document and applies writes to it the
/// way the service would.
pub struct FakeApi {
    house: Mutex<Value>,
    posts: Mutex<Vec<Post>>,
    fail_fetch: AtomicBool,
    fetches: AtomicUsize,
}

impl FakeApi {
    pub fn new(house: Value) -> Arc<Self> {
        Arc::new(Self {
            house: Mutex::new(house),
            posts: Mutex::new(Vec::new()),
            fail_fetch: AtomicBool::new(false),
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn posts(&self) -> Vec<Post> {
        self.posts.lock().unwrap().clone()
    }

    pub fn clear_posts(&self) {
        self.posts.lock().unwrap().clear();
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NexiaApi for FakeApi {
    async fn fetch_house(&self) -> Result<Value> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(Error::SessionExpired);
        }
        Ok(self.house.lock().unwrap().clone())
    }

    async fn post(&self, target: WriteTarget, endpoint: &str, data: Value) -> Result<()> {
        apply(&mut self.house.lock().unwrap(), target, endpoint, &data);
        self.posts.lock().unwrap().push(Post {
            target,
            endpoint: endpoint.to_string(),
            data,
        });
        Ok(())
    }
}

pub fn post(target: WriteTarget, endpoint: &str, data: Value) -> Post {
    Post {
        target,
        endpoint: endpoint.to_string(),
        data,
    }
}

pub async fn integration(api: &Arc<FakeApi>) -> Integration {
    let api: Arc<dyn NexiaApi> = api.clone();
    Integration::with_api(api, Duration::from_secs(120))
        .await
        .expect("setup should succeed")
}

fn items(house: &mut Value) -> &mut Vec<Value> {
    house
        .pointer_mut("/result/_links/child/0/data/items")
        .and_then(Value::as_array_mut)
        .expect("fixture has thermostat items")
}

fn thermostat_mut(house: &mut Value, id: u64) -> Option<&mut Value> {
    items(house).iter_mut().find(|t| t["id"] == id)
}

fn zone_mut(house: &mut Value, id: u64) -> Option<&mut Value> {
    for thermostat in items(house).iter_mut() {
        if let Some(zones) = thermostat.get_mut("zones").and_then(Value::as_array_mut) {
            for zone in zones.iter_mut() {
                if zone["id"] == id {
                    return Some(zone);
                }
            }
        }
    }
    None
}

fn entry_mut<'a>(list: &'a mut Value, key: &str, name: &str) -> Option<&'a mut Value> {
    list.as_array_mut()?.iter_mut().find(|e| e[key] == name)
}

fn set_current(entity: &mut Value, setting: &str, value: Value) {
    if let Some(entry) = entry_mut(&mut entity["settings"], "type", setting) {
        entry["current_value"] = value;
    }
}

fn apply(house: &mut Value, target: WriteTarget, endpoint: &str, data: &Value) {
    let value = data.get("value").cloned().unwrap_or(Value::Null);
    match target {
        WriteTarget::Thermostat(id) => {
            let Some(thermostat) = thermostat_mut(house, id) else { return };
            let setting = match endpoint {
                EMERGENCY_HEAT => "emergency_heat_active",
                other => other,
            };
            set_current(thermostat, setting, value);
        }
        WriteTarget::Zone(id) => {
            let Some(zone) = zone_mut(house, id) else { return };
            match endpoint {
                ZONE_MODE => {
                    set_current(zone, "zone_mode", value.clone());
                    if let Some(feature) = entry_mut(&mut zone["features"], "name", "thermostat_mode") {
                        feature["value"] = value;
                    }
                }
                RUN_MODE => set_current(zone, "run_mode", value),
                RETURN_TO_SCHEDULE => set_current(zone, "run_mode", json!("run_schedule")),
                PRESET_SELECTED => set_current(zone, "preset_selected", value),
                SETPOINTS => zone["setpoints"] = data.clone(),
                _ => {}
            }
        }
    }
}
