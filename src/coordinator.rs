use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::api::NexiaApi;
use crate::diff::diff_json;
use crate::snapshot::{House, SnapshotStore};
use crate::Result;

pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(120);

type Listener = Arc<dyn Fn() + Send + Sync>;

/// Handle returned by [`Coordinator::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Owns the house snapshot and refreshes it from the cloud.
///
/// Every refresh, successful or not, notifies listeners once; entities
/// re-read their state from [`snapshot`](Self::snapshot) and check
/// [`last_update_success`](Self::last_update_success) for availability.
pub struct Coordinator {
    api: Arc<dyn NexiaApi>,
    store: SnapshotStore,
    update_interval: Duration,
    last_update_success: AtomicBool,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl Coordinator {
    pub fn new(api: Arc<dyn NexiaApi>, update_interval: Duration) -> Self {
        Self {
            api,
            store: SnapshotStore::new(),
            update_interval,
            last_update_success: AtomicBool::new(false),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(0),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn api(&self) -> &dyn NexiaApi {
        self.api.as_ref()
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    pub fn last_update_success(&self) -> bool {
        self.last_update_success.load(Ordering::Acquire)
    }

    /// The current house. Fails only before the first successful refresh.
    pub fn snapshot(&self) -> Result<Arc<House>> {
        self.store.require()
    }

    pub fn last_update_iso(&self) -> String {
        self.store.last_update_iso()
    }

    /// Fetch the house and swap it in. Concurrent calls run one at a time.
    pub async fn refresh(&self) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;
        let result = self.fetch().await;
        self.last_update_success.store(result.is_ok(), Ordering::Release);
        if let Err(e) = &result {
            warn!("house refresh failed: {e}");
        }
        self.notify();
        result
    }

    async fn fetch(&self) -> Result<()> {
        let body = self.api.fetch_house().await?;
        let house = House::from_response(&body)?;
        let thermostats = house.thermostat_ids().len();
        if let Some(previous) = self.store.replace(house) {
            let current = self.store.require()?;
            let mut changes = Vec::new();
            for (old, new) in previous.thermostats().zip(current.thermostats()) {
                diff_json(old.json(), new.json(), "", &mut changes);
            }
            debug!(thermostats, changes = changes.len(), "house refreshed");
        } else {
            info!(thermostats, "initial house data loaded");
        }
        Ok(())
    }

    /// Refresh after a write. Failures are logged and surface through
    /// [`last_update_success`](Self::last_update_success), not to the caller.
    pub async fn request_refresh(&self) {
        if let Err(e) = self.refresh().await {
            debug!("requested refresh did not complete: {e}");
        }
    }

    pub fn add_listener(&self, listener: impl Fn() + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    fn notify(&self) {
        // Listeners may add or remove listeners, so call them unlocked.
        let listeners: Vec<Listener> = self.listeners.lock().iter().map(|(_, l)| l.clone()).collect();
        for listener in listeners {
            listener();
        }
    }

    /// Poll on [`update_interval`](Self::update_interval) until the handle is
    /// aborted. The first refresh is expected to have run already.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(coordinator.update_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;
            loop {
                interval.tick().await;
                let _ = coordinator.refresh().await;
            }
        })
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("update_interval", &self.update_interval)
            .field("last_update_success", &self.last_update_success())
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}
