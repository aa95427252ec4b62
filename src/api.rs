use async_trait::async_trait;
use serde_json::Value;

use crate::Result;
use crate::protocol::WriteTarget;

/// The vendor cloud as seen by the views and the coordinator.
///
/// [`HttpApi`](crate::HttpApi) talks to the mobile API; tests substitute an
/// in-memory implementation that records writes.
#[async_trait]
pub trait NexiaApi: Send + Sync {
    /// Fetch the whole house document in one round trip.
    async fn fetch_house(&self) -> Result<Value>;

    /// Post `data` to `endpoint` on a thermostat or zone.
    async fn post(&self, target: WriteTarget, endpoint: &str, data: Value) -> Result<()>;
}
