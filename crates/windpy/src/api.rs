use async_trait::async_trait;

use crate::error::WindError;
use crate::models::{WindCall, WindData};

/// The WindPy session surface the gateway depends on.
///
/// Mirrors `w.start`, `w.stop`, `w.isconnected` and the query family; the
/// bridge client is the production implementation.
#[async_trait]
pub trait WindApi: Send + Sync {
    async fn start(&self) -> Result<WindData, WindError>;

    async fn stop(&self) -> Result<WindData, WindError>;

    async fn is_connected(&self) -> Result<bool, WindError>;

    async fn call(&self, call: &WindCall) -> Result<WindData, WindError>;
}
