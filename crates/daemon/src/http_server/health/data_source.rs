use std::fmt::Debug;
use std::ops::Deref;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use http::request::Parts;

use crate::ServiceState;

/// Key probed by the readiness check. Never written.
const READINESS_PROBE_KEY: &[u8] = b"readyz/probe";

#[async_trait]
pub trait DataSource {
    /// Perform various checks on the system to ensure its healthy and ready to accept requests.
    async fn is_ready(&self) -> Result<(), DataSourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("one or more dependent services aren't available")]
    DependencyFailure,

    #[error("service has received signal indicating it should shutdown")]
    ShuttingDown,
}

pub type DynDataSource = Arc<dyn DataSource + Send + Sync>;

pub struct StateDataSource(DynDataSource);

impl Debug for StateDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateDataSource").finish()
    }
}

impl StateDataSource {
    #[cfg(test)]
    pub fn new(dds: DynDataSource) -> Self {
        Self(dds)
    }
}

impl Deref for StateDataSource {
    type Target = DynDataSource;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Ready when the storage backend answers and no shutdown was signalled.
struct StorageSource {
    state: ServiceState,
}

#[async_trait]
impl DataSource for StorageSource {
    async fn is_ready(&self) -> Result<(), DataSourceError> {
        if self.state.is_shutting_down() {
            return Err(DataSourceError::ShuttingDown);
        }
        self.state
            .store()
            .contains(READINESS_PROBE_KEY)
            .await
            .map_err(|e| {
                tracing::warn!("readiness probe failed: {}", e);
                DataSourceError::DependencyFailure
            })?;
        Ok(())
    }
}

#[async_trait]
impl FromRequestParts<ServiceState> for StateDataSource {
    type Rejection = ();

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &ServiceState,
    ) -> Result<Self, Self::Rejection> {
        Ok(StateDataSource(Arc::new(StorageSource {
            state: state.clone(),
        })))
    }
}
