use std::sync::Arc;

use tracing::info;

use super::{DocumentStore, MongoStore, StoreResult};
use crate::config::{AppConfig, StoreBackend};

/// Builds the shared store handle selected by configuration
pub struct DatabaseManager;

impl DatabaseManager {
    /// Connects the configured backend. The handle is created once at startup
    /// and shared by every request.
    pub async fn connect(config: &AppConfig) -> StoreResult<Arc<dyn DocumentStore>> {
        match config.database.backend {
            StoreBackend::Mongodb => {
                info!("Connecting to MongoDB at {}", config.redacted_connection_string());
                let store = MongoStore::connect(
                    &config.database.connection_string,
                    config.database.connection_timeout,
                )
                .await?;
                Ok(Arc::new(store))
            }
            #[cfg(any(test, feature = "memory-store"))]
            StoreBackend::Memory => {
                info!("Using in-memory document store");
                Ok(Arc::new(super::MemoryStore::new()))
            }
        }
    }

    /// Pings the store
    pub async fn health_check(store: &dyn DocumentStore) -> StoreResult<()> {
        store.ping().await
    }
}
