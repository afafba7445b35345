use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::{DocumentStore, Namespace, PrincipalRepository};
use crate::services::{ActionService, UserService};

/// Shared per-process state handed to every handler and middleware
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }

    pub fn principals(&self) -> PrincipalRepository {
        let namespace = Namespace::new(
            self.config.database.credentials_database.clone(),
            self.config.database.credentials_collection.clone(),
        );
        PrincipalRepository::new(self.store.clone(), namespace)
    }

    pub fn actions(&self) -> ActionService {
        ActionService::new(self.store.clone())
    }

    pub fn users(&self) -> UserService {
        UserService::new(self.principals())
    }
}
