use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

use crate::auth;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),

    #[error("Unknown store backend: {0}")]
    UnknownBackend(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mongodb,
    /// In-process store for tests and local runs; requires the `memory-store` feature.
    #[cfg(any(test, feature = "memory-store"))]
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(StoreBackend::Mongodb),
            #[cfg(any(test, feature = "memory-store"))]
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub connection_string: String,
    pub connection_timeout: u64,
    pub credentials_database: String,
    pub credentials_collection: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    /// Seed for the master principal. Replaced by the stored key when the
    /// master principal already exists.
    pub master_api_key: String,
}

const DEFAULT_CONNECTION_STRING: &str = "mongodb://localhost:27070/data-api";

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // Database overrides
        if let Ok(v) = env::var("STORE_BACKEND") {
            match v.parse() {
                Ok(backend) => self.database.backend = backend,
                Err(e) => tracing::warn!("Ignoring STORE_BACKEND: {}", e),
            }
        }
        if let Ok(v) = env::var("MONGODB_CONNECTION_STRING_KEY") {
            self.database.connection_string = v;
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("CREDENTIALS_DATABASE") {
            self.database.credentials_database = v;
        }
        if let Ok(v) = env::var("CREDENTIALS_COLLECTION") {
            self.database.credentials_collection = v;
        }

        // API overrides
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("MAIN_API_KEY") {
            if !v.is_empty() {
                self.security.master_api_key = v;
            }
        }

        self
    }

    /// Checks the settings that cannot be repaired by falling back to a default.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.backend == StoreBackend::Mongodb {
            let scheme_ok = self.database.connection_string.starts_with("mongodb://")
                || self.database.connection_string.starts_with("mongodb+srv://");
            if !scheme_ok {
                return Err(ConfigError::InvalidConnectionString(self.redacted_connection_string()));
            }
        }
        Ok(())
    }

    /// Connection string with any password removed, safe for logs.
    pub fn redacted_connection_string(&self) -> String {
        match url::Url::parse(&self.database.connection_string) {
            Ok(mut url) => {
                if url.password().is_some() {
                    let _ = url.set_password(Some("****"));
                }
                url.to_string()
            }
            Err(_) => "<unparseable>".to_string(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Mongodb,
                connection_string: DEFAULT_CONNECTION_STRING.to_string(),
                connection_timeout: 30,
                credentials_database: "aws_apps".to_string(),
                credentials_collection: "users".to_string(),
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 16 * 1024 * 1024, // 16MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["*".to_string()],
                master_api_key: auth::generate_api_key(),
            },
        }
    }

    fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.database.connection_timeout = 10;
        config.security.cors_origins = vec!["https://staging.example.com".to_string()];
        config
    }

    fn production() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Production;
        config.database.connection_timeout = 5;
        config.api.enable_request_logging = false;
        config.security.cors_origins = vec!["https://app.example.com".to_string()];
        config
    }

    /// Configuration for tests: in-memory store, fixed master key.
    #[cfg(any(test, feature = "memory-store"))]
    pub fn for_tests(master_api_key: impl Into<String>) -> Self {
        let mut config = Self::development();
        config.database.backend = StoreBackend::Memory;
        config.api.enable_request_logging = false;
        config.security.master_api_key = master_api_key.into();
        config
    }
}
