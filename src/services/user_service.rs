use bson::Bson;
use chrono::DateTime;
use tracing::info;

use crate::api::users::{CreateUserRequest, ListUsersResponse, UserResponse};
use crate::auth::{self, PrincipalType, Role};
use crate::database::models::PrincipalRecord;
use crate::database::{PrincipalRepository, StoreError};
use crate::error::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("Database error: {0}")]
    Store(#[from] StoreError),
    #[error("API key must be exactly {} characters", auth::API_KEY_LENGTH)]
    InvalidKey,
    #[error("Username must be a non-empty string")]
    InvalidUsername,
    #[error("Invalid expires_at: {0}")]
    InvalidExpiry(String),
    #[error("An API key with the same hash is already registered")]
    DuplicateKey,
    #[error("Principal already exists: {0}")]
    DuplicateUsername(String),
}

impl From<ProvisionError> for ApiError {
    fn from(err: ProvisionError) -> Self {
        match err {
            ProvisionError::Store(e) => ApiError::Backend(e),
            ProvisionError::DuplicateKey | ProvisionError::DuplicateUsername(_) => {
                ApiError::DuplicateKey(err.to_string())
            }
            ProvisionError::InvalidKey | ProvisionError::InvalidUsername | ProvisionError::InvalidExpiry(_) => {
                ApiError::Validation(err.to_string())
            }
        }
    }
}

/// Creates and lists API-key principals
#[derive(Clone)]
pub struct UserService {
    principals: PrincipalRepository,
}

impl UserService {
    pub fn new(principals: PrincipalRepository) -> Self {
        Self { principals }
    }

    pub fn principals(&self) -> &PrincipalRepository {
        &self.principals
    }

    /// Stores a new principal and returns it with its assigned id.
    ///
    /// The hash and username are checked before the insert; two concurrent
    /// creates with the same key can both pass the check.
    pub async fn provision(
        &self,
        username: &str,
        role: Role,
        key: String,
        expires_at: Option<bson::DateTime>,
    ) -> Result<PrincipalRecord, ProvisionError> {
        if !auth::is_well_formed(&key) {
            return Err(ProvisionError::InvalidKey);
        }
        self.provision_unchecked(username, role, key, expires_at).await
    }

    /// Same as [`Self::provision`] without the key length check. A key of the
    /// wrong length is stored but can never authenticate.
    pub async fn provision_unchecked(
        &self,
        username: &str,
        role: Role,
        key: String,
        expires_at: Option<bson::DateTime>,
    ) -> Result<PrincipalRecord, ProvisionError> {
        if username.trim().is_empty() {
            return Err(ProvisionError::InvalidUsername);
        }

        let hashed_key = auth::hash_api_key(&key);
        if self.principals.hashed_key_exists(&hashed_key).await? {
            return Err(ProvisionError::DuplicateKey);
        }
        if self.principals.username_exists(username).await? {
            return Err(ProvisionError::DuplicateUsername(username.to_string()));
        }

        let mut record = PrincipalRecord {
            id: None,
            username: username.to_string(),
            kind: PrincipalType::ApiKey,
            role,
            masked_key: auth::mask_api_key(&key),
            key,
            hashed_key,
            created_at: Some(bson::DateTime::now()),
            expires_at,
        };

        let id = self.principals.insert(&record).await?;
        if let Bson::ObjectId(oid) = id {
            record.id = Some(oid);
        }

        info!("Provisioned {} principal {} ({})", record.role, record.username, record.masked_key);
        Ok(record)
    }

    pub async fn create(&self, request: CreateUserRequest) -> Result<UserResponse, ApiError> {
        let expires_at = parse_expiry(request.expires_at)?;
        let key = request.key.unwrap_or_else(auth::generate_api_key);
        let record = self.provision(&request.username, request.role, key, expires_at).await?;
        Ok(record.into())
    }

    pub async fn list(&self) -> Result<ListUsersResponse, ApiError> {
        let users = self.principals.list_all().await?;
        Ok(ListUsersResponse {
            users: users.into_iter().map(UserResponse::from).collect(),
        })
    }
}

/// Accepts an RFC 3339 string or a native date; null means no expiry.
fn parse_expiry(value: Option<Bson>) -> Result<Option<bson::DateTime>, ProvisionError> {
    match value {
        None | Some(Bson::Null) => Ok(None),
        Some(Bson::DateTime(dt)) => Ok(Some(dt)),
        Some(Bson::String(s)) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| Some(bson::DateTime::from_chrono(dt)))
            .map_err(|e| ProvisionError::InvalidExpiry(format!("{}: {}", s, e))),
        Some(other) => Err(ProvisionError::InvalidExpiry(format!(
            "expected a date, found {:?}",
            other.element_type()
        ))),
    }
}
