use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

/// Length every well-formed API key has.
pub const API_KEY_LENGTH: usize = 64;

/// Role assigned to a principal. Wire values match the stored documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "read")]
    ReadOnly,
    #[serde(rename = "write")]
    WriteOnly,
    #[serde(rename = "readWrite")]
    ReadWrite,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::ReadOnly => "read",
            Role::WriteOnly => "write",
            Role::ReadWrite => "readWrite",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PrincipalType {
    #[default]
    #[serde(rename = "api-key")]
    ApiKey,
}

impl PrincipalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalType::ApiKey => "api-key",
        }
    }
}

/// Authenticated caller attached to the request by the API-key middleware
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrincipalContext {
    pub id: String,
    pub kind: PrincipalType,
    pub roles: Vec<Role>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("API key is required")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("Authorization ran without an authenticated principal")]
    MissingPrincipal,
}

pub const INVALID_API_KEY: &str = "Invalid API key";
pub const INSUFFICIENT_ROLE: &str = "You do not have permission to access this resource";

/// Hex-encoded SHA-256 of the plaintext key; the lookup key for principals.
pub fn hash_api_key(api_key: &str) -> String {
    format!("{:x}", Sha256::digest(api_key.as_bytes()))
}

/// First two and last four characters with the middle redacted.
pub fn mask_api_key(api_key: &str) -> String {
    let chars: Vec<char> = api_key.chars().collect();
    let head: String = chars.iter().take(2).collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("{}.......{}", head, tail)
}

pub fn is_well_formed(api_key: &str) -> bool {
    api_key.chars().count() == API_KEY_LENGTH
}

/// Fresh 64 character key: SHA-256 hex of a random UUID.
pub fn generate_api_key() -> String {
    hash_api_key(&Uuid::new_v4().to_string())
}

/// Allows the caller iff its roles intersect `required`. An empty requirement
/// is an open endpoint and never consults the principal.
pub fn authorize(required: &[Role], principal: Option<&PrincipalContext>) -> Result<(), AuthError> {
    if required.is_empty() {
        return Ok(());
    }
    let principal = principal.ok_or(AuthError::MissingPrincipal)?;
    if principal.roles.iter().any(|role| required.contains(role)) {
        Ok(())
    } else {
        Err(AuthError::Forbidden(INSUFFICIENT_ROLE.to_string()))
    }
}
