use tracing::{error, info, warn};

use super::user_service::UserService;
use crate::auth::{self, Role};

/// Reserved username of the principal created on first boot
pub const MASTER_PRINCIPAL: &str = "master-api-key";

// 9999-12-31T00:00:00Z
const MASTER_EXPIRY_MILLIS: i64 = 253_402_214_400_000;

/// Ensures the master principal exists and returns the effective master key.
///
/// An existing master principal wins over the configured key. A configured key
/// of the wrong length is still stored, with a warning. Store failures are
/// logged and yield `None`; startup continues either way.
pub async fn ensure_master_principal(users: &UserService, configured_key: &str) -> Option<String> {
    if !auth::is_well_formed(configured_key) {
        warn!(
            "Configured master API key is {} characters, expected {}; it cannot authenticate",
            configured_key.chars().count(),
            auth::API_KEY_LENGTH
        );
    }

    match users.principals().find_by_username(MASTER_PRINCIPAL).await {
        Ok(Some(existing)) => {
            info!("Master principal already exists; adopting its stored key ({})", existing.masked_key);
            Some(existing.key)
        }
        Ok(None) => {
            let expires_at = bson::DateTime::from_millis(MASTER_EXPIRY_MILLIS);
            match users
                .provision_unchecked(MASTER_PRINCIPAL, Role::Admin, configured_key.to_string(), Some(expires_at))
                .await
            {
                Ok(record) => {
                    info!("Created master principal; master API key: {}", record.key);
                    Some(record.key)
                }
                Err(e) => {
                    error!("Failed to create master principal: {}", e);
                    None
                }
            }
        }
        Err(e) => {
            error!("Failed to look up master principal: {}", e);
            None
        }
    }
}
