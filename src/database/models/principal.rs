use bson::oid::ObjectId;
use bson::Bson;
use serde::{Deserialize, Deserializer, Serialize};

use crate::auth::{PrincipalContext, PrincipalType, Role};

/// Principal document as stored in the credential collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrincipalRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    #[serde(rename = "type", default)]
    pub kind: PrincipalType,
    pub role: Role,
    /// Plaintext key, kept so the bootstrap can adopt an existing master key.
    #[serde(default)]
    pub key: String,
    pub hashed_key: String,
    #[serde(default)]
    pub masked_key: String,
    #[serde(default, deserialize_with = "lenient_datetime", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<bson::DateTime>,
    #[serde(default, deserialize_with = "lenient_datetime", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<bson::DateTime>,
}

impl PrincipalRecord {
    pub fn context(&self) -> PrincipalContext {
        PrincipalContext {
            id: self.username.clone(),
            kind: self.kind,
            roles: vec![self.role],
        }
    }
}

/// The fields authentication reads from a principal document
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PrincipalIdentity {
    pub username: String,
    #[serde(rename = "type", default)]
    pub kind: PrincipalType,
    pub role: Role,
}

impl PrincipalIdentity {
    /// Projection that fetches only the identity fields.
    pub fn projection() -> bson::Document {
        bson::doc! { "_id": 0, "username": 1, "type": 1, "role": 1 }
    }

    pub fn context(&self) -> PrincipalContext {
        PrincipalContext {
            id: self.username.clone(),
            kind: self.kind,
            roles: vec![self.role],
        }
    }
}

// Older records hold timestamps as ISO strings; unreadable values become None
fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<bson::DateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Bson>::deserialize(deserializer)? {
        Some(Bson::DateTime(dt)) => Some(dt),
        Some(Bson::String(s)) => chrono::DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(bson::DateTime::from_chrono),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn decodes_stored_document() {
        let stored = doc! {
            "_id": ObjectId::new(),
            "username": "reporting",
            "type": "api-key",
            "role": "read",
            "key": "k",
            "hashed_key": "h",
            "masked_key": "m",
            "created_at": bson::DateTime::now(),
        };
        let record: PrincipalRecord = bson::from_document(stored).unwrap();
        assert_eq!(record.role, Role::ReadOnly);
        assert!(record.created_at.is_some());
        assert!(record.expires_at.is_none());

        let context = record.context();
        assert_eq!(context.id, "reporting");
        assert_eq!(context.roles, vec![Role::ReadOnly]);
    }

    #[test]
    fn string_timestamps_decode() {
        let stored = doc! {
            "username": "read-api-key",
            "type": "api-key",
            "role": "read",
            "hashed_key": "h",
            "created_at": "2024-08-09T04:22:31.082Z",
            "expires_at": "2025-08-09T04:22:31.082Z",
        };
        let record: PrincipalRecord = bson::from_document(stored).unwrap();
        assert_eq!(record.expires_at.map(|d| d.timestamp_millis()), Some(1_754_713_351_082));
        assert!(record.created_at.is_some());

        let odd = doc! { "username": "x", "role": "read", "hashed_key": "h", "expires_at": "someday" };
        let record: PrincipalRecord = bson::from_document(odd).unwrap();
        assert!(record.expires_at.is_none());
        assert!(record.created_at.is_none());
    }

    #[test]
    fn identity_ignores_everything_else() {
        let stored = doc! {
            "username": "etl",
            "role": "write",
            "expires_at": { "weird": true },
            "created_at": 17,
        };
        let identity: PrincipalIdentity = bson::from_document(stored).unwrap();
        assert_eq!(identity.context().roles, vec![Role::WriteOnly]);
        assert_eq!(identity.kind, PrincipalType::ApiKey);
    }

    #[test]
    fn unknown_role_does_not_decode() {
        let stored = doc! {
            "username": "x",
            "role": "superuser",
            "hashed_key": "h",
        };
        assert!(bson::from_document::<PrincipalRecord>(stored).is_err());
    }
}
