use bson::Bson;
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use crate::auth::{PrincipalType, Role};
use crate::database::models::PrincipalRecord;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    #[serde(rename = "type", default)]
    pub kind: PrincipalType,
    pub role: Role,
    /// Generated when omitted
    pub key: Option<String>,
    /// RFC 3339 string or Extended JSON date
    pub expires_at: Option<Bson>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserResponse {
    pub id: Option<String>,
    pub username: String,
    #[serde(rename = "type")]
    pub kind: PrincipalType,
    pub role: Role,
    pub key: String,
    pub masked_key: String,
    /// ISO 8601 with milliseconds, UTC
    pub created_at: Option<String>,
    pub expires_at: Option<String>,
}

impl From<PrincipalRecord> for UserResponse {
    fn from(record: PrincipalRecord) -> Self {
        Self {
            id: record.id.map(|oid| oid.to_hex()),
            username: record.username,
            kind: record.kind,
            role: record.role,
            key: record.key,
            masked_key: record.masked_key,
            created_at: record.created_at.map(iso_string),
            expires_at: record.expires_at.map(iso_string),
        }
    }
}

fn iso_string(dt: bson::DateTime) -> String {
    dt.to_chrono().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListUsersResponse {
    pub users: Vec<UserResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::PrincipalType;

    #[test]
    fn timestamps_render_as_iso_strings() {
        let record = PrincipalRecord {
            id: None,
            username: "etl".into(),
            kind: PrincipalType::ApiKey,
            role: Role::WriteOnly,
            key: "k".into(),
            hashed_key: "h".into(),
            masked_key: "m".into(),
            created_at: Some(bson::DateTime::from_millis(1_754_713_351_082)),
            expires_at: None,
        };
        let response = UserResponse::from(record);
        assert_eq!(response.created_at.as_deref(), Some("2025-08-09T04:22:31.082Z"));
        assert_eq!(response.expires_at, None);
    }
}
