use bson::{Bson, Document};
use serde::{Deserialize, Serialize};

use crate::database::Namespace;
use crate::error::ApiError;

/// Fields shared by every action request
pub trait ActionTarget {
    fn database(&self) -> &str;
    fn collection(&self) -> &str;

    /// Resolves the target collection. The data source name is informational.
    fn namespace(&self) -> Result<Namespace, ApiError> {
        let (database, collection) = (self.database().trim(), self.collection().trim());
        if database.is_empty() {
            return Err(ApiError::validation("database must be a non-empty string"));
        }
        if collection.is_empty() {
            return Err(ApiError::validation("collection must be a non-empty string"));
        }
        Ok(Namespace::new(database, collection))
    }
}

macro_rules! action_target {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ActionTarget for $ty {
                fn database(&self) -> &str {
                    &self.database
                }

                fn collection(&self) -> &str {
                    &self.collection
                }
            }
        )*
    };
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOneRequest {
    #[serde(default)]
    pub data_source: String,
    pub database: String,
    pub collection: String,
    pub document: Document,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertManyRequest {
    #[serde(default)]
    pub data_source: String,
    pub database: String,
    pub collection: String,
    pub documents: Vec<Document>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindOneRequest {
    #[serde(default)]
    pub data_source: String,
    pub database: String,
    pub collection: String,
    #[serde(default)]
    pub filter: Document,
    pub projection: Option<Document>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindRequest {
    #[serde(default)]
    pub data_source: String,
    pub database: String,
    pub collection: String,
    #[serde(default)]
    pub filter: Document,
    pub projection: Option<Document>,
    pub sort: Option<Document>,
    pub limit: Option<i64>,
    pub skip: Option<u64>,
}

/// Body of `updateOne` and `update`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    #[serde(default)]
    pub data_source: String,
    pub database: String,
    pub collection: String,
    pub filter: Document,
    pub update: Document,
    #[serde(default)]
    pub upsert: bool,
}

/// Body of `deleteOne` and `delete`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    #[serde(default)]
    pub data_source: String,
    pub database: String,
    pub collection: String,
    pub filter: Document,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRequest {
    #[serde(default)]
    pub data_source: String,
    pub database: String,
    pub collection: String,
    pub pipeline: Vec<Document>,
}

action_target!(
    InsertOneRequest,
    InsertManyRequest,
    FindOneRequest,
    FindRequest,
    UpdateRequest,
    DeleteRequest,
    AggregateRequest,
);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOneResponse {
    pub inserted_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertManyResponse {
    pub inserted_count: u64,
    pub inserted_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FindOneResponse {
    /// Serialized as an explicit null when nothing matched.
    pub document: Option<Document>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentsResponse {
    pub documents: Vec<Document>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponse {
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_count: u64,
    pub upserted_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub deleted_count: u64,
}

/// String form of a generated identifier: hex for ObjectIds, the value itself
/// for strings and integers, relaxed Extended JSON text otherwise.
pub fn stringify_id(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        Bson::Int32(n) => n.to_string(),
        Bson::Int64(n) => n.to_string(),
        other => other.clone().into_relaxed_extjson().to_string(),
    }
}
