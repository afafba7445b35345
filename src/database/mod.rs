pub mod manager;
#[cfg(any(test, feature = "memory-store"))]
pub mod memory;
pub mod models;
pub mod mongo;
pub mod repository;

use async_trait::async_trait;
use bson::{Bson, Document};
use thiserror::Error;

use crate::types::Cardinality;

pub use manager::DatabaseManager;
#[cfg(any(test, feature = "memory-store"))]
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use repository::PrincipalRepository;

/// Failure surfaced by the document store, carrying the backend's own message and code
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
    pub code: Option<String>,
}

impl StoreError {
    pub fn new(message: impl Into<String>, code: Option<String>) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }

    /// Error with a numeric server-style code.
    pub fn coded(code: i32, message: impl Into<String>) -> Self {
        Self::new(message, Some(code.to_string()))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Database and collection an operation targets
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub database: String,
    pub collection: String,
}

impl Namespace {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// Cursor modifiers for `find`, applied in the order sort, skip, limit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindSpec {
    pub projection: Option<Document>,
    pub sort: Option<Document>,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_id: Option<Bson>,
}

/// Capability interface over the document database.
///
/// Filters, update expressions and pipelines are passed through untouched;
/// interpreting them is the backend's job.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Backend label for logs and the health endpoint
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> StoreResult<()>;

    /// Returns the identifier of the stored document.
    async fn insert_one(&self, ns: &Namespace, document: Document) -> StoreResult<Bson>;

    /// Returns identifiers in input order.
    async fn insert_many(&self, ns: &Namespace, documents: Vec<Document>) -> StoreResult<Vec<Bson>>;

    async fn find_one(
        &self,
        ns: &Namespace,
        filter: Document,
        projection: Option<Document>,
    ) -> StoreResult<Option<Document>>;

    async fn find(&self, ns: &Namespace, filter: Document, spec: FindSpec) -> StoreResult<Vec<Document>>;

    async fn update(
        &self,
        ns: &Namespace,
        filter: Document,
        update: Document,
        cardinality: Cardinality,
        upsert: bool,
    ) -> StoreResult<UpdateOutcome>;

    /// Returns the number of documents removed.
    async fn delete(&self, ns: &Namespace, filter: Document, cardinality: Cardinality) -> StoreResult<u64>;

    async fn aggregate(&self, ns: &Namespace, pipeline: Vec<Document>) -> StoreResult<Vec<Document>>;
}
