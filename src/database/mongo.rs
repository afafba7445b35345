use std::time::Duration;

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, FindOneOptions, FindOptions, UpdateOptions};
use mongodb::{Client, Collection};
use tracing::info;

use super::{DocumentStore, FindSpec, Namespace, StoreError, StoreResult, UpdateOutcome};
use crate::types::Cardinality;

/// Document store backed by a single shared MongoDB client
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
}

impl MongoStore {
    /// Parses the connection string and builds the client. The driver
    /// connects lazily, so an unreachable server surfaces on first use.
    pub async fn connect(connection_string: &str, connect_timeout_secs: u64) -> StoreResult<Self> {
        let mut options = ClientOptions::parse(connection_string).await.map_err(StoreError::from)?;
        options.app_name = Some("data-api-rust".to_string());
        options.connect_timeout = Some(Duration::from_secs(connect_timeout_secs));
        options.server_selection_timeout = Some(Duration::from_secs(connect_timeout_secs));

        let client = Client::with_options(options).map_err(StoreError::from)?;
        info!("Created MongoDB client");
        Ok(Self { client })
    }

    fn collection(&self, ns: &Namespace) -> Collection<Document> {
        self.client.database(&ns.database).collection::<Document>(&ns.collection)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn ping(&self) -> StoreResult<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await?;
        Ok(())
    }

    async fn insert_one(&self, ns: &Namespace, document: Document) -> StoreResult<Bson> {
        let result = self.collection(ns).insert_one(document, None).await?;
        Ok(result.inserted_id)
    }

    async fn insert_many(&self, ns: &Namespace, documents: Vec<Document>) -> StoreResult<Vec<Bson>> {
        let result = self.collection(ns).insert_many(documents, None).await?;
        let mut ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        ids.sort_by_key(|(index, _)| *index);
        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }

    async fn find_one(
        &self,
        ns: &Namespace,
        filter: Document,
        projection: Option<Document>,
    ) -> StoreResult<Option<Document>> {
        let mut options = FindOneOptions::default();
        options.projection = projection;
        Ok(self.collection(ns).find_one(filter, options).await?)
    }

    async fn find(&self, ns: &Namespace, filter: Document, spec: FindSpec) -> StoreResult<Vec<Document>> {
        let mut options = FindOptions::default();
        options.projection = spec.projection;
        options.sort = spec.sort;
        options.skip = spec.skip;
        options.limit = spec.limit;

        let cursor = self.collection(ns).find(filter, options).await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents)
    }

    async fn update(
        &self,
        ns: &Namespace,
        filter: Document,
        update: Document,
        cardinality: Cardinality,
        upsert: bool,
    ) -> StoreResult<UpdateOutcome> {
        let mut options = UpdateOptions::default();
        options.upsert = Some(upsert);

        let collection = self.collection(ns);
        let result = match cardinality {
            Cardinality::One => collection.update_one(filter, update, options).await?,
            Cardinality::Many => collection.update_many(filter, update, options).await?,
        };

        Ok(UpdateOutcome {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
        })
    }

    async fn delete(&self, ns: &Namespace, filter: Document, cardinality: Cardinality) -> StoreResult<u64> {
        let collection = self.collection(ns);
        let result = match cardinality {
            Cardinality::One => collection.delete_one(filter, None).await?,
            Cardinality::Many => collection.delete_many(filter, None).await?,
        };
        Ok(result.deleted_count)
    }

    async fn aggregate(&self, ns: &Namespace, pipeline: Vec<Document>) -> StoreResult<Vec<Document>> {
        let cursor = self.collection(ns).aggregate(pipeline, None).await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents)
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        let code = server_error_code(&err).or_else(|| Some(error_kind_label(&err.kind).to_string()));
        StoreError::new(err.to_string(), code)
    }
}

/// Numeric code reported by the server, if the failure came from one.
fn server_error_code(err: &mongodb::error::Error) -> Option<String> {
    let code = match err.kind.as_ref() {
        ErrorKind::Command(e) => Some(e.code),
        ErrorKind::Write(WriteFailure::WriteError(e)) => Some(e.code),
        ErrorKind::Write(WriteFailure::WriteConcernError(e)) => Some(e.code),
        ErrorKind::BulkWrite(e) => e
            .write_errors
            .as_ref()
            .and_then(|errors| errors.first())
            .map(|e| e.code)
            .or_else(|| e.write_concern_error.as_ref().map(|e| e.code)),
        _ => None,
    };
    code.map(|c| c.to_string())
}

fn error_kind_label(kind: &ErrorKind) -> &'static str {
    match kind {
        ErrorKind::InvalidArgument { .. } => "InvalidArgument",
        ErrorKind::Authentication { .. } => "AuthenticationFailed",
        ErrorKind::BsonDeserialization(_) => "BsonDeserialization",
        ErrorKind::BsonSerialization(_) => "BsonSerialization",
        ErrorKind::ServerSelection { .. } => "ServerSelection",
        ErrorKind::Io(_) => "NetworkError",
        ErrorKind::ConnectionPoolCleared { .. } => "ConnectionPoolCleared",
        ErrorKind::InvalidResponse { .. } => "InvalidResponse",
        ErrorKind::DnsResolve { .. } => "DnsResolve",
        _ => "UnknownError",
    }
}
