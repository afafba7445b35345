use std::sync::Arc;

use tracing::debug;

use crate::api::action::{
    stringify_id, ActionTarget, AggregateRequest, DeleteRequest, DeleteResponse, DocumentsResponse,
    FindOneRequest, FindOneResponse, FindRequest, InsertManyRequest, InsertManyResponse, InsertOneRequest,
    InsertOneResponse, UpdateRequest, UpdateResponse,
};
use crate::database::{DocumentStore, FindSpec};
use crate::error::ApiError;
use crate::types::{Cardinality, Operation};

/// Dispatches the nine generic actions to the document store.
///
/// Filters, updates and pipelines are forwarded as-is; any store failure comes
/// back as [`ApiError::Backend`] carrying the store's message and code.
#[derive(Clone)]
pub struct ActionService {
    store: Arc<dyn DocumentStore>,
}

impl ActionService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn insert_one(&self, request: InsertOneRequest) -> Result<InsertOneResponse, ApiError> {
        let ns = request.namespace()?;
        debug!("{} on {}", Operation::InsertOne, ns);

        let id = self.store.insert_one(&ns, request.document).await?;
        Ok(InsertOneResponse {
            inserted_id: stringify_id(&id),
        })
    }

    pub async fn insert_many(&self, request: InsertManyRequest) -> Result<InsertManyResponse, ApiError> {
        let ns = request.namespace()?;
        if request.documents.is_empty() {
            return Err(ApiError::validation("documents must contain at least one document"));
        }
        debug!("{} on {} ({} documents)", Operation::InsertMany, ns, request.documents.len());

        let ids = self.store.insert_many(&ns, request.documents).await?;
        Ok(InsertManyResponse {
            inserted_count: ids.len() as u64,
            inserted_ids: ids.iter().map(stringify_id).collect(),
        })
    }

    pub async fn find_one(&self, request: FindOneRequest) -> Result<FindOneResponse, ApiError> {
        let ns = request.namespace()?;
        debug!("{} on {}", Operation::FindOne, ns);

        let document = self.store.find_one(&ns, request.filter, request.projection).await?;
        Ok(FindOneResponse { document })
    }

    pub async fn find(&self, request: FindRequest) -> Result<DocumentsResponse, ApiError> {
        let ns = request.namespace()?;
        debug!("{} on {}", Operation::Find, ns);

        let spec = FindSpec {
            projection: request.projection,
            sort: request.sort,
            skip: request.skip,
            limit: request.limit,
        };
        let documents = self.store.find(&ns, request.filter, spec).await?;
        Ok(DocumentsResponse { documents })
    }

    pub async fn update_one(&self, request: UpdateRequest) -> Result<UpdateResponse, ApiError> {
        self.update(Operation::UpdateOne, Cardinality::One, request).await
    }

    pub async fn update_many(&self, request: UpdateRequest) -> Result<UpdateResponse, ApiError> {
        self.update(Operation::Update, Cardinality::Many, request).await
    }

    pub async fn delete_one(&self, request: DeleteRequest) -> Result<DeleteResponse, ApiError> {
        self.delete(Operation::DeleteOne, Cardinality::One, request).await
    }

    pub async fn delete_many(&self, request: DeleteRequest) -> Result<DeleteResponse, ApiError> {
        self.delete(Operation::Delete, Cardinality::Many, request).await
    }

    pub async fn aggregate(&self, request: AggregateRequest) -> Result<DocumentsResponse, ApiError> {
        let ns = request.namespace()?;
        debug!("{} on {} ({} stages)", Operation::Aggregate, ns, request.pipeline.len());

        let documents = self.store.aggregate(&ns, request.pipeline).await?;
        Ok(DocumentsResponse { documents })
    }

    async fn update(
        &self,
        operation: Operation,
        cardinality: Cardinality,
        request: UpdateRequest,
    ) -> Result<UpdateResponse, ApiError> {
        let ns = request.namespace()?;
        debug!("{} on {} (upsert: {})", operation, ns, request.upsert);

        let outcome = self
            .store
            .update(&ns, request.filter, request.update, cardinality, request.upsert)
            .await?;

        let upserted_id = outcome.upserted_id.as_ref().map(stringify_id);
        Ok(UpdateResponse {
            matched_count: outcome.matched_count,
            modified_count: outcome.modified_count,
            upserted_count: u64::from(upserted_id.is_some()),
            upserted_id,
        })
    }

    async fn delete(
        &self,
        operation: Operation,
        cardinality: Cardinality,
        request: DeleteRequest,
    ) -> Result<DeleteResponse, ApiError> {
        let ns = request.namespace()?;
        debug!("{} on {}", operation, ns);

        let deleted_count = self.store.delete(&ns, request.filter, cardinality).await?;
        Ok(DeleteResponse { deleted_count })
    }
}
