use std::sync::Arc;

use bson::{doc, Bson, Document};
use tracing::warn;

use super::models::{PrincipalIdentity, PrincipalRecord};
use super::{DocumentStore, FindSpec, Namespace, StoreError, StoreResult};
use crate::auth::PrincipalType;

/// Typed access to the credential collection
#[derive(Clone)]
pub struct PrincipalRepository {
    store: Arc<dyn DocumentStore>,
    namespace: Namespace,
}

impl PrincipalRepository {
    pub fn new(store: Arc<dyn DocumentStore>, namespace: Namespace) -> Self {
        Self { store, namespace }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Identity of the principal owning `hashed_key`. Only the identity fields
    /// are read, so the rest of the document may have any shape.
    pub async fn find_identity_by_hashed_key(&self, hashed_key: &str) -> StoreResult<Option<PrincipalIdentity>> {
        self.store
            .find_one(
                &self.namespace,
                doc! { "hashed_key": hashed_key },
                Some(PrincipalIdentity::projection()),
            )
            .await?
            .map(|document| {
                bson::from_document(document)
                    .map_err(|e| StoreError::new(e.to_string(), Some("BsonDeserialization".to_string())))
            })
            .transpose()
    }

    pub async fn hashed_key_exists(&self, hashed_key: &str) -> StoreResult<bool> {
        self.exists(doc! { "hashed_key": hashed_key }).await
    }

    pub async fn username_exists(&self, username: &str) -> StoreResult<bool> {
        self.exists(doc! { "username": username, "type": PrincipalType::ApiKey.as_str() })
            .await
    }

    pub async fn find_by_username(&self, username: &str) -> StoreResult<Option<PrincipalRecord>> {
        self.select_one(doc! { "username": username, "type": PrincipalType::ApiKey.as_str() })
            .await
    }

    pub async fn insert(&self, record: &PrincipalRecord) -> StoreResult<Bson> {
        let document = bson::to_document(record)
            .map_err(|e| StoreError::new(e.to_string(), Some("BsonSerialization".to_string())))?;
        self.store.insert_one(&self.namespace, document).await
    }

    /// Every principal in insertion order. Documents that do not decode are skipped.
    pub async fn list_all(&self) -> StoreResult<Vec<PrincipalRecord>> {
        let documents = self
            .store
            .find(&self.namespace, Document::new(), FindSpec::default())
            .await?;

        Ok(documents
            .into_iter()
            .filter_map(|document| match decode(document) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping malformed principal in {}: {}", self.namespace, e);
                    None
                }
            })
            .collect())
    }

    async fn exists(&self, filter: Document) -> StoreResult<bool> {
        let found = self
            .store
            .find_one(&self.namespace, filter, Some(doc! { "_id": 1 }))
            .await?;
        Ok(found.is_some())
    }

    async fn select_one(&self, filter: Document) -> StoreResult<Option<PrincipalRecord>> {
        self.store
            .find_one(&self.namespace, filter, None)
            .await?
            .map(decode)
            .transpose()
    }
}

fn decode(document: Document) -> StoreResult<PrincipalRecord> {
    bson::from_document(document)
        .map_err(|e| StoreError::new(e.to_string(), Some("BsonDeserialization".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{hash_api_key, PrincipalType, Role};
    use crate::database::MemoryStore;

    fn record(username: &str, key: &str) -> PrincipalRecord {
        PrincipalRecord {
            id: None,
            username: username.to_string(),
            kind: PrincipalType::ApiKey,
            role: Role::ReadWrite,
            key: key.to_string(),
            hashed_key: hash_api_key(key),
            masked_key: String::new(),
            created_at: Some(bson::DateTime::now()),
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn looks_up_by_hash_and_username() {
        let repo = PrincipalRepository::new(Arc::new(MemoryStore::new()), Namespace::new("aws_apps", "users"));
        repo.insert(&record("etl", "k1")).await.unwrap();

        let found = repo.find_identity_by_hashed_key(&hash_api_key("k1")).await.unwrap().unwrap();
        assert_eq!(found.username, "etl");
        assert_eq!(found.role, Role::ReadWrite);
        assert!(repo.find_identity_by_hashed_key(&hash_api_key("k2")).await.unwrap().is_none());
        assert!(repo.hashed_key_exists(&hash_api_key("k1")).await.unwrap());
        assert!(repo.username_exists("etl").await.unwrap());
        assert!(!repo.username_exists("nobody").await.unwrap());
        assert!(repo.find_by_username("etl").await.unwrap().unwrap().id.is_some());
    }

    #[tokio::test]
    async fn identity_lookup_tolerates_legacy_documents() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let ns = Namespace::new("aws_apps", "users");
        store
            .insert_one(
                &ns,
                doc! {
                    "username": "read-api-key",
                    "type": "api-key",
                    "role": "read",
                    "hashed_key": hash_api_key("legacy"),
                    "created_at": 0,
                    "expires_at": ["not", "a", "date"],
                },
            )
            .await
            .unwrap();

        let repo = PrincipalRepository::new(store, ns);
        let identity = repo.find_identity_by_hashed_key(&hash_api_key("legacy")).await.unwrap().unwrap();
        assert_eq!(identity.context().roles, vec![Role::ReadOnly]);
    }

    #[tokio::test]
    async fn list_skips_malformed_documents() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let ns = Namespace::new("aws_apps", "users");
        let repo = PrincipalRepository::new(store.clone(), ns.clone());
        repo.insert(&record("a", "k1")).await.unwrap();
        store.insert_one(&ns, doc! { "username": "broken" }).await.unwrap();
        repo.insert(&record("b", "k2")).await.unwrap();

        let names: Vec<String> = repo.list_all().await.unwrap().into_iter().map(|r| r.username).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
