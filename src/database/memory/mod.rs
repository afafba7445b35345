//! In-process document store for the test suite and local runs.
//!
//! Understands a small subset of the query language: equality and comparison
//! filters, `$set`/`$inc` updates and the `$match`/`$sort`/`$limit`/`$group`
//! stages. Anything else is rejected with the server's error code.

pub mod filter_order;
pub mod filter_where;
pub mod pipeline;
pub mod update;
pub mod value;

use std::collections::HashMap;

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Bson, Document};
use tokio::sync::RwLock;

use self::filter_order::FilterOrder;
use self::filter_where::FilterWhere;
use self::value::{project, values_equal, DUPLICATE_KEY};
use super::{DocumentStore, FindSpec, Namespace, StoreError, StoreResult, UpdateOutcome};
use crate::types::Cardinality;

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Namespace, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Puts `_id` first, generating an ObjectId when the document has none.
fn with_id(document: Document) -> (Bson, Document) {
    let id = document
        .get("_id")
        .cloned()
        .unwrap_or_else(|| Bson::ObjectId(ObjectId::new()));
    let mut stored = Document::new();
    stored.insert("_id", id.clone());
    for (key, value) in document {
        if key != "_id" {
            stored.insert(key, value);
        }
    }
    (id, stored)
}

fn insert_checked(collection: &mut Vec<Document>, ns: &Namespace, document: Document) -> StoreResult<Bson> {
    let (id, stored) = with_id(document);
    let duplicate = collection
        .iter()
        .any(|existing| existing.get("_id").map(|e| values_equal(e, &id)).unwrap_or(false));
    if duplicate {
        return Err(StoreError::coded(
            DUPLICATE_KEY,
            format!("E11000 duplicate key error collection: {} index: _id_ dup key: {{ _id: {} }}", ns, id),
        ));
    }
    collection.push(stored);
    Ok(id)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn insert_one(&self, ns: &Namespace, document: Document) -> StoreResult<Bson> {
        let mut collections = self.collections.write().await;
        insert_checked(collections.entry(ns.clone()).or_default(), ns, document)
    }

    /// Ordered insert: documents before the first failure stay stored.
    async fn insert_many(&self, ns: &Namespace, documents: Vec<Document>) -> StoreResult<Vec<Bson>> {
        let mut collections = self.collections.write().await;
        let collection = collections.entry(ns.clone()).or_default();
        documents
            .into_iter()
            .map(|document| insert_checked(collection, ns, document))
            .collect()
    }

    async fn find_one(
        &self,
        ns: &Namespace,
        filter: Document,
        projection: Option<Document>,
    ) -> StoreResult<Option<Document>> {
        let filter = FilterWhere::parse(&filter)?;
        let collections = self.collections.read().await;
        let found = collections
            .get(ns)
            .and_then(|docs| docs.iter().find(|d| filter.matches(d)));
        match (found, projection) {
            (Some(doc), Some(projection)) => Ok(Some(project(doc, &projection))),
            (found, _) => Ok(found.cloned()),
        }
    }

    async fn find(&self, ns: &Namespace, filter: Document, spec: FindSpec) -> StoreResult<Vec<Document>> {
        let filter = FilterWhere::parse(&filter)?;
        let order = match &spec.sort {
            Some(sort) => FilterOrder::parse(sort)?,
            None => Vec::new(),
        };

        let mut matched: Vec<Document> = {
            let collections = self.collections.read().await;
            collections
                .get(ns)
                .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
                .unwrap_or_default()
        };

        FilterOrder::apply(&order, &mut matched);

        let skip = spec.skip.unwrap_or(0) as usize;
        // 0 means no limit; a negative limit is treated by its magnitude
        let limit = match spec.limit.map(i64::unsigned_abs) {
            None | Some(0) => usize::MAX,
            Some(n) => n as usize,
        };

        Ok(matched
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|doc| match &spec.projection {
                Some(projection) => project(&doc, projection),
                None => doc,
            })
            .collect())
    }

    async fn update(
        &self,
        ns: &Namespace,
        filter: Document,
        update: Document,
        cardinality: Cardinality,
        upsert: bool,
    ) -> StoreResult<UpdateOutcome> {
        update::validate(&update)?;
        let compiled = FilterWhere::parse(&filter)?;

        let mut collections = self.collections.write().await;
        let collection = collections.entry(ns.clone()).or_default();

        let mut outcome = UpdateOutcome {
            matched_count: 0,
            modified_count: 0,
            upserted_id: None,
        };

        for stored in collection.iter_mut() {
            if !compiled.matches(stored) {
                continue;
            }
            outcome.matched_count += 1;

            let mut candidate = stored.clone();
            if update::apply(&mut candidate, &update)? {
                *stored = candidate;
                outcome.modified_count += 1;
            }
            if cardinality == Cardinality::One {
                break;
            }
        }

        if outcome.matched_count == 0 && upsert {
            let mut seed = update::seed_from_filter(&filter)?;
            update::apply(&mut seed, &update)?;
            outcome.upserted_id = Some(insert_checked(collection, ns, seed)?);
        }

        Ok(outcome)
    }

    async fn delete(&self, ns: &Namespace, filter: Document, cardinality: Cardinality) -> StoreResult<u64> {
        let filter = FilterWhere::parse(&filter)?;
        let mut collections = self.collections.write().await;
        let Some(collection) = collections.get_mut(ns) else {
            return Ok(0);
        };

        match cardinality {
            Cardinality::One => match collection.iter().position(|d| filter.matches(d)) {
                Some(index) => {
                    collection.remove(index);
                    Ok(1)
                }
                None => Ok(0),
            },
            Cardinality::Many => {
                let before = collection.len();
                collection.retain(|d| !filter.matches(d));
                Ok((before - collection.len()) as u64)
            }
        }
    }

    async fn aggregate(&self, ns: &Namespace, pipeline: Vec<Document>) -> StoreResult<Vec<Document>> {
        let snapshot = self
            .collections
            .read()
            .await
            .get(ns)
            .cloned()
            .unwrap_or_default();
        pipeline::run(snapshot, &pipeline)
    }
}
