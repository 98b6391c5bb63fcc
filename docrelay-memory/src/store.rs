//! In-memory storage implementation for document stores.
//!
//! This module provides a simple in-memory backend that keeps databases, collections
//! and documents in nested maps behind an async-safe read-write lock. Documents keep
//! their insertion order, which is the natural order reads return.

use std::{collections::{BTreeMap, HashMap}, sync::Arc};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Bson, Document, oid::ObjectId};

use docrelay_core::{
    backend::{Connector, ConnectorBuilder, StoreBackend, UpdateOutcome},
    error::{DocumentStoreError, DocumentStoreResult},
    identity::ID_FIELD,
    projection::Projection,
    query::{Expr, Query},
};

use crate::evaluator::{DocumentEvaluator, lookup};

type CollectionMap = Vec<Document>;
type DatabaseMap = HashMap<String, CollectionMap>;
type StoreMap = BTreeMap<String, DatabaseMap>;


/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state. Every clone
/// shares the same data, so the store doubles as its own [`Connector`]: each connection
/// is a clone.
///
/// Unlike a hosted database, databases and collections only exist once
/// [`create_collection`](InMemoryStore::create_collection) (or an insert) creates them.
///
/// # Example
///
/// ```ignore
/// use docrelay_memory::InMemoryStore;
/// use docrelay_core::backend::StoreBackend;
/// use bson::doc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = InMemoryStore::new();
///     store.create_collection("sample_mflix", "users").await;
///
///     let ids = store
///         .insert_documents("sample_mflix", "users", vec![doc! { "name": "Alice" }])
///         .await?;
///     assert_eq!(ids.len(), 1);
///
///     Ok(())
/// }
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// database name -> (collection name -> documents in insertion order)
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Creates an empty collection, creating its database if needed.
    ///
    /// Existing collections are left untouched.
    pub async fn create_collection(&self, database: &str, name: &str) {
        self.store
            .write()
            .await
            .entry(database.to_string())
            .or_default()
            .entry(name.to_string())
            .or_default();
    }

    /// Returns a copy of every document in a collection.
    pub async fn documents(&self, database: &str, collection: &str) -> Vec<Document> {
        self.store
            .read()
            .await
            .get(database)
            .and_then(|db| db.get(collection))
            .cloned()
            .unwrap_or_default()
    }

    fn project(document: &Document, projection: &Projection) -> Document {
        if projection.is_empty() {
            return document.clone();
        }

        let mut projected = Document::new();

        if let Some(id) = document.get(ID_FIELD) {
            projected.insert(ID_FIELD, id.clone());
        }

        for field in projection.fields() {
            if let Some(value) = lookup(document, field) {
                // Projections only create embedded documents, so this cannot fail.
                let _ = assign(&mut projected, field, value.clone());
            }
        }

        projected
    }
}

/// Sets `value` at a dotted path, creating embedded documents along the way.
///
/// Fails when a segment before the last one holds something other than a document.
fn assign(document: &mut Document, path: &str, value: Bson) -> DocumentStoreResult<()> {
    let Some((head, rest)) = path.split_once('.') else {
        document.insert(path, value);
        return Ok(());
    };

    if !document.contains_key(head) {
        document.insert(head, Document::new());
    }

    match document.get_mut(head) {
        Some(Bson::Document(embedded)) => assign(embedded, rest, value),
        _ => Err(DocumentStoreError::InvalidDocument(format!(
            "cannot set \"{path}\": \"{head}\" is not an embedded document"
        ))),
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn list_databases(&self) -> DocumentStoreResult<Vec<String>> {
        Ok(
            self.store
                .read()
                .await
                .keys()
                .cloned()
                .collect()
        )
    }

    async fn list_collections(&self, database: &str) -> DocumentStoreResult<Vec<String>> {
        Ok(
            self.store
                .read()
                .await
                .get(database)
                .map(|db| db.keys().cloned().collect())
                .unwrap_or_default()
        )
    }

    async fn insert_documents(
        &self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> DocumentStoreResult<Vec<Bson>> {
        let mut store = self.store.write().await;
        let collection_map = store
            .entry(database.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default();

        let mut prepared = Vec::with_capacity(documents.len());
        let mut ids = Vec::with_capacity(documents.len());

        for mut doc in documents {
            let id = doc
                .entry(ID_FIELD.to_string())
                .or_insert_with(|| Bson::ObjectId(ObjectId::new()))
                .clone();

            if collection_map.iter().chain(prepared.iter()).any(|existing: &Document| existing.get(ID_FIELD) == Some(&id)) {
                return Err(DocumentStoreError::Backend(format!(
                    "duplicate key {id} in collection {collection}"
                )));
            }

            ids.push(id);
            prepared.push(doc);
        }

        collection_map.extend(prepared);

        Ok(ids)
    }

    async fn query_documents(
        &self,
        database: &str,
        collection: &str,
        query: Query,
    ) -> DocumentStoreResult<Vec<Document>> {
        let store = self.store.read().await;
        let collection_map = match store.get(database).and_then(|db| db.get(collection)) {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        // Apply filter expressions if present
        let matched: Vec<&Document> = match &query.filter {
            Some(filter) => DocumentEvaluator::matching_indices(collection_map, filter)?
                .into_iter()
                .map(|index| &collection_map[index])
                .collect(),
            None => collection_map.iter().collect(),
        };

        Ok(
            matched
                .into_iter()
                .map(|doc| Self::project(doc, &query.projection))
                .collect()
        )
    }

    async fn update_document(
        &self,
        database: &str,
        collection: &str,
        id: ObjectId,
        fields: Document,
    ) -> DocumentStoreResult<UpdateOutcome> {
        if fields.contains_key(ID_FIELD) {
            return Err(DocumentStoreError::InvalidDocument(format!(
                "the {ID_FIELD} field is immutable"
            )));
        }

        let mut store = self.store.write().await;
        let target = store
            .get_mut(database)
            .and_then(|db| db.get_mut(collection))
            .and_then(|col| {
                col.iter_mut()
                    .find(|doc| doc.get(ID_FIELD) == Some(&Bson::ObjectId(id)))
            });

        let Some(target) = target else {
            return Ok(UpdateOutcome::default());
        };

        let mut updated = target.clone();
        let mut modified = false;

        for (field, value) in fields {
            if lookup(&updated, &field) != Some(&value) {
                assign(&mut updated, &field, value)?;
                modified = true;
            }
        }

        *target = updated;

        Ok(UpdateOutcome {
            matched: 1,
            modified: modified as u64,
        })
    }

    async fn delete_documents(
        &self,
        database: &str,
        collection: &str,
        filter: Option<Expr>,
    ) -> DocumentStoreResult<u64> {
        let mut store = self.store.write().await;
        let collection_map = match store.get_mut(database).and_then(|db| db.get_mut(collection)) {
            Some(col) => col,
            None => return Ok(0),
        };

        let doomed = match &filter {
            Some(filter) => DocumentEvaluator::matching_indices(collection_map.iter(), filter)?,
            None => (0..collection_map.len()).collect(),
        };

        let mut index = 0;
        collection_map.retain(|_| {
            let keep = doomed.binary_search(&index).is_err();
            index += 1;
            keep
        });

        Ok(doomed.len() as u64)
    }
}

#[async_trait]
impl Connector for InMemoryStore {
    type Backend = InMemoryStore;

    /// Connections share this store's data.
    async fn connect(&self) -> DocumentStoreResult<Self::Backend> {
        Ok(self.clone())
    }
}


/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use docrelay_memory::InMemoryStore;
/// use docrelay_core::backend::ConnectorBuilder;
///
/// #[tokio::main]
/// async fn main() {
///     let store = InMemoryStore::builder()
///         .with_collection("sample_mflix", "movies")
///         .build()
///         .await
///         .unwrap();
/// }
/// ```
#[derive(Default)]
pub struct InMemoryStoreBuilder {
    collections: Vec<(String, String)>,
}

impl InMemoryStoreBuilder {
    /// Pre-creates an empty collection (and its database).
    pub fn with_collection(mut self, database: &str, name: &str) -> Self {
        self.collections.push((database.to_string(), name.to_string()));
        self
    }
}

#[async_trait]
impl ConnectorBuilder for InMemoryStoreBuilder {
    type Connector = InMemoryStore;

    async fn build(self) -> DocumentStoreResult<Self::Connector> {
        let store = InMemoryStore::new();

        for (database, name) in &self.collections {
            store.create_collection(database, name).await;
        }

        Ok(store)
    }
}
