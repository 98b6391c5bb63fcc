//! Collection handles for document store operations.
//!
//! A [`Collection`] names one `(database, collection)` namespace and forwards document
//! operations to the backend connection it borrows. Obtain one through
//! [`DocumentStore::checked_collection`](crate::store::DocumentStore::checked_collection).
//!
//! # Example
//!
//! ```ignore
//! use bson::doc;
//!
//! let users = store.checked_collection("sample_mflix", "users").await?;
//! let ids = users.insert(vec![doc! { "name": "Alice" }]).await?;
//! ```

use bson::{Bson, Document, oid::ObjectId};

use crate::{
    backend::{StoreBackend, UpdateOutcome},
    error::DocumentStoreResult,
    query::{Expr, Query},
};

/// A collection with a reference to a backend connection.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the backend reference
/// * `B` - The storage backend type
#[derive(Debug)]
pub struct Collection<'a, B: StoreBackend> {
    database: String,
    name: String,
    backend: &'a B,
}

impl<'a, B: StoreBackend> Collection<'a, B> {
    /// Creates a new collection reference (internal use).
    pub(crate) fn new(database: String, name: String, backend: &'a B) -> Self {
        Self { database, name, backend }
    }

    /// Returns the name of the database holding this collection.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts new documents into the collection.
    ///
    /// # Returns
    ///
    /// The identities of the inserted documents, in input order.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if the operation fails.
    pub async fn insert(&self, documents: Vec<Document>) -> DocumentStoreResult<Vec<Bson>> {
        self.backend
            .insert_documents(&self.database, &self.name, documents)
            .await
    }

    /// Finds documents using a filter and projection.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if the operation fails.
    pub async fn find(&self, query: Query) -> DocumentStoreResult<Vec<Document>> {
        self.backend
            .query_documents(&self.database, &self.name, query)
            .await
    }

    /// Sets `fields` on the document with the given identity.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if the operation fails.
    /// A missing document is reported through [`UpdateOutcome::matched`], not as an error.
    pub async fn update(&self, id: ObjectId, fields: Document) -> DocumentStoreResult<UpdateOutcome> {
        self.backend
            .update_document(&self.database, &self.name, id, fields)
            .await
    }

    /// Deletes the documents matching `filter`, or every document when `None`.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if the operation fails.
    pub async fn delete(&self, filter: Option<Expr>) -> DocumentStoreResult<u64> {
        self.backend
            .delete_documents(&self.database, &self.name, filter)
            .await
    }
}
