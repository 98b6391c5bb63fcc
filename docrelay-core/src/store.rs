//! Main document store interface for interacting with document backends.
//!
//! [`DocumentStore`] wraps a single backend connection. Handlers resolve their target
//! namespace with [`DocumentStore::checked_collection`], which verifies that both the
//! database and the collection exist before any document is touched.
//!
//! # Example
//!
//! ```ignore
//! use docrelay_core::store::DocumentStore;
//!
//! let store = DocumentStore::new(connector.connect().await?);
//! let movies = store.checked_collection("sample_mflix", "movies").await?;
//! let found = movies.find(Query::new()).await?;
//! store.shutdown().await?;
//! ```

use crate::{
    backend::StoreBackend,
    collection::Collection,
    error::{DocumentStoreError, DocumentStoreResult},
};

/// A document store bound to one backend connection.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Gets a collection handle without checking that it exists.
    pub fn collection<'a>(&'a self, database: &str, name: &str) -> Collection<'a, B> {
        Collection::new(database.to_string(), name.to_string(), &self.backend)
    }

    /// Gets a collection handle after confirming the database and the collection exist.
    ///
    /// Issues two metadata queries: one listing databases, one listing the collections of
    /// `database`. Nothing is cached between calls.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::DatabaseNotFound`] or
    /// [`DocumentStoreError::CollectionNotFound`] naming the missing item, or any backend
    /// error raised while listing.
    pub async fn checked_collection<'a>(
        &'a self,
        database: &str,
        name: &str,
    ) -> DocumentStoreResult<Collection<'a, B>> {
        if !self
            .backend
            .list_databases()
            .await?
            .iter()
            .any(|db| db == database)
        {
            return Err(DocumentStoreError::DatabaseNotFound(database.to_string()));
        }

        if !self
            .backend
            .list_collections(database)
            .await?
            .iter()
            .any(|collection| collection == name)
        {
            return Err(DocumentStoreError::CollectionNotFound(
                name.to_string(),
                database.to_string(),
            ));
        }

        Ok(self.collection(database, name))
    }

    /// Lists all databases visible to the connection.
    pub async fn list_databases(&self) -> DocumentStoreResult<Vec<String>> {
        self.backend.list_databases().await
    }

    /// Lists all collections in a database.
    pub async fn list_collections(&self, database: &str) -> DocumentStoreResult<Vec<String>> {
        self.backend.list_collections(database).await
    }

    /// Shuts down the store and releases the backend connection.
    ///
    /// This consumes the store and should be called once the request is done.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown operation fails.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await?;

        Ok(())
    }
}
