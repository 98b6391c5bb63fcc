//! Storage backend abstraction for the document store.
//!
//! This module defines the traits that sit between the request handlers and a concrete
//! database, so handlers can run against MongoDB in production and against an in-memory
//! store in tests.
//!
//! # Overview
//!
//! - [`Connector`] hands out one [`StoreBackend`] per request. The backend is released
//!   with [`StoreBackend::shutdown`] once the request is done.
//! - [`StoreBackend`] lists databases and collections and runs the four document
//!   operations against a `(database, collection)` namespace.
//! - [`ConnectorBuilder`] creates connectors from configuration.
//!
//! # Examples
//!
//! ```ignore
//! use docrelay_core::backend::{Connector, StoreBackend};
//! use bson::doc;
//!
//! let backend = connector.connect().await?;
//! let ids = backend
//!     .insert_documents("sample_mflix", "users", vec![doc! { "name": "Alice" }])
//!     .await;
//! backend.shutdown().await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use serde::Serialize;
use std::fmt::Debug;

use crate::{
    error::DocumentStoreResult,
    query::{Expr, Query},
};

/// The result of updating a single document.
///
/// Serializes as `{ "matchedCount": .., "modifiedCount": .. }`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateOutcome {
    /// Number of documents that matched the identity (0 or 1).
    #[serde(rename = "matchedCount")]
    pub matched: u64,
    /// Number of documents whose content actually changed (0 or 1).
    #[serde(rename = "modifiedCount")]
    pub modified: u64,
}

/// Abstract interface for document storage backends.
///
/// A backend value represents one live connection. It is acquired from a [`Connector`]
/// at the start of a request and shut down at the end of it.
///
/// # Error Handling
///
/// Operations return [`DocumentStoreResult<T>`](crate::error::DocumentStoreResult).
/// Driver failures surface as [`DocumentStoreError::Backend`](crate::error::DocumentStoreError::Backend);
/// filters a backend cannot evaluate surface as
/// [`DocumentStoreError::InvalidQuery`](crate::error::DocumentStoreError::InvalidQuery).
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Lists the names of all databases visible to this connection.
    async fn list_databases(&self) -> DocumentStoreResult<Vec<String>>;

    /// Lists the names of all collections within `database`.
    async fn list_collections(&self, database: &str) -> DocumentStoreResult<Vec<String>>;

    /// Inserts documents as new records.
    ///
    /// Documents without an `_id` are assigned a fresh [`ObjectId`].
    ///
    /// # Returns
    ///
    /// The identity of every inserted document, in input order.
    async fn insert_documents(
        &self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> DocumentStoreResult<Vec<Bson>>;

    /// Finds the documents matching `query`, applying its projection.
    ///
    /// Documents are returned in the backend's natural order.
    async fn query_documents(
        &self,
        database: &str,
        collection: &str,
        query: Query,
    ) -> DocumentStoreResult<Vec<Document>>;

    /// Sets `fields` on the document identified by `id`, leaving other fields intact.
    ///
    /// A missing document is not an error; it is reported as zero matches.
    async fn update_document(
        &self,
        database: &str,
        collection: &str,
        id: ObjectId,
        fields: Document,
    ) -> DocumentStoreResult<UpdateOutcome>;

    /// Deletes every document matching `filter` (every document when `None`).
    ///
    /// # Returns
    ///
    /// The number of documents deleted.
    async fn delete_documents(
        &self,
        database: &str,
        collection: &str,
        filter: Option<Expr>,
    ) -> DocumentStoreResult<u64>;

    /// Cleanly shuts down the connection, releasing all resources.
    ///
    /// The default implementation is a no-op, but backends with external connections
    /// should override this.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Hands out per-request connections to a document database.
#[async_trait]
pub trait Connector: Send + Sync + Debug + 'static {
    type Backend: StoreBackend + 'static;

    /// Opens a new connection.
    async fn connect(&self) -> DocumentStoreResult<Self::Backend>;
}

#[async_trait]
pub trait ConnectorBuilder {
    type Connector: Connector;

    async fn build(self) -> DocumentStoreResult<Self::Connector>;
}
