//! Error types and result types for document store operations.
//!
//! This module provides error handling for every operation that reaches a document
//! store, from query translation to backend failures.
//! Use [`DocumentStoreResult<T>`] as the return type for fallible operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a document store.
///
/// This enum covers serialization errors, missing databases and collections,
/// malformed queries and backend-specific errors.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during connector initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The requested database is not visible to the connection.
    #[error("Database \"{0}\" not found")]
    DatabaseNotFound(String),
    /// The requested collection does not exist in the database.
    /// The first argument is the collection name, the second is the database name.
    #[error("Collection \"{0}\" not found in database \"{1}\"")]
    CollectionNotFound(String, String),
    /// The document has an invalid structure (e.g. not a BSON document).
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// A filter could not be built from the request parameters.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
    /// An unknown error occurred.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// A specialized `Result` type for document store operations.
///
/// This type alias is used throughout the crate to indicate operations that may fail
/// with a [`DocumentStoreError`].
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
