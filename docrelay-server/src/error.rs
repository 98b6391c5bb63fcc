//! # API Errors
//!
//! Request-level failures and their mapping onto status codes and envelopes.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use thiserror::Error;

use docrelay::error::DocumentStoreError;

use crate::envelope::Envelope;

/// Result type for request handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that end a request with a single error envelope.
///
/// Per-item update failures are not represented here: they are reported inside a
/// successful batch response.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The endpoint exists but not for this verb
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    /// No endpoint at this path; the path is sent as `error`
    #[error("Not Found")]
    NotFound(String),

    /// Missing or malformed request input
    #[error("{0}")]
    Validation(String),

    #[error("Database \"{0}\" not found")]
    DatabaseNotFound(String),

    #[error("Collection \"{collection}\" not found in database \"{database}\"")]
    CollectionNotFound { collection: String, database: String },

    /// Unexpected failure from the database layer; the driver message is sent as `error`
    #[error("Fail")]
    Upstream(String),
}

impl ApiError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_)
            | ApiError::DatabaseNotFound(_)
            | ApiError::CollectionNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The envelope describing this error.
    pub fn envelope(&self) -> Envelope {
        match self {
            ApiError::Upstream(detail) => Envelope::err_with(self.to_string(), Value::String(detail.clone())),
            ApiError::NotFound(path) => {
                Envelope::err_with(self.to_string(), Value::String(format!("No route for {path}")))
            }
            _ => Envelope::err(self.to_string()),
        }
    }
}

impl From<DocumentStoreError> for ApiError {
    fn from(err: DocumentStoreError) -> Self {
        match err {
            DocumentStoreError::DatabaseNotFound(database) => ApiError::DatabaseNotFound(database),
            DocumentStoreError::CollectionNotFound(collection, database) => {
                ApiError::CollectionNotFound { collection, database }
            }
            DocumentStoreError::InvalidQuery(_) | DocumentStoreError::InvalidDocument(_) => {
                ApiError::Validation(err.to_string())
            }
            DocumentStoreError::Serialization(detail)
            | DocumentStoreError::Initialization(detail)
            | DocumentStoreError::Backend(detail)
            | DocumentStoreError::Unknown(detail) => ApiError::Upstream(detail),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.envelope())).into_response()
    }
}
