//! # Request Handlers
//!
//! One handler per endpoint. Each handler validates its request, opens a connection,
//! checks that the target database and collection exist, runs a single operation and
//! releases the connection on every exit path.

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::Uri,
};
use chrono::Utc;
use serde_json::{Map, Value, json};
use tracing::{debug, error, warn};

use docrelay::{
    backend::{Connector, StoreBackend},
    error::DocumentStoreError,
    store::DocumentStore,
};

use crate::{
    envelope::{ApiResponse, Envelope},
    error::{ApiError, ApiResult},
    json::{document_to_json, to_json},
    requests::{DeleteRequest, InsertRequest, ReadParams, UpdateItem, UpdateRequest},
};

/// Shared state of every handler: the connector that opens per-request connections.
#[derive(Debug)]
pub struct AppState<C: Connector> {
    connector: Arc<C>,
}

impl<C: Connector> AppState<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector: Arc::new(connector),
        }
    }

    async fn connect(&self) -> ApiResult<DocumentStore<C::Backend>> {
        Ok(DocumentStore::new(self.connector.connect().await?))
    }
}

impl<C: Connector> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            connector: Arc::clone(&self.connector),
        }
    }
}

/// Shuts the connection down and hands back the operation's result.
async fn release<B: StoreBackend, T>(
    store: DocumentStore<B>,
    operation: &'static str,
    result: ApiResult<T>,
) -> ApiResult<T> {
    if let Err(e) = store.shutdown().await {
        warn!(operation, error = %e, "Failed to release database connection");
    }

    if let Err(ApiError::Upstream(detail)) = &result {
        error!(operation, error = %detail, "Database operation failed");
    }

    result
}

/// `GET /read`
pub async fn read<C: Connector>(
    State(state): State<AppState<C>>,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> ApiResult<ApiResponse> {
    let Query(params) = params?;
    let params = ReadParams::from_pairs(params)?;
    let query = params.query()?;
    let namespace = &params.namespace;

    let store = state.connect().await?;
    let result = async {
        let documents = store
            .checked_collection(&namespace.db, &namespace.collection)
            .await?
            .find(query)
            .await?;

        debug!(db = %namespace.db, collection = %namespace.collection, found = documents.len(), "Read documents");

        Ok::<_, ApiError>(Value::Array(documents.iter().map(document_to_json).collect()))
    }
    .await;

    release(store, "read", result).await.map(ApiResponse::ok)
}

/// `POST /insert`
pub async fn insert<C: Connector>(
    State(state): State<AppState<C>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<ApiResponse> {
    let Json(body) = body?;
    let InsertRequest { namespace, items } = InsertRequest::parse(body)?;

    let store = state.connect().await?;
    let result = async {
        let ids = store
            .checked_collection(&namespace.db, &namespace.collection)
            .await?
            .insert(items)
            .await?;

        debug!(db = %namespace.db, collection = %namespace.collection, inserted = ids.len(), "Inserted documents");

        let inserted_ids = ids
            .iter()
            .enumerate()
            .map(|(index, id)| (index.to_string(), to_json(id)))
            .collect::<Map<_, _>>();

        Ok::<_, ApiError>(json!({
            "insertedCount": ids.len(),
            "insertedIds": inserted_ids,
        }))
    }
    .await;

    release(store, "insert", result).await.map(ApiResponse::created)
}

/// `POST /update`
///
/// Items are applied one at a time in input order. A failing item does not stop the batch;
/// earlier updates stay applied.
pub async fn update<C: Connector>(
    State(state): State<AppState<C>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<ApiResponse> {
    let Json(body) = body?;
    let UpdateRequest { namespace, items } = UpdateRequest::parse(body)?;

    let store = state.connect().await?;
    let result = async {
        let collection = store
            .checked_collection(&namespace.db, &namespace.collection)
            .await?;
        let mut results = Vec::with_capacity(items.len());

        for item in items {
            let envelope = match item {
                UpdateItem::Rejected(message) => Envelope::err(message),
                UpdateItem::Apply { id, fields } => match collection.update(id, fields).await {
                    Ok(outcome) if outcome.matched == 0 => {
                        Envelope::err(format!("No document found with id \"{id}\""))
                    }
                    Ok(outcome) => Envelope::ok(json!(outcome)),
                    Err(e) => Envelope::err(item_failure(e)),
                },
            };

            if !envelope.is_ok() {
                warn!(db = %namespace.db, collection = %namespace.collection, reason = %envelope.message, "Update item failed");
            }

            results.push(envelope);
        }

        serde_json::to_value(results).map_err(|e| ApiError::Upstream(e.to_string()))
    }
    .await;

    release(store, "update", result).await.map(ApiResponse::ok)
}

/// `POST /delete`
pub async fn delete<C: Connector>(
    State(state): State<AppState<C>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<ApiResponse> {
    let Json(body) = body?;
    let DeleteRequest { namespace, selector } = DeleteRequest::parse(body)?;

    let store = state.connect().await?;
    let result = async {
        let deleted = store
            .checked_collection(&namespace.db, &namespace.collection)
            .await?
            .delete(selector.filter())
            .await?;

        debug!(db = %namespace.db, collection = %namespace.collection, deleted, "Deleted documents");

        Ok::<_, ApiError>(json!({ "deletedCount": deleted }))
    }
    .await;

    release(store, "delete", result).await.map(ApiResponse::ok)
}

/// `GET /health`; does not touch the database.
pub async fn health() -> ApiResponse {
    ApiResponse::ok(json!({ "timestamp": Utc::now().to_rfc3339() }))
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}

/// The message of a failed update item: the driver's own message for upstream failures.
fn item_failure(err: DocumentStoreError) -> String {
    match ApiError::from(err) {
        ApiError::Upstream(detail) => detail,
        other => other.to_string(),
    }
}
