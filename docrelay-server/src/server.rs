//! # HTTP Server
//!
//! Routes the endpoints to their handlers and runs the listener.

use axum::{
    Router,
    routing::{get, post},
};
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use docrelay::backend::Connector;

use crate::{
    config::ServerConfig,
    handlers::{AppState, delete, health, insert, method_not_allowed, not_found, read, update},
};

/// Builds the router serving every endpoint against `state`.
///
/// Wrong verbs on a known path get a `405` envelope; unknown paths a `404` envelope.
pub fn router<C: Connector>(state: AppState<C>) -> Router {
    Router::new()
        .route("/health", get(health).fallback(method_not_allowed))
        .route("/read", get(read::<C>).fallback(method_not_allowed))
        .route("/insert", post(insert::<C>).fallback(method_not_allowed))
        .route("/update", post(update::<C>).fallback(method_not_allowed))
        .route("/delete", post(delete::<C>).fallback(method_not_allowed))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// HTTP server relaying requests to the database behind `C`
pub struct DocRelayServer<C: Connector> {
    config: ServerConfig,
    state: AppState<C>,
}

impl<C: Connector> DocRelayServer<C> {
    pub fn new(config: ServerConfig, connector: C) -> Self {
        Self {
            config,
            state: AppState::new(connector),
        }
    }

    /// Get the router (for testing)
    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Serves requests until Ctrl+C or SIGTERM.
    pub async fn run(self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.socket_addr()).await?;

        info!("docrelay listening on {}", listener.local_addr()?);
        info!("  GET  /read   - Find documents");
        info!("  POST /insert - Insert documents");
        info!("  POST /update - Update documents by id");
        info!("  POST /delete - Delete documents");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received terminate signal, shutting down..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode, header::CONTENT_TYPE},
    };
    use async_trait::async_trait;
    use bson::{Bson, Document, doc, oid::ObjectId};
    use docrelay::{
        backend::{ConnectorBuilder, StoreBackend, UpdateOutcome},
        error::{DocumentStoreError, DocumentStoreResult},
        memory::InMemoryStore,
        query::{Expr, Query},
    };
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use tower::ServiceExt;

    const DB: &str = "sample_mflix";

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::builder()
            .with_collection(DB, "users")
            .with_collection(DB, "cars")
            .with_collection(DB, "transactions")
            .build()
            .await
            .unwrap();

        store
            .insert_documents(DB, "users", vec![
                doc! { "name": "John Smith", "email": "john@example.com", "age": 30, "active": true },
                doc! { "name": "Johnny Walker", "email": "johnny@example.com", "age": 17, "active": false },
                doc! { "name": "Alice", "email": "alice@example.com", "age": 45, "active": true },
            ])
            .await
            .unwrap();

        store
            .insert_documents(DB, "cars", vec![
                doc! { "model": "Aurora", "benefits": [{ "feature": "Cooling System" }, { "feature": "ABS" }] },
                doc! { "model": "Borealis", "benefits": [{ "feature": "Heated seats" }] },
            ])
            .await
            .unwrap();

        store
            .insert_documents(DB, "transactions", vec![
                doc! { "trxndate": "2024-01-01", "branch": "north" },
                doc! { "trxndate": "2024-01-01", "branch": "south" },
                doc! { "trxndate": "2024-01-02", "branch": "north" },
            ])
            .await
            .unwrap();

        store
    }

    /// Which backend call fails with a driver error.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Outage {
        None,
        Listing,
        Finding,
    }

    /// Connector over an in-memory store that counts released connections.
    #[derive(Debug, Clone)]
    struct CountingConnector {
        store: InMemoryStore,
        outage: Outage,
        releases: Arc<AtomicUsize>,
    }

    impl CountingConnector {
        fn new(store: &InMemoryStore, outage: Outage) -> Self {
            Self {
                store: store.clone(),
                outage,
                releases: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn releases(&self) -> usize {
            self.releases.load(Ordering::SeqCst)
        }
    }

    #[derive(Debug)]
    struct CountingBackend {
        store: InMemoryStore,
        outage: Outage,
        releases: Arc<AtomicUsize>,
    }

    impl CountingBackend {
        fn fail_on(&self, outage: Outage) -> DocumentStoreResult<()> {
            if self.outage == outage {
                return Err(DocumentStoreError::Backend("connection reset".into()));
            }

            Ok(())
        }
    }

    #[async_trait]
    impl StoreBackend for CountingBackend {
        async fn list_databases(&self) -> DocumentStoreResult<Vec<String>> {
            self.fail_on(Outage::Listing)?;
            self.store.list_databases().await
        }

        async fn list_collections(&self, database: &str) -> DocumentStoreResult<Vec<String>> {
            self.store.list_collections(database).await
        }

        async fn insert_documents(
            &self,
            database: &str,
            collection: &str,
            documents: Vec<Document>,
        ) -> DocumentStoreResult<Vec<Bson>> {
            self.store.insert_documents(database, collection, documents).await
        }

        async fn query_documents(
            &self,
            database: &str,
            collection: &str,
            query: Query,
        ) -> DocumentStoreResult<Vec<Document>> {
            self.fail_on(Outage::Finding)?;
            self.store.query_documents(database, collection, query).await
        }

        async fn update_document(
            &self,
            database: &str,
            collection: &str,
            id: ObjectId,
            fields: Document,
        ) -> DocumentStoreResult<UpdateOutcome> {
            self.store.update_document(database, collection, id, fields).await
        }

        async fn delete_documents(
            &self,
            database: &str,
            collection: &str,
            filter: Option<Expr>,
        ) -> DocumentStoreResult<u64> {
            self.store.delete_documents(database, collection, filter).await
        }

        async fn shutdown(self) -> DocumentStoreResult<()> {
            self.releases.fetch_add(1, Ordering::SeqCst);

            Ok(())
        }
    }

    #[async_trait]
    impl Connector for CountingConnector {
        type Backend = CountingBackend;

        async fn connect(&self) -> DocumentStoreResult<Self::Backend> {
            Ok(CountingBackend {
                store: self.store.clone(),
                outage: self.outage,
                releases: Arc::clone(&self.releases),
            })
        }
    }

    async fn send(store: &InMemoryStore, request: Request<Body>) -> (StatusCode, Value) {
        send_to(store.clone(), request).await
    }

    async fn send_to<C: Connector>(connector: C, request: Request<Body>) -> (StatusCode, Value) {
        let response = router(AppState::new(connector))
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        (status, serde_json::from_slice(&body).unwrap())
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn post_request(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn names(data: &Value) -> Vec<&str> {
        data.as_array()
            .unwrap()
            .iter()
            .map(|document| document["name"].as_str().unwrap())
            .collect()
    }

    async fn user_ids(store: &InMemoryStore) -> Vec<String> {
        store
            .documents(DB, "users")
            .await
            .iter()
            .map(|user| user.get_object_id("_id").unwrap().to_hex())
            .collect()
    }

    #[tokio::test]
    async fn read_matches_substrings_case_insensitively() {
        let store = seeded().await;
        let (status, body) = send(&store, get_request("/read?db=sample_mflix&collection=users&name=JOHN")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["message"], "Success");
        assert_eq!(body["error"], json!({}));
        assert_eq!(names(&body["data"]), vec!["John Smith", "Johnny Walker"]);
    }

    #[tokio::test]
    async fn read_applies_ranges_exact_numbers_and_booleans() {
        let store = seeded().await;

        let (_, body) = send(&store, get_request("/read?db=sample_mflix&collection=users&age=gte18&active=true")).await;
        assert_eq!(names(&body["data"]), vec!["John Smith", "Alice"]);

        let (_, body) = send(&store, get_request("/read?db=sample_mflix&collection=users&age=%3E%3D40")).await;
        assert_eq!(names(&body["data"]), vec!["Alice"]);

        let (_, body) = send(&store, get_request("/read?db=sample_mflix&collection=users&age=lte30")).await;
        assert_eq!(names(&body["data"]), vec!["John Smith", "Johnny Walker"]);

        let (_, body) = send(&store, get_request("/read?db=sample_mflix&collection=users&age=17")).await;
        assert_eq!(names(&body["data"]), vec!["Johnny Walker"]);
    }

    #[tokio::test]
    async fn read_matches_array_elements() {
        let store = seeded().await;
        let (status, body) = send(
            &store,
            get_request("/read?db=sample_mflix&collection=cars&benefits%5B%5D.feature=cooling%20system&fields=model"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);

        let cars = body["data"].as_array().unwrap();
        assert_eq!(cars.len(), 1);
        assert_eq!(cars[0]["model"], "Aurora");
    }

    #[tokio::test]
    async fn read_projects_requested_fields_and_identity() {
        let store = seeded().await;
        let (_, body) = send(&store, get_request("/read?db=sample_mflix&collection=users&fields=name,%20email")).await;

        for user in body["data"].as_array().unwrap() {
            let mut keys = user.as_object().unwrap().keys().cloned().collect::<Vec<_>>();
            keys.sort();

            assert_eq!(keys, vec!["_id", "email", "name"]);
            assert_eq!(user["_id"].as_str().unwrap().len(), 24);
        }
    }

    #[tokio::test]
    async fn read_rejects_missing_parameters_and_bad_bounds() {
        let store = seeded().await;

        let (status, body) = send(&store, get_request("/read?collection=users")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Missing \"db\" or \"collection\" parameter");
        assert_eq!(body["data"], json!({}));

        let (status, body) = send(&store, get_request("/read?db=sample_mflix&collection=users&age=gteten")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "err");
    }

    #[tokio::test]
    async fn insert_reports_count_and_identities() {
        let store = seeded().await;
        let (status, body) = send(
            &store,
            post_request("/insert", json!({
                "db": DB,
                "collection": "users",
                "items": [{ "name": "Ned" }, { "name": "Arya", "age": 11 }],
            })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["data"]["insertedCount"], 2);

        let stored = store.documents(DB, "users").await;
        let arya = stored.last().unwrap();

        assert_eq!(arya.get_str("name").unwrap(), "Arya");
        assert_eq!(body["data"]["insertedIds"]["1"], arya.get_object_id("_id").unwrap().to_hex());
        assert_eq!(stored.len(), 5);
    }

    #[tokio::test]
    async fn insert_rejects_empty_batches() {
        let store = seeded().await;
        let (status, body) = send(
            &store,
            post_request("/insert", json!({ "db": DB, "collection": "users", "items": [] })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "No valid items provided");
    }

    #[tokio::test]
    async fn update_reports_each_item() {
        let store = seeded().await;
        let ids = user_ids(&store).await;
        let (status, body) = send(
            &store,
            post_request("/update", json!({
                "db": DB,
                "collection": "users",
                "items": [
                    { "id": ids[0], "age": 31 },
                    { "id": "65a1b2c3d4e5f6a7b8c9d0e1", "age": 99 },
                    { "id": ids[2], "email": "alice@example.org" },
                ],
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);

        let statuses = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["status"].as_str().unwrap())
            .collect::<Vec<_>>();

        assert_eq!(statuses, vec!["ok", "err", "ok"]);
        assert_eq!(body["data"][0]["data"], json!({ "matchedCount": 1, "modifiedCount": 1 }));
        assert_eq!(body["data"][1]["message"], "No document found with id \"65a1b2c3d4e5f6a7b8c9d0e1\"");

        let users = store.documents(DB, "users").await;
        assert_eq!(users[0].get("age"), Some(&Bson::Int64(31)));
        assert_eq!(users[2].get_str("email").unwrap(), "alice@example.org");
    }

    #[tokio::test]
    async fn update_keeps_rejected_items_in_place() {
        let store = seeded().await;
        let ids = user_ids(&store).await;
        let (status, body) = send(
            &store,
            post_request("/update", json!({
                "db": DB,
                "collection": "users",
                "items": [{ "age": 1 }, { "id": ids[1], "age": 18 }],
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["message"], "Missing \"id\" in update object");
        assert_eq!(body["data"][1]["status"], "ok");
    }

    #[tokio::test]
    async fn delete_all_removes_every_document() {
        let store = seeded().await;
        let before = store.documents(DB, "users").await.len();
        let (status, body) = send(
            &store,
            post_request("/delete", json!({ "db": DB, "collection": "users", "deleteAll": "message2u" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["deletedCount"], before);
        assert!(store.documents(DB, "users").await.is_empty());
    }

    #[tokio::test]
    async fn delete_by_ids_skips_malformed_ones() {
        let store = seeded().await;
        let ids = user_ids(&store).await;
        let (status, body) = send(
            &store,
            post_request("/delete", json!({ "db": DB, "collection": "users", "ids": [ids[0], "not-an-id", ids[1]] })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["deletedCount"], 2);
        assert_eq!(store.documents(DB, "users").await.len(), 1);
    }

    #[tokio::test]
    async fn delete_by_transaction_date() {
        let store = seeded().await;
        let (_, body) = send(
            &store,
            post_request("/delete", json!({ "db": DB, "collection": "transactions", "trxndate": "2024-01-01" })),
        )
        .await;

        assert_eq!(body["data"]["deletedCount"], 2);

        let (_, body) = send(
            &store,
            post_request("/delete", json!({ "db": DB, "collection": "transactions", "match": { "branch": "north" } })),
        )
        .await;

        assert_eq!(body["data"]["deletedCount"], 1);
        assert!(store.documents(DB, "transactions").await.is_empty());
    }

    #[tokio::test]
    async fn missing_namespaces_are_named_for_every_handler() {
        let store = seeded().await;
        let id = "65a1b2c3d4e5f6a7b8c9d0e1";

        let requests = |db: &str, collection: &str| {
            vec![
                get_request(&format!("/read?db={db}&collection={collection}")),
                post_request("/insert", json!({ "db": db, "collection": collection, "items": [{ "a": 1 }] })),
                post_request("/update", json!({ "db": db, "collection": collection, "items": [{ "id": id, "a": 1 }] })),
                post_request("/delete", json!({ "db": db, "collection": collection, "ids": [id] })),
            ]
        };

        for request in requests("nope", "users") {
            let (status, body) = send(&store, request).await;

            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["message"], "Database \"nope\" not found");
        }

        for request in requests(DB, "nope") {
            let (status, body) = send(&store, request).await;

            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["message"], "Collection \"nope\" not found in database \"sample_mflix\"");
        }
    }

    #[tokio::test]
    async fn wrong_verbs_are_rejected_for_every_handler() {
        let store = seeded().await;
        let requests = vec![
            post_request("/read?db=sample_mflix&collection=users", json!({})),
            get_request("/insert"),
            get_request("/update"),
            get_request("/delete"),
        ];

        for request in requests {
            let (status, body) = send(&store, request).await;

            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(body, json!({ "status": "err", "message": "Method Not Allowed", "data": {}, "error": {} }));
        }
    }

    #[tokio::test]
    async fn malformed_bodies_are_bad_requests() {
        let store = seeded().await;
        let request = Request::builder()
            .method(Method::POST)
            .uri("/insert")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{ not json"))
            .unwrap();

        let (status, body) = send(&store, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "err");
    }

    #[tokio::test]
    async fn unknown_paths_and_health() {
        let store = seeded().await;

        let (status, body) = send(&store, get_request("/nowhere")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Not Found");
        assert_eq!(body["error"], "No route for /nowhere");

        let (status, body) = send(&store, get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn connections_are_released_after_every_request() {
        let store = seeded().await;
        let connector = CountingConnector::new(&store, Outage::None);
        let id = user_ids(&store).await.remove(0);

        let requests = vec![
            (get_request("/read?db=sample_mflix&collection=users&name=alice"), StatusCode::OK),
            (post_request("/insert", json!({ "db": DB, "collection": "cars", "items": [{ "model": "Nova" }] })), StatusCode::CREATED),
            (post_request("/update", json!({ "db": DB, "collection": "users", "items": [{ "id": id, "age": 31 }] })), StatusCode::OK),
            (post_request("/delete", json!({ "db": DB, "collection": "cars", "match": { "model": "Nova" } })), StatusCode::OK),
            (get_request("/read?db=nope&collection=users"), StatusCode::NOT_FOUND),
            (post_request("/delete", json!({ "db": DB, "collection": "nope", "deleteAll": "message2u" })), StatusCode::NOT_FOUND),
        ];

        for (expected, (request, code)) in requests.into_iter().enumerate() {
            let (status, _) = send_to(connector.clone(), request).await;

            assert_eq!(status, code);
            assert_eq!(connector.releases(), expected + 1);
        }
    }

    #[tokio::test]
    async fn invalid_requests_never_connect() {
        let store = seeded().await;
        let connector = CountingConnector::new(&store, Outage::None);

        let (status, _) = send_to(connector.clone(), get_request("/read?db=sample_mflix")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send_to(connector.clone(), post_request("/insert", json!({ "db": DB, "collection": "users", "items": [] }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(connector.releases(), 0);
    }

    #[tokio::test]
    async fn driver_failures_are_reported_and_released() {
        let store = seeded().await;
        let failure = json!({ "status": "err", "message": "Fail", "data": {}, "error": "connection reset" });

        let connector = CountingConnector::new(&store, Outage::Listing);
        let (status, body) = send_to(
            connector.clone(),
            post_request("/delete", json!({ "db": DB, "collection": "users", "deleteAll": "message2u" })),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, failure);
        assert_eq!(connector.releases(), 1);
        assert_eq!(store.documents(DB, "users").await.len(), 3);

        let connector = CountingConnector::new(&store, Outage::Finding);
        let (status, body) = send_to(connector.clone(), get_request("/read?db=sample_mflix&collection=users")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, failure);
        assert_eq!(connector.releases(), 1);
    }

    #[tokio::test]
    async fn operator_shaped_values_only_match_literally() {
        let store = seeded().await;

        let (status, body) = send(
            &store,
            post_request("/delete", json!({ "db": DB, "collection": "transactions", "trxndate": { "$exists": true } })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["deletedCount"], 0);

        let (status, _) = send(
            &store,
            post_request("/delete", json!({ "db": DB, "collection": "transactions", "match": { "$where": "true" } })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(store.documents(DB, "transactions").await.len(), 3);
    }
}
