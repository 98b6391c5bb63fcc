use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Bson, Document, doc, oid::ObjectId};
use mongodb::{
    Client, Collection as MongoCollection,
    options::{ClientOptions, FindOptions},
};
use docrelay_core::{
    backend::{Connector, ConnectorBuilder, StoreBackend, UpdateOutcome},
    error::{DocumentStoreError, DocumentStoreResult},
    identity::ID_FIELD,
    query::{Expr, Query, QueryVisitor},
};

use crate::query::MongoQueryTranslator;


/// A live connection to a MongoDB deployment.
#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
}

impl MongoDbStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn get_collection(&self, database: &str, collection: &str) -> MongoCollection<Document> {
        self.client
            .database(database)
            .collection(collection)
    }

    fn translate_filter(&self, filter: Option<&Expr>) -> DocumentStoreResult<Document> {
        match filter {
            Some(expr) => MongoQueryTranslator.visit_expr(expr),
            None => Ok(doc! {}),
        }
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn list_databases(&self) -> DocumentStoreResult<Vec<String>> {
        self.client
            .list_database_names()
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))
    }

    async fn list_collections(&self, database: &str) -> DocumentStoreResult<Vec<String>> {
        self.client
            .database(database)
            .list_collection_names()
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))
    }

    async fn insert_documents(
        &self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> DocumentStoreResult<Vec<Bson>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let mut inserted = self.get_collection(database, collection)
            .insert_many(documents)
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))?
            .inserted_ids
            .into_iter()
            .collect::<Vec<(usize, Bson)>>();

        inserted.sort_by_key(|(index, _)| *index);

        Ok(inserted.into_iter().map(|(_, id)| id).collect())
    }

    async fn query_documents(
        &self,
        database: &str,
        collection: &str,
        query: Query,
    ) -> DocumentStoreResult<Vec<Document>> {
        let mut options = FindOptions::default();

        if !query.projection.is_empty() {
            options.projection = Some(query.projection.to_document());
        }

        self.get_collection(database, collection)
            .find(self.translate_filter(query.filter.as_ref())?)
            .with_options(options)
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))
    }

    async fn update_document(
        &self,
        database: &str,
        collection: &str,
        id: ObjectId,
        fields: Document,
    ) -> DocumentStoreResult<UpdateOutcome> {
        let result = self.get_collection(database, collection)
            .update_one(
                doc! { ID_FIELD: id },
                doc! { "$set": fields },
            )
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))?;

        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete_documents(
        &self,
        database: &str,
        collection: &str,
        filter: Option<Expr>,
    ) -> DocumentStoreResult<u64> {
        Ok(
            self.get_collection(database, collection)
                .delete_many(self.translate_filter(filter.as_ref())?)
                .await
                .map_err(|e| DocumentStoreError::Backend(e.to_string()))?
                .deleted_count
        )
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.shutdown().await
    }
}

/// Opens a fresh MongoDB client for every request.
#[derive(Debug, Clone)]
pub struct MongoDbConnector {
    options: ClientOptions,
}

impl MongoDbConnector {
    pub fn new(options: ClientOptions) -> Self {
        Self { options }
    }

    pub fn builder(dsn: &str) -> MongoDbConnectorBuilder {
        MongoDbConnectorBuilder::new(dsn)
    }
}

#[async_trait]
impl Connector for MongoDbConnector {
    type Backend = MongoDbStore;

    async fn connect(&self) -> DocumentStoreResult<Self::Backend> {
        Ok(MongoDbStore::new(
            Client::with_options(self.options.clone())
                .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
        ))
    }
}

pub struct MongoDbConnectorBuilder {
    dsn: String,
    app_name: Option<String>,
}

impl MongoDbConnectorBuilder {
    pub fn new(dsn: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            app_name: None,
        }
    }

    /// Name reported to the server in the connection handshake.
    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }
}

#[async_trait]
impl ConnectorBuilder for MongoDbConnectorBuilder {
    type Connector = MongoDbConnector;

    async fn build(self) -> DocumentStoreResult<Self::Connector> {
        let mut options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        if let Some(app_name) = self.app_name {
            options.app_name = Some(app_name);
        }

        Ok(MongoDbConnector::new(options))
    }
}
