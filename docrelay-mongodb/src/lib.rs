//! MongoDB backend implementation for docrelay.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` and `Connector`
//! traits. Every request opens its own client from the parsed connection options and shuts
//! it down when the request completes.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docrelay = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Features
//!
//! - **Hosted storage** - Works against MongoDB Atlas or self-hosted MongoDB
//! - **Native filters** - Filter expressions are translated to MongoDB filter documents
//! - **Async/await** - Fully asynchronous API built on MongoDB's async driver
//!
//! # Example
//!
//! ```ignore
//! use docrelay::{backend::{Connector, ConnectorBuilder}, mongodb::MongoDbConnector};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connector = MongoDbConnector::builder("mongodb://localhost:27017")
//!         .app_name("docrelay")
//!         .build()
//!         .await?;
//!
//!     let backend = connector.connect().await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrelay_mongodb;

pub mod store;
pub mod query;

pub use store::{MongoDbStore, MongoDbConnector, MongoDbConnectorBuilder};
