//! In-memory document storage backend for docrelay.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` and
//! `Connector` traits. It uses async-aware read-write locks for concurrent access and is
//! meant for development and for exercising the request handlers without a database server.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Databases and collections** - Namespaces are listed just like on a hosted server
//! - **Full filter support** - Patterns, numeric bounds, element matches and dotted paths
//! - **Projections** - Inclusion projections that always keep the identity field
//!
//! # Quick Start
//!
//! ```ignore
//! use docrelay_memory::InMemoryStore;
//! use docrelay_core::{backend::ConnectorBuilder, store::DocumentStore};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connector = InMemoryStore::builder()
//!         .with_collection("sample_mflix", "users")
//!         .build()
//!         .await?;
//!
//!     let store = DocumentStore::new(connector.connect().await?);
//!     let users = store.checked_collection("sample_mflix", "users").await?;
//!     users.insert(vec![doc! { "name": "Alice" }]).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrelay_memory;

pub mod store;
pub mod evaluator;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
