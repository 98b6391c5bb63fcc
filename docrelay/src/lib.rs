//! Main docrelay crate providing a unified interface to the document relay.
//!
//! This crate is the primary entry point for users of docrelay. It re-exports the core
//! types from the sub-crates and gives convenient access to the storage backends.
//!
//! # Features
//!
//! - **Request translation** - Query-string filters and field lists become store queries
//! - **Multiple backends** - In-memory and MongoDB connectors behind one trait
//! - **Namespace checks** - Collections are only handed out once their database and
//!   collection are known to exist
//!
//! # Quick Start
//!
//! ```ignore
//! use docrelay::{prelude::*, memory::InMemoryStore, bson::doc};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connector = InMemoryStore::builder()
//!         .with_collection("sample_mflix", "movies")
//!         .build()
//!         .await?;
//!
//!     let store = DocumentStore::new(connector.connect().await?);
//!     let movies = store.checked_collection("sample_mflix", "movies").await?;
//!
//!     movies.insert(vec![doc! { "title": "The Matrix", "year": 1999 }]).await?;
//!
//!     let found = movies
//!         .find(
//!             Query::builder()
//!                 .maybe_filter(filter::translate([("title", "matrix"), ("year", "gte1990")])?)
//!                 .projection(Projection::parse(Some("title")))
//!                 .build(),
//!         )
//!         .await?;
//!
//!     println!("Found movies: {:?}", found);
//!
//!     store.shutdown().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`mongodb`] - MongoDB backend (requires `mongodb` feature)

pub mod prelude;

pub use docrelay_core::{backend, collection, error, filter, identity, projection, query, store};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docrelay_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docrelay_mongodb::{MongoDbStore, MongoDbConnector, MongoDbConnectorBuilder};
}
