//! Core of the docrelay project: the pieces that turn loosely-typed HTTP requests into
//! document database operations.
//!
//! This crate provides:
//!
//! - **Error handling** ([`error`]) - Error and result types shared by every crate
//! - **Query AST** ([`query`]) - Backend-neutral filter expressions and find queries
//! - **Filter translation** ([`filter`]) - Query-string parameters to filter expressions
//! - **Projections** ([`projection`]) - Comma-separated field lists to inclusion documents
//! - **Identities** ([`identity`]) - Parsing of document identity strings
//! - **Store backend abstraction** ([`backend`]) - Traits implemented by concrete databases
//! - **Document store** ([`store`]) and **collections** ([`collection`]) - Existence-checked
//!   access to a namespace
//!
//! # Example
//!
//! ```ignore
//! use docrelay_core::{filter, projection::Projection, query::Query, store::DocumentStore};
//!
//! let query = Query::builder()
//!     .maybe_filter(filter::translate([("name", "john"), ("year", "gte1999")])?)
//!     .projection(Projection::parse(Some("name,year")))
//!     .build();
//!
//! let store = DocumentStore::new(connector.connect().await?);
//! let users = store.checked_collection("sample_mflix", "users").await?;
//! let found = users.find(query).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrelay_core;

pub mod backend;
pub mod collection;
pub mod error;
pub mod filter;
pub mod identity;
pub mod projection;
pub mod query;
pub mod store;
