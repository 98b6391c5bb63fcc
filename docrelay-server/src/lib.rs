//! HTTP front end of docrelay.
//!
//! Serves four endpoints that relay CRUD requests to a document database:
//!
//! - `GET /read?db=&collection=&fields=&<filter>=<value>...`
//! - `POST /insert` with `{db, collection, items}`
//! - `POST /update` with `{db, collection, items: [{id, ...fields}]}`
//! - `POST /delete` with `{db, collection}` plus `ids`, `deleteAll`, `trxndate` or `match`
//!
//! Every response uses the [`envelope::Envelope`] shape.

pub mod config;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod json;
pub mod requests;
pub mod server;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use handlers::AppState;
pub use server::{DocRelayServer, router};
