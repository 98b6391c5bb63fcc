//! Convenient re-exports of commonly used types from docrelay.
//!
//! ```ignore
//! use docrelay::prelude::*;
//! ```

pub use docrelay_core::{
    collection::Collection,
    store::DocumentStore,
    backend::{StoreBackend, Connector, ConnectorBuilder, UpdateOutcome},
    query::{Query, QueryVisitor, Expr, FieldOp, QueryBuilder, Filter},
    projection::Projection,
    identity::{ID_FIELD, ParsedIds, parse_id, parse_ids},
    filter,
    error::{DocumentStoreError, DocumentStoreResult},
};
