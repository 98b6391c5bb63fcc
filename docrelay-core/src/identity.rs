//! Document identity values.
//!
//! Documents are addressed by their `_id`, a BSON [`ObjectId`]. Requests carry identities
//! as hex strings; these helpers turn them into object ids and keep track of the ones that
//! could not be converted.

use bson::oid::ObjectId;
use serde_json::Value;

/// The name of the identity field of every stored document.
pub const ID_FIELD: &str = "_id";

/// Parses a single identity string into an [`ObjectId`].
///
/// Surrounding whitespace is ignored. Returns `None` for anything that is not a
/// 24-digit hex string.
pub fn parse_id(raw: &str) -> Option<ObjectId> {
    ObjectId::parse_str(raw.trim()).ok()
}

/// The outcome of converting a list of raw identities.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParsedIds {
    /// Identities that converted cleanly, in input order.
    pub valid: Vec<ObjectId>,
    /// Raw values that were dropped, rendered as text.
    pub rejected: Vec<String>,
}

/// Converts raw JSON values into object ids, partitioning out the malformed ones.
///
/// Non-string values are rejected along with strings that fail to parse.
pub fn parse_ids<'a>(raw: impl IntoIterator<Item = &'a Value>) -> ParsedIds {
    let mut parsed = ParsedIds::default();

    for value in raw {
        match value.as_str().and_then(parse_id) {
            Some(id) => parsed.valid.push(id),
            None => parsed.rejected.push(match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
        }
    }

    parsed
}
