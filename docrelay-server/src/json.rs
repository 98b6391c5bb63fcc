//! Conversion between request/response JSON and stored BSON.
//!
//! Stored documents are rendered the way clients of the service expect to read them:
//! object ids become their hex string and dates become RFC 3339 strings. Other
//! non-JSON types fall back to their extended JSON form.

use bson::{Bson, Document, ser::serialize_to_bson};
use serde_json::{Map, Number, Value};

use crate::error::{ApiError, ApiResult};

/// Renders a BSON value as JSON.
pub fn to_json(bson: &Bson) -> Value {
    match bson {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(value) => Value::Bool(*value),
        Bson::Int32(value) => Value::from(*value),
        Bson::Int64(value) => Value::from(*value),
        Bson::Double(value) => Number::from_f64(*value).map_or(Value::Null, Value::Number),
        Bson::String(value) => Value::String(value.clone()),
        Bson::ObjectId(id) => Value::String(id.to_hex()),
        Bson::DateTime(datetime) => Value::String(datetime.to_chrono().to_rfc3339()),
        Bson::Array(values) => Value::Array(values.iter().map(to_json).collect()),
        Bson::Document(document) => document_to_json(document),
        other => serde_json::to_value(other).unwrap_or(Value::Null),
    }
}

/// Renders a document as a JSON object.
pub fn document_to_json(document: &Document) -> Value {
    Value::Object(
        document
            .iter()
            .map(|(key, value)| (key.clone(), to_json(value)))
            .collect::<Map<_, _>>()
    )
}

/// Converts a JSON object from a request body into a document.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] with `message` when `value` is not an object.
pub fn to_document(value: &Value, message: &str) -> ApiResult<Document> {
    if !value.is_object() {
        return Err(ApiError::Validation(message.to_string()));
    }

    match serialize_to_bson(value) {
        Ok(Bson::Document(document)) => Ok(document),
        Ok(_) => Err(ApiError::Validation(message.to_string())),
        Err(e) => Err(ApiError::Validation(e.to_string())),
    }
}

/// Converts a single JSON value into BSON.
pub fn to_bson(value: &Value) -> ApiResult<Bson> {
    serialize_to_bson(value).map_err(|e| ApiError::Validation(e.to_string()))
}
