//! The response envelope shared by every endpoint.
//!
//! Every body the server writes has the same four fields:
//!
//! ```json
//! { "status": "ok", "message": "Success", "data": [...], "error": {} }
//! ```
//!
//! `status` is `"ok"` exactly when the HTTP code is 2xx. On success `error` is `{}`; on
//! failure `data` is `{}` and `error` is either `{}` or the upstream error message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Map, Value};

pub const SUCCESS: &str = "Success";

/// Outcome marker carried by every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Err,
}

/// Uniform `{status, message, data, error}` response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub status: Status,
    pub message: String,
    pub data: Value,
    pub error: Value,
}

impl Envelope {
    /// A successful envelope carrying `data`.
    pub fn ok(data: Value) -> Self {
        Self {
            status: Status::Ok,
            message: SUCCESS.to_string(),
            data,
            error: empty(),
        }
    }

    /// A failed envelope with an empty `error` object.
    pub fn err(message: impl Into<String>) -> Self {
        Self::err_with(message, empty())
    }

    /// A failed envelope carrying error details.
    pub fn err_with(message: impl Into<String>, error: Value) -> Self {
        Self {
            status: Status::Err,
            message: message.into(),
            data: empty(),
            error,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

/// A successful response: a 2xx code plus an `ok` envelope.
#[derive(Debug)]
pub struct ApiResponse {
    code: StatusCode,
    envelope: Envelope,
}

impl ApiResponse {
    /// `200 OK` with `data`.
    pub fn ok(data: Value) -> Self {
        Self {
            code: StatusCode::OK,
            envelope: Envelope::ok(data),
        }
    }

    /// `201 Created` with `data`.
    pub fn created(data: Value) -> Self {
        Self {
            code: StatusCode::CREATED,
            envelope: Envelope::ok(data),
        }
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (self.code, Json(self.envelope)).into_response()
    }
}

fn empty() -> Value {
    Value::Object(Map::new())
}
