use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Application status codes carried in the envelope's `code` field
pub mod codes {
    pub const SUCCESS: i32 = 0;
    pub const BAD_REQUEST: i32 = 400;
    pub const LOGIN_FAIL: i32 = 401;
}

pub const LOGIN_FAIL: &str = "LOGIN_FAIL";

/// Fixed-shape body returned by every endpoint.
///
/// The HTTP status is always 200; clients branch on `code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub code: i32,
    pub message: Option<String>,
    pub data: Option<Value>,
}

impl Envelope {
    pub fn success(data: Value) -> Self {
        Self {
            code: codes::SUCCESS,
            message: None,
            data: Some(data),
        }
    }

    pub fn failure(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
            data: None,
        }
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
