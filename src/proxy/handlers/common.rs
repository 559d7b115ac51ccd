use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::proxy::upstream::UpstreamError;

/// OpenAI-style error document
pub fn error_body(status: u16, message: &str) -> Value {
    json!({
        "error": {
            "message": message,
            "type": "upstream_error",
            "code": status
        }
    })
}

pub fn error_response(status: u16, message: &str) -> Response {
    let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (code, Json(error_body(code.as_u16(), message))).into_response()
}

impl IntoResponse for UpstreamError {
    fn into_response(self) -> Response {
        error_response(self.status_code(), &self.to_string())
    }
}

/// Short id used to correlate the log lines of one request
pub fn new_trace_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}
