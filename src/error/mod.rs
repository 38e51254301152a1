//! Error handling module

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Failures talking to the upstream GET Nano API.
///
/// Constructed at the lowest layer that detects the failure and carried
/// upward as data; no operation lets a transport error escape as a panic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP {0}")]
    UpstreamHttp(u16),

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("{0} not connected")]
    DeviceNotConnected(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            // Connect failures, DNS errors and other transport faults all
            // surface to callers as connection errors.
            ClientError::Connection(e.to_string())
        }
    }
}

/// Errors at the gateway HTTP boundary
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Upstream(#[from] ClientError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Upstream(e) => {
                let status = match e {
                    ClientError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                    // Upstream 404s (unknown device, missing log file) pass through
                    ClientError::UpstreamHttp(404) => StatusCode::NOT_FOUND,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (status, e.to_string())
            }
        };

        let body = Json(serde_json::json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
