//! Common error type and alias.
//!
//! Every failure the generation flow can hit is a variant here. `kind()`
//! collapses them into the coarse [`ErrorKind`] reported to callers, and
//! `status_code()` picks the HTTP status the local API answers with.
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::types::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Bad prompt or request shape, rejected before any network call.
    #[error("{0}")]
    Validation(String),

    #[error("Authentication failed. Please check API configuration.")]
    UpstreamAuth,

    #[error("Rate limit exceeded. Please try again in a moment.")]
    RateLimited,

    #[error("Image generation timed out after {0:?}. Please try again with a simpler prompt.")]
    Timeout(Duration),

    /// The upstream answered but nothing in it looked like an image.
    #[error("No image data received from API: {0}")]
    UpstreamFormat(String),

    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::UpstreamAuth => ErrorKind::Auth,
            Self::RateLimited => ErrorKind::RateLimit,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::UpstreamFormat(_) => ErrorKind::NoImageData,
            Self::HttpClient(e) if e.is_timeout() => ErrorKind::Timeout,
            Self::Upstream { .. }
            | Self::HttpClient(_)
            | Self::Json(_)
            | Self::Io(_)
            | Self::Storage(_) => ErrorKind::Upstream,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
