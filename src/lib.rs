// Copyright (c), Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde_json::json;
use std::fmt;

pub mod apps {
    #[cfg(feature = "soap-notes")]
    #[path = "soap-notes/mod.rs"]
    pub mod soap_notes;
}

pub mod app {
    #[cfg(feature = "soap-notes")]
    pub use crate::apps::soap_notes::*;
}

pub mod common;
pub mod config;

/// App state shared by every handler.
pub struct AppState {
    /// LLM client used to turn clinical text into SOAP fields
    #[cfg(feature = "soap-notes")]
    pub llm: app::SoapLlmService,
    /// Speech-to-text client for voice input
    #[cfg(feature = "soap-notes")]
    pub transcriber: app::TranscriptionService,
    /// Upper bound on uploaded audio, in bytes
    pub max_audio_bytes: usize,
}

/// Implement IntoResponse for SoapError.
impl IntoResponse for SoapError {
    fn into_response(self) -> Response {
        let status = match &self {
            SoapError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            SoapError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            SoapError::Authentication(_) => StatusCode::BAD_GATEWAY,
            SoapError::Upstream(_) => StatusCode::BAD_GATEWAY,
            SoapError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SoapError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}

/// Service errors enum.
#[derive(Debug)]
pub enum SoapError {
    /// Request was rejected before any upstream call
    InvalidInput(String),
    PayloadTooLarge(String),
    /// Upstream refused our credentials
    Authentication(String),
    /// Upstream model or transcription API failed
    Upstream(String),
    Render(String),
    Config(String),
}

impl fmt::Display for SoapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoapError::InvalidInput(e) => write!(f, "{e}"),
            SoapError::PayloadTooLarge(e) => write!(f, "{e}"),
            SoapError::Authentication(e) => write!(f, "Authentication failed: {e}"),
            SoapError::Upstream(e) => write!(f, "Upstream error: {e}"),
            SoapError::Render(e) => write!(f, "PDF render error: {e}"),
            SoapError::Config(e) => write!(f, "Config error: {e}"),
        }
    }
}

impl std::error::Error for SoapError {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        let resp = SoapError::InvalidInput("empty".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = SoapError::Authentication("401".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let resp = SoapError::PayloadTooLarge("big".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            SoapError::Upstream("timeout".to_string()).to_string(),
            "Upstream error: timeout"
        );
        assert_eq!(SoapError::InvalidInput("no text".to_string()).to_string(), "no text");
    }
}
