// Copyright (c), Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::SoapError;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Response for the ping endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct PingResponse {
    pub message: String,
}

/// Liveness check.
pub async fn ping() -> Json<PingResponse> {
    debug!("Ping received");
    Json(PingResponse {
        message: "pong".to_string(),
    })
}

/// Milliseconds since the unix epoch.
pub fn current_timestamp_ms() -> Result<u64, SoapError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| SoapError::Config(format!("Failed to get current timestamp: {e}")))?
        .as_millis() as u64)
}

/// Masked form of an API key that is safe to put in logs, e.g. `sk-****a1b2c3`.
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 6 {
        return "sk-****".to_string();
    }
    let tail: String = chars[chars.len() - 6..].iter().collect();
    format!("sk-****{tail}")
}

/// Make a string usable as one component of a download file name.
pub fn sanitize_file_component(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            ' ' => '_',
            c if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') => c,
            _ => '_',
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mask_api_key() {
        assert_eq!(mask_api_key("sk-proj-abcdef123456"), "sk-****123456");
        assert_eq!(mask_api_key("short"), "sk-****");
        assert!(!mask_api_key("sk-secretsecretsecret").contains("secretsecret"));
    }

    #[test]
    fn test_sanitize_file_component() {
        assert_eq!(sanitize_file_component("Demo Patient"), "Demo_Patient");
        assert_eq!(sanitize_file_component(" Budi/Santoso "), "Budi_Santoso");
        assert_eq!(sanitize_file_component("O'Neil"), "O_Neil");
    }

    #[tokio::test]
    async fn test_ping() {
        let Json(resp) = ping().await;
        assert_eq!(resp.message, "pong");
    }
}
