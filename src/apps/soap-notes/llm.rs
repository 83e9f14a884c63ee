// Copyright (c), Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

// SOAP note builder using an OpenAI-compatible chat-completions API.
// Works against api.openai.com, OpenRouter or any compatible gateway.

use super::extract::{extract_soap, Extraction};
use crate::SoapError;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

pub use crate::config::LlmConfig;

// ============================================
// Prompts
// ============================================

const SOAP_SYSTEM_PROMPT: &str = "You are a medical documentation assistant. \
Return ONLY valid JSON with exactly these keys: Subjective, Objective, Assessment, Plan. \
Each value is a string. Be concise and clinical. Do not add fabricated data; \
leave a field empty when the text says nothing about it.";

fn user_prompt(text: &str, language: Option<&str>) -> String {
    let mut prompt = format!(
        "Map the following clinical text into SOAP. Reply with ONLY valid JSON.\n\nText:\n\"\"\" {} \"\"\"",
        text.trim()
    );
    if let Some(lang) = language.map(str::trim).filter(|l| !l.is_empty()) {
        prompt.push_str(&format!("\n\nWrite the field values in {lang}."));
    }
    prompt
}

/// Chat-completions request body for one SOAP conversion.
pub fn build_request_body(config: &LlmConfig, text: &str, language: Option<&str>) -> Value {
    json!({
        "model": config.model,
        "messages": [
            {
                "role": "system",
                "content": SOAP_SYSTEM_PROMPT
            },
            {
                "role": "user",
                "content": user_prompt(text, language)
            }
        ],
        "max_tokens": config.max_tokens,
        "temperature": config.temperature
    })
}

/// `choices[0].message.content` of a chat-completions response.
pub fn completion_content(response: &Value) -> Option<&str> {
    response["choices"]
        .get(0)
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
}

// ============================================
// LLM Service
// ============================================

pub struct SoapLlmService {
    pub client: reqwest::Client,
    pub config: LlmConfig,
}

impl SoapLlmService {
    pub fn new(config: LlmConfig) -> Result<Self, SoapError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SoapError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Ask the model for a SOAP JSON answer and return its raw text.
    pub async fn complete_soap(&self, text: &str, language: Option<&str>) -> Result<String, SoapError> {
        info!("Calling LLM for SOAP conversion with model: {}", self.config.model);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&build_request_body(&self.config, text, language))
            .send()
            .await
            .map_err(|e| SoapError::Upstream(format!("LLM request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            warn!("LLM rejected credentials with status {}", status);
            return Err(SoapError::Authentication(format!(
                "LLM API returned {status}; check OPENAI_API_KEY"
            )));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SoapError::Upstream(format!(
                "LLM API returned {status}: {error_text}"
            )));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| SoapError::Upstream(format!("Failed to parse LLM response: {e}")))?;

        let content = completion_content(&response_json)
            .ok_or_else(|| SoapError::Upstream("No content in LLM response".to_string()))?;

        Ok(content.trim().to_string())
    }

    /// Convert clinical text to SOAP fields. Also returns the raw model
    /// output so callers can show it when extraction fell back.
    pub async fn to_soap(
        &self,
        text: &str,
        language: Option<&str>,
    ) -> Result<(Extraction, String), SoapError> {
        let raw = self.complete_soap(text, language).await?;
        let extraction = extract_soap(&raw);
        if !extraction.parsed {
            warn!("LLM output was not valid JSON, falling back to raw text");
        }
        Ok((extraction, raw))
    }
}
