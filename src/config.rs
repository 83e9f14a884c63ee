// Copyright (c), Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::SoapError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub const CONFIG_PATH_ENV: &str = "SOAP_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "soap_config.yaml";

/// Server configuration. Loaded from an optional YAML file, then overridden
/// from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_max_audio_bytes")]
    pub max_audio_bytes: usize,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
}

/// OpenAI-compatible chat-completions endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// OpenAI-compatible audio-transcriptions endpoint settings.
///
/// `api_key` and `base_url` fall back to the LLM settings when unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranscriptionConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_transcribe_model")]
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_max_audio_bytes() -> usize {
    25 * 1024 * 1024
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_transcribe_model() -> String {
    "whisper-1".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: default_base_url(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_transcribe_model(),
            base_url: None,
            language: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_audio_bytes: default_max_audio_bytes(),
            llm: LlmConfig::default(),
            transcription: TranscriptionConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parse a YAML config file.
    pub fn from_file(path: &Path) -> Result<Self, SoapError> {
        let txt = std::fs::read_to_string(path)
            .map_err(|e| SoapError::Config(format!("read {}: {e}", path.display())))?;
        serde_yaml::from_str(&txt)
            .map_err(|e| SoapError::Config(format!("parse {}: {e}", path.display())))
    }

    /// Load config the way the server binary does: `$SOAP_CONFIG`, else
    /// `soap_config.yaml` if it exists, else defaults. Environment overrides
    /// are applied on top and the result is validated.
    pub fn load() -> Result<Self, SoapError> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                let p = PathBuf::from(DEFAULT_CONFIG_FILE);
                p.exists().then_some(p)
            });

        let mut config = match path {
            Some(p) => {
                info!("Loading config from {}", p.display());
                Self::from_file(&p)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.finalize()?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), SoapError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OPENAI_API_KEY") {
            self.llm.api_key = v;
        }
        if let Some(v) = get("SOAP_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = get("SOAP_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = get("SOAP_TRANSCRIBE_MODEL") {
            self.transcription.model = v;
        }
        if let Some(v) = get("SOAP_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = get("SOAP_MAX_AUDIO_BYTES") {
            self.max_audio_bytes = v
                .parse()
                .map_err(|e| SoapError::Config(format!("SOAP_MAX_AUDIO_BYTES: {e}")))?;
        }
        Ok(())
    }

    /// Fill derived defaults and reject unusable configs.
    pub fn finalize(&mut self) -> Result<(), SoapError> {
        if self.llm.api_key.trim().is_empty() {
            return Err(SoapError::Config(
                "OPENAI_API_KEY is not set (environment or llm.api_key in config)".to_string(),
            ));
        }
        self.llm.base_url = self.llm.base_url.trim_end_matches('/').to_string();
        if self.transcription.api_key.trim().is_empty() {
            self.transcription.api_key = self.llm.api_key.clone();
        }
        if self.transcription.base_url.is_none() {
            self.transcription.base_url = Some(self.llm.base_url.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.bind_addr, "0.0.0.0:3000");
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
        assert_eq!(cfg.llm.temperature, 0.0);
        assert_eq!(cfg.transcription.model, "whisper-1");
        assert_eq!(cfg.max_audio_bytes, 25 * 1024 * 1024);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "bind_addr: 127.0.0.1:8080\nllm:\n  model: openai/gpt-4o\n  base_url: https://openrouter.ai/api/v1/\n  api_key: sk-file"
        )
        .unwrap();

        let mut cfg = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:8080");
        assert_eq!(cfg.llm.model, "openai/gpt-4o");
        assert_eq!(cfg.llm.max_tokens, 1024);

        cfg.finalize().unwrap();
        assert_eq!(cfg.llm.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(cfg.transcription.api_key, "sk-file");
        assert_eq!(
            cfg.transcription.base_url.as_deref(),
            Some("https://openrouter.ai/api/v1")
        );
    }

    #[test]
    fn test_example_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("soap_config.example.yaml");
        let cfg = ServerConfig::from_file(&path).unwrap();
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
        assert_eq!(cfg.transcription.model, "whisper-1");
        assert!(cfg.llm.api_key.is_empty());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind_adr: 127.0.0.1:8080").unwrap();
        assert!(matches!(
            ServerConfig::from_file(file.path()),
            Err(SoapError::Config(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("OPENAI_API_KEY", "sk-env-123456"),
            ("SOAP_MODEL", "gpt-4o"),
            ("SOAP_BIND_ADDR", "127.0.0.1:9000"),
            ("SOAP_BASE_URL", "  "),
        ]
        .into_iter()
        .collect();

        let mut cfg = ServerConfig::default();
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.llm.api_key, "sk-env-123456");
        assert_eq!(cfg.llm.model, "gpt-4o");
        assert_eq!(cfg.bind_addr, "127.0.0.1:9000");
        // blank values are ignored
        assert_eq!(cfg.llm.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_bad_max_audio_bytes() {
        let mut cfg = ServerConfig::default();
        let res = cfg.apply_env(|k| (k == "SOAP_MAX_AUDIO_BYTES").then(|| "lots".to_string()));
        assert!(matches!(res, Err(SoapError::Config(_))));
    }

    #[test]
    fn test_missing_api_key() {
        let mut cfg = ServerConfig::default();
        assert!(matches!(cfg.finalize(), Err(SoapError::Config(_))));
    }
}
