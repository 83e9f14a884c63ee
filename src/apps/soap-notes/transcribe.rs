use crate::config::TranscriptionConfig;
use crate::SoapError;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

/// Speech-to-text client for an OpenAI-compatible `/audio/transcriptions` API.
pub struct TranscriptionService {
    pub client: reqwest::Client,
    pub config: TranscriptionConfig,
}

impl TranscriptionService {
    pub fn new(config: TranscriptionConfig) -> Result<Self, SoapError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SoapError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or("https://api.openai.com/v1")
            .trim_end_matches('/')
    }

    /// Transcribe a short recording. `language` overrides the configured one.
    pub async fn transcribe(
        &self,
        audio: Vec<u8>,
        file_name: &str,
        mime: Option<&str>,
        language: Option<&str>,
    ) -> Result<String, SoapError> {
        if audio.is_empty() {
            return Err(SoapError::InvalidInput("Audio body is empty".to_string()));
        }

        info!("Transcribing {} bytes of audio ({})", audio.len(), file_name);

        let mut file_part = Part::bytes(audio).file_name(file_name.to_string());
        if let Some(mime) = mime {
            file_part = file_part
                .mime_str(mime)
                .map_err(|e| SoapError::InvalidInput(format!("Invalid audio content type: {e}")))?;
        }

        let mut form = Form::new()
            .text("model", self.config.model.clone())
            .text("response_format", "json");
        if let Some(lang) = language.or(self.config.language.as_deref()) {
            form = form.text("language", lang.to_string());
        }
        let form = form.part("file", file_part);

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url()))
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SoapError::Upstream(format!("Transcription request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(SoapError::Authentication(format!(
                "Transcription API returned {status}; check OPENAI_API_KEY"
            )));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SoapError::Upstream(format!(
                "Transcription failed with status {status}: {error_text}"
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| SoapError::Upstream(format!("Failed to parse transcription: {e}")))?;

        let text = payload
            .get("text")
            .and_then(|t| t.as_str())
            .map(str::trim)
            .unwrap_or_default();
        if text.is_empty() {
            warn!("Transcription returned no text");
            return Err(SoapError::Upstream("Transcription returned no text".to_string()));
        }

        info!("Transcribed {} chars", text.len());
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use mockito::Matcher;

    fn service(base_url: String) -> TranscriptionService {
        TranscriptionService::new(TranscriptionConfig {
            api_key: "sk-test".to_string(),
            base_url: Some(base_url),
            ..TranscriptionConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_transcribe() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/audio/transcriptions")
            .match_header("authorization", "Bearer sk-test")
            .match_header("content-type", Matcher::Regex("multipart/form-data".to_string()))
            .match_body(Matcher::Regex("whisper-1".to_string()))
            .with_status(200)
            .with_body("{\"text\": \"  Pasien demam tiga hari.  \"}")
            .create_async()
            .await;

        let text = service(server.url())
            .transcribe(vec![0u8; 64], "note.wav", Some("audio/wav"), Some("id"))
            .await
            .unwrap();
        assert_eq!(text, "Pasien demam tiga hari.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_audio_rejected() {
        let svc = service("http://127.0.0.1:9".to_string());
        let err = svc.transcribe(Vec::new(), "a.wav", None, None).await.unwrap_err();
        assert!(matches!(err, SoapError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_empty_transcript() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/audio/transcriptions")
            .with_status(200)
            .with_body("{\"text\": \"\"}")
            .create_async()
            .await;

        let err = service(server.url())
            .transcribe(vec![1, 2, 3], "a.webm", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SoapError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_transcription_auth_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/audio/transcriptions")
            .with_status(403)
            .create_async()
            .await;

        let err = service(server.url())
            .transcribe(vec![1, 2, 3], "a.wav", None, None)
            .await
            .unwrap_err();
        match err {
            SoapError::Authentication(msg) => assert!(msg.contains("check OPENAI_API_KEY")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
