// Copyright (c), Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

pub mod endpoints;
pub mod extract;
pub mod font_metrics;
pub mod llm;
pub mod pdf;
pub mod transcribe;
pub mod types;

pub use endpoints::{build_router, serve};
pub use extract::{extract_soap, Extraction, SoapNote};
pub use llm::SoapLlmService;
pub use pdf::{pdf_file_name, render_soap_pdf};
pub use transcribe::TranscriptionService;
pub use types::*;

use crate::common::current_timestamp_ms;
use crate::AppState;
use crate::SoapError;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// File name to report upstream when the client did not send one.
fn default_audio_file_name(mime: Option<&str>) -> String {
    let ext = match mime.map(|m| m.split(';').next().unwrap_or(m).trim()) {
        Some("audio/webm") => "webm",
        Some("audio/ogg") => "ogg",
        Some("audio/mpeg") | Some("audio/mp3") => "mp3",
        Some("audio/mp4") | Some("audio/m4a") | Some("audio/x-m4a") => "m4a",
        Some("audio/flac") => "flac",
        _ => "wav",
    };
    format!("audio.{ext}")
}

async fn run_soap(
    state: &AppState,
    text: &str,
    patient: Option<String>,
    date: Option<String>,
    language: Option<&str>,
    transcript: Option<String>,
) -> Result<SoapResponse, SoapError> {
    if text.trim().is_empty() {
        return Err(SoapError::InvalidInput(
            "Clinical text is empty; provide some text first".to_string(),
        ));
    }

    let created_at = current_timestamp_ms()?;
    let (extraction, raw) = state.llm.to_soap(text, language).await?;

    info!("SOAP conversion complete (parsed: {})", extraction.parsed);

    Ok(SoapResponse {
        id: Uuid::new_v4(),
        raw_output: (!extraction.parsed).then_some(raw),
        note: extraction.note,
        parsed: extraction.parsed,
        transcript,
        patient: non_blank(patient),
        date: non_blank(date).unwrap_or_else(today),
        created_at,
    })
}

/// Convert clinical text to a SOAP note.
pub async fn generate_soap(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SoapRequest>,
) -> Result<Json<SoapResponse>, SoapError> {
    info!("Processing SOAP request ({} chars)", request.text.len());
    let response = run_soap(
        &state,
        &request.text,
        request.patient,
        request.date,
        request.language.as_deref(),
        None,
    )
    .await?;
    Ok(Json(response))
}

/// Render a (possibly edited) SOAP note as a PDF download.
pub async fn render_pdf(Json(request): Json<PdfRequest>) -> Result<Response, SoapError> {
    let bytes = render_soap_pdf(
        request.patient.as_deref(),
        request.date.as_deref(),
        &request.note,
    )?;
    let file_name = pdf_file_name(request.patient.as_deref(), chrono::Local::now().naive_local());

    info!("Rendered {} ({} bytes)", file_name, bytes.len());

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

async fn transcribe_body(
    state: &AppState,
    headers: &HeaderMap,
    body: Bytes,
    file_name: Option<String>,
    language: Option<&str>,
) -> Result<String, SoapError> {
    if body.len() > state.max_audio_bytes {
        return Err(SoapError::PayloadTooLarge(format!(
            "Audio is {} bytes, limit is {}",
            body.len(),
            state.max_audio_bytes
        )));
    }
    let mime = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|m| m.starts_with("audio/") || m.starts_with("video/"));
    let file_name = non_blank(file_name).unwrap_or_else(|| default_audio_file_name(mime));

    state
        .transcriber
        .transcribe(body.to_vec(), &file_name, mime, language)
        .await
}

/// Transcribe a raw audio body.
pub async fn transcribe_audio(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TranscribeParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<TranscribeResponse>, SoapError> {
    let text = transcribe_body(
        &state,
        &headers,
        body,
        params.file_name,
        params.language.as_deref(),
    )
    .await?;
    Ok(Json(TranscribeResponse { text }))
}

/// Transcribe a raw audio body and convert the transcript to a SOAP note.
pub async fn soap_from_audio(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AudioSoapParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SoapResponse>, SoapError> {
    let transcript = transcribe_body(
        &state,
        &headers,
        body,
        params.file_name,
        params.language.as_deref(),
    )
    .await?;
    let response = run_soap(
        &state,
        &transcript,
        params.patient,
        params.date,
        params.output_language.as_deref(),
        Some(transcript.clone()),
    )
    .await?;
    Ok(Json(response))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_audio_file_name() {
        assert_eq!(default_audio_file_name(Some("audio/webm;codecs=opus")), "audio.webm");
        assert_eq!(default_audio_file_name(Some("audio/mpeg")), "audio.mp3");
        assert_eq!(default_audio_file_name(None), "audio.wav");
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  Budi ".to_string())), Some("Budi".to_string()));
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn test_today_format() {
        let d = today();
        assert_eq!(d.len(), 10);
        assert!(chrono::NaiveDate::parse_from_str(&d, "%Y-%m-%d").is_ok());
    }
}
