// Copyright (c), Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use super::extract::SoapNote;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request for /soap
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SoapRequest {
    /// Free clinical text (anamnesis, outpatient notes, ...)
    pub text: String,
    #[serde(default)]
    pub patient: Option<String>,
    /// Defaults to today (YYYY-MM-DD)
    #[serde(default)]
    pub date: Option<String>,
    /// Output language hint for the model, e.g. "Indonesian"
    #[serde(default)]
    pub language: Option<String>,
}

/// Response for /soap and /soap/from-audio
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SoapResponse {
    pub id: Uuid,
    pub note: SoapNote,
    /// False when the model output was not valid JSON and the raw text was
    /// placed in Subjective.
    pub parsed: bool,
    /// Raw model output, only present when `parsed` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
    /// Transcribed audio, only present for /soap/from-audio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    pub patient: Option<String>,
    pub date: String,
    pub created_at: u64,
}

/// Request for /soap/pdf. The note may have been edited by the client.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PdfRequest {
    #[serde(default)]
    pub patient: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    pub note: SoapNote,
}

/// Query parameters for /transcribe
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TranscribeParams {
    #[serde(default)]
    pub file_name: Option<String>,
    /// ISO-639-1 language of the recording
    #[serde(default)]
    pub language: Option<String>,
}

/// Response for /transcribe
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranscribeResponse {
    pub text: String,
}

/// Query parameters for /soap/from-audio
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AudioSoapParams {
    #[serde(default)]
    pub patient: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    /// ISO-639-1 language of the recording
    #[serde(default)]
    pub language: Option<String>,
    /// Output language hint for the model
    #[serde(default)]
    pub output_language: Option<String>,
}
