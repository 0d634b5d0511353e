// src/models/transcription.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct TranscriptionResponse {
    pub language: String,
    pub transcription: String,
    /// Array of `{ten_hang_hoa, so_luong, don_gia}`, or `{error, raw}`.
    #[schema(value_type = Object)]
    pub extracted: Value,
}

/// Speech engine output.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Segment {
    #[serde(default)]
    pub text: String,
}

impl Transcript {
    /// Segment texts joined with spaces, or the flat text when no segments came back.
    pub fn joined_text(&self) -> String {
        if self.segments.is_empty() {
            return self.text.trim().to_string();
        }
        self.segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
