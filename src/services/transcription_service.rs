// src/services/transcription_service.rs
//
// Audio in, line items out: a speech engine produces the transcript and a chat model
// turns it into `[{ten_hang_hoa, so_luong, don_gia}]`. Nothing here is stored.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use serde_json::{Value, json};

use crate::{
    common::error::AppError,
    models::transcription::{Transcript, TranscriptionResponse},
};

const NO_SPEECH: &str = "Không nghe rõ từ bạn!";
const NO_ARRAY: &str = "Không tìm thấy mảng JSON hợp lệ";

/// Uploaded audio as received by the handler.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, clip: AudioClip) -> Result<Transcript, AppError>;
}

#[async_trait]
pub trait LineItemExtractor: Send + Sync {
    /// Returns the model's raw reply for `transcript`.
    async fn complete(&self, transcript: &str) -> Result<String, AppError>;
}

// =============================================================================
//  SPEECH ENGINE
// =============================================================================

/// Whisper server speaking the OpenAI-compatible transcription endpoint.
#[derive(Clone)]
pub struct WhisperHttpEngine {
    http: Client,
    url: String,
    model: String,
    compute_type: Option<String>,
    device: Option<String>,
}

impl WhisperHttpEngine {
    pub fn new(http: Client, url: &str, model: &str) -> Self {
        Self {
            http,
            url: url.to_string(),
            model: model.to_string(),
            compute_type: None,
            device: None,
        }
    }

    /// Compute type (`int8`, `float16`, ...) and device (`cpu`, `cuda`) sent with every request.
    pub fn with_runtime(mut self, compute_type: &str, device: &str) -> Self {
        self.compute_type = Some(compute_type.to_string()).filter(|c| !c.is_empty());
        self.device = Some(device.to_string()).filter(|d| !d.is_empty());
        self
    }
}

#[async_trait]
impl SpeechToText for WhisperHttpEngine {
    async fn transcribe(&self, clip: AudioClip) -> Result<Transcript, AppError> {
        let size = clip.bytes.len();
        let part = Part::bytes(clip.bytes)
            .file_name(clip.file_name)
            .mime_str(&clip.content_type)
            .map_err(|e| AppError::BadRequest(format!("Định dạng âm thanh không hợp lệ: {e}")))?;
        let mut form = Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");
        if let Some(compute_type) = &self.compute_type {
            form = form.text("compute_type", compute_type.clone());
        }
        if let Some(device) = &self.device {
            form = form.text("device", device.clone());
        }

        tracing::info!("Sending {} bytes of audio to the speech engine", size);
        let response = self
            .http
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Transcription failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "Transcription failed: HTTP error: {}",
                status.as_u16()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Transcription failed: {e}")))
    }
}

// =============================================================================
//  EXTRACTOR
// =============================================================================

fn extraction_prompt(transcript: &str) -> String {
    format!(
        "Bạn là một AI hỗ trợ phân tích hóa đơn từ văn bản tiếng Việt.\n\n\
         Yêu cầu:\n\
         - Phân tích câu sau và trích xuất thành một mảng JSON, mỗi phần tử là một object có đúng 3 trường:\n\
         - \"ten_hang_hoa\": tên hàng hoá\n\
         - \"so_luong\": số lượng (mặc định là 1 nếu không ghi rõ)\n\
         - \"don_gia\": đơn giá của một đơn vị hàng hóa, là số nguyên (ví dụ: \"2 triệu 180 nghìn\" = 2180000). Nếu không rõ thì để null.\n\
         - Chuyển đổi giá tiền ghi bằng chữ sang dạng số nguyên chính xác (ví dụ: \"năm mươi triệu\" = 50000000).\n\
         - Tuyệt đối không nhân số lượng với đơn giá.\n\
         - Chỉ trả về một mảng JSON hợp lệ, không có giải thích, không markdown.\n\n\
         Câu cần phân tích:\n\"{transcript}\""
    )
}

/// Chat-completions client (OpenRouter by default).
#[derive(Clone)]
pub struct OpenRouterExtractor {
    http: Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenRouterExtractor {
    pub fn new(http: Client, url: &str, model: &str, api_key: Option<String>) -> Self {
        Self {
            http,
            url: url.to_string(),
            model: model.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }
}

#[async_trait]
impl LineItemExtractor for OpenRouterExtractor {
    async fn complete(&self, transcript: &str) -> Result<String, AppError> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": extraction_prompt(transcript) }],
        });
        let mut request = self.http.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Extraction failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "Extraction failed: HTTP error: {}",
                status.as_u16()
            )));
        }
        let reply: Value = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Extraction failed: {e}")))?;
        reply["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AppError::Upstream("Extraction failed: empty completion".into()))
    }
}

/// Parses the model reply into a JSON array, or `{error, raw}` when it is not one.
pub fn parse_extraction(reply: &str) -> Value {
    let cleaned = reply
        .trim()
        .replace("```json", "")
        .replace("```", "");
    let cleaned = cleaned.trim();
    match serde_json::from_str::<Value>(cleaned) {
        Ok(items @ Value::Array(_)) => items,
        Ok(_) => json!({ "error": NO_ARRAY, "raw": reply }),
        Err(e) => json!({ "error": format!("{NO_ARRAY}: {e}"), "raw": reply }),
    }
}

// =============================================================================
//  SERVICE
// =============================================================================

#[derive(Clone)]
pub struct TranscriptionService {
    speech: Arc<dyn SpeechToText>,
    extractor: Arc<dyn LineItemExtractor>,
}

impl TranscriptionService {
    pub fn new(speech: Arc<dyn SpeechToText>, extractor: Arc<dyn LineItemExtractor>) -> Self {
        Self { speech, extractor }
    }

    pub async fn transcribe(&self, clip: AudioClip) -> Result<TranscriptionResponse, AppError> {
        let transcript = self.speech.transcribe(clip).await?;
        let text = transcript.joined_text();
        tracing::info!(
            "Transcribed {} characters (language: {})",
            text.chars().count(),
            transcript.language
        );

        let extracted = if text.is_empty() {
            json!({ "error": NO_SPEECH, "raw": "" })
        } else {
            parse_extraction(&self.extractor.complete(&text).await?)
        };
        if extracted.get("error").is_some() {
            tracing::warn!("Extraction returned no line items");
        }

        Ok(TranscriptionResponse {
            language: transcript.language,
            transcription: text,
            extracted,
        })
    }
}
