// src/handlers/transcription.rs

use axum::{
    Json,
    extract::{Multipart, State},
};
use utoipa::ToSchema;

use crate::{
    common::error::AppError,
    config::AppState,
    models::transcription::TranscriptionResponse,
    services::transcription_service::AudioClip,
};

/// Multipart form with a single audio part.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct TranscribeUpload {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

async fn read_audio(multipart: &mut Multipart) -> Result<AudioClip, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Dữ liệu multipart không hợp lệ: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("audio/") {
            return Err(AppError::BadRequest("File must be an audio file".into()));
        }
        let file_name = field.file_name().unwrap_or("audio.webm").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Không đọc được file âm thanh: {e}")))?;
        return Ok(AudioClip {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    Err(AppError::BadRequest("Thiếu file âm thanh (trường 'file')".into()))
}

#[utoipa::path(
    post,
    path = "/transcription/transcribe",
    tag = "Transcription",
    request_body(content = TranscribeUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Văn bản nhận dạng và danh sách hàng hóa", body = TranscriptionResponse),
        (status = 400, description = "File không phải âm thanh"),
        (status = 502, description = "Dịch vụ nhận dạng giọng nói lỗi")
    )
)]
pub async fn transcribe(
    State(app_state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<TranscriptionResponse>, AppError> {
    let clip = read_audio(&mut multipart).await?;
    let response = app_state.transcription_service.transcribe(clip).await?;
    Ok(Json(response))
}
