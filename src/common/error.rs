// src/common/error.rs

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::db::table_store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Dữ liệu không hợp lệ")]
    Validation(#[from] validator::ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("Tài khoản đã tồn tại")]
    UsernameTaken,

    #[error("Tên đăng nhập hoặc mật khẩu không đúng")]
    InvalidCredentials,

    #[error("Token xác thực không hợp lệ hoặc không tồn tại")]
    InvalidToken,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Thiếu thông tin bảng cần thiết: {}", .0.join(", "))]
    MissingTenantTables(Vec<String>),

    #[error("{context}: {source}")]
    Store {
        context: String,
        #[source]
        source: StoreError,
    },

    #[error("Khởi tạo không gian làm việc thất bại ở bước '{step}': {source}")]
    Provisioning {
        step: String,
        #[source]
        source: StoreError,
    },

    #[error("{0}")]
    Upstream(String),

    #[error("Lỗi máy chủ không mong muốn: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(source: StoreError) -> Self {
        AppError::Store {
            context: "Lỗi khi gọi API Teable".to_string(),
            source,
        }
    }
}

impl AppError {
    /// Wraps a table-store failure with the operation it interrupted.
    pub fn store(context: impl Into<String>, source: StoreError) -> Self {
        AppError::Store {
            context: context.into(),
            source,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::BadRequest(_)
            | AppError::MissingTenantTables(_) => StatusCode::BAD_REQUEST,
            AppError::UsernameTaken => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store { source, .. } | AppError::Provisioning { source, .. } => {
                source.client_status()
            }
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let AppError::Validation(errors) = &self {
            let mut details: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for (field, field_errors) in errors.field_errors() {
                let messages = field_errors
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                details.insert(field.to_string(), messages);
            }
            let body = Json(json!({
                "detail": "Một hoặc nhiều trường không hợp lệ.",
                "errors": details,
            }));
            return (status, body).into_response();
        }

        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }

        let body = Json(json!({ "detail": self.to_string() }));
        let mut response = (status, body).into_response();
        if matches!(self, AppError::InvalidToken) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
