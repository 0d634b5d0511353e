// src/handlers/auth.rs

use axum::{Json, extract::State};

use crate::{
    common::{error::AppError, extract::AppJson},
    config::AppState,
    models::auth::{
        ChangePasswordPayload, ChangePasswordResponse, SigninPayload, SigninResponse,
        SignupPayload, SignupResponse,
    },
};

#[utoipa::path(
    post,
    path = "/auth/signup",
    tag = "Auth",
    request_body = SignupPayload,
    responses(
        (status = 200, description = "Tài khoản và không gian làm việc đã được tạo", body = SignupResponse),
        (status = 400, description = "Dữ liệu không hợp lệ"),
        (status = 409, description = "Tài khoản đã tồn tại")
    )
)]
pub async fn signup(
    State(app_state): State<AppState>,
    AppJson(payload): AppJson<SignupPayload>,
) -> Result<Json<SignupResponse>, AppError> {
    let response = app_state.auth_service.signup(payload).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/auth/signin",
    tag = "Auth",
    request_body = SigninPayload,
    responses(
        (status = 200, description = "Xác thực thành công", body = SigninResponse),
        (status = 401, description = "Sai tên đăng nhập hoặc mật khẩu")
    )
)]
pub async fn signin(
    State(app_state): State<AppState>,
    AppJson(payload): AppJson<SigninPayload>,
) -> Result<Json<SigninResponse>, AppError> {
    let response = app_state.auth_service.signin(payload).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/auth/change-password",
    tag = "Auth",
    request_body = ChangePasswordPayload,
    responses(
        (status = 200, description = "Đổi mật khẩu thành công", body = ChangePasswordResponse),
        (status = 401, description = "Mật khẩu cũ không đúng"),
        (status = 404, description = "Không tìm thấy người dùng")
    )
)]
pub async fn change_password(
    State(app_state): State<AppState>,
    AppJson(payload): AppJson<ChangePasswordPayload>,
) -> Result<Json<ChangePasswordResponse>, AppError> {
    let response = app_state.auth_service.change_password(payload).await?;
    Ok(Json(response))
}
