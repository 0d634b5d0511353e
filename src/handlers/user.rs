// src/handlers/user.rs

use axum::{Json, extract::State};

use crate::{
    common::{error::AppError, extract::AppJson},
    config::AppState,
    middleware::auth::CurrentTenant,
    models::profile::{ProfileResponse, UpdateProfilePayload},
};

#[utoipa::path(
    get,
    path = "/user/me",
    tag = "User",
    responses(
        (status = 200, description = "Thông tin người dùng hiện tại", body = ProfileResponse),
        (status = 401, description = "Token không hợp lệ")
    ),
    security(("bearer_token" = []))
)]
pub async fn get_me(
    State(app_state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
) -> Json<ProfileResponse> {
    Json(app_state.profile_service.me(&tenant))
}

#[utoipa::path(
    patch,
    path = "/user/update-profile",
    tag = "User",
    request_body = UpdateProfilePayload,
    responses(
        (status = 200, description = "Thông tin đã được cập nhật", body = ProfileResponse)
    ),
    security(("bearer_token" = []))
)]
pub async fn update_profile(
    State(app_state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    AppJson(payload): AppJson<UpdateProfilePayload>,
) -> Result<Json<ProfileResponse>, AppError> {
    let response = app_state.profile_service.update(&tenant, payload).await?;
    Ok(Json(response))
}
