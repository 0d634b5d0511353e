// src/handlers/plan_status.rs

use axum::{Json, extract::State};

use crate::{
    common::{error::AppError, extract::AppJson},
    config::AppState,
    models::plan::{PlanStatusPayload, PlanStatusResponse},
};

#[utoipa::path(
    post,
    path = "/plan-status/get-status-plan",
    tag = "Plan status",
    request_body = PlanStatusPayload,
    responses(
        (status = 200, description = "Thông tin gói đăng ký", body = PlanStatusResponse),
        (status = 404, description = "Không tìm thấy plan status")
    )
)]
pub async fn get_status_plan(
    State(app_state): State<AppState>,
    AppJson(payload): AppJson<PlanStatusPayload>,
) -> Result<Json<PlanStatusResponse>, AppError> {
    let response = app_state.plan_service.get_status(payload).await?;
    Ok(Json(response))
}
