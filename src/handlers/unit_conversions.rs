// src/handlers/unit_conversions.rs

use axum::{Json, extract::State};

use crate::{
    common::{error::AppError, extract::AppJson},
    config::AppState,
    middleware::auth::CurrentTenant,
    models::unit_conversions::{
        CreateUnitConversionResponse, ListUnitConversionsResponse, UnitConversionPayload,
    },
};

#[utoipa::path(
    post,
    path = "/unit-conversions/create-unit-conversion",
    tag = "Unit conversions",
    request_body = UnitConversionPayload,
    responses(
        (status = 200, description = "Đơn vị tính đã được tạo", body = CreateUnitConversionResponse)
    ),
    security(("bearer_token" = []))
)]
pub async fn create_unit_conversion(
    State(app_state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    AppJson(payload): AppJson<UnitConversionPayload>,
) -> Result<Json<CreateUnitConversionResponse>, AppError> {
    let response = app_state.unit_conversion_service.create(&tenant, payload).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/unit-conversions/list",
    tag = "Unit conversions",
    responses(
        (status = 200, description = "Tất cả đơn vị tính", body = ListUnitConversionsResponse)
    ),
    security(("bearer_token" = []))
)]
pub async fn list_unit_conversions(
    State(app_state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
) -> Result<Json<ListUnitConversionsResponse>, AppError> {
    let response = app_state.unit_conversion_service.list(&tenant).await?;
    Ok(Json(response))
}
