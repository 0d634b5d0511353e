// src/handlers/stock.rs

use axum::{Json, extract::State};

use crate::{
    common::{error::AppError, extract::AppJson},
    config::AppState,
    middleware::auth::CurrentTenant,
    models::stock::{
        CreateDeliveryNotePayload, CreateImportSlipPayload, DeliveryNoteResponse,
        ImportSlipResponse,
    },
};

#[utoipa::path(
    post,
    path = "/create-import-slip",
    tag = "Stock",
    request_body = CreateImportSlipPayload,
    responses(
        (status = 200, description = "Phiếu nhập và chi tiết đã được tạo", body = ImportSlipResponse)
    ),
    security(("bearer_token" = []))
)]
pub async fn create_import_slip(
    State(app_state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    AppJson(payload): AppJson<CreateImportSlipPayload>,
) -> Result<Json<ImportSlipResponse>, AppError> {
    let response = app_state.stock_service.create_import_slip(&tenant, payload).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/create-delivery-note",
    tag = "Stock",
    request_body = CreateDeliveryNotePayload,
    responses(
        (status = 200, description = "Phiếu xuất và chi tiết đã được tạo", body = DeliveryNoteResponse)
    ),
    security(("bearer_token" = []))
)]
pub async fn create_delivery_note(
    State(app_state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    AppJson(payload): AppJson<CreateDeliveryNotePayload>,
) -> Result<Json<DeliveryNoteResponse>, AppError> {
    let response = app_state.stock_service.create_delivery_note(&tenant, payload).await?;
    Ok(Json(response))
}
