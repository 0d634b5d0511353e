// src/handlers/suppliers.rs

use axum::{Json, extract::State};

use crate::{
    common::{error::AppError, extract::AppJson},
    config::AppState,
    middleware::auth::CurrentTenant,
    models::suppliers::{CreateSupplierPayload, CreateSupplierResponse},
};

#[utoipa::path(
    post,
    path = "/suppliers/create-supplier",
    tag = "Suppliers",
    request_body = CreateSupplierPayload,
    responses(
        (status = 200, description = "Nhà cung cấp đã được tạo", body = CreateSupplierResponse)
    ),
    security(("bearer_token" = []))
)]
pub async fn create_supplier(
    State(app_state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    AppJson(payload): AppJson<CreateSupplierPayload>,
) -> Result<Json<CreateSupplierResponse>, AppError> {
    let response = app_state.supplier_service.create(&tenant, payload).await?;
    Ok(Json(response))
}
