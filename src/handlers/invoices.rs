// src/handlers/invoices.rs

use axum::{Json, extract::State};

use crate::{
    common::{error::AppError, extract::AppJson},
    config::AppState,
    middleware::auth::CurrentTenant,
    models::invoices::{GenerateInvoicePayload, InvoiceResponse},
};

#[utoipa::path(
    post,
    path = "/invoices/generate",
    tag = "Invoices",
    request_body = GenerateInvoicePayload,
    responses(
        (status = 200, description = "Hóa đơn đã được xuất và đính kèm vào đơn hàng", body = InvoiceResponse),
        (status = 403, description = "Không thể xuất hóa đơn cho tài khoản khác"),
        (status = 502, description = "Nhà cung cấp hóa đơn điện tử lỗi")
    ),
    security(("bearer_token" = []))
)]
pub async fn generate_invoice(
    State(app_state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    AppJson(payload): AppJson<GenerateInvoicePayload>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let response = app_state.invoice_service.generate(&tenant, payload).await?;
    Ok(Json(response))
}
