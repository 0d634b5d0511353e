// src/handlers/orders.rs

use axum::{Json, extract::State};

use crate::{
    common::{error::AppError, extract::AppJson},
    config::AppState,
    middleware::auth::CurrentTenant,
    models::orders::{CreateOrderPayload, CreateOrderResponse},
};

/// Creates the order, its detail rows and the matching delivery note.
#[utoipa::path(
    post,
    path = "/orders/create",
    tag = "Orders",
    request_body = CreateOrderPayload,
    responses(
        (status = 200, description = "Đơn hàng và phiếu xuất đã được tạo", body = CreateOrderResponse),
        (status = 400, description = "Dữ liệu không hợp lệ hoặc thiếu bảng")
    ),
    security(("bearer_token" = []))
)]
pub async fn create_order(
    State(app_state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    AppJson(payload): AppJson<CreateOrderPayload>,
) -> Result<Json<CreateOrderResponse>, AppError> {
    let response = app_state.order_service.create(&tenant, payload).await?;
    Ok(Json(response))
}
