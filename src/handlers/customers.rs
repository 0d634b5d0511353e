// src/handlers/customers.rs

use axum::{Json, extract::State};

use crate::{
    common::{error::AppError, extract::{AppJson, AppQuery}},
    config::AppState,
    middleware::auth::CurrentTenant,
    models::customers::{
        CreateCustomerPayload, CreateCustomerResponse, FindCustomersQuery, FindCustomersResponse,
    },
};

#[utoipa::path(
    post,
    path = "/customers/create-customer",
    tag = "Customers",
    request_body = CreateCustomerPayload,
    responses(
        (status = 200, description = "Khách hàng đã được tạo", body = CreateCustomerResponse),
        (status = 401, description = "Token không hợp lệ")
    ),
    security(("bearer_token" = []))
)]
pub async fn create_customer(
    State(app_state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    AppJson(payload): AppJson<CreateCustomerPayload>,
) -> Result<Json<CreateCustomerResponse>, AppError> {
    let response = app_state.customer_service.create(&tenant, payload).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/customers/find-by-name",
    tag = "Customers",
    params(FindCustomersQuery),
    responses(
        (status = 200, description = "Khách hàng có tên chứa chuỗi tìm kiếm", body = FindCustomersResponse)
    ),
    security(("bearer_token" = []))
)]
pub async fn find_customers(
    State(app_state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    AppQuery(query): AppQuery<FindCustomersQuery>,
) -> Result<Json<FindCustomersResponse>, AppError> {
    let response = app_state.customer_service.find_by_name(&tenant, query).await?;
    Ok(Json(response))
}
