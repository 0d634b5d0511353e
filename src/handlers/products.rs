// src/handlers/products.rs

use axum::{Json, extract::State};

use crate::{
    common::{error::AppError, extract::{AppJson, AppQuery}},
    config::AppState,
    middleware::auth::CurrentTenant,
    models::products::{
        CreateProductPayload, CreateProductResponse, CreateProductWithUnitsPayload,
        CreateProductWithUnitsResponse, FindProductsQuery, FindProductsResponse,
    },
};

#[utoipa::path(
    post,
    path = "/products/create-product",
    tag = "Products",
    request_body = CreateProductPayload,
    responses(
        (status = 200, description = "Sản phẩm đã được tạo", body = CreateProductResponse)
    ),
    security(("bearer_token" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    AppJson(payload): AppJson<CreateProductPayload>,
) -> Result<Json<CreateProductResponse>, AppError> {
    let response = app_state.product_service.create(&tenant, payload).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/products/find-by-name",
    tag = "Products",
    params(FindProductsQuery),
    responses(
        (status = 200, description = "Sản phẩm theo tên và danh mục", body = FindProductsResponse)
    ),
    security(("bearer_token" = []))
)]
pub async fn find_products(
    State(app_state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    AppQuery(query): AppQuery<FindProductsQuery>,
) -> Result<Json<FindProductsResponse>, AppError> {
    let response = app_state.product_service.find_by_name(&tenant, query).await?;
    Ok(Json(response))
}

/// One unit is folded into the product row; several are created and linked.
#[utoipa::path(
    post,
    path = "/products/create-product-with-units",
    tag = "Products",
    request_body = CreateProductWithUnitsPayload,
    responses(
        (status = 200, description = "Sản phẩm và đơn vị tính đã được tạo", body = CreateProductWithUnitsResponse)
    ),
    security(("bearer_token" = []))
)]
pub async fn create_product_with_units(
    State(app_state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    AppJson(payload): AppJson<CreateProductWithUnitsPayload>,
) -> Result<Json<CreateProductWithUnitsResponse>, AppError> {
    let response = app_state.product_service.create_with_units(&tenant, payload).await?;
    Ok(Json(response))
}
