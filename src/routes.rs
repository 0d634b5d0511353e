// src/routes.rs

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware as axum_middleware,
    routing::{get, patch, post},
};
use serde_json::{Value, json};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

/// Audio uploads are larger than the default 2 MB body limit.
const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

async fn health() -> Json<Value> {
    Json(json!({
        "message": "Order Voice Backend API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "healthy",
    }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() || origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn build_router(app_state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/signup", post(handlers::auth::signup))
        .route("/signin", post(handlers::auth::signin))
        .route("/change-password", post(handlers::auth::change_password));

    // Everything below resolves the caller's workspace from the bearer token.
    let tenant_routes = Router::new()
        .route("/customers/create-customer", post(handlers::customers::create_customer))
        .route("/customers/find-by-name", get(handlers::customers::find_customers))
        .route("/products/create-product", post(handlers::products::create_product))
        .route("/products/find-by-name", get(handlers::products::find_products))
        .route(
            "/products/create-product-with-units",
            post(handlers::products::create_product_with_units),
        )
        .route(
            "/unit-conversions/create-unit-conversion",
            post(handlers::unit_conversions::create_unit_conversion),
        )
        .route("/unit-conversions/list", get(handlers::unit_conversions::list_unit_conversions))
        .route("/suppliers/create-supplier", post(handlers::suppliers::create_supplier))
        .route("/create-import-slip", post(handlers::stock::create_import_slip))
        .route("/create-delivery-note", post(handlers::stock::create_delivery_note))
        .route("/orders/create", post(handlers::orders::create_order))
        .route("/invoices/generate", post(handlers::invoices::generate_invoice))
        .route("/user/me", get(handlers::user::get_me))
        .route("/user/update-profile", patch(handlers::user::update_profile))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let cors = cors_layer(&app_state.cors_origins);

    Router::new()
        .route("/", get(health))
        .nest("/auth", auth_routes)
        .route(
            "/transcription/transcribe",
            post(handlers::transcription::transcribe).layer(DefaultBodyLimit::max(MAX_AUDIO_BYTES)),
        )
        .route("/plan-status/get-status-plan", post(handlers::plan_status::get_status_plan))
        .merge(tenant_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}
