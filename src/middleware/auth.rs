// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use crate::{common::error::AppError, config::AppState, models::tenant::TenantRow};

/// Resolves the bearer token to its tenant row and stores it on the request.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .map(|Authorization(bearer)| bearer.token().trim().to_string())
        .filter(|token| !token.is_empty())
        .ok_or(AppError::InvalidToken)?;

    let tenant = app_state.auth_service.resolve(&token).await?;
    tracing::debug!("Request authenticated as {}", tenant.username());
    request.extensions_mut().insert(tenant);
    Ok(next.run(request).await)
}

/// The tenant resolved by [`auth_guard`].
pub struct CurrentTenant(pub TenantRow);

impl<S> FromRequestParts<S> for CurrentTenant
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantRow>()
            .cloned()
            .map(CurrentTenant)
            .ok_or(AppError::InvalidToken)
    }
}
