use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::models::Role;
use crate::{
    services::{authz, metrics, Principal},
    AppState,
};

fn bearer_token(req: &Request) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Middleware to require a valid bearer token belonging to an active user.
/// The verified claims and the resolved `Principal` are stored in request
/// extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = bearer_token(&req) else {
        metrics::record_auth_failure("missing_token");
        return Err(AppError::InvalidToken);
    };

    let claims = state.jwt.verify(token).map_err(|e| {
        tracing::warn!("Rejected bearer token");
        metrics::record_auth_failure("invalid_token");
        AppError::from(e)
    })?;

    let principal = authz::require_any_user(&state.db, &claims)
        .await
        .map_err(|e| {
            metrics::record_auth_failure("unknown_or_inactive_user");
            AppError::from(e)
        })?;

    req.extensions_mut().insert(claims);
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

fn principal_from(parts: &Parts) -> Result<Principal, AppError> {
    parts.extensions.get::<Principal>().copied().ok_or_else(|| {
        AppError::InternalError(anyhow::anyhow!(
            "Principal missing from request extensions"
        ))
    })
}

/// Any active user.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Principal);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentUser(principal_from(parts)?))
    }
}

/// Active user whose role is superuser.
#[derive(Debug, Clone, Copy)]
pub struct Superuser(pub Principal);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Superuser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = principal_from(parts)?;
        authz::require_role(&principal, Role::Superuser)
            .into_result()
            .map_err(|e| {
                tracing::warn!(user_id = %principal.user_id, role = %principal.role, "Superuser role required");
                AppError::from(e)
            })?;
        Ok(Superuser(principal))
    }
}
