use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::dtos::auth::{LoginRequest, TokenResponse};
use crate::services::{metrics, ServiceError};
use crate::utils::{Password, PasswordHashString, ValidatedJson};
use crate::AppState;

/// Exchange email and password for a bearer token.
///
/// POST /token
///
/// Unknown email and wrong password get the same 401.
pub async fn issue_token(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = state.db.find_user_by_email(&req.email).await?;

    let user = match user {
        Some(user) => {
            let hasher = state.hasher.clone();
            let digest = PasswordHashString::new(user.password_hash.clone());
            let password = Password::new(req.password);
            let matches = tokio::task::spawn_blocking(move || hasher.verify(&digest, &password))
                .await
                .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;
            matches.then_some(user)
        }
        None => None,
    };

    let Some(user) = user else {
        tracing::warn!("Login failed: invalid credentials");
        metrics::record_auth_failure("invalid_credentials");
        return Err(ServiceError::InvalidCredentials.into());
    };

    if !user.active {
        tracing::warn!(user_id = %user.user_id, "Login refused for deactivated user");
        metrics::record_auth_failure("inactive_user");
        return Err(ServiceError::Forbidden.into());
    }

    let issued = state.jwt.issue_default(&user.user_id.to_string())?;
    metrics::record_login();
    tracing::info!(user_id = %user.user_id, "Access token issued");

    Ok(Json(TokenResponse {
        access_token: issued.access_token,
        token_type: "Bearer".to_string(),
        expires_at: issued.expires_at,
    }))
}
