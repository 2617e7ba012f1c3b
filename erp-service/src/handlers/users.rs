use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::auth::CreateUserRequest;
use crate::middleware::{CurrentUser, Superuser};
use crate::models::{Organization, Role, User, UserResponse};
use crate::services::ServiceError;
use crate::utils::{Password, PasswordHashString, ValidatedJson};
use crate::AppState;

/// Argon2 hashing runs on the blocking pool.
pub(crate) async fn hash_password(
    state: &AppState,
    password: String,
) -> Result<PasswordHashString, AppError> {
    let hasher = state.hasher.clone();
    let password = Password::new(password);
    let digest = tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))??;
    Ok(digest)
}

/// POST /users
///
/// Open to anonymous callers, so only collaborators can sign themselves up.
/// Other roles are assigned through the organization employee route.
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    if req.role != Role::Collaborator {
        tracing::warn!(role = %req.role, "Self-registration with elevated role refused");
        return Err(ServiceError::Forbidden.into());
    }

    let digest = hash_password(&state, req.password).await?;
    let user = User::new(req.name, req.email, digest.into_string(), req.role);

    state.db.insert_user(&user).await?;
    tracing::info!(user_id = %user.user_id, role = %user.role, "User registered");

    Ok((StatusCode::CREATED, Json(user.sanitized())))
}

/// GET /users/me
pub async fn get_me(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .db
        .find_user_by_id(principal.user_id)
        .await?
        .ok_or(ServiceError::UserNotFound)?;

    Ok(Json(user.sanitized()))
}

/// GET /users/me/organizations
pub async fn my_organizations(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
) -> Result<Json<Vec<Organization>>, AppError> {
    Ok(Json(
        state.db.organizations_for_user(principal.user_id).await?,
    ))
}

/// GET /users/:user_id
pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .db
        .find_user_by_id(user_id)
        .await?
        .ok_or(ServiceError::UserNotFound)?;

    Ok(Json(user.sanitized()))
}

/// DELETE /users/:user_id
///
/// Removes the user's memberships as well.
pub async fn delete_user(
    State(state): State<AppState>,
    Superuser(principal): Superuser,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.relations.delete_user(user_id).await?;
    tracing::info!(%user_id, deleted_by = %principal.user_id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

/// PATCH /users/:user_id/active
pub async fn set_user_active(
    State(state): State<AppState>,
    Superuser(principal): Superuser,
    Path(user_id): Path<Uuid>,
    Json(req): Json<SetActiveRequest>,
) -> Result<Json<UserResponse>, AppError> {
    if !state.db.set_user_active(user_id, req.active).await? {
        return Err(ServiceError::UserNotFound.into());
    }
    tracing::info!(%user_id, active = req.active, changed_by = %principal.user_id, "User activation changed");

    let user = state
        .db
        .find_user_by_id(user_id)
        .await?
        .ok_or(ServiceError::UserNotFound)?;
    Ok(Json(user.sanitized()))
}
