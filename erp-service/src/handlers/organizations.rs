//! Organization handlers. Changes to an organization's membership require a
//! superuser who already belongs to it.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use super::users::hash_password;
use crate::dtos::auth::CreateUserRequest;
use crate::dtos::org::CreateOrganizationRequest;
use crate::middleware::CurrentUser;
use crate::models::{Organization, User, UserResponse};
use crate::services::{authz, ServiceError};
use crate::utils::ValidatedJson;
use crate::AppState;

/// Create an organization with the caller as its first member.
///
/// POST /organizations
pub async fn create_organization(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    ValidatedJson(req): ValidatedJson<CreateOrganizationRequest>,
) -> Result<(StatusCode, Json<Organization>), AppError> {
    let organization = Organization::new(req.name);
    state
        .relations
        .create_organization(&organization, principal.user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(organization)))
}

/// GET /organizations
pub async fn list_my_organizations(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
) -> Result<Json<Vec<Organization>>, AppError> {
    Ok(Json(
        state.db.organizations_for_user(principal.user_id).await?,
    ))
}

/// GET /organizations/:organization_id
pub async fn get_organization(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Path(organization_id): Path<Uuid>,
) -> Result<Json<Organization>, AppError> {
    let organization = state
        .db
        .find_organization(organization_id)
        .await?
        .ok_or(ServiceError::NotFound("Organization"))?;

    Ok(Json(organization))
}

/// Create a user inside the organization.
///
/// POST /organizations/:organization_id/users
pub async fn add_employee(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(organization_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    authz::require_org_superuser(&state.db, &principal, organization_id).await?;

    let digest = hash_password(&state, req.password).await?;
    let user = User::new(req.name, req.email, digest.into_string(), req.role);
    state.relations.add_employee(organization_id, &user).await?;

    Ok((StatusCode::CREATED, Json(user.sanitized())))
}

/// Add an existing user to the organization.
///
/// PUT /organizations/:organization_id/users/:user_id
pub async fn add_member(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path((organization_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    authz::require_org_superuser(&state.db, &principal, organization_id).await?;
    state.relations.add_member(organization_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /organizations/:organization_id/users/:user_id
pub async fn remove_member(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path((organization_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    authz::require_org_superuser(&state.db, &principal, organization_id).await?;
    state.relations.remove_member(organization_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /organizations/:organization_id
pub async fn delete_organization(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(organization_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    authz::require_org_superuser(&state.db, &principal, organization_id).await?;
    state.relations.delete_organization(organization_id).await?;
    tracing::info!(%organization_id, deleted_by = %principal.user_id, "Organization deleted");
    Ok(StatusCode::NO_CONTENT)
}
