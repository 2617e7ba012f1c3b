use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::records::{CreateAccountRequest, LinkRequest};
use crate::dtos::{Page, PaginationParams};
use crate::models::{Account, AccountDetails};
use crate::services::ServiceError;
use crate::utils::ValidatedJson;
use crate::AppState;

async fn account_details(state: &AppState, account_id: Uuid) -> Result<AccountDetails, AppError> {
    let account = state
        .db
        .find_account(account_id)
        .await?
        .ok_or(ServiceError::NotFound("Account"))?;
    let company = state
        .db
        .find_company(&account.rnc)
        .await?
        .ok_or(ServiceError::NotFound("Company"))?;
    let services = state.db.services_for_account(account_id).await?;

    Ok(AccountDetails {
        account,
        company,
        services,
    })
}

/// GET /accounts
pub async fn list_accounts(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Page<Account>>, AppError> {
    params.validate()?;
    Ok(Json(state.db.list_accounts(params).await?))
}

/// Open an account for a company that has none yet.
///
/// POST /accounts
pub async fn create_account(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateAccountRequest>,
) -> Result<(StatusCode, Json<AccountDetails>), AppError> {
    let account = Account::new(req.rnc);
    state
        .relations
        .create_account(&account, &req.services)
        .await?;

    let details = account_details(&state, account.account_id).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

/// GET /accounts/:account_id
pub async fn get_account(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<AccountDetails>, AppError> {
    Ok(Json(account_details(&state, account_id).await?))
}

/// DELETE /accounts/:account_id
pub async fn delete_account(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.relations.delete_account(account_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /accounts/:account_id/services
pub async fn link_services(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<LinkRequest>,
) -> Result<Json<AccountDetails>, AppError> {
    state.relations.link_services(account_id, &req.ids).await?;
    Ok(Json(account_details(&state, account_id).await?))
}

/// DELETE /accounts/:account_id/services/:service_id
pub async fn unlink_service(
    State(state): State<AppState>,
    Path((account_id, service_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    state
        .relations
        .unlink_service(account_id, service_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
