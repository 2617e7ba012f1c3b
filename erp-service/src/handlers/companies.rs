use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::records::{CreateCompanyRequest, LinkRequest, UpdateCompanyRequest};
use crate::dtos::{Page, PaginationParams};
use crate::models::{AccountSummary, Company, CompanyDetails};
use crate::services::ServiceError;
use crate::utils::ValidatedJson;
use crate::AppState;

/// Company with its related clients and, if it has one, its account.
async fn company_details(
    state: &AppState,
    rnc: &str,
) -> Result<CompanyDetails, AppError> {
    let company = state
        .db
        .find_company(rnc)
        .await?
        .ok_or(ServiceError::NotFound("Company"))?;
    let related = state.db.clients_for_company(rnc).await?;

    let account = match state.db.account_for_company(rnc).await? {
        Some(account) => {
            let services = state.db.services_for_account(account.account_id).await?;
            Some(AccountSummary { account, services })
        }
        None => None,
    };

    Ok(CompanyDetails {
        company,
        related,
        account,
    })
}

/// GET /companies
pub async fn list_companies(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Page<Company>>, AppError> {
    params.validate()?;
    Ok(Json(state.db.list_companies(params).await?))
}

/// POST /companies
///
/// Every id in `related` must name an existing client; otherwise nothing is
/// created.
pub async fn create_company(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateCompanyRequest>,
) -> Result<(StatusCode, Json<CompanyDetails>), AppError> {
    let company = Company::new(req.rnc, req.name, req.person_type);
    state
        .relations
        .create_company(&company, &req.related)
        .await?;

    let details = company_details(&state, &company.rnc).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

/// GET /companies/:rnc
pub async fn get_company(
    State(state): State<AppState>,
    Path(rnc): Path<String>,
) -> Result<Json<CompanyDetails>, AppError> {
    Ok(Json(company_details(&state, &rnc).await?))
}

/// PUT /companies/:rnc
pub async fn update_company(
    State(state): State<AppState>,
    Path(rnc): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateCompanyRequest>,
) -> Result<Json<Company>, AppError> {
    let company = state
        .db
        .update_company(&rnc, req.name.as_deref(), req.person_type)
        .await?
        .ok_or(ServiceError::NotFound("Company"))?;

    Ok(Json(company))
}

/// DELETE /companies/:rnc
///
/// Also removes the company's account.
pub async fn delete_company(
    State(state): State<AppState>,
    Path(rnc): Path<String>,
) -> Result<StatusCode, AppError> {
    state.relations.delete_company(&rnc).await?;
    tracing::info!(%rnc, "Company deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /companies/:rnc/clients
pub async fn link_clients(
    State(state): State<AppState>,
    Path(rnc): Path<String>,
    ValidatedJson(req): ValidatedJson<LinkRequest>,
) -> Result<Json<CompanyDetails>, AppError> {
    let linked = state.relations.link_clients(&rnc, &req.ids).await?;
    tracing::debug!(%rnc, linked, "Clients linked");
    Ok(Json(company_details(&state, &rnc).await?))
}

/// DELETE /companies/:rnc/clients/:client_id
pub async fn unlink_client(
    State(state): State<AppState>,
    Path((rnc, client_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, AppError> {
    state.relations.unlink_client(&rnc, client_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
