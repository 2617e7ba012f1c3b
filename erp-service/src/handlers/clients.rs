use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::records::{CreateClientRequest, UpdateClientRequest};
use crate::dtos::{Page, PaginationParams};
use crate::models::{Client, ClientDetails};
use crate::services::ServiceError;
use crate::utils::ValidatedJson;
use crate::AppState;

/// GET /clients
pub async fn list_clients(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Page<Client>>, AppError> {
    params.validate()?;
    Ok(Json(state.db.list_clients(params).await?))
}

/// POST /clients
pub async fn create_client(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateClientRequest>,
) -> Result<(StatusCode, Json<Client>), AppError> {
    let client = Client::new(req.name, req.email, req.phone);
    state.db.insert_client(&client).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

/// GET /clients/:client_id
///
/// Includes the companies the client is related to.
pub async fn get_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> Result<Json<ClientDetails>, AppError> {
    let client = state
        .db
        .find_client(client_id)
        .await?
        .ok_or(ServiceError::NotFound("Client"))?;
    let companies = state.db.companies_for_client(client_id).await?;

    Ok(Json(ClientDetails { client, companies }))
}

/// PUT /clients/:client_id
pub async fn update_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateClientRequest>,
) -> Result<Json<Client>, AppError> {
    let client = state
        .db
        .update_client(
            client_id,
            req.name.as_deref(),
            req.email.as_deref(),
            req.phone.as_deref(),
        )
        .await?
        .ok_or(ServiceError::NotFound("Client"))?;

    Ok(Json(client))
}

/// DELETE /clients/:client_id
pub async fn delete_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.relations.delete_client(client_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
