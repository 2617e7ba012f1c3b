use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::records::{CreateServiceRequest, LinkRequest, RenameServiceItem};
use crate::dtos::{Page, PaginationParams};
use crate::models::{Service, ServiceDetails};
use crate::services::ServiceError;
use crate::utils::{ValidatedBatch, ValidatedJson};
use crate::AppState;

async fn service_details(state: &AppState, service_id: Uuid) -> Result<ServiceDetails, AppError> {
    let service = state
        .db
        .find_service(service_id)
        .await?
        .ok_or(ServiceError::NotFound("Service"))?;
    let tags = state.db.tags_for_service(service_id).await?;
    Ok(ServiceDetails { service, tags })
}

/// GET /services
pub async fn list_services(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Page<Service>>, AppError> {
    params.validate()?;
    Ok(Json(state.db.list_services(params).await?))
}

/// POST /services
pub async fn create_service(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateServiceRequest>,
) -> Result<(StatusCode, Json<ServiceDetails>), AppError> {
    let service = Service::new(req.name);
    state.relations.create_service(&service, &req.tags).await?;

    let details = service_details(&state, service.service_id).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

/// Rename several services. Any unknown id fails the batch.
///
/// PUT /services
pub async fn rename_services(
    State(state): State<AppState>,
    ValidatedBatch(items): ValidatedBatch<RenameServiceItem>,
) -> Result<Json<Vec<Service>>, AppError> {
    let items: Vec<(Uuid, String)> = items
        .into_iter()
        .map(|item| (item.service_id, item.name))
        .collect();
    Ok(Json(state.db.rename_services(&items).await?))
}

/// GET /services/:service_id
pub async fn get_service(
    State(state): State<AppState>,
    Path(service_id): Path<Uuid>,
) -> Result<Json<ServiceDetails>, AppError> {
    Ok(Json(service_details(&state, service_id).await?))
}

/// DELETE /services/:service_id
pub async fn delete_service(
    State(state): State<AppState>,
    Path(service_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.relations.delete_service(service_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /services/:service_id/tags
pub async fn link_tags(
    State(state): State<AppState>,
    Path(service_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<LinkRequest>,
) -> Result<Json<ServiceDetails>, AppError> {
    state.relations.link_tags(service_id, &req.ids).await?;
    Ok(Json(service_details(&state, service_id).await?))
}

/// DELETE /services/:service_id/tags/:tag_id
pub async fn unlink_tag(
    State(state): State<AppState>,
    Path((service_id, tag_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    state.relations.unlink_tag(service_id, tag_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
