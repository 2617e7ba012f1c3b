use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::records::{CreateTagRequest, RenameTagItem};
use crate::dtos::{Page, PaginationParams};
use crate::models::{Tag, TagDetails};
use crate::services::ServiceError;
use crate::utils::ValidatedBatch;
use crate::AppState;

/// GET /tags
pub async fn list_tags(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Page<Tag>>, AppError> {
    params.validate()?;
    Ok(Json(state.db.list_tags(params).await?))
}

/// Create several tags at once.
///
/// POST /tags
pub async fn create_tags(
    State(state): State<AppState>,
    ValidatedBatch(items): ValidatedBatch<CreateTagRequest>,
) -> Result<(StatusCode, Json<Vec<Tag>>), AppError> {
    let tags: Vec<Tag> = items.into_iter().map(|item| Tag::new(item.name)).collect();
    state.db.insert_tags(&tags).await?;
    Ok((StatusCode::CREATED, Json(tags)))
}

/// PUT /tags
pub async fn rename_tags(
    State(state): State<AppState>,
    ValidatedBatch(items): ValidatedBatch<RenameTagItem>,
) -> Result<Json<Vec<Tag>>, AppError> {
    let items: Vec<(Uuid, String)> = items
        .into_iter()
        .map(|item| (item.tag_id, item.name))
        .collect();
    Ok(Json(state.db.rename_tags(&items).await?))
}

/// GET /tags/:tag_id
///
/// Includes the services carrying the tag.
pub async fn get_tag(
    State(state): State<AppState>,
    Path(tag_id): Path<Uuid>,
) -> Result<Json<TagDetails>, AppError> {
    let tag = state
        .db
        .find_tag(tag_id)
        .await?
        .ok_or(ServiceError::NotFound("Tag"))?;
    let services = state.db.services_for_tag(tag_id).await?;
    Ok(Json(TagDetails { tag, services }))
}

/// DELETE /tags/:tag_id
pub async fn delete_tag(
    State(state): State<AppState>,
    Path(tag_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.relations.delete_tag(tag_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
