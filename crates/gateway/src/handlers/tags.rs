//! Tag editorial handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use waypost_common::{
    db::models::Tag,
    errors::{AppError, Result},
    lifecycle::{SlugLifecycleManager, TagDraft},
};

/// Request to create or replace a tag
#[derive(Debug, Deserialize, Validate)]
pub struct TagPayload {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    /// Blank to derive one from the name; Unicode is allowed
    pub slug: Option<String>,
}

impl From<TagPayload> for TagDraft {
    fn from(payload: TagPayload) -> Self {
        TagDraft {
            name: payload.name,
            slug: payload.slug,
        }
    }
}

/// Tag representation returned by the API
#[derive(Serialize)]
pub struct TagResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        TagResponse {
            id: tag.id,
            name: tag.name,
            slug: tag.slug,
            created_at: tag.created_at.to_rfc3339(),
            updated_at: tag.updated_at.to_rfc3339(),
        }
    }
}

/// Create a tag
pub async fn create_tag(
    State(state): State<AppState>,
    Json(payload): Json<TagPayload>,
) -> Result<(StatusCode, Json<TagResponse>)> {
    payload.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let lifecycle =
        SlugLifecycleManager::new(state.store.clone(), state.config.site.utc_offset_hours);
    let tag = lifecycle.create_tag(payload.into()).await?;

    Ok((StatusCode::CREATED, Json(TagResponse::from(tag))))
}

/// Replace a tag; a slug change retires the old address
pub async fn update_tag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TagPayload>,
) -> Result<Json<TagResponse>> {
    payload.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let lifecycle =
        SlugLifecycleManager::new(state.store.clone(), state.config.site.utc_offset_hours);
    let tag = lifecycle.update_tag(id, payload.into()).await?;

    Ok(Json(TagResponse::from(tag)))
}

/// Delete a tag and its history
pub async fn delete_tag(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    let lifecycle =
        SlugLifecycleManager::new(state.store.clone(), state.config.site.utc_offset_hours);
    lifecycle.delete_tag(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
