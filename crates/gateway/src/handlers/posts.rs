//! Post editorial handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use waypost_common::{
    db::models::{Category, Post},
    errors::{AppError, Result},
    lifecycle::{PostDraft, SlugLifecycleManager},
};

fn default_published() -> bool {
    true
}

/// Request to create or replace a post
#[derive(Debug, Deserialize, Validate)]
pub struct PostPayload {
    pub country_id: Uuid,

    pub category: Category,

    #[validate(length(min = 1, max = 200))]
    pub title: String,

    /// Blank to derive one from the title
    pub slug: Option<String>,

    #[serde(default)]
    pub content: String,

    #[serde(default = "default_published")]
    pub is_published: bool,

    pub published_at: Option<NaiveDate>,
}

impl From<PostPayload> for PostDraft {
    fn from(payload: PostPayload) -> Self {
        PostDraft {
            country_id: payload.country_id,
            category: payload.category,
            title: payload.title,
            slug: payload.slug,
            content: payload.content,
            is_published: payload.is_published,
            published_at: payload.published_at,
        }
    }
}

/// Post representation returned by the API
#[derive(Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub country_id: Uuid,
    pub category: Category,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub is_published: bool,
    pub published_at: Option<NaiveDate>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        PostResponse {
            category: post.category(),
            id: post.id,
            country_id: post.country_id,
            title: post.title,
            slug: post.slug,
            content: post.content,
            is_published: post.is_published,
            published_at: post.published_at,
            created_at: post.created_at.to_rfc3339(),
            updated_at: post.updated_at.to_rfc3339(),
        }
    }
}

/// Create a post under a country and category
pub async fn create_post(
    State(state): State<AppState>,
    Json(payload): Json<PostPayload>,
) -> Result<(StatusCode, Json<PostResponse>)> {
    payload.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let lifecycle =
        SlugLifecycleManager::new(state.store.clone(), state.config.site.utc_offset_hours);
    let post = lifecycle.create_post(payload.into()).await?;

    Ok((StatusCode::CREATED, Json(PostResponse::from(post))))
}

/// Replace a post; a slug, country, or category change retires the old
/// address in its old scope
pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PostPayload>,
) -> Result<Json<PostResponse>> {
    payload.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let lifecycle =
        SlugLifecycleManager::new(state.store.clone(), state.config.site.utc_offset_hours);
    let post = lifecycle.update_post(id, payload.into()).await?;

    Ok(Json(PostResponse::from(post)))
}

/// Delete a post and its history
pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let lifecycle =
        SlugLifecycleManager::new(state.store.clone(), state.config.site.utc_offset_hours);
    lifecycle.delete_post(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
