//! Country editorial handlers

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
    db::models::Country,
    errors::{AppError, Result},
    lifecycle::{CountryDraft, SlugLifecycleManager},
};

/// Request to create or replace a country
#[derive(Debug, Deserialize, Validate)]
pub struct CountryPayload {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(length(max = 100))]
    pub name_en: Option<String>,

    /// Blank to derive one from the name
    pub slug: Option<String>,

    pub iso_a2: Option<String>,

    pub iso_a3: Option<String>,
}

impl From<CountryPayload> for CountryDraft {
    fn from(payload: CountryPayload) -> Self {
        CountryDraft {
            name: payload.name,
            name_en: payload.name_en,
            slug: payload.slug,
            iso_a2: payload.iso_a2,
            iso_a3: payload.iso_a3,
        }
    }
}

/// Country representation returned by the API
#[derive(Serialize)]
pub struct CountryResponse {
    pub id: Uuid,
    pub name: String,
    pub name_en: Option<String>,
    pub slug: String,
    pub iso_a2: Option<String>,
    pub iso_a3: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Country> for CountryResponse {
    fn from(country: Country) -> Self {
        CountryResponse {
            id: country.id,
            name: country.name,
            name_en: country.name_en,
            slug: country.slug,
            iso_a2: country.iso_a2,
            iso_a3: country.iso_a3,
            created_at: country.created_at.to_rfc3339(),
            updated_at: country.updated_at.to_rfc3339(),
        }
    }
}

/// Create a country
pub async fn create_country(
    State(state): State<AppState>,
    Json(payload): Json<CountryPayload>,
) -> Result<(StatusCode, Json<CountryResponse>)> {
    payload.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let lifecycle =
        SlugLifecycleManager::new(state.store.clone(), state.config.site.utc_offset_hours);
    let country = lifecycle.create_country(payload.into()).await?;

    Ok((StatusCode::CREATED, Json(CountryResponse::from(country))))
}

/// Replace a country; a slug change retires the old address
pub async fn update_country(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CountryPayload>,
) -> Result<Json<CountryResponse>> {
    payload.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let lifecycle =
        SlugLifecycleManager::new(state.store.clone(), state.config.site.utc_offset_hours);
    let country = lifecycle.update_country(id, payload.into()).await?;

    Ok(Json(CountryResponse::from(country)))
}

/// Delete a country; its posts and history rows cascade away
pub async fn delete_country(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let lifecycle =
        SlugLifecycleManager::new(state.store.clone(), state.config.site.utc_offset_hours);
    lifecycle.delete_country(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
