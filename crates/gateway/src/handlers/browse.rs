//! Public browse and redirect handlers
//!
//! Every address resolves to live content (200), a single-hop redirect to
//! the canonical address, or a 404. Redirect replies follow the
//! partial-navigation contract in [`crate::navigation`].

use axum::{
    extract::{Path, RawQuery, State},
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::navigation::{redirect_reply, PartialNavigation};
use crate::AppState;
use waypost_common::{
    db::models::{Category, Post},
    errors::{AppError, Result},
    resolver::{CategoryLocation, PostLocation, RedirectResolver, Resolution},
    slug::EntityKind,
};

use super::countries::CountryResponse;
use super::posts::PostResponse;
use super::tags::TagResponse;

/// Post listing entry on category pages
#[derive(Serialize)]
pub struct PostSummary {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub published_at: Option<NaiveDate>,
}

impl From<Post> for PostSummary {
    fn from(post: Post) -> Self {
        PostSummary {
            id: post.id,
            title: post.title,
            slug: post.slug,
            published_at: post.published_at,
        }
    }
}

/// Category page: the country, the category, and its published posts
#[derive(Serialize)]
pub struct CategoryListingResponse {
    pub country: CountryResponse,
    pub category: Category,
    pub posts: Vec<PostSummary>,
}

/// Post page: the post with its country context
#[derive(Serialize)]
pub struct PostPageResponse {
    pub country: CountryResponse,
    pub post: PostResponse,
}

/// Tag index, ordered by name
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<TagResponse>>> {
    let tags = state.store.list_tags().await?;
    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}

/// Tag page, following retired slugs
pub async fn show_tag(
    State(state): State<AppState>,
    Path(tag_slug): Path<String>,
    RawQuery(query): RawQuery,
    partial: PartialNavigation,
) -> Result<Response> {
    let resolver = RedirectResolver::new(state.store.clone());
    match resolver.resolve_tag(&tag_slug).await? {
        Resolution::Found(tag) => Ok(Json(TagResponse::from(tag)).into_response()),
        Resolution::Redirect(target) => Ok(redirect_reply(
            EntityKind::Tag,
            &target,
            query.as_deref(),
            partial.0,
        )),
        Resolution::NotFound => Err(AppError::TagNotFound { id: tag_slug }),
    }
}

/// Country page, following retired slugs
pub async fn show_country(
    State(state): State<AppState>,
    Path(country_slug): Path<String>,
    RawQuery(query): RawQuery,
    partial: PartialNavigation,
) -> Result<Response> {
    let resolver = RedirectResolver::new(state.store.clone());
    match resolver.resolve_country(&country_slug).await? {
        Resolution::Found(country) => Ok(Json(CountryResponse::from(country)).into_response()),
        Resolution::Redirect(target) => Ok(redirect_reply(
            EntityKind::Country,
            &target,
            query.as_deref(),
            partial.0,
        )),
        Resolution::NotFound => Err(AppError::CountryNotFound { id: country_slug }),
    }
}

/// Category page: published posts in a (country, category) scope, newest
/// first. A stale country slug redirects to the canonical listing.
pub async fn list_category_posts(
    State(state): State<AppState>,
    Path((country_slug, category_slug)): Path<(String, String)>,
    RawQuery(query): RawQuery,
    partial: PartialNavigation,
) -> Result<Response> {
    let resolver = RedirectResolver::new(state.store.clone());
    match resolver
        .resolve_category(&country_slug, &category_slug)
        .await?
    {
        Resolution::Found(CategoryLocation { country, category }) => {
            let posts = state
                .store
                .published_posts_in_scope(country.id, category)
                .await?;
            Ok(Json(CategoryListingResponse {
                country: CountryResponse::from(country),
                category,
                posts: posts.into_iter().map(PostSummary::from).collect(),
            })
            .into_response())
        }
        Resolution::Redirect(target) => Ok(redirect_reply(
            EntityKind::Country,
            &target,
            query.as_deref(),
            partial.0,
        )),
        Resolution::NotFound => Err(AppError::NotFound {
            resource_type: "category".to_string(),
            id: format!("{country_slug}/{category_slug}"),
        }),
    }
}

/// Post page, following retired country and post slugs in one hop
pub async fn show_post(
    State(state): State<AppState>,
    Path((country_slug, category_slug, post_slug)): Path<(String, String, String)>,
    RawQuery(query): RawQuery,
    partial: PartialNavigation,
) -> Result<Response> {
    let resolver = RedirectResolver::new(state.store.clone());
    match resolver
        .resolve_post(&country_slug, &category_slug, &post_slug)
        .await?
    {
        Resolution::Found(PostLocation { country, post }) => {
            // A draft still owns its slug but is not publicly visible.
            if !post.is_published {
                return Err(AppError::PostNotFound { id: post_slug });
            }
            Ok(Json(PostPageResponse {
                country: CountryResponse::from(country),
                post: PostResponse::from(post),
            })
            .into_response())
        }
        Resolution::Redirect(target) => Ok(redirect_reply(
            EntityKind::Post,
            &target,
            query.as_deref(),
            partial.0,
        )),
        Resolution::NotFound => Err(AppError::PostNotFound { id: post_slug }),
    }
}
