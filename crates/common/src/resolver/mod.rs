//! Redirect resolution
//!
//! Resolves requested slugs against current and historical addresses:
//! - live content always wins over history
//! - a retired slug produces a single-hop redirect to the canonical path
//!   rebuilt from current slugs
//! - anything else is not found
//!
//! Decisions here are transport-agnostic. The HTTP boundary turns a
//! [`Resolution::Redirect`] into a 301 or a partial-navigation response and
//! re-attaches the original query string.

use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::debug;

use crate::db::models::{Category, Country, Post, Tag};
use crate::db::{ScopeKey, SlugStore};
use crate::errors::Result;
use crate::slug::EntityKind;

/// Characters escaped when a slug is embedded in a path segment.
/// Unreserved characters pass through; everything else (including the
/// Unicode in tag slugs) is percent-encoded.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn encode_segment(s: &str) -> String {
    utf8_percent_encode(s, PATH_SEGMENT).to_string()
}

/// Outcome of resolving a requested address
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution<T> {
    /// The requested slugs are all current; serve the content directly
    Found(T),

    /// A retired slug matched; the content lives at the canonical address
    Redirect(RedirectTarget),

    /// Nothing current or historical matches
    NotFound,
}

/// Canonical address for a redirect, one hop, never chained
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedirectTarget {
    /// Absolute path built from current slugs, percent-encoded
    pub canonical_path: String,
}

impl RedirectTarget {
    pub fn new(canonical_path: String) -> Self {
        Self { canonical_path }
    }

    /// Final redirect address: the canonical path with the original query
    /// string appended byte for byte.
    pub fn location(&self, raw_query: Option<&str>) -> String {
        match raw_query {
            Some(q) if !q.is_empty() => format!("{}?{}", self.canonical_path, q),
            _ => self.canonical_path.clone(),
        }
    }
}

/// A resolved category listing location
#[derive(Clone, Debug, PartialEq)]
pub struct CategoryLocation {
    pub country: Country,
    pub category: Category,
}

/// A resolved post location
#[derive(Clone, Debug, PartialEq)]
pub struct PostLocation {
    pub country: Country,
    pub post: Post,
}

// Canonical path builders. Paths always carry a trailing slash.

pub fn country_path(country: &Country) -> String {
    format!("/{}/", encode_segment(&country.slug))
}

pub fn tag_path(tag: &Tag) -> String {
    format!("/tags/{}/", encode_segment(&tag.slug))
}

pub fn category_path(country: &Country, category: Category) -> String {
    format!("/{}/{}/", encode_segment(&country.slug), category.as_slug())
}

pub fn post_path(country: &Country, post: &Post) -> String {
    format!(
        "/{}/{}/{}/",
        encode_segment(&country.slug),
        post.category_slug(),
        encode_segment(&post.slug)
    )
}

/// Resolves request addresses to content or canonical redirects.
///
/// Strictly read-only. Publication visibility is a display concern left to
/// the caller: a live but unpublished post still owns its slug here.
pub struct RedirectResolver {
    store: Arc<dyn SlugStore>,
}

impl RedirectResolver {
    pub fn new(store: Arc<dyn SlugStore>) -> Self {
        Self { store }
    }

    /// Locate a country by current or retired slug, flagging staleness
    async fn locate_country(&self, requested: &str) -> Result<Option<(Country, bool)>> {
        if let Some(country) = self.store.country_by_slug(requested).await? {
            return Ok(Some((country, false)));
        }

        if let Some(hit) = self
            .store
            .find_history(EntityKind::Country, ScopeKey::Global, requested)
            .await?
        {
            if let Some(country) = self.store.country_by_id(hit.entity_id).await? {
                return Ok(Some((country, true)));
            }
            debug!(requested, "History row points at a missing country");
        }

        Ok(None)
    }

    /// Resolve a country page address
    pub async fn resolve_country(&self, requested: &str) -> Result<Resolution<Country>> {
        match self.locate_country(requested).await? {
            Some((country, false)) => Ok(Resolution::Found(country)),
            Some((country, true)) => Ok(Resolution::Redirect(RedirectTarget::new(country_path(
                &country,
            )))),
            None => Ok(Resolution::NotFound),
        }
    }

    /// Resolve a tag page address
    pub async fn resolve_tag(&self, requested: &str) -> Result<Resolution<Tag>> {
        if let Some(tag) = self.store.tag_by_slug(requested).await? {
            return Ok(Resolution::Found(tag));
        }

        if let Some(hit) = self
            .store
            .find_history(EntityKind::Tag, ScopeKey::Global, requested)
            .await?
        {
            if let Some(tag) = self.store.tag_by_id(hit.entity_id).await? {
                return Ok(Resolution::Redirect(RedirectTarget::new(tag_path(&tag))));
            }
            debug!(requested, "History row points at a missing tag");
        }

        Ok(Resolution::NotFound)
    }

    /// Resolve a category listing address. A stale country slug redirects to
    /// the listing under the country's current slug; an unknown category
    /// segment never resolves.
    pub async fn resolve_category(
        &self,
        country_slug: &str,
        category_slug: &str,
    ) -> Result<Resolution<CategoryLocation>> {
        let Some(category) = Category::from_slug(category_slug) else {
            return Ok(Resolution::NotFound);
        };

        match self.locate_country(country_slug).await? {
            Some((country, false)) => Ok(Resolution::Found(CategoryLocation { country, category })),
            Some((country, true)) => Ok(Resolution::Redirect(RedirectTarget::new(category_path(
                &country, category,
            )))),
            None => Ok(Resolution::NotFound),
        }
    }

    /// Resolve a post address within its (country, category) scope.
    ///
    /// Any stale component (country slug, post slug, or both) collapses into
    /// one redirect to the fully canonical path. A post that moved to
    /// another country redirects to its current home.
    pub async fn resolve_post(
        &self,
        country_slug: &str,
        category_slug: &str,
        post_slug: &str,
    ) -> Result<Resolution<PostLocation>> {
        let Some(category) = Category::from_slug(category_slug) else {
            return Ok(Resolution::NotFound);
        };

        let Some((country, country_stale)) = self.locate_country(country_slug).await? else {
            return Ok(Resolution::NotFound);
        };

        // Live post wins within the scope.
        if let Some(post) = self
            .store
            .post_in_scope(country.id, category, post_slug)
            .await?
        {
            if country_stale {
                return Ok(Resolution::Redirect(RedirectTarget::new(post_path(
                    &country, &post,
                ))));
            }
            return Ok(Resolution::Found(PostLocation { country, post }));
        }

        // One hop through scoped history.
        let scope = ScopeKey::CountryCategory {
            country_id: country.id,
            category,
        };
        if let Some(hit) = self.store.find_history(EntityKind::Post, scope, post_slug).await? {
            if let Some(post) = self.store.post_by_id(hit.entity_id).await? {
                // Canonical path is built from the post's current home,
                // which may differ from the scope that matched.
                let home = if post.country_id == country.id {
                    country
                } else {
                    match self.store.country_by_id(post.country_id).await? {
                        Some(home) => home,
                        None => return Ok(Resolution::NotFound),
                    }
                };
                return Ok(Resolution::Redirect(RedirectTarget::new(post_path(
                    &home, &post,
                ))));
            }
            debug!(post_slug, "History row points at a missing post");
        }

        Ok(Resolution::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use sea_orm::prelude::DateTimeWithTimeZone;
    use uuid::Uuid;

    fn now() -> DateTimeWithTimeZone {
        chrono::Utc::now().into()
    }

    fn country(slug: &str) -> Country {
        Country {
            id: Uuid::new_v4(),
            name: slug.to_string(),
            name_en: None,
            slug: slug.to_string(),
            iso_a2: None,
            iso_a3: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn tag(slug: &str) -> Tag {
        Tag {
            id: Uuid::new_v4(),
            name: slug.to_string(),
            slug: slug.to_string(),
            created_at: now(),
            updated_at: now(),
        }
    }

    fn post(country_id: Uuid, category: Category, slug: &str) -> Post {
        Post {
            id: Uuid::new_v4(),
            country_id,
            category: category.as_str().to_string(),
            title: slug.to_string(),
            slug: slug.to_string(),
            content: String::new(),
            is_published: true,
            published_at: Some(chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()),
            created_at: now(),
            updated_at: now(),
        }
    }

    async fn rename_country(store: &MemoryStore, old: &Country, new_slug: &str) -> Country {
        let renamed = Country {
            slug: new_slug.to_string(),
            updated_at: now(),
            ..old.clone()
        };
        let renamed = store.update_country(renamed).await.unwrap();
        store
            .record_history(EntityKind::Country, old.id, ScopeKey::Global, &old.slug)
            .await
            .unwrap();
        renamed
    }

    async fn rename_tag(store: &MemoryStore, old: &Tag, new_slug: &str) -> Tag {
        let renamed = Tag {
            slug: new_slug.to_string(),
            updated_at: now(),
            ..old.clone()
        };
        let renamed = store.update_tag(renamed).await.unwrap();
        store
            .record_history(EntityKind::Tag, old.id, ScopeKey::Global, &old.slug)
            .await
            .unwrap();
        renamed
    }

    async fn rename_post(store: &MemoryStore, old: &Post, new_slug: &str) -> Post {
        let renamed = Post {
            slug: new_slug.to_string(),
            updated_at: now(),
            ..old.clone()
        };
        let renamed = store.update_post(renamed).await.unwrap();
        store
            .record_history(
                EntityKind::Post,
                old.id,
                ScopeKey::CountryCategory {
                    country_id: old.country_id,
                    category: old.category(),
                },
                &old.slug,
            )
            .await
            .unwrap();
        renamed
    }

    fn resolver(store: &MemoryStore) -> RedirectResolver {
        RedirectResolver::new(Arc::new(store.clone()))
    }

    #[tokio::test]
    async fn test_live_country_found() {
        let store = MemoryStore::new();
        store.insert_country(country("korea")).await.unwrap();

        let res = resolver(&store).resolve_country("korea").await.unwrap();
        assert!(matches!(res, Resolution::Found(c) if c.slug == "korea"));
    }

    #[tokio::test]
    async fn test_renamed_country_redirects_to_current_path() {
        let store = MemoryStore::new();
        let korea = store.insert_country(country("korea")).await.unwrap();
        rename_country(&store, &korea, "south-korea").await;

        let res = resolver(&store).resolve_country("korea").await.unwrap();
        assert_eq!(
            res,
            Resolution::Redirect(RedirectTarget::new("/south-korea/".to_string()))
        );
    }

    #[tokio::test]
    async fn test_unknown_slug_not_found() {
        let store = MemoryStore::new();
        let res = resolver(&store).resolve_country("atlantis").await.unwrap();
        assert_eq!(res, Resolution::NotFound);
    }

    #[tokio::test]
    async fn test_live_wins_over_history() {
        let store = MemoryStore::new();
        // "x" retires from the first tag, then a second tag adopts it.
        let first = store.insert_tag(tag("x")).await.unwrap();
        rename_tag(&store, &first, "y").await;
        let second = store.insert_tag(tag("x")).await.unwrap();

        let res = resolver(&store).resolve_tag("x").await.unwrap();
        assert!(matches!(res, Resolution::Found(t) if t.id == second.id));
    }

    #[tokio::test]
    async fn test_single_hop_after_two_renames() {
        let store = MemoryStore::new();
        let t = store.insert_tag(tag("a")).await.unwrap();
        let t = rename_tag(&store, &t, "b").await;
        rename_tag(&store, &t, "c").await;

        let r = resolver(&store);
        assert_eq!(
            r.resolve_tag("a").await.unwrap(),
            Resolution::Redirect(RedirectTarget::new("/tags/c/".to_string()))
        );
        assert_eq!(
            r.resolve_tag("b").await.unwrap(),
            Resolution::Redirect(RedirectTarget::new("/tags/c/".to_string()))
        );
    }

    #[tokio::test]
    async fn test_unicode_tag_path_is_percent_encoded() {
        let store = MemoryStore::new();
        let t = store.insert_tag(tag("서울")).await.unwrap();
        rename_tag(&store, &t, "서울-여행").await;

        let res = resolver(&store).resolve_tag("서울").await.unwrap();
        assert_eq!(
            res,
            Resolution::Redirect(RedirectTarget::new(
                "/tags/%EC%84%9C%EC%9A%B8-%EC%97%AC%ED%96%89/".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_renamed_post_redirects_within_scope() {
        let store = MemoryStore::new();
        let kr = store.insert_country(country("kr")).await.unwrap();
        let p = store
            .insert_post(post(kr.id, Category::Travel, "seoul-trip"))
            .await
            .unwrap();
        rename_post(&store, &p, "seoul-trip-2024").await;

        let res = resolver(&store)
            .resolve_post("kr", "travel", "seoul-trip")
            .await
            .unwrap();
        assert_eq!(
            res,
            Resolution::Redirect(RedirectTarget::new(
                "/kr/travel/seoul-trip-2024/".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_post_history_is_scoped_by_category() {
        let store = MemoryStore::new();
        let kr = store.insert_country(country("kr")).await.unwrap();
        let p = store
            .insert_post(post(kr.id, Category::Travel, "seoul-trip"))
            .await
            .unwrap();
        rename_post(&store, &p, "seoul-trip-2024").await;

        // The retired slug only redirects under the scope it was recorded in.
        let res = resolver(&store)
            .resolve_post("kr", "culture", "seoul-trip")
            .await
            .unwrap();
        assert_eq!(res, Resolution::NotFound);
    }

    #[tokio::test]
    async fn test_unknown_category_segment_never_resolves() {
        let store = MemoryStore::new();
        let kr = store.insert_country(country("kr")).await.unwrap();
        store
            .insert_post(post(kr.id, Category::Travel, "seoul-trip"))
            .await
            .unwrap();

        let r = resolver(&store);
        assert_eq!(
            r.resolve_post("kr", "trave", "seoul-trip").await.unwrap(),
            Resolution::NotFound
        );
        assert_eq!(
            r.resolve_category("kr", "trave").await.unwrap(),
            Resolution::NotFound
        );
    }

    #[tokio::test]
    async fn test_stale_country_slug_redirects_post_to_canonical() {
        let store = MemoryStore::new();
        let kr = store.insert_country(country("kr")).await.unwrap();
        store
            .insert_post(post(kr.id, Category::Travel, "seoul-trip-2024"))
            .await
            .unwrap();
        rename_country(&store, &kr, "south-korea").await;

        let res = resolver(&store)
            .resolve_post("kr", "travel", "seoul-trip-2024")
            .await
            .unwrap();
        assert_eq!(
            res,
            Resolution::Redirect(RedirectTarget::new(
                "/south-korea/travel/seoul-trip-2024/".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_both_components_stale_still_one_hop() {
        let store = MemoryStore::new();
        let kr = store.insert_country(country("kr")).await.unwrap();
        let p = store
            .insert_post(post(kr.id, Category::Travel, "seoul-trip"))
            .await
            .unwrap();
        rename_post(&store, &p, "seoul-trip-2024").await;
        rename_country(&store, &kr, "south-korea").await;

        let res = resolver(&store)
            .resolve_post("kr", "travel", "seoul-trip")
            .await
            .unwrap();
        assert_eq!(
            res,
            Resolution::Redirect(RedirectTarget::new(
                "/south-korea/travel/seoul-trip-2024/".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_stale_category_listing_redirects() {
        let store = MemoryStore::new();
        let kr = store.insert_country(country("kr")).await.unwrap();
        rename_country(&store, &kr, "south-korea").await;

        let res = resolver(&store)
            .resolve_category("kr", "travel")
            .await
            .unwrap();
        assert_eq!(
            res,
            Resolution::Redirect(RedirectTarget::new("/south-korea/travel/".to_string()))
        );
    }

    #[test]
    fn test_location_preserves_query_bytes() {
        let target = RedirectTarget::new("/kr/travel/seoul-trip-2024/".to_string());
        assert_eq!(
            target.location(Some("page=2")),
            "/kr/travel/seoul-trip-2024/?page=2"
        );
        assert_eq!(
            target.location(Some("a=%20b&c=d+e")),
            "/kr/travel/seoul-trip-2024/?a=%20b&c=d+e"
        );
        assert_eq!(target.location(None), "/kr/travel/seoul-trip-2024/");
        assert_eq!(target.location(Some("")), "/kr/travel/seoul-trip-2024/");
    }
}
