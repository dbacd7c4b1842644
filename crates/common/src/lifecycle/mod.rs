//! Slug lifecycle orchestration
//!
//! The editorial write path for countries, tags, and posts: slug derivation,
//! rename detection, and history recording. This module is the only writer
//! of slug history; resolution never mutates anything.

use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::models::{Category, Country, Post, Tag};
use crate::db::{HistoryOutcome, ScopeKey, SlugStore};
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::slug::{self, EntityKind};

/// Regeneration attempts after a derived slug loses a persist race
const MAX_CONFLICT_RETRIES: u32 = 3;

/// Editorial input for creating or updating a country.
/// A blank `slug` means "derive one from the name".
#[derive(Clone, Debug, Default)]
pub struct CountryDraft {
    pub name: String,
    pub name_en: Option<String>,
    pub slug: Option<String>,
    pub iso_a2: Option<String>,
    pub iso_a3: Option<String>,
}

impl CountryDraft {
    /// Slug derivation prefers the English name
    fn base_text(&self) -> &str {
        self.name_en
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.name)
    }
}

/// Editorial input for creating or updating a tag
#[derive(Clone, Debug, Default)]
pub struct TagDraft {
    pub name: String,
    pub slug: Option<String>,
}

/// Editorial input for creating or updating a post
#[derive(Clone, Debug)]
pub struct PostDraft {
    pub country_id: Uuid,
    pub category: Category,
    pub title: String,
    pub slug: Option<String>,
    pub content: String,
    pub is_published: bool,
    pub published_at: Option<NaiveDate>,
}

/// Editor-supplied slug: trimmed and checked against the kind's charset and
/// length rules. Blank input means "derive one for me".
fn explicit_slug(kind: EntityKind, input: Option<&str>) -> Result<Option<String>> {
    let Some(trimmed) = input.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    let rules = kind.rules();
    if trimmed.chars().count() > rules.max_len {
        return Err(AppError::Validation {
            message: format!(
                "{} slug exceeds {} characters",
                kind.as_str(),
                rules.max_len
            ),
            field: Some("slug".to_string()),
        });
    }
    if !slug::is_valid_slug(rules.charset, trimmed) {
        return Err(AppError::Validation {
            message: format!("'{trimmed}' is not a valid {} slug", kind.as_str()),
            field: Some("slug".to_string()),
        });
    }

    Ok(Some(trimmed.to_string()))
}

/// ISO codes are stored trimmed and uppercased; empty strings become NULL
/// so the unique index on `iso_a3` never compares empties.
fn normalize_iso(code: Option<&str>) -> Option<String> {
    code.map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_uppercase)
}

/// Normalized ISO codes are fixed-width or absent
fn check_iso(code: Option<String>, field: &str, width: usize) -> Result<Option<String>> {
    match &code {
        Some(c) if c.chars().count() != width => Err(AppError::Validation {
            message: format!("{field} must be exactly {width} characters"),
            field: Some(field.to_string()),
        }),
        _ => Ok(code),
    }
}

/// Today in the site's local time. An out-of-range configured offset falls
/// back to UTC.
fn today_at_site(utc_offset_hours: i32) -> NaiveDate {
    match FixedOffset::east_opt(utc_offset_hours * 3600) {
        Some(offset) => Utc::now().with_timezone(&offset).date_naive(),
        None => Utc::now().date_naive(),
    }
}

/// Decide whether a failed persist warrants another round with a freshly
/// derived slug. Only derived slugs are regenerated; a caller-chosen slug
/// conflict surfaces immediately.
fn note_retry(kind: EntityKind, err: AppError, derived: bool, attempts: &mut u32) -> Result<()> {
    if derived && *attempts < MAX_CONFLICT_RETRIES && err.is_slug_conflict() {
        *attempts += 1;
        metrics::record_conflict_retry(kind);
        warn!(
            kind = kind.as_str(),
            attempt = *attempts,
            "Slug persist raced a concurrent writer, regenerating"
        );
        Ok(())
    } else {
        Err(err)
    }
}

/// Orchestrates entity writes around the slug rules: derives slugs, persists,
/// and records retired addresses for redirects.
pub struct SlugLifecycleManager {
    store: Arc<dyn SlugStore>,
    utc_offset_hours: i32,
}

impl SlugLifecycleManager {
    pub fn new(store: Arc<dyn SlugStore>, utc_offset_hours: i32) -> Self {
        Self {
            store,
            utc_offset_hours,
        }
    }

    /// Derive a free slug from base text, skipping the entity's own row
    async fn derive(&self, kind: EntityKind, base: &str, own_id: Option<Uuid>) -> Result<String> {
        slug::generate(base, kind.rules(), |candidate| {
            let store = Arc::clone(&self.store);
            async move { store.slug_exists(kind, &candidate, own_id).await }
        })
        .await
    }

    /// A published post always carries a date. The draft's value wins, then
    /// the prior stored value, then today at the site.
    fn publication_date(&self, draft: &PostDraft, prior: Option<NaiveDate>) -> Option<NaiveDate> {
        let date = draft.published_at.or(prior);
        if draft.is_published && date.is_none() {
            Some(today_at_site(self.utc_offset_hours))
        } else {
            date
        }
    }

    /// After a successful persist, record the prior address if it changed
    async fn record_rename(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
        old_scope: ScopeKey,
        old_slug: &str,
        new_scope: ScopeKey,
        new_slug: &str,
    ) -> Result<()> {
        if old_slug.is_empty() || (old_scope == new_scope && old_slug == new_slug) {
            return Ok(());
        }

        // Re-adopting a previously held address must not leave the entity's
        // own history row redirecting its new current slug to itself.
        let reclaimed = self
            .store
            .reclaim_history(kind, entity_id, new_scope, new_slug)
            .await?;
        if reclaimed > 0 {
            info!(
                kind = kind.as_str(),
                slug = new_slug,
                reclaimed,
                "Removed re-adopted address from history"
            );
        }

        let outcome = self
            .store
            .record_history(kind, entity_id, old_scope, old_slug)
            .await?;
        metrics::record_history_outcome(kind, outcome);
        match outcome {
            HistoryOutcome::Recorded => {
                info!(
                    kind = kind.as_str(),
                    old_slug, new_slug, "Retired slug recorded for redirects"
                );
            }
            HistoryOutcome::Skipped(reason) => {
                info!(
                    kind = kind.as_str(),
                    old_slug,
                    reason = reason.as_str(),
                    "History row skipped"
                );
            }
        }
        Ok(())
    }

    // ==================== Countries ====================

    pub async fn create_country(&self, draft: CountryDraft) -> Result<Country> {
        let explicit = explicit_slug(EntityKind::Country, draft.slug.as_deref())?;
        let base = draft.base_text().to_string();
        let iso_a2 = check_iso(normalize_iso(draft.iso_a2.as_deref()), "iso_a2", 2)?;
        let iso_a3 = check_iso(normalize_iso(draft.iso_a3.as_deref()), "iso_a3", 3)?;

        let mut attempts = 0;
        loop {
            let slug = match &explicit {
                Some(s) => s.clone(),
                None => self.derive(EntityKind::Country, &base, None).await?,
            };
            let now = Utc::now().into();
            let country = Country {
                id: Uuid::new_v4(),
                name: draft.name.clone(),
                name_en: draft.name_en.clone(),
                slug,
                iso_a2: iso_a2.clone(),
                iso_a3: iso_a3.clone(),
                created_at: now,
                updated_at: now,
            };
            match self.store.insert_country(country).await {
                Ok(created) => {
                    info!(slug = %created.slug, "Created country");
                    return Ok(created);
                }
                Err(err) => note_retry(EntityKind::Country, err, explicit.is_none(), &mut attempts)?,
            }
        }
    }

    pub async fn update_country(&self, id: Uuid, draft: CountryDraft) -> Result<Country> {
        let existing = self
            .store
            .country_by_id(id)
            .await?
            .ok_or_else(|| AppError::CountryNotFound { id: id.to_string() })?;

        let explicit = explicit_slug(EntityKind::Country, draft.slug.as_deref())?;
        let base = draft.base_text().to_string();
        let iso_a2 = check_iso(normalize_iso(draft.iso_a2.as_deref()), "iso_a2", 2)?;
        let iso_a3 = check_iso(normalize_iso(draft.iso_a3.as_deref()), "iso_a3", 3)?;
        let old_slug = existing.slug.clone();

        let mut attempts = 0;
        loop {
            let slug = match &explicit {
                Some(s) => s.clone(),
                None => self.derive(EntityKind::Country, &base, Some(id)).await?,
            };
            let country = Country {
                id,
                name: draft.name.clone(),
                name_en: draft.name_en.clone(),
                slug,
                iso_a2: iso_a2.clone(),
                iso_a3: iso_a3.clone(),
                created_at: existing.created_at,
                updated_at: Utc::now().into(),
            };
            match self.store.update_country(country).await {
                Ok(saved) => {
                    self.record_rename(
                        EntityKind::Country,
                        id,
                        ScopeKey::Global,
                        &old_slug,
                        ScopeKey::Global,
                        &saved.slug,
                    )
                    .await?;
                    return Ok(saved);
                }
                Err(err) => note_retry(EntityKind::Country, err, explicit.is_none(), &mut attempts)?,
            }
        }
    }

    pub async fn delete_country(&self, id: Uuid) -> Result<()> {
        if !self.store.delete_country(id).await? {
            return Err(AppError::CountryNotFound { id: id.to_string() });
        }
        info!(%id, "Deleted country");
        Ok(())
    }

    // ==================== Tags ====================

    pub async fn create_tag(&self, draft: TagDraft) -> Result<Tag> {
        let explicit = explicit_slug(EntityKind::Tag, draft.slug.as_deref())?;

        let mut attempts = 0;
        loop {
            let slug = match &explicit {
                Some(s) => s.clone(),
                None => self.derive(EntityKind::Tag, &draft.name, None).await?,
            };
            let now = Utc::now().into();
            let tag = Tag {
                id: Uuid::new_v4(),
                name: draft.name.clone(),
                slug,
                created_at: now,
                updated_at: now,
            };
            match self.store.insert_tag(tag).await {
                Ok(created) => {
                    info!(slug = %created.slug, "Created tag");
                    return Ok(created);
                }
                Err(err) => note_retry(EntityKind::Tag, err, explicit.is_none(), &mut attempts)?,
            }
        }
    }

    pub async fn update_tag(&self, id: Uuid, draft: TagDraft) -> Result<Tag> {
        let existing = self
            .store
            .tag_by_id(id)
            .await?
            .ok_or_else(|| AppError::TagNotFound { id: id.to_string() })?;

        let explicit = explicit_slug(EntityKind::Tag, draft.slug.as_deref())?;
        let old_slug = existing.slug.clone();

        let mut attempts = 0;
        loop {
            let slug = match &explicit {
                Some(s) => s.clone(),
                None => self.derive(EntityKind::Tag, &draft.name, Some(id)).await?,
            };
            let tag = Tag {
                id,
                name: draft.name.clone(),
                slug,
                created_at: existing.created_at,
                updated_at: Utc::now().into(),
            };
            match self.store.update_tag(tag).await {
                Ok(saved) => {
                    self.record_rename(
                        EntityKind::Tag,
                        id,
                        ScopeKey::Global,
                        &old_slug,
                        ScopeKey::Global,
                        &saved.slug,
                    )
                    .await?;
                    return Ok(saved);
                }
                Err(err) => note_retry(EntityKind::Tag, err, explicit.is_none(), &mut attempts)?,
            }
        }
    }

    pub async fn delete_tag(&self, id: Uuid) -> Result<()> {
        if !self.store.delete_tag(id).await? {
            return Err(AppError::TagNotFound { id: id.to_string() });
        }
        info!(%id, "Deleted tag");
        Ok(())
    }

    // ==================== Posts ====================

    pub async fn create_post(&self, draft: PostDraft) -> Result<Post> {
        // The scope key cannot be formed around a missing country.
        if self.store.country_by_id(draft.country_id).await?.is_none() {
            return Err(AppError::CountryNotFound {
                id: draft.country_id.to_string(),
            });
        }

        let explicit = explicit_slug(EntityKind::Post, draft.slug.as_deref())?;
        let published_at = self.publication_date(&draft, None);

        let mut attempts = 0;
        loop {
            let slug = match &explicit {
                Some(s) => s.clone(),
                None => self.derive(EntityKind::Post, &draft.title, None).await?,
            };
            let now = Utc::now().into();
            let post = Post {
                id: Uuid::new_v4(),
                country_id: draft.country_id,
                category: draft.category.as_str().to_string(),
                title: draft.title.clone(),
                slug,
                content: draft.content.clone(),
                is_published: draft.is_published,
                published_at,
                created_at: now,
                updated_at: now,
            };
            match self.store.insert_post(post).await {
                Ok(created) => {
                    info!(slug = %created.slug, category = %created.category, "Created post");
                    return Ok(created);
                }
                Err(err) => note_retry(EntityKind::Post, err, explicit.is_none(), &mut attempts)?,
            }
        }
    }

    pub async fn update_post(&self, id: Uuid, draft: PostDraft) -> Result<Post> {
        let existing = self
            .store
            .post_by_id(id)
            .await?
            .ok_or_else(|| AppError::PostNotFound { id: id.to_string() })?;

        if existing.country_id != draft.country_id
            && self.store.country_by_id(draft.country_id).await?.is_none()
        {
            return Err(AppError::CountryNotFound {
                id: draft.country_id.to_string(),
            });
        }

        let explicit = explicit_slug(EntityKind::Post, draft.slug.as_deref())?;
        let old_scope = ScopeKey::CountryCategory {
            country_id: existing.country_id,
            category: existing.category(),
        };
        let old_slug = existing.slug.clone();
        let published_at = self.publication_date(&draft, existing.published_at);

        let mut attempts = 0;
        loop {
            let slug = match &explicit {
                Some(s) => s.clone(),
                None => self.derive(EntityKind::Post, &draft.title, Some(id)).await?,
            };
            let post = Post {
                id,
                country_id: draft.country_id,
                category: draft.category.as_str().to_string(),
                title: draft.title.clone(),
                slug,
                content: draft.content.clone(),
                is_published: draft.is_published,
                published_at,
                created_at: existing.created_at,
                updated_at: Utc::now().into(),
            };
            match self.store.update_post(post).await {
                Ok(saved) => {
                    let new_scope = ScopeKey::CountryCategory {
                        country_id: saved.country_id,
                        category: saved.category(),
                    };
                    self.record_rename(
                        EntityKind::Post,
                        id,
                        old_scope,
                        &old_slug,
                        new_scope,
                        &saved.slug,
                    )
                    .await?;
                    return Ok(saved);
                }
                Err(err) => note_retry(EntityKind::Post, err, explicit.is_none(), &mut attempts)?,
            }
        }
    }

    pub async fn delete_post(&self, id: Uuid) -> Result<()> {
        if !self.store.delete_post(id).await? {
            return Err(AppError::PostNotFound { id: id.to_string() });
        }
        info!(%id, "Deleted post");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn manager(store: &MemoryStore) -> SlugLifecycleManager {
        SlugLifecycleManager::new(Arc::new(store.clone()), 9)
    }

    fn country_draft(name: &str, name_en: Option<&str>) -> CountryDraft {
        CountryDraft {
            name: name.to_string(),
            name_en: name_en.map(str::to_string),
            ..CountryDraft::default()
        }
    }

    fn post_draft(country_id: Uuid, title: &str) -> PostDraft {
        PostDraft {
            country_id,
            category: Category::Travel,
            title: title.to_string(),
            slug: None,
            content: "body".to_string(),
            is_published: true,
            published_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_country_derives_slug_from_english_name() {
        let store = MemoryStore::new();
        let created = manager(&store)
            .create_country(country_draft("대한민국", Some("South Korea")))
            .await
            .unwrap();
        assert_eq!(created.slug, "south-korea");
    }

    #[tokio::test]
    async fn test_create_tag_keeps_unicode_slug() {
        let store = MemoryStore::new();
        let created = manager(&store)
            .create_tag(TagDraft {
                name: "서울 여행".to_string(),
                slug: None,
            })
            .await
            .unwrap();
        assert_eq!(created.slug, "서울-여행");
    }

    #[tokio::test]
    async fn test_explicit_slug_is_trimmed_and_kept() {
        let store = MemoryStore::new();
        let mut draft = country_draft("Korea", None);
        draft.slug = Some("  kr ".to_string());
        let created = manager(&store).create_country(draft).await.unwrap();
        assert_eq!(created.slug, "kr");
    }

    #[tokio::test]
    async fn test_explicit_slug_rejects_invalid_charset() {
        let store = MemoryStore::new();
        let mut draft = country_draft("Korea", None);
        draft.slug = Some("Hello World!".to_string());
        let err = manager(&store).create_country(draft).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_derived_collision_gets_suffix() {
        let store = MemoryStore::new();
        let mgr = manager(&store);
        let first = mgr
            .create_country(country_draft("Korea", Some("Korea")))
            .await
            .unwrap();
        let second = mgr
            .create_country(country_draft("Korea Two", Some("Korea")))
            .await
            .unwrap();
        assert_eq!(first.slug, "korea");
        assert_eq!(second.slug, "korea-2");
    }

    #[tokio::test]
    async fn test_explicit_conflict_surfaces_immediately() {
        let store = MemoryStore::new();
        let mgr = manager(&store);
        let mut draft = country_draft("Korea", None);
        draft.slug = Some("kr".to_string());
        mgr.create_country(draft.clone()).await.unwrap();

        draft.name = "Other Korea".to_string();
        let err = mgr.create_country(draft).await.unwrap_err();
        assert!(err.is_slug_conflict());
    }

    #[tokio::test]
    async fn test_rename_records_old_address() {
        let store = MemoryStore::new();
        let mgr = manager(&store);
        let created = mgr
            .create_country(country_draft("Korea", Some("Korea")))
            .await
            .unwrap();

        let mut draft = country_draft("Korea", Some("Korea"));
        draft.slug = Some("south-korea".to_string());
        let updated = mgr.update_country(created.id, draft).await.unwrap();
        assert_eq!(updated.slug, "south-korea");
        assert_eq!(updated.created_at, created.created_at);

        let hit = store
            .find_history(EntityKind::Country, ScopeKey::Global, "korea")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.entity_id, created.id);
    }

    #[tokio::test]
    async fn test_rename_back_reclaims_own_history() {
        let store = MemoryStore::new();
        let mgr = manager(&store);
        let tag = mgr
            .create_tag(TagDraft {
                name: "Food".to_string(),
                slug: Some("food".to_string()),
            })
            .await
            .unwrap();

        let rename = |slug: &str| TagDraft {
            name: "Food".to_string(),
            slug: Some(slug.to_string()),
        };
        mgr.update_tag(tag.id, rename("eating")).await.unwrap();
        mgr.update_tag(tag.id, rename("food")).await.unwrap();

        // "food" is current again; only "eating" may redirect.
        assert!(store
            .find_history(EntityKind::Tag, ScopeKey::Global, "food")
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find_history(EntityKind::Tag, ScopeKey::Global, "eating")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_unchanged_slug_records_nothing() {
        let store = MemoryStore::new();
        let mgr = manager(&store);
        let tag = mgr
            .create_tag(TagDraft {
                name: "Food".to_string(),
                slug: Some("food".to_string()),
            })
            .await
            .unwrap();

        mgr.update_tag(
            tag.id,
            TagDraft {
                name: "Food & Drink".to_string(),
                slug: Some("food".to_string()),
            },
        )
        .await
        .unwrap();

        assert!(store
            .find_history(EntityKind::Tag, ScopeKey::Global, "food")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_iso_codes_are_normalized() {
        let store = MemoryStore::new();
        let mut draft = country_draft("Korea", None);
        draft.iso_a2 = Some(" kr ".to_string());
        draft.iso_a3 = Some("kor".to_string());
        let created = manager(&store).create_country(draft).await.unwrap();
        assert_eq!(created.iso_a2.as_deref(), Some("KR"));
        assert_eq!(created.iso_a3.as_deref(), Some("KOR"));

        let mut blank = country_draft("Japan", None);
        blank.iso_a3 = Some("   ".to_string());
        let created = manager(&store).create_country(blank).await.unwrap();
        assert_eq!(created.iso_a3, None);
    }

    #[tokio::test]
    async fn test_wrong_width_iso_code_rejected() {
        let store = MemoryStore::new();
        let mut draft = country_draft("Korea", None);
        draft.iso_a3 = Some("KOREA".to_string());
        let err = manager(&store).create_country(draft).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_published_post_gets_default_date() {
        let store = MemoryStore::new();
        let mgr = manager(&store);
        let kr = mgr
            .create_country(country_draft("Korea", Some("Korea")))
            .await
            .unwrap();

        let published = mgr.create_post(post_draft(kr.id, "Seoul Trip")).await.unwrap();
        assert!(published.published_at.is_some());

        let mut draft = post_draft(kr.id, "Busan Draft");
        draft.is_published = false;
        let unpublished = mgr.create_post(draft).await.unwrap();
        assert_eq!(unpublished.published_at, None);
    }

    #[tokio::test]
    async fn test_update_keeps_existing_publication_date() {
        let store = MemoryStore::new();
        let mgr = manager(&store);
        let kr = mgr
            .create_country(country_draft("Korea", Some("Korea")))
            .await
            .unwrap();

        let date = chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let mut draft = post_draft(kr.id, "Seoul Trip");
        draft.published_at = Some(date);
        let post = mgr.create_post(draft).await.unwrap();

        // Updating without a date keeps the stored one.
        let updated = mgr
            .update_post(post.id, post_draft(kr.id, "Seoul Trip"))
            .await
            .unwrap();
        assert_eq!(updated.published_at, Some(date));
    }

    #[tokio::test]
    async fn test_category_move_records_history_in_old_scope() {
        let store = MemoryStore::new();
        let mgr = manager(&store);
        let kr = mgr
            .create_country(country_draft("Korea", Some("Korea")))
            .await
            .unwrap();
        let post = mgr.create_post(post_draft(kr.id, "Seoul Trip")).await.unwrap();
        assert_eq!(post.slug, "seoul-trip");

        let mut draft = post_draft(kr.id, "Seoul Trip");
        draft.category = Category::Culture;
        draft.slug = Some("seoul-trip".to_string());
        mgr.update_post(post.id, draft).await.unwrap();

        // Same slug text, different scope: the old address still redirects.
        let old_scope = ScopeKey::CountryCategory {
            country_id: kr.id,
            category: Category::Travel,
        };
        let hit = store
            .find_history(EntityKind::Post, old_scope, "seoul-trip")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.entity_id, post.id);
    }

    #[tokio::test]
    async fn test_create_post_requires_existing_country() {
        let store = MemoryStore::new();
        let err = manager(&store)
            .create_post(post_draft(Uuid::new_v4(), "Orphan"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CountryNotFound { .. }));
    }

    #[tokio::test]
    async fn test_empty_title_falls_back_to_kind_token() {
        let store = MemoryStore::new();
        let mgr = manager(&store);
        let kr = mgr
            .create_country(country_draft("Korea", Some("Korea")))
            .await
            .unwrap();
        let post = mgr.create_post(post_draft(kr.id, "???")).await.unwrap();
        assert_eq!(post.slug, "post");
    }

    #[tokio::test]
    async fn test_delete_then_delete_again_is_not_found() {
        let store = MemoryStore::new();
        let mgr = manager(&store);
        let created = mgr
            .create_country(country_draft("Korea", Some("Korea")))
            .await
            .unwrap();

        mgr.delete_country(created.id).await.unwrap();
        let err = mgr.delete_country(created.id).await.unwrap_err();
        assert!(matches!(err, AppError::CountryNotFound { .. }));
    }
}
