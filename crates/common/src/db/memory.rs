//! In-memory slug store
//!
//! Test double implementing [`SlugStore`] over plain collections, mirroring
//! the Postgres backend's semantics: unique-slug conflicts, cascade deletes,
//! best-effort history writes, and the sweep classification.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::prelude::DateTimeWithTimeZone;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::db::models::{
    Category, Country, CountrySlugHistory, Post, PostSlugHistory, Tag, TagSlugHistory,
};
use crate::db::store::{
    HistoryHit, HistoryOutcome, ScopeKey, SkipReason, SlugStore, SweepReport,
};
use crate::db::sweep::{classify_history, HistoryRow, LiveRow, SweepVerdicts};
use crate::errors::{AppError, Result};
use crate::slug::EntityKind;

#[derive(Default)]
struct Inner {
    countries: Vec<Country>,
    tags: Vec<Tag>,
    posts: Vec<Post>,
    country_history: Vec<CountrySlugHistory>,
    tag_history: Vec<TagSlugHistory>,
    post_history: Vec<PostSlugHistory>,
}

/// In-memory [`SlugStore`] backend
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

fn now() -> DateTimeWithTimeZone {
    chrono::Utc::now().into()
}

fn slug_conflict(kind: EntityKind, slug: &str) -> AppError {
    AppError::SlugConflict {
        kind: kind.as_str().to_string(),
        slug: slug.to_string(),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn country_verdicts(&self) -> SweepVerdicts {
        let rows: Vec<HistoryRow> = self
            .country_history
            .iter()
            .map(|m| HistoryRow {
                id: m.id,
                entity_id: m.country_id,
                scope: ScopeKey::Global,
                old_slug: m.old_slug.clone(),
            })
            .collect();
        let live: Vec<LiveRow> = self
            .countries
            .iter()
            .map(|m| LiveRow {
                id: m.id,
                scope: ScopeKey::Global,
                slug: m.slug.clone(),
            })
            .collect();
        classify_history(EntityKind::Country.rules().charset, &rows, &live)
    }

    fn tag_verdicts(&self) -> SweepVerdicts {
        let rows: Vec<HistoryRow> = self
            .tag_history
            .iter()
            .map(|m| HistoryRow {
                id: m.id,
                entity_id: m.tag_id,
                scope: ScopeKey::Global,
                old_slug: m.old_slug.clone(),
            })
            .collect();
        let live: Vec<LiveRow> = self
            .tags
            .iter()
            .map(|m| LiveRow {
                id: m.id,
                scope: ScopeKey::Global,
                slug: m.slug.clone(),
            })
            .collect();
        classify_history(EntityKind::Tag.rules().charset, &rows, &live)
    }

    fn post_verdicts(&self) -> SweepVerdicts {
        let rows: Vec<HistoryRow> = self
            .post_history
            .iter()
            .map(|m| HistoryRow {
                id: m.id,
                entity_id: m.post_id,
                scope: ScopeKey::CountryCategory {
                    country_id: m.country_id,
                    category: Category::from(m.category.clone()),
                },
                old_slug: m.old_slug.clone(),
            })
            .collect();
        let live: Vec<LiveRow> = self
            .posts
            .iter()
            .map(|m| LiveRow {
                id: m.id,
                scope: ScopeKey::CountryCategory {
                    country_id: m.country_id,
                    category: m.category(),
                },
                slug: m.slug.clone(),
            })
            .collect();
        classify_history(EntityKind::Post.rules().charset, &rows, &live)
    }

    fn apply_verdicts(
        &mut self,
        country: &SweepVerdicts,
        tag: &SweepVerdicts,
        post: &SweepVerdicts,
    ) {
        let ids = country.all_ids();
        self.country_history.retain(|m| !ids.contains(&m.id));
        let ids = tag.all_ids();
        self.tag_history.retain(|m| !ids.contains(&m.id));
        let ids = post.all_ids();
        self.post_history.retain(|m| !ids.contains(&m.id));
    }
}

#[async_trait]
impl SlugStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn slug_exists(
        &self,
        kind: EntityKind,
        slug: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<bool> {
        let inner = self.inner.lock().await;
        let hit = match kind {
            EntityKind::Country => inner
                .countries
                .iter()
                .any(|m| m.slug == slug && Some(m.id) != exclude_id),
            EntityKind::Tag => inner
                .tags
                .iter()
                .any(|m| m.slug == slug && Some(m.id) != exclude_id),
            EntityKind::Post => inner
                .posts
                .iter()
                .any(|m| m.slug == slug && Some(m.id) != exclude_id),
        };
        Ok(hit)
    }

    async fn country_by_slug(&self, slug: &str) -> Result<Option<Country>> {
        let inner = self.inner.lock().await;
        Ok(inner.countries.iter().find(|m| m.slug == slug).cloned())
    }

    async fn tag_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        let inner = self.inner.lock().await;
        Ok(inner.tags.iter().find(|m| m.slug == slug).cloned())
    }

    async fn post_in_scope(
        &self,
        country_id: Uuid,
        category: Category,
        slug: &str,
    ) -> Result<Option<Post>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .posts
            .iter()
            .find(|m| m.country_id == country_id && m.category() == category && m.slug == slug)
            .cloned())
    }

    async fn country_by_id(&self, id: Uuid) -> Result<Option<Country>> {
        let inner = self.inner.lock().await;
        Ok(inner.countries.iter().find(|m| m.id == id).cloned())
    }

    async fn tag_by_id(&self, id: Uuid) -> Result<Option<Tag>> {
        let inner = self.inner.lock().await;
        Ok(inner.tags.iter().find(|m| m.id == id).cloned())
    }

    async fn post_by_id(&self, id: Uuid) -> Result<Option<Post>> {
        let inner = self.inner.lock().await;
        Ok(inner.posts.iter().find(|m| m.id == id).cloned())
    }

    async fn find_history(
        &self,
        kind: EntityKind,
        scope: ScopeKey,
        old_slug: &str,
    ) -> Result<Option<HistoryHit>> {
        let inner = self.inner.lock().await;
        let mut hits: Vec<HistoryHit> = match kind {
            EntityKind::Country => inner
                .country_history
                .iter()
                .filter(|m| m.old_slug == old_slug)
                .map(|m| HistoryHit {
                    entity_id: m.country_id,
                    created_at: m.created_at,
                })
                .collect(),
            EntityKind::Tag => inner
                .tag_history
                .iter()
                .filter(|m| m.old_slug == old_slug)
                .map(|m| HistoryHit {
                    entity_id: m.tag_id,
                    created_at: m.created_at,
                })
                .collect(),
            EntityKind::Post => {
                let ScopeKey::CountryCategory {
                    country_id,
                    category,
                } = scope
                else {
                    return Err(AppError::Internal {
                        message: "post slug history requires a (country, category) scope"
                            .to_string(),
                    });
                };
                inner
                    .post_history
                    .iter()
                    .filter(|m| {
                        m.country_id == country_id
                            && m.category == category.as_str()
                            && m.old_slug == old_slug
                    })
                    .map(|m| HistoryHit {
                        entity_id: m.post_id,
                        created_at: m.created_at,
                    })
                    .collect()
            }
        };

        if hits.len() > 1 {
            warn!(
                kind = kind.as_str(),
                old_slug, "Multiple history rows for one address, using most recent"
            );
            hits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }
        Ok(hits.into_iter().next())
    }

    async fn record_history(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
        scope: ScopeKey,
        old_slug: &str,
    ) -> Result<HistoryOutcome> {
        let mut inner = self.inner.lock().await;

        match kind {
            EntityKind::Country => {
                if let Some(owner) = inner.countries.iter().find(|m| m.id == entity_id) {
                    if owner.slug == old_slug {
                        return Ok(HistoryOutcome::Skipped(SkipReason::MatchesCurrentSlug));
                    }
                }
                if inner
                    .countries
                    .iter()
                    .any(|m| m.slug == old_slug && m.id != entity_id)
                {
                    return Ok(HistoryOutcome::Skipped(SkipReason::CollidesWithLiveSlug));
                }
                if inner.country_history.iter().any(|m| m.old_slug == old_slug) {
                    return Ok(HistoryOutcome::Skipped(SkipReason::DuplicateOldSlug));
                }
                inner.country_history.push(CountrySlugHistory {
                    id: Uuid::new_v4(),
                    country_id: entity_id,
                    old_slug: old_slug.to_string(),
                    created_at: now(),
                });
            }
            EntityKind::Tag => {
                if let Some(owner) = inner.tags.iter().find(|m| m.id == entity_id) {
                    if owner.slug == old_slug {
                        return Ok(HistoryOutcome::Skipped(SkipReason::MatchesCurrentSlug));
                    }
                }
                if inner
                    .tags
                    .iter()
                    .any(|m| m.slug == old_slug && m.id != entity_id)
                {
                    return Ok(HistoryOutcome::Skipped(SkipReason::CollidesWithLiveSlug));
                }
                if inner.tag_history.iter().any(|m| m.old_slug == old_slug) {
                    return Ok(HistoryOutcome::Skipped(SkipReason::DuplicateOldSlug));
                }
                inner.tag_history.push(TagSlugHistory {
                    id: Uuid::new_v4(),
                    tag_id: entity_id,
                    old_slug: old_slug.to_string(),
                    created_at: now(),
                });
            }
            EntityKind::Post => {
                let ScopeKey::CountryCategory {
                    country_id,
                    category,
                } = scope
                else {
                    return Err(AppError::Internal {
                        message: "post slug history requires a (country, category) scope"
                            .to_string(),
                    });
                };
                if let Some(owner) = inner.posts.iter().find(|m| m.id == entity_id) {
                    if owner.slug == old_slug
                        && owner.country_id == country_id
                        && owner.category() == category
                    {
                        return Ok(HistoryOutcome::Skipped(SkipReason::MatchesCurrentSlug));
                    }
                }
                if inner.posts.iter().any(|m| {
                    m.country_id == country_id
                        && m.category() == category
                        && m.slug == old_slug
                        && m.id != entity_id
                }) {
                    return Ok(HistoryOutcome::Skipped(SkipReason::CollidesWithLiveSlug));
                }
                if inner.post_history.iter().any(|m| {
                    m.country_id == country_id
                        && m.category == category.as_str()
                        && m.old_slug == old_slug
                }) {
                    return Ok(HistoryOutcome::Skipped(SkipReason::DuplicateOldSlug));
                }
                inner.post_history.push(PostSlugHistory {
                    id: Uuid::new_v4(),
                    post_id: entity_id,
                    country_id,
                    category: category.as_str().to_string(),
                    old_slug: old_slug.to_string(),
                    created_at: now(),
                });
            }
        }

        Ok(HistoryOutcome::Recorded)
    }

    async fn reclaim_history(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
        scope: ScopeKey,
        current_slug: &str,
    ) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        let removed = match kind {
            EntityKind::Country => {
                let before = inner.country_history.len();
                inner
                    .country_history
                    .retain(|m| !(m.country_id == entity_id && m.old_slug == current_slug));
                before - inner.country_history.len()
            }
            EntityKind::Tag => {
                let before = inner.tag_history.len();
                inner
                    .tag_history
                    .retain(|m| !(m.tag_id == entity_id && m.old_slug == current_slug));
                before - inner.tag_history.len()
            }
            EntityKind::Post => {
                let ScopeKey::CountryCategory {
                    country_id,
                    category,
                } = scope
                else {
                    return Err(AppError::Internal {
                        message: "post slug history requires a (country, category) scope"
                            .to_string(),
                    });
                };
                let before = inner.post_history.len();
                inner.post_history.retain(|m| {
                    !(m.post_id == entity_id
                        && m.country_id == country_id
                        && m.category == category.as_str()
                        && m.old_slug == current_slug)
                });
                before - inner.post_history.len()
            }
        };
        Ok(removed as u64)
    }

    async fn find_violating_history(&self) -> Result<SweepReport> {
        let inner = self.inner.lock().await;
        let mut verdicts = inner.country_verdicts();
        verdicts.extend(inner.tag_verdicts());
        verdicts.extend(inner.post_verdicts());
        Ok(verdicts.report())
    }

    async fn delete_violating_history(&self) -> Result<SweepReport> {
        let mut inner = self.inner.lock().await;
        let country = inner.country_verdicts();
        let tag = inner.tag_verdicts();
        let post = inner.post_verdicts();

        inner.apply_verdicts(&country, &tag, &post);

        let mut verdicts = country;
        verdicts.extend(tag);
        verdicts.extend(post);
        Ok(verdicts.report())
    }

    async fn insert_country(&self, country: Country) -> Result<Country> {
        let mut inner = self.inner.lock().await;
        if inner.countries.iter().any(|m| m.slug == country.slug) {
            return Err(slug_conflict(EntityKind::Country, &country.slug));
        }
        if let Some(iso) = &country.iso_a3 {
            if inner.countries.iter().any(|m| m.iso_a3.as_deref() == Some(iso)) {
                return Err(AppError::Duplicate {
                    message: format!("countries_iso_a3_key: {}", iso),
                });
            }
        }
        inner.countries.push(country.clone());
        Ok(country)
    }

    async fn update_country(&self, country: Country) -> Result<Country> {
        let mut inner = self.inner.lock().await;
        if inner
            .countries
            .iter()
            .any(|m| m.slug == country.slug && m.id != country.id)
        {
            return Err(slug_conflict(EntityKind::Country, &country.slug));
        }
        let Some(existing) = inner.countries.iter_mut().find(|m| m.id == country.id) else {
            return Err(AppError::CountryNotFound {
                id: country.id.to_string(),
            });
        };
        *existing = country.clone();
        Ok(country)
    }

    async fn delete_country(&self, id: Uuid) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        let before = inner.countries.len();
        inner.countries.retain(|m| m.id != id);
        let deleted = inner.countries.len() < before;
        if deleted {
            // Cascades: the country's posts, and all history under it.
            inner.country_history.retain(|m| m.country_id != id);
            inner.posts.retain(|m| m.country_id != id);
            inner.post_history.retain(|m| m.country_id != id);
        }
        Ok(deleted)
    }

    async fn insert_tag(&self, tag: Tag) -> Result<Tag> {
        let mut inner = self.inner.lock().await;
        if inner.tags.iter().any(|m| m.slug == tag.slug) {
            return Err(slug_conflict(EntityKind::Tag, &tag.slug));
        }
        inner.tags.push(tag.clone());
        Ok(tag)
    }

    async fn update_tag(&self, tag: Tag) -> Result<Tag> {
        let mut inner = self.inner.lock().await;
        if inner
            .tags
            .iter()
            .any(|m| m.slug == tag.slug && m.id != tag.id)
        {
            return Err(slug_conflict(EntityKind::Tag, &tag.slug));
        }
        let Some(existing) = inner.tags.iter_mut().find(|m| m.id == tag.id) else {
            return Err(AppError::TagNotFound {
                id: tag.id.to_string(),
            });
        };
        *existing = tag.clone();
        Ok(tag)
    }

    async fn delete_tag(&self, id: Uuid) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        let before = inner.tags.len();
        inner.tags.retain(|m| m.id != id);
        let deleted = inner.tags.len() < before;
        if deleted {
            inner.tag_history.retain(|m| m.tag_id != id);
        }
        Ok(deleted)
    }

    async fn insert_post(&self, post: Post) -> Result<Post> {
        let mut inner = self.inner.lock().await;
        if inner.posts.iter().any(|m| m.slug == post.slug) {
            return Err(slug_conflict(EntityKind::Post, &post.slug));
        }
        inner.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, post: Post) -> Result<Post> {
        let mut inner = self.inner.lock().await;
        if inner
            .posts
            .iter()
            .any(|m| m.slug == post.slug && m.id != post.id)
        {
            return Err(slug_conflict(EntityKind::Post, &post.slug));
        }
        let Some(existing) = inner.posts.iter_mut().find(|m| m.id == post.id) else {
            return Err(AppError::PostNotFound {
                id: post.id.to_string(),
            });
        };
        *existing = post.clone();
        Ok(post)
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        let before = inner.posts.len();
        inner.posts.retain(|m| m.id != id);
        let deleted = inner.posts.len() < before;
        if deleted {
            inner.post_history.retain(|m| m.post_id != id);
        }
        Ok(deleted)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let inner = self.inner.lock().await;
        let mut tags = inner.tags.clone();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn published_posts_in_scope(
        &self,
        country_id: Uuid,
        category: Category,
    ) -> Result<Vec<Post>> {
        let inner = self.inner.lock().await;
        let mut posts: Vec<Post> = inner
            .posts
            .iter()
            .filter(|m| m.country_id == country_id && m.category() == category && m.is_published)
            .cloned()
            .collect();
        posts.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[tokio::test]
    async fn test_insert_duplicate_slug_conflicts() {
        let store = MemoryStore::new();
        store.insert_country(country("korea")).await.unwrap();

        let err = store.insert_country(country("korea")).await.unwrap_err();
        assert!(err.is_slug_conflict());
    }

    #[tokio::test]
    async fn test_record_history_skips_live_collision() {
        let store = MemoryStore::new();
        let korea = store.insert_country(country("korea")).await.unwrap();
        let japan = store.insert_country(country("japan")).await.unwrap();

        // Recording japan's live slug as korea's history would shadow japan.
        let outcome = store
            .record_history(EntityKind::Country, korea.id, ScopeKey::Global, "japan")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            HistoryOutcome::Skipped(SkipReason::CollidesWithLiveSlug)
        );

        // A retired slug that shadows nothing records fine.
        let outcome = store
            .record_history(EntityKind::Country, japan.id, ScopeKey::Global, "nippon")
            .await
            .unwrap();
        assert_eq!(outcome, HistoryOutcome::Recorded);
    }

    #[tokio::test]
    async fn test_record_history_skips_own_current_slug() {
        let store = MemoryStore::new();
        let korea = store.insert_country(country("korea")).await.unwrap();

        let outcome = store
            .record_history(EntityKind::Country, korea.id, ScopeKey::Global, "korea")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            HistoryOutcome::Skipped(SkipReason::MatchesCurrentSlug)
        );
    }

    #[tokio::test]
    async fn test_record_history_skips_duplicate_address() {
        let store = MemoryStore::new();
        let korea = store.insert_country(country("korea")).await.unwrap();

        let first = store
            .record_history(EntityKind::Country, korea.id, ScopeKey::Global, "coree")
            .await
            .unwrap();
        assert_eq!(first, HistoryOutcome::Recorded);

        let second = store
            .record_history(EntityKind::Country, korea.id, ScopeKey::Global, "coree")
            .await
            .unwrap();
        assert_eq!(
            second,
            HistoryOutcome::Skipped(SkipReason::DuplicateOldSlug)
        );
    }

    #[tokio::test]
    async fn test_delete_country_cascades_history() {
        let store = MemoryStore::new();
        let korea = store.insert_country(country("korea")).await.unwrap();
        store
            .record_history(EntityKind::Country, korea.id, ScopeKey::Global, "coree")
            .await
            .unwrap();

        assert!(store.delete_country(korea.id).await.unwrap());

        let hit = store
            .find_history(EntityKind::Country, ScopeKey::Global, "coree")
            .await
            .unwrap();
        assert!(hit.is_none());
    }

    #[tokio::test]
    async fn test_sweep_delete_is_idempotent() {
        let store = MemoryStore::new();
        let korea = store.insert_country(country("korea")).await.unwrap();
        store
            .record_history(EntityKind::Country, korea.id, ScopeKey::Global, "coree")
            .await
            .unwrap();

        // Orphan the row by dropping the owner without cascading.
        {
            let mut inner = store.inner.lock().await;
            inner.countries.clear();
        }

        let first = store.delete_violating_history().await.unwrap();
        assert_eq!(first.orphaned, 1);

        let second = store.delete_violating_history().await.unwrap();
        assert_eq!(second.total(), 0);
    }
}
