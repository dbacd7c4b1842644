//! Slug store abstraction
//!
//! One interface over the three slug-bearing entity collections and their
//! history tables, parameterized by entity kind. Two implementations:
//! [`super::SlugRepository`] (SeaORM/Postgres) for production and
//! [`super::MemoryStore`] for tests.

use async_trait::async_trait;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::{Category, Country, Post, Tag};
use crate::errors::Result;
use crate::slug::EntityKind;

/// Uniqueness scope for history rows and redirect resolution
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum ScopeKey {
    /// Country and Tag addresses are scoped globally
    Global,

    /// Post addresses are scoped by (country, category)
    CountryCategory { country_id: Uuid, category: Category },
}

/// A history row matched during resolution
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryHit {
    /// Owner of the retired slug
    pub entity_id: Uuid,

    pub created_at: DateTimeWithTimeZone,
}

/// Why a history row was not written
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The (scope, old_slug) address is already recorded
    DuplicateOldSlug,

    /// The old slug equals another entity's live slug in the same scope;
    /// recording it would shadow live content
    CollidesWithLiveSlug,

    /// The old slug equals the owner's own current slug in the same scope;
    /// recording it would create a self-redirect
    MatchesCurrentSlug,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::DuplicateOldSlug => "duplicate_old_slug",
            SkipReason::CollidesWithLiveSlug => "collides_with_live_slug",
            SkipReason::MatchesCurrentSlug => "matches_current_slug",
        }
    }
}

/// Outcome of a best-effort history write
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryOutcome {
    Recorded,
    Skipped(SkipReason),
}

impl HistoryOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, HistoryOutcome::Recorded)
    }
}

/// Per-class counts from a history sweep (dry-run or applied)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Rows whose old slug breaks the kind's charset rule
    pub invalid: u64,

    /// Rows whose owning entity no longer exists
    pub orphaned: u64,

    /// Rows whose old slug equals another entity's live slug in scope
    pub collisions: u64,

    /// Rows whose old slug equals the owner's current slug in scope
    pub redundant: u64,
}

impl SweepReport {
    pub fn total(&self) -> u64 {
        self.invalid + self.orphaned + self.collisions + self.redundant
    }

    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }
}

/// Persistence interface for slug identity, history, and resolution.
///
/// Every method is a single independent round-trip; the only internal
/// transaction is `record_history`, which checks its constraints and
/// inserts atomically. Slug uniqueness is ultimately enforced by the
/// storage layer, and a violated slug constraint surfaces as
/// [`crate::errors::AppError::SlugConflict`].
#[async_trait]
pub trait SlugStore: Send + Sync {
    /// Storage reachability probe for readiness checks
    async fn ping(&self) -> Result<()>;

    // ==================== Generation support ====================

    /// Is `slug` already the current slug of any entity of this kind?
    /// `exclude_id` skips the entity being renamed. Slug values are checked
    /// globally for all kinds.
    async fn slug_exists(
        &self,
        kind: EntityKind,
        slug: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<bool>;

    // ==================== Current lookups ====================

    async fn country_by_slug(&self, slug: &str) -> Result<Option<Country>>;

    async fn tag_by_slug(&self, slug: &str) -> Result<Option<Tag>>;

    /// Published-or-not lookup by current slug within (country, category)
    async fn post_in_scope(
        &self,
        country_id: Uuid,
        category: Category,
        slug: &str,
    ) -> Result<Option<Post>>;

    async fn country_by_id(&self, id: Uuid) -> Result<Option<Country>>;

    async fn tag_by_id(&self, id: Uuid) -> Result<Option<Tag>>;

    async fn post_by_id(&self, id: Uuid) -> Result<Option<Post>>;

    // ==================== History ====================

    /// Find the history row for a retired address. If more than one row
    /// matches (impossible while the unique indexes hold), implementations
    /// log a warning and return the most recently created.
    async fn find_history(
        &self,
        kind: EntityKind,
        scope: ScopeKey,
        old_slug: &str,
    ) -> Result<Option<HistoryHit>>;

    /// Best-effort history write. Refuses to record a duplicate address, an
    /// address that equals another entity's live slug in scope, or the
    /// owner's own current slug; refusals come back as `Skipped`, never as
    /// errors.
    async fn record_history(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
        scope: ScopeKey,
        old_slug: &str,
    ) -> Result<HistoryOutcome>;

    /// Delete the entity's own history rows for an address it is re-adopting,
    /// so its new current slug never redirects to itself. Returns the number
    /// of rows removed.
    async fn reclaim_history(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
        scope: ScopeKey,
        current_slug: &str,
    ) -> Result<u64>;

    // ==================== Maintenance sweep ====================

    /// Count history rows violating the charset, ownership, collision, or
    /// redundancy rules without deleting anything.
    async fn find_violating_history(&self) -> Result<SweepReport>;

    /// Delete violating history rows and report what was removed. Running
    /// it again immediately deletes nothing.
    async fn delete_violating_history(&self) -> Result<SweepReport>;

    // ==================== Entity writes ====================

    async fn insert_country(&self, country: Country) -> Result<Country>;

    async fn update_country(&self, country: Country) -> Result<Country>;

    async fn delete_country(&self, id: Uuid) -> Result<bool>;

    async fn insert_tag(&self, tag: Tag) -> Result<Tag>;

    async fn update_tag(&self, tag: Tag) -> Result<Tag>;

    async fn delete_tag(&self, id: Uuid) -> Result<bool>;

    async fn insert_post(&self, post: Post) -> Result<Post>;

    async fn update_post(&self, post: Post) -> Result<Post>;

    async fn delete_post(&self, id: Uuid) -> Result<bool>;

    // ==================== Browse reads ====================

    /// All tags ordered by name
    async fn list_tags(&self) -> Result<Vec<Tag>>;

    /// Published posts in a (country, category) scope, newest first
    async fn published_posts_in_scope(
        &self,
        country_id: Uuid,
        category: Category,
    ) -> Result<Vec<Post>>;
}
