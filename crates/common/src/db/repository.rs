//! SeaORM implementation of the slug store
//!
//! Provides data access for the three slug-bearing entity collections and
//! their history tables, with proper conflict mapping and the transactional
//! history write.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr, Statement, TransactionTrait,
};
use tracing::warn;
use uuid::Uuid;

use crate::db::models::*;
use crate::db::store::{
    HistoryHit, HistoryOutcome, ScopeKey, SkipReason, SlugStore, SweepReport,
};
use crate::db::sweep::{classify_history, HistoryRow, LiveRow, SweepVerdicts};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::slug::EntityKind;

/// Repository for slug identity, history, and resolution data access
#[derive(Clone)]
pub struct SlugRepository {
    pool: DbPool,
}

/// Map a unique-constraint violation on a slug column to the conflict error
/// the lifecycle manager retries on. Other unique violations (e.g. a country
/// ISO code) surface as plain duplicates.
fn map_unique_violation(kind: EntityKind, slug: &str, err: sea_orm::DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg)) if msg.contains("slug") => {
            AppError::SlugConflict {
                kind: kind.as_str().to_string(),
                slug: slug.to_string(),
            }
        }
        Some(SqlErr::UniqueConstraintViolation(msg)) => AppError::Duplicate { message: msg },
        _ => AppError::Database(err),
    }
}

/// Post history operations require the compound scope
fn post_scope(scope: ScopeKey) -> Result<(Uuid, Category)> {
    match scope {
        ScopeKey::CountryCategory {
            country_id,
            category,
        } => Ok((country_id, category)),
        ScopeKey::Global => Err(AppError::Internal {
            message: "post slug history requires a (country, category) scope".to_string(),
        }),
    }
}

impl SlugRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // History write helpers (one per kind, all inside the caller's txn)
    // ========================================================================

    async fn record_country_history(
        txn: &DatabaseTransaction,
        entity_id: Uuid,
        old_slug: &str,
    ) -> Result<HistoryOutcome> {
        if let Some(owner) = CountryEntity::find_by_id(entity_id).one(txn).await? {
            if owner.slug == old_slug {
                return Ok(HistoryOutcome::Skipped(SkipReason::MatchesCurrentSlug));
            }
        }

        let collides = CountryEntity::find()
            .filter(CountryColumn::Slug.eq(old_slug))
            .filter(CountryColumn::Id.ne(entity_id))
            .one(txn)
            .await?
            .is_some();
        if collides {
            return Ok(HistoryOutcome::Skipped(SkipReason::CollidesWithLiveSlug));
        }

        let duplicate = CountrySlugHistoryEntity::find()
            .filter(CountrySlugHistoryColumn::OldSlug.eq(old_slug))
            .one(txn)
            .await?
            .is_some();
        if duplicate {
            return Ok(HistoryOutcome::Skipped(SkipReason::DuplicateOldSlug));
        }

        // Unique index backstop against a concurrent recorder.
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO country_slug_history (id, country_id, old_slug, created_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (old_slug) DO NOTHING
            "#,
            vec![Uuid::new_v4().into(), entity_id.into(), old_slug.into()],
        );
        let res = txn.execute(stmt).await?;

        if res.rows_affected() == 0 {
            Ok(HistoryOutcome::Skipped(SkipReason::DuplicateOldSlug))
        } else {
            Ok(HistoryOutcome::Recorded)
        }
    }

    async fn record_tag_history(
        txn: &DatabaseTransaction,
        entity_id: Uuid,
        old_slug: &str,
    ) -> Result<HistoryOutcome> {
        if let Some(owner) = TagEntity::find_by_id(entity_id).one(txn).await? {
            if owner.slug == old_slug {
                return Ok(HistoryOutcome::Skipped(SkipReason::MatchesCurrentSlug));
            }
        }

        let collides = TagEntity::find()
            .filter(TagColumn::Slug.eq(old_slug))
            .filter(TagColumn::Id.ne(entity_id))
            .one(txn)
            .await?
            .is_some();
        if collides {
            return Ok(HistoryOutcome::Skipped(SkipReason::CollidesWithLiveSlug));
        }

        let duplicate = TagSlugHistoryEntity::find()
            .filter(TagSlugHistoryColumn::OldSlug.eq(old_slug))
            .one(txn)
            .await?
            .is_some();
        if duplicate {
            return Ok(HistoryOutcome::Skipped(SkipReason::DuplicateOldSlug));
        }

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO tag_slug_history (id, tag_id, old_slug, created_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (old_slug) DO NOTHING
            "#,
            vec![Uuid::new_v4().into(), entity_id.into(), old_slug.into()],
        );
        let res = txn.execute(stmt).await?;

        if res.rows_affected() == 0 {
            Ok(HistoryOutcome::Skipped(SkipReason::DuplicateOldSlug))
        } else {
            Ok(HistoryOutcome::Recorded)
        }
    }

    async fn record_post_history(
        txn: &DatabaseTransaction,
        entity_id: Uuid,
        country_id: Uuid,
        category: Category,
        old_slug: &str,
    ) -> Result<HistoryOutcome> {
        // The owner's current slug only conflicts when it still lives in the
        // same (country, category) scope the row describes.
        if let Some(owner) = PostEntity::find_by_id(entity_id).one(txn).await? {
            if owner.slug == old_slug
                && owner.country_id == country_id
                && owner.category() == category
            {
                return Ok(HistoryOutcome::Skipped(SkipReason::MatchesCurrentSlug));
            }
        }

        let collides = PostEntity::find()
            .filter(PostColumn::CountryId.eq(country_id))
            .filter(PostColumn::Category.eq(category.as_str()))
            .filter(PostColumn::Slug.eq(old_slug))
            .filter(PostColumn::Id.ne(entity_id))
            .one(txn)
            .await?
            .is_some();
        if collides {
            return Ok(HistoryOutcome::Skipped(SkipReason::CollidesWithLiveSlug));
        }

        let duplicate = PostSlugHistoryEntity::find()
            .filter(PostSlugHistoryColumn::CountryId.eq(country_id))
            .filter(PostSlugHistoryColumn::Category.eq(category.as_str()))
            .filter(PostSlugHistoryColumn::OldSlug.eq(old_slug))
            .one(txn)
            .await?
            .is_some();
        if duplicate {
            return Ok(HistoryOutcome::Skipped(SkipReason::DuplicateOldSlug));
        }

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO post_slug_history (id, post_id, country_id, category, old_slug, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (country_id, category, old_slug) DO NOTHING
            "#,
            vec![
                Uuid::new_v4().into(),
                entity_id.into(),
                country_id.into(),
                category.as_str().into(),
                old_slug.into(),
            ],
        );
        let res = txn.execute(stmt).await?;

        if res.rows_affected() == 0 {
            Ok(HistoryOutcome::Skipped(SkipReason::DuplicateOldSlug))
        } else {
            Ok(HistoryOutcome::Recorded)
        }
    }

    // ========================================================================
    // Sweep helpers (fetch + classify per kind)
    // ========================================================================

    async fn country_verdicts(&self) -> Result<SweepVerdicts> {
        let rows: Vec<HistoryRow> = CountrySlugHistoryEntity::find()
            .all(self.read_conn())
            .await?
            .into_iter()
            .map(|m| HistoryRow {
                id: m.id,
                entity_id: m.country_id,
                scope: ScopeKey::Global,
                old_slug: m.old_slug,
            })
            .collect();

        let live: Vec<LiveRow> = CountryEntity::find()
            .all(self.read_conn())
            .await?
            .into_iter()
            .map(|m| LiveRow {
                id: m.id,
                scope: ScopeKey::Global,
                slug: m.slug,
            })
            .collect();

        Ok(classify_history(
            EntityKind::Country.rules().charset,
            &rows,
            &live,
        ))
    }

    async fn tag_verdicts(&self) -> Result<SweepVerdicts> {
        let rows: Vec<HistoryRow> = TagSlugHistoryEntity::find()
            .all(self.read_conn())
            .await?
            .into_iter()
            .map(|m| HistoryRow {
                id: m.id,
                entity_id: m.tag_id,
                scope: ScopeKey::Global,
                old_slug: m.old_slug,
            })
            .collect();

        let live: Vec<LiveRow> = TagEntity::find()
            .all(self.read_conn())
            .await?
            .into_iter()
            .map(|m| LiveRow {
                id: m.id,
                scope: ScopeKey::Global,
                slug: m.slug,
            })
            .collect();

        Ok(classify_history(
            EntityKind::Tag.rules().charset,
            &rows,
            &live,
        ))
    }

    async fn post_verdicts(&self) -> Result<SweepVerdicts> {
        let rows: Vec<HistoryRow> = PostSlugHistoryEntity::find()
            .all(self.read_conn())
            .await?
            .into_iter()
            .map(|m| HistoryRow {
                id: m.id,
                entity_id: m.post_id,
                scope: ScopeKey::CountryCategory {
                    country_id: m.country_id,
                    category: Category::from(m.category.clone()),
                },
                old_slug: m.old_slug,
            })
            .collect();

        let live: Vec<LiveRow> = PostEntity::find()
            .all(self.read_conn())
            .await?
            .into_iter()
            .map(|m| LiveRow {
                id: m.id,
                scope: ScopeKey::CountryCategory {
                    country_id: m.country_id,
                    category: m.category(),
                },
                slug: m.slug,
            })
            .collect();

        Ok(classify_history(
            EntityKind::Post.rules().charset,
            &rows,
            &live,
        ))
    }
}

#[async_trait]
impl SlugStore for SlugRepository {
    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Generation support
    // ========================================================================

    async fn slug_exists(
        &self,
        kind: EntityKind,
        slug: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<bool> {
        match kind {
            EntityKind::Country => {
                let mut query = CountryEntity::find().filter(CountryColumn::Slug.eq(slug));
                if let Some(id) = exclude_id {
                    query = query.filter(CountryColumn::Id.ne(id));
                }
                Ok(query.one(self.read_conn()).await?.is_some())
            }
            EntityKind::Tag => {
                let mut query = TagEntity::find().filter(TagColumn::Slug.eq(slug));
                if let Some(id) = exclude_id {
                    query = query.filter(TagColumn::Id.ne(id));
                }
                Ok(query.one(self.read_conn()).await?.is_some())
            }
            EntityKind::Post => {
                let mut query = PostEntity::find().filter(PostColumn::Slug.eq(slug));
                if let Some(id) = exclude_id {
                    query = query.filter(PostColumn::Id.ne(id));
                }
                Ok(query.one(self.read_conn()).await?.is_some())
            }
        }
    }

    // ========================================================================
    // Current lookups
    // ========================================================================

    async fn country_by_slug(&self, slug: &str) -> Result<Option<Country>> {
        CountryEntity::find()
            .filter(CountryColumn::Slug.eq(slug))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn tag_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        TagEntity::find()
            .filter(TagColumn::Slug.eq(slug))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn post_in_scope(
        &self,
        country_id: Uuid,
        category: Category,
        slug: &str,
    ) -> Result<Option<Post>> {
        PostEntity::find()
            .filter(PostColumn::CountryId.eq(country_id))
            .filter(PostColumn::Category.eq(category.as_str()))
            .filter(PostColumn::Slug.eq(slug))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn country_by_id(&self, id: Uuid) -> Result<Option<Country>> {
        CountryEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn tag_by_id(&self, id: Uuid) -> Result<Option<Tag>> {
        TagEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn post_by_id(&self, id: Uuid) -> Result<Option<Post>> {
        PostEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // History
    // ========================================================================

    async fn find_history(
        &self,
        kind: EntityKind,
        scope: ScopeKey,
        old_slug: &str,
    ) -> Result<Option<HistoryHit>> {
        // More than one match is impossible while the unique indexes hold.
        match kind {
            EntityKind::Country => {
                let rows = CountrySlugHistoryEntity::find()
                    .filter(CountrySlugHistoryColumn::OldSlug.eq(old_slug))
                    .order_by_desc(CountrySlugHistoryColumn::CreatedAt)
                    .all(self.read_conn())
                    .await?;
                if rows.len() > 1 {
                    warn!(
                        kind = kind.as_str(),
                        old_slug, "Multiple history rows for one address, using most recent"
                    );
                }
                Ok(rows.into_iter().next().map(|m| HistoryHit {
                    entity_id: m.country_id,
                    created_at: m.created_at,
                }))
            }
            EntityKind::Tag => {
                let rows = TagSlugHistoryEntity::find()
                    .filter(TagSlugHistoryColumn::OldSlug.eq(old_slug))
                    .order_by_desc(TagSlugHistoryColumn::CreatedAt)
                    .all(self.read_conn())
                    .await?;
                if rows.len() > 1 {
                    warn!(
                        kind = kind.as_str(),
                        old_slug, "Multiple history rows for one address, using most recent"
                    );
                }
                Ok(rows.into_iter().next().map(|m| HistoryHit {
                    entity_id: m.tag_id,
                    created_at: m.created_at,
                }))
            }
            EntityKind::Post => {
                let (country_id, category) = post_scope(scope)?;
                let rows = PostSlugHistoryEntity::find()
                    .filter(PostSlugHistoryColumn::CountryId.eq(country_id))
                    .filter(PostSlugHistoryColumn::Category.eq(category.as_str()))
                    .filter(PostSlugHistoryColumn::OldSlug.eq(old_slug))
                    .order_by_desc(PostSlugHistoryColumn::CreatedAt)
                    .all(self.read_conn())
                    .await?;
                if rows.len() > 1 {
                    warn!(
                        kind = kind.as_str(),
                        old_slug, "Multiple history rows for one address, using most recent"
                    );
                }
                Ok(rows.into_iter().next().map(|m| HistoryHit {
                    entity_id: m.post_id,
                    created_at: m.created_at,
                }))
            }
        }
    }

    async fn record_history(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
        scope: ScopeKey,
        old_slug: &str,
    ) -> Result<HistoryOutcome> {
        let txn = self.write_conn().begin().await?;

        let outcome = match kind {
            EntityKind::Country => {
                Self::record_country_history(&txn, entity_id, old_slug).await?
            }
            EntityKind::Tag => Self::record_tag_history(&txn, entity_id, old_slug).await?,
            EntityKind::Post => {
                let (country_id, category) = post_scope(scope)?;
                Self::record_post_history(&txn, entity_id, country_id, category, old_slug).await?
            }
        };

        txn.commit().await?;
        Ok(outcome)
    }

    async fn reclaim_history(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
        scope: ScopeKey,
        current_slug: &str,
    ) -> Result<u64> {
        let rows_affected = match kind {
            EntityKind::Country => {
                CountrySlugHistoryEntity::delete_many()
                    .filter(CountrySlugHistoryColumn::CountryId.eq(entity_id))
                    .filter(CountrySlugHistoryColumn::OldSlug.eq(current_slug))
                    .exec(self.write_conn())
                    .await?
                    .rows_affected
            }
            EntityKind::Tag => {
                TagSlugHistoryEntity::delete_many()
                    .filter(TagSlugHistoryColumn::TagId.eq(entity_id))
                    .filter(TagSlugHistoryColumn::OldSlug.eq(current_slug))
                    .exec(self.write_conn())
                    .await?
                    .rows_affected
            }
            EntityKind::Post => {
                let (country_id, category) = post_scope(scope)?;
                PostSlugHistoryEntity::delete_many()
                    .filter(PostSlugHistoryColumn::PostId.eq(entity_id))
                    .filter(PostSlugHistoryColumn::CountryId.eq(country_id))
                    .filter(PostSlugHistoryColumn::Category.eq(category.as_str()))
                    .filter(PostSlugHistoryColumn::OldSlug.eq(current_slug))
                    .exec(self.write_conn())
                    .await?
                    .rows_affected
            }
        };

        Ok(rows_affected)
    }

    // ========================================================================
    // Maintenance sweep
    // ========================================================================

    async fn find_violating_history(&self) -> Result<SweepReport> {
        let mut verdicts = self.country_verdicts().await?;
        verdicts.extend(self.tag_verdicts().await?);
        verdicts.extend(self.post_verdicts().await?);
        Ok(verdicts.report())
    }

    async fn delete_violating_history(&self) -> Result<SweepReport> {
        let country = self.country_verdicts().await?;
        let tag = self.tag_verdicts().await?;
        let post = self.post_verdicts().await?;

        let ids = country.all_ids();
        if !ids.is_empty() {
            CountrySlugHistoryEntity::delete_many()
                .filter(CountrySlugHistoryColumn::Id.is_in(ids))
                .exec(self.write_conn())
                .await?;
        }

        let ids = tag.all_ids();
        if !ids.is_empty() {
            TagSlugHistoryEntity::delete_many()
                .filter(TagSlugHistoryColumn::Id.is_in(ids))
                .exec(self.write_conn())
                .await?;
        }

        let ids = post.all_ids();
        if !ids.is_empty() {
            PostSlugHistoryEntity::delete_many()
                .filter(PostSlugHistoryColumn::Id.is_in(ids))
                .exec(self.write_conn())
                .await?;
        }

        let mut verdicts = country;
        verdicts.extend(tag);
        verdicts.extend(post);
        Ok(verdicts.report())
    }

    // ========================================================================
    // Entity writes
    // ========================================================================

    async fn insert_country(&self, country: Country) -> Result<Country> {
        let slug = country.slug.clone();
        let model = CountryActiveModel {
            id: Set(country.id),
            name: Set(country.name),
            name_en: Set(country.name_en),
            slug: Set(country.slug),
            iso_a2: Set(country.iso_a2),
            iso_a3: Set(country.iso_a3),
            created_at: Set(country.created_at),
            updated_at: Set(country.updated_at),
        };

        model
            .insert(self.write_conn())
            .await
            .map_err(|e| map_unique_violation(EntityKind::Country, &slug, e))
    }

    async fn update_country(&self, country: Country) -> Result<Country> {
        let slug = country.slug.clone();
        let model = CountryActiveModel {
            id: Set(country.id),
            name: Set(country.name),
            name_en: Set(country.name_en),
            slug: Set(country.slug),
            iso_a2: Set(country.iso_a2),
            iso_a3: Set(country.iso_a3),
            created_at: Set(country.created_at),
            updated_at: Set(country.updated_at),
        };

        model
            .update(self.write_conn())
            .await
            .map_err(|e| map_unique_violation(EntityKind::Country, &slug, e))
    }

    async fn delete_country(&self, id: Uuid) -> Result<bool> {
        let result = CountryEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn insert_tag(&self, tag: Tag) -> Result<Tag> {
        let slug = tag.slug.clone();
        let model = TagActiveModel {
            id: Set(tag.id),
            name: Set(tag.name),
            slug: Set(tag.slug),
            created_at: Set(tag.created_at),
            updated_at: Set(tag.updated_at),
        };

        model
            .insert(self.write_conn())
            .await
            .map_err(|e| map_unique_violation(EntityKind::Tag, &slug, e))
    }

    async fn update_tag(&self, tag: Tag) -> Result<Tag> {
        let slug = tag.slug.clone();
        let model = TagActiveModel {
            id: Set(tag.id),
            name: Set(tag.name),
            slug: Set(tag.slug),
            created_at: Set(tag.created_at),
            updated_at: Set(tag.updated_at),
        };

        model
            .update(self.write_conn())
            .await
            .map_err(|e| map_unique_violation(EntityKind::Tag, &slug, e))
    }

    async fn delete_tag(&self, id: Uuid) -> Result<bool> {
        let result = TagEntity::delete_by_id(id).exec(self.write_conn()).await?;

        Ok(result.rows_affected > 0)
    }

    async fn insert_post(&self, post: Post) -> Result<Post> {
        let slug = post.slug.clone();
        let model = PostActiveModel {
            id: Set(post.id),
            country_id: Set(post.country_id),
            category: Set(post.category),
            title: Set(post.title),
            slug: Set(post.slug),
            content: Set(post.content),
            is_published: Set(post.is_published),
            published_at: Set(post.published_at),
            created_at: Set(post.created_at),
            updated_at: Set(post.updated_at),
        };

        model
            .insert(self.write_conn())
            .await
            .map_err(|e| map_unique_violation(EntityKind::Post, &slug, e))
    }

    async fn update_post(&self, post: Post) -> Result<Post> {
        let slug = post.slug.clone();
        let model = PostActiveModel {
            id: Set(post.id),
            country_id: Set(post.country_id),
            category: Set(post.category),
            title: Set(post.title),
            slug: Set(post.slug),
            content: Set(post.content),
            is_published: Set(post.is_published),
            published_at: Set(post.published_at),
            created_at: Set(post.created_at),
            updated_at: Set(post.updated_at),
        };

        model
            .update(self.write_conn())
            .await
            .map_err(|e| map_unique_violation(EntityKind::Post, &slug, e))
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool> {
        let result = PostEntity::delete_by_id(id).exec(self.write_conn()).await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Browse reads
    // ========================================================================

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        TagEntity::find()
            .order_by_asc(TagColumn::Name)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn published_posts_in_scope(
        &self,
        country_id: Uuid,
        category: Category,
    ) -> Result<Vec<Post>> {
        PostEntity::find()
            .filter(PostColumn::CountryId.eq(country_id))
            .filter(PostColumn::Category.eq(category.as_str()))
            .filter(PostColumn::IsPublished.eq(true))
            .order_by_desc(PostColumn::PublishedAt)
            .order_by_desc(PostColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }
}
