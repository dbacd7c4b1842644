//! Schema migrations for the Waypost slug subsystem.
//!
//! Unique slug indexes are deliberately named with a `slug` infix: the
//! repository's error mapper inspects the violated constraint name to tell
//! slug collisions apart from other unique violations (such as `iso_a3`).

pub use sea_orm_migration::prelude::*;

mod m20260114_000001_create_countries;
mod m20260114_000002_create_tags;
mod m20260114_000003_create_posts;
mod m20260114_000004_create_slug_history;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260114_000001_create_countries::Migration),
            Box::new(m20260114_000002_create_tags::Migration),
            Box::new(m20260114_000003_create_posts::Migration),
            Box::new(m20260114_000004_create_slug_history::Migration),
        ]
    }
}
