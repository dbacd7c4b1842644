//! Waypost Common Library
//!
//! Shared code for the Waypost services including:
//! - Slug generation and per-kind slug rules
//! - Database models, the slug store, and its Postgres repository
//! - Slug lifecycle orchestration (create/rename/history)
//! - Redirect resolution over current and historical slugs
//! - Error types and handling
//! - Configuration management
//! - Metrics registration

pub mod config;
pub mod db;
pub mod errors;
pub mod lifecycle;
pub mod metrics;
pub mod resolver;
pub mod slug;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{SlugRepository, SlugStore};
pub use errors::{AppError, Result};
pub use lifecycle::SlugLifecycleManager;
pub use resolver::RedirectResolver;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
