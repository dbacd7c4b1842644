//! SeaORM entity models
//!
//! Database entities for Waypost: the three slug-bearing content entities
//! and their per-kind slug history tables.

mod country;
mod country_slug_history;
mod post;
mod post_slug_history;
mod tag;
mod tag_slug_history;

pub use country::{
    ActiveModel as CountryActiveModel,
    Column as CountryColumn,
    Entity as CountryEntity,
    Model as Country,
};

pub use tag::{
    ActiveModel as TagActiveModel,
    Column as TagColumn,
    Entity as TagEntity,
    Model as Tag,
};

pub use post::{
    ActiveModel as PostActiveModel,
    Category,
    Column as PostColumn,
    Entity as PostEntity,
    Model as Post,
};

pub use country_slug_history::{
    ActiveModel as CountrySlugHistoryActiveModel,
    Column as CountrySlugHistoryColumn,
    Entity as CountrySlugHistoryEntity,
    Model as CountrySlugHistory,
};

pub use tag_slug_history::{
    ActiveModel as TagSlugHistoryActiveModel,
    Column as TagSlugHistoryColumn,
    Entity as TagSlugHistoryEntity,
    Model as TagSlugHistory,
};

pub use post_slug_history::{
    ActiveModel as PostSlugHistoryActiveModel,
    Column as PostSlugHistoryColumn,
    Entity as PostSlugHistoryEntity,
    Model as PostSlugHistory,
};
