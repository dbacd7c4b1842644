//! Post entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Post category enum
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    History,
    Culture,
    Travel,
    MyLog,
}

impl Category {
    /// Stored database discriminant
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::History => "HISTORY",
            Category::Culture => "CULTURE",
            Category::Travel => "TRAVEL",
            Category::MyLog => "MY_LOG",
        }
    }

    /// URL path segment for this category
    pub fn as_slug(&self) -> &'static str {
        match self {
            Category::History => "history",
            Category::Culture => "culture",
            Category::Travel => "travel",
            Category::MyLog => "my-log",
        }
    }

    /// Parse a URL path segment. Unknown segments are rejected so a typo'd
    /// category path never resolves to content.
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "history" => Some(Category::History),
            "culture" => Some(Category::Culture),
            "travel" => Some(Category::Travel),
            "my-log" => Some(Category::MyLog),
            _ => None,
        }
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        match s.as_str() {
            "HISTORY" => Category::History,
            "CULTURE" => Category::Culture,
            "MY_LOG" => Category::MyLog,
            _ => Category::Travel,
        }
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub country_id: Uuid,

    /// Stored category discriminant (see [`Category`])
    #[sea_orm(column_type = "Text")]
    pub category: String,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    /// Current URL identifier. Globally unique as a value; history and
    /// redirect resolution are scoped by (country_id, category).
    #[sea_orm(column_type = "Text")]
    pub slug: String,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    pub is_published: bool,

    pub published_at: Option<Date>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Get the category as an enum
    pub fn category(&self) -> Category {
        Category::from(self.category.clone())
    }

    /// URL path segment of this post's category
    pub fn category_slug(&self) -> &'static str {
        self.category().as_slug()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::country::Entity",
        from = "Column::CountryId",
        to = "super::country::Column::Id"
    )]
    Country,

    #[sea_orm(has_many = "super::post_slug_history::Entity", on_delete = "Cascade")]
    SlugHistory,
}

impl Related<super::country::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Country.def()
    }
}

impl Related<super::post_slug_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SlugHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_slug_round_trip() {
        for category in [
            Category::History,
            Category::Culture,
            Category::Travel,
            Category::MyLog,
        ] {
            assert_eq!(Category::from_slug(category.as_slug()), Some(category));
        }
    }

    #[test]
    fn test_unknown_category_slug_rejected() {
        assert_eq!(Category::from_slug("trave"), None);
        assert_eq!(Category::from_slug("MY_LOG"), None);
        assert_eq!(Category::from_slug(""), None);
    }
}
