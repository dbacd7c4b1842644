//! Country entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "countries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    /// English name, preferred as the slug derivation base when present
    #[sea_orm(column_type = "Text", nullable)]
    pub name_en: Option<String>,

    /// Current URL identifier, globally unique
    #[sea_orm(column_type = "Text")]
    pub slug: String,

    /// ISO 3166-1 alpha-2 code, stored uppercase or NULL
    #[sea_orm(column_type = "Text", nullable)]
    pub iso_a2: Option<String>,

    /// ISO 3166-1 alpha-3 code, stored uppercase or NULL, unique
    #[sea_orm(column_type = "Text", nullable)]
    pub iso_a3: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::post::Entity")]
    Posts,

    #[sea_orm(has_many = "super::country_slug_history::Entity", on_delete = "Cascade")]
    SlugHistory,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Posts.def()
    }
}

impl Related<super::country_slug_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SlugHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
