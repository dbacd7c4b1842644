//! Tag entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tags")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    /// Current URL identifier, globally unique. Unicode letters allowed.
    #[sea_orm(column_type = "Text")]
    pub slug: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::tag_slug_history::Entity", on_delete = "Cascade")]
    SlugHistory,
}

impl Related<super::tag_slug_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SlugHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
