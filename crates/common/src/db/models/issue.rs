//! Issue entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "issues")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub volume: i32,

    pub number: i32,

    pub year: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::published_article::Entity")]
    PublishedArticles,
}

impl Related<super::published_article::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PublishedArticles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
