//! Manuscript entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "manuscripts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_name = "abstract", column_type = "Text")]
    pub abstract_text: String,

    #[sea_orm(column_type = "Text")]
    pub subject_area: String,

    /// Ordered keyword list as a JSONB array of strings
    #[sea_orm(column_type = "JsonBinary")]
    pub keywords: Json,

    #[sea_orm(column_type = "Text", nullable)]
    pub doi: Option<String>,
}

impl Model {
    /// Keywords in stored order; non-string entries are ignored
    pub fn keyword_list(&self) -> Vec<String> {
        self.keywords
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::manuscript_author::Entity")]
    Authors,

    #[sea_orm(has_many = "super::published_article::Entity")]
    PublishedArticles,
}

impl Related<super::manuscript_author::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Authors.def()
    }
}

impl Related<super::published_article::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PublishedArticles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
