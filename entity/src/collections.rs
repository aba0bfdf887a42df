//! SeaORM Entity for the collections table: the browsing tree of the library.

use crate::localised_text::LocalisedText;
use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::collections::Model)]
#[sea_orm(schema_name = "pecha", table_name = "collections")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[schema(value_type = String, format = Uuid)]
    pub id: Id,

    #[sea_orm(unique)]
    pub slug: String,

    #[sea_orm(column_type = "JsonBinary")]
    pub titles: LocalisedText,

    #[sea_orm(column_type = "JsonBinary")]
    pub descriptions: LocalisedText,

    #[schema(value_type = Option<String>, format = Uuid)]
    pub parent_id: Option<Id>,

    pub has_child: bool,

    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,

    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
