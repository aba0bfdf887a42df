//! SeaORM Entity for the texts table.
//! A Text is the work-level record: one language or edition of a work.

use crate::text_type::TextType;
use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::texts::Model)]
#[sea_orm(schema_name = "pecha", table_name = "texts")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[schema(value_type = String, format = Uuid)]
    pub id: Id,

    /// Identifier of the text in the upstream pecha corpus, if imported from it
    pub pecha_text_id: Option<String>,

    pub title: String,

    /// BCP-47-ish language tag (e.g. "bo", "en", "zh")
    pub language: String,

    #[schema(value_type = String, format = Uuid)]
    pub group_id: Id,

    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub text_type: TextType,

    /// Ordered list of term ids this text is filed under
    #[schema(value_type = Vec<String>, format = Uuid)]
    pub categories: Vec<Id>,

    /// For a `version`, the root Text it translates
    #[schema(value_type = Option<String>, format = Uuid)]
    pub parent_id: Option<Id>,

    pub is_published: bool,

    pub published_by: Option<String>,

    #[schema(value_type = Option<String>, format = DateTime)]
    pub published_at: Option<DateTimeWithTimeZone>,

    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,

    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Groups,

    #[sea_orm(has_many = "super::segments::Entity")]
    Segments,

    #[sea_orm(has_many = "super::table_of_contents::Entity")]
    TableOfContents,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl Related<super::segments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Segments.def()
    }
}

impl Related<super::table_of_contents::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TableOfContents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
