//! SeaORM Entity for the table_of_contents table.

use crate::section::Sections;
use crate::table_of_content_type::TableOfContentType;
use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::table_of_contents::Model)]
#[sea_orm(schema_name = "pecha", table_name = "table_of_contents")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[schema(value_type = String, format = Uuid)]
    pub id: Id,

    #[schema(value_type = String, format = Uuid)]
    pub text_id: Id,

    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub toc_type: TableOfContentType,

    #[sea_orm(column_type = "JsonBinary")]
    pub sections: Sections,

    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,

    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// The same table of contents with every level sorted.
    pub fn normalised(self) -> Self {
        Self {
            sections: self.sections.normalised(),
            ..self
        }
    }

    /// The tree structure only; used by the contents listing.
    pub fn stripped(self) -> Self {
        Self {
            sections: self.sections.stripped(),
            ..self
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::texts::Entity",
        from = "Column::TextId",
        to = "super::texts::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Texts,
}

impl Related<super::texts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Texts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
