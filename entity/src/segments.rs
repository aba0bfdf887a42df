//! SeaORM Entity for the segments table.
//! A segment is the unit of cross-work alignment and belongs to exactly one Text.

use crate::mapping::Mappings;
use crate::segment_type::SegmentType;
use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::segments::Model)]
#[sea_orm(schema_name = "pecha", table_name = "segments")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[schema(value_type = String, format = Uuid)]
    pub id: Id,

    pub pecha_segment_id: Option<String>,

    #[schema(value_type = String, format = Uuid)]
    pub text_id: Id,

    /// Opaque content, may carry inline citation markup
    #[sea_orm(column_type = "Text")]
    pub content: String,

    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub segment_type: SegmentType,

    #[sea_orm(column_type = "JsonBinary")]
    pub mapping: Mappings,

    /// Optimistic concurrency token, bumped on every mapping write
    #[serde(skip_serializing, default)]
    pub revision: i32,

    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,

    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTimeWithTimeZone,
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
