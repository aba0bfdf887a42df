use crate::group_type::GroupType;
use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::groups::Model)]
#[sea_orm(schema_name = "pecha", table_name = "groups")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[schema(value_type = String, format = Uuid)]
    pub id: Id,

    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub group_type: GroupType,

    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,

    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::texts::Entity")]
    Texts,
}

impl Related<super::texts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Texts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
