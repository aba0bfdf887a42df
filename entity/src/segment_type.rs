use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    EnumIter,
    Deserialize,
    Serialize,
    Default,
    DeriveActiveEnum,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "segment_type")]
pub enum SegmentType {
    #[sea_orm(string_value = "source")]
    #[default]
    Source,
    #[sea_orm(string_value = "content")]
    Content,
    #[sea_orm(string_value = "audio")]
    Audio,
    #[sea_orm(string_value = "image")]
    Image,
    #[sea_orm(string_value = "video")]
    Video,
}
