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
#[sea_orm(
    rs_type = "String",
    db_type = "Enum",
    enum_name = "table_of_content_type"
)]
pub enum TableOfContentType {
    #[sea_orm(string_value = "text")]
    #[default]
    Text,
    #[sea_orm(string_value = "sheet")]
    Sheet,
}
