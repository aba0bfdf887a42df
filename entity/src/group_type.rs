use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A Group ties together the Texts that express the same work.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, EnumIter, Deserialize, Serialize, DeriveActiveEnum, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "group_type")]
pub enum GroupType {
    #[sea_orm(string_value = "text")]
    Text,
    #[sea_orm(string_value = "commentary")]
    Commentary,
    #[sea_orm(string_value = "version")]
    Version,
}

impl std::fmt::Display for GroupType {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupType::Text => write!(fmt, "text"),
            GroupType::Commentary => write!(fmt, "commentary"),
            GroupType::Version => write!(fmt, "version"),
        }
    }
}
