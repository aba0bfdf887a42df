use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The kind of a Text within a work.
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Hash,
    EnumIter,
    Deserialize,
    Serialize,
    DeriveActiveEnum,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "text_type")]
pub enum TextType {
    #[sea_orm(string_value = "root_text")]
    RootText,
    #[sea_orm(string_value = "commentary")]
    Commentary,
    #[sea_orm(string_value = "version")]
    Version,
    #[sea_orm(string_value = "translation")]
    Translation,
    #[sea_orm(string_value = "transliteration")]
    Transliteration,
    #[sea_orm(string_value = "adaptation")]
    Adaptation,
    #[sea_orm(string_value = "sheet")]
    Sheet,
}

impl std::fmt::Display for TextType {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextType::RootText => write!(fmt, "root_text"),
            TextType::Commentary => write!(fmt, "commentary"),
            TextType::Version => write!(fmt, "version"),
            TextType::Translation => write!(fmt, "translation"),
            TextType::Transliteration => write!(fmt, "transliteration"),
            TextType::Adaptation => write!(fmt, "adaptation"),
            TextType::Sheet => write!(fmt, "sheet"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_type_serializes_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&TextType::RootText).unwrap(),
            "\"root_text\""
        );
        let parsed: TextType = serde_json::from_str("\"commentary\"").unwrap();
        assert_eq!(parsed, TextType::Commentary);
    }

    #[test]
    fn display_matches_wire_value() {
        assert_eq!(TextType::Transliteration.to_string(), "transliteration");
    }
}
