//! Language tags and language-keyed strings used for term and collection titles.

use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use utoipa::openapi::schema::{ObjectBuilder, Schema, Type};
use utoipa::openapi::RefOr;
use utoipa::{PartialSchema, ToSchema};

/// The languages the corpus is curated in, with an open fallback for anything else.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LanguageTag {
    Bo,
    En,
    Zh,
    Sa,
    Other(String),
}

impl LanguageTag {
    pub fn as_str(&self) -> &str {
        match self {
            LanguageTag::Bo => "bo",
            LanguageTag::En => "en",
            LanguageTag::Zh => "zh",
            LanguageTag::Sa => "sa",
            LanguageTag::Other(tag) => tag.as_str(),
        }
    }
}

// On the wire a tag is its plain string form, so the schema is written by hand.
impl PartialSchema for LanguageTag {
    fn schema() -> RefOr<Schema> {
        RefOr::T(Schema::Object(
            ObjectBuilder::new()
                .schema_type(Type::String)
                .examples([serde_json::json!("bo")])
                .build(),
        ))
    }
}

impl ToSchema for LanguageTag {}

impl From<String> for LanguageTag {
    fn from(tag: String) -> Self {
        LanguageTag::from(tag.as_str())
    }
}

impl From<&str> for LanguageTag {
    fn from(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "bo" => LanguageTag::Bo,
            "en" => LanguageTag::En,
            "zh" => LanguageTag::Zh,
            "sa" => LanguageTag::Sa,
            other => LanguageTag::Other(other.to_string()),
        }
    }
}

impl From<LanguageTag> for String {
    fn from(tag: LanguageTag) -> Self {
        tag.as_str().to_string()
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A string rendered in several languages, keyed by [`LanguageTag`].
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult, ToSchema,
)]
#[schema(value_type = Object, example = json!({"bo": "ཆོས་", "en": "Dharma"}))]
pub struct LocalisedText(pub BTreeMap<LanguageTag, String>);

impl LocalisedText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, language: impl Into<LanguageTag>, value: impl Into<String>) -> Self {
        self.0.insert(language.into(), value.into());
        self
    }

    /// Returns the value for `language`, falling back to `fallback` and then to
    /// whichever language sorts first.
    pub fn resolve(&self, language: &LanguageTag, fallback: &LanguageTag) -> Option<&str> {
        self.0
            .get(language)
            .or_else(|| self.0.get(fallback))
            .or_else(|| self.0.values().next())
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_tag_parses_known_and_unknown_tags() {
        assert_eq!(LanguageTag::from("BO"), LanguageTag::Bo);
        assert_eq!(
            LanguageTag::from("de"),
            LanguageTag::Other("de".to_string())
        );
    }

    #[test]
    fn language_tag_schema_is_a_plain_string() {
        let schema = serde_json::to_value(LanguageTag::schema()).unwrap();

        assert_eq!(schema["type"], "string");
        assert_eq!(schema["examples"], serde_json::json!(["bo"]));
        assert_eq!(LanguageTag::name(), "LanguageTag");
    }

    #[test]
    fn localised_text_serializes_as_plain_map() {
        let text = LocalisedText::new().with("en", "Dharma").with("bo", "ཆོས་");
        let value = serde_json::to_value(&text).unwrap();
        assert_eq!(value, serde_json::json!({"bo": "ཆོས་", "en": "Dharma"}));

        let parsed: LocalisedText = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, text);
    }

    #[test]
    fn resolve_falls_back_in_order() {
        let text = LocalisedText::new().with("zh", "法").with("bo", "ཆོས་");
        assert_eq!(text.resolve(&LanguageTag::Zh, &LanguageTag::Bo), Some("法"));
        assert_eq!(text.resolve(&LanguageTag::En, &LanguageTag::Bo), Some("ཆོས་"));

        let only_sanskrit = LocalisedText::new().with("sa", "dharma");
        assert_eq!(
            only_sanskrit.resolve(&LanguageTag::En, &LanguageTag::Bo),
            Some("dharma")
        );
        assert_eq!(LocalisedText::new().resolve(&LanguageTag::En, &LanguageTag::Bo), None);
    }
}
