use uuid::Uuid;

// Core entities
pub mod collections;
pub mod groups;
pub mod segments;
pub mod table_of_contents;
pub mod terms;
pub mod texts;

// Value types stored inside entity records
pub mod group_type;
pub mod localised_text;
pub mod mapping;
pub mod section;
pub mod segment_type;
pub mod table_of_content_type;
pub mod text_type;

/// A type alias that represents any Entity's internal id field data type.
/// Aliased so that it's easy to change the underlying type if necessary.
pub type Id = Uuid;
