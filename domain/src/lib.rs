//! This module re-exports the record types of the `entity` crate through `entity_api`.
//!
//! Consumers of the `domain` crate (the `web` layer) work with these types without
//! depending on `entity_api` directly. Storage access itself stays encapsulated in
//! `entity_api` and is only reached through the operations below.
pub use entity_api::{
    collections, group_type, groups, localised_text, section, segment_type, segments,
    table_of_content_type, table_of_contents, terms, text_type, texts, Id,
};
pub use entity_api::mapping::{Mapping, Mappings};

pub mod collection;
pub mod error;
pub mod group;
pub mod jwt;
pub mod mapping;
pub mod page;
pub mod segment;
pub mod table_of_content;
pub mod term;
pub mod text;

mod cache;
mod store;

#[cfg(test)]
mod test_support;

use error::Error;

/// Parses an id taken from a path or query string.
pub fn parse_id(value: &str) -> Result<Id, Error> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::bad_request("id must not be empty"));
    }
    entity_api::uuid_parse_str(value).map_err(|_| Error::bad_request(format!("invalid id {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_accepts_uuids() {
        let id = Id::new_v4();
        assert_eq!(parse_id(&format!(" {id} ")).unwrap(), id);
    }

    #[test]
    fn parse_id_rejects_empty_and_malformed_ids() {
        assert!(parse_id("").is_err());
        assert!(parse_id("not-a-uuid").is_err());
    }
}
