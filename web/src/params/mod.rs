//! This module holds typed parameters for the query strings of the read endpoints.
//!
//! Ids arrive as strings and are parsed with [`domain::parse_id`] so that a
//! malformed id is reported as `400 { detail }` like every other request error.

use domain::page::Page;
use domain::{error::Error as DomainError, Id};

pub(crate) mod collection;
pub(crate) mod segment;
pub(crate) mod term;
pub(crate) mod text;

pub(crate) fn parse_optional_id(value: Option<&str>) -> Result<Option<Id>, DomainError> {
    value
        .filter(|value| !value.trim().is_empty())
        .map(domain::parse_id)
        .transpose()
}

pub(crate) fn page(skip: Option<u64>, limit: Option<u64>) -> Page {
    Page::new(skip, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_ids_treat_blank_as_absent() {
        assert_eq!(parse_optional_id(None).unwrap(), None);
        assert_eq!(parse_optional_id(Some("  ")).unwrap(), None);
        assert!(parse_optional_id(Some("nope")).is_err());

        let id = Id::new_v4();
        assert_eq!(parse_optional_id(Some(&id.to_string())).unwrap(), Some(id));
    }
}
