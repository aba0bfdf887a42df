//! Error types for the store adapter.
use std::error::Error as StdError;
use std::fmt;

use serde::Serialize;

use sea_orm::error::DbErr;

/// Errors while executing store operations.
/// Absent records are not errors at this layer: lookups return `Option`, maps or
/// empty lists and callers decide what "missing" means. What remains is:
///  * Errors related to the request itself. Ex an unparsable id
///  * Errors related to interactions with the database itself. Ex DbErr::Conn
#[derive(Debug, PartialEq)]
pub struct Error {
    // Underlying error emitted from seaORM internals
    pub source: Option<DbErr>,
    // Enum representing which category of error
    pub error_kind: EntityApiErrorKind,
}

#[derive(Debug, PartialEq, Serialize)]
pub enum EntityApiErrorKind {
    // Invalid search term or malformed id
    InvalidQueryTerm,
    // Record not found where one was required (updates)
    RecordNotFound,
    // Record not updated
    RecordNotUpdated,
    // Errors related to interactions with the database itself. Ex DbErr::Conn
    SystemError,
    // Other errors
    Other,
}

impl Error {
    pub(crate) fn record_not_found() -> Self {
        Error {
            source: None,
            error_kind: EntityApiErrorKind::RecordNotFound,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Entity API Error: {:?}", self)
    }
}

impl StdError for Error {}

impl From<DbErr> for Error {
    fn from(err: DbErr) -> Self {
        let error_kind = match err {
            DbErr::RecordNotFound(_) => EntityApiErrorKind::RecordNotFound,
            DbErr::RecordNotUpdated => EntityApiErrorKind::RecordNotUpdated,
            _ => EntityApiErrorKind::SystemError,
        };
        Error {
            source: Some(err),
            error_kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_errors_are_system_errors() {
        let err: Error = DbErr::Conn(sea_orm::RuntimeErr::Internal("refused".to_string())).into();
        assert_eq!(err.error_kind, EntityApiErrorKind::SystemError);
    }

    #[test]
    fn record_not_updated_is_preserved() {
        let err: Error = DbErr::RecordNotUpdated.into();
        assert_eq!(err.error_kind, EntityApiErrorKind::RecordNotUpdated);
    }
}
