//! Error types for the `domain` layer.
use entity_api::error::{EntityApiErrorKind, Error as EntityApiError};
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree with `domain::error::Error` at
/// the root holding an `error_kind` that says what went wrong, either inside the
/// service (`Internal`) or with the caller's request (`Request`). The `source` field
/// keeps the lower-layer error that caused it. `web` only ever sees this type and
/// turns the kind into an HTTP status and a `detail` message.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    Request(RequestErrorKind),
}

/// Failures of the service itself. None of these are the caller's fault.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Entity(EntityErrorKind),
    /// A store operation did not finish within its configured timeout.
    Timeout,
    Other(String),
}

/// Enum representing the kinds of entity errors that bubble up from `entity_api`,
/// reduced to the subset that matters to the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum EntityErrorKind {
    NotFound,
    Invalid,
    DbTransaction,
    Other(String),
}

/// Problems with what the caller asked for. The message is shown to the caller.
#[derive(Debug, PartialEq)]
pub enum RequestErrorKind {
    BadRequest(String),
    NotFound(String),
    Unauthorized,
    Forbidden,
}

impl Error {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::request(RequestErrorKind::BadRequest(message.into()))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::request(RequestErrorKind::NotFound(message.into()))
    }

    pub fn unauthorized() -> Self {
        Self::request(RequestErrorKind::Unauthorized)
    }

    pub fn forbidden() -> Self {
        Self::request(RequestErrorKind::Forbidden)
    }

    pub fn timeout() -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Timeout),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(message.into())),
        }
    }

    fn request(kind: RequestErrorKind) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Request(kind),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// This is where we translate errors from the `entity_api` layer to the `domain` layer.
impl From<EntityApiError> for Error {
    fn from(err: EntityApiError) -> Self {
        let entity_error_kind = match err.error_kind {
            EntityApiErrorKind::RecordNotFound => EntityErrorKind::NotFound,
            EntityApiErrorKind::InvalidQueryTerm => EntityErrorKind::Invalid,
            EntityApiErrorKind::SystemError => EntityErrorKind::DbTransaction,
            EntityApiErrorKind::RecordNotUpdated => {
                EntityErrorKind::Other("record not updated".to_string())
            }
            EntityApiErrorKind::Other => EntityErrorKind::Other("EntityErrorKind".to_string()),
        };

        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(entity_error_kind)),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Request(RequestErrorKind::Unauthorized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_not_found_becomes_entity_not_found() {
        let err: Error = EntityApiError {
            source: None,
            error_kind: EntityApiErrorKind::RecordNotFound,
        }
        .into();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::NotFound))
        );
        assert!(StdError::source(&err).is_some());
    }

    #[test]
    fn system_errors_become_db_transaction_errors() {
        let err: Error = EntityApiError {
            source: None,
            error_kind: EntityApiErrorKind::SystemError,
        }
        .into();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::DbTransaction))
        );
    }

    #[test]
    fn constructors_build_request_errors() {
        assert_eq!(
            Error::bad_request("nope").error_kind,
            DomainErrorKind::Request(RequestErrorKind::BadRequest("nope".to_string()))
        );
        assert_eq!(
            Error::forbidden().error_kind,
            DomainErrorKind::Request(RequestErrorKind::Forbidden)
        );
    }
}
