use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use domain::error::{
    DomainErrorKind, EntityErrorKind, Error as DomainError, InternalErrorKind, RequestErrorKind,
};
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(DomainError);

/// The body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub detail: String,
}

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl Error {
    fn status_and_detail(self) -> (StatusCode, String) {
        match self.0.error_kind {
            DomainErrorKind::Request(request_error_kind) => match request_error_kind {
                RequestErrorKind::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
                RequestErrorKind::NotFound(detail) => (StatusCode::NOT_FOUND, detail),
                RequestErrorKind::Unauthorized => {
                    (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
                }
                RequestErrorKind::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            },
            DomainErrorKind::Internal(internal_error_kind) => match internal_error_kind {
                InternalErrorKind::Entity(entity_error_kind) => match entity_error_kind {
                    EntityErrorKind::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
                    EntityErrorKind::Invalid => {
                        (StatusCode::BAD_REQUEST, "Invalid request".to_string())
                    }
                    EntityErrorKind::DbTransaction | EntityErrorKind::Other(_) => {
                        error!("Storage failure: {:?}", self.0.source);
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            "Internal server error".to_string(),
                        )
                    }
                },
                InternalErrorKind::Timeout => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage timed out".to_string(),
                ),
                InternalErrorKind::Other(message) => {
                    error!("Internal error: {message}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                    )
                }
            },
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, detail) = self.status_and_detail();
        (status, Json(ErrorBody { detail })).into_response()
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(err: DomainError) -> (StatusCode, serde_json::Value) {
        let response = Error::from(err).into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn request_errors_keep_their_detail() {
        let (status, body) = render(DomainError::bad_request("mapping within same text not allowed")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            serde_json::json!({ "detail": "mapping within same text not allowed" })
        );

        let (status, _) = render(DomainError::not_found("Text x not found")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn auth_errors_map_to_401_and_403() {
        assert_eq!(render(DomainError::unauthorized()).await.0, StatusCode::UNAUTHORIZED);
        assert_eq!(render(DomainError::forbidden()).await.0, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn internal_errors_hide_their_cause() {
        let (status, body) = render(DomainError::internal("segment mapping kept changing")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, serde_json::json!({ "detail": "Internal server error" }));

        assert_eq!(
            render(DomainError::timeout()).await.0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
