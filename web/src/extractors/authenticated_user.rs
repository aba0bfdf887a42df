use axum::{extract::FromRequestParts, http::request::Parts};
use domain::jwt::Claims;
use log::*;

use crate::Error;

/// The verified claims of the caller, placed in the request extensions by
/// [`require_auth`](crate::middleware::auth::require_auth).
pub(crate) struct AuthenticatedUser(pub Claims);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Claims>() {
            Some(claims) => Ok(AuthenticatedUser(claims.clone())),
            None => {
                warn!("AuthenticatedUser used on a route without require_auth");
                Err(domain::error::Error::unauthorized().into())
            }
        }
    }
}
