use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use log::*;
use serde::de::DeserializeOwned;

use crate::Error;

/// `Query<T>` whose rejections become `400 { detail }` responses.
pub(crate) struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(QueryParams(value)),
            Err(rejection) => {
                debug!("Rejected query string: {rejection}");
                Err(domain::error::Error::bad_request(rejection.body_text()).into())
            }
        }
    }
}
