use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use log::*;

use crate::Error;

/// `Json<T>` whose rejections become `400 { detail }` responses.
pub(crate) struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(request, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                debug!("Rejected request body: {rejection}");
                Err(domain::error::Error::bad_request(rejection.body_text()).into())
            }
        }
    }
}
