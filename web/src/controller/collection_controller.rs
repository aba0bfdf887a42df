use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::extractors::{
    authenticated_user::AuthenticatedUser, json_body::JsonBody, query_params::QueryParams,
};
use crate::params::collection::IndexParams;
use crate::params::{page, parse_optional_id};
use crate::{AppState, Error};
use domain::collection::{self as CollectionApi, CreateCollectionRequest};
use log::*;

/// GET the collections under a parent, or the top-level collections
#[utoipa::path(
    get,
    path = "/collections",
    params(IndexParams),
    responses(
        (status = 200, description = "A page of collections", body = domain::collection::CollectionsResponse),
        (status = 404, description = "Parent collection not found", body = crate::error::ErrorBody),
    )
)]
pub async fn index(
    State(app_state): State<AppState>,
    QueryParams(params): QueryParams<IndexParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET Collections with params: {params:?}");

    let parent_id = parse_optional_id(params.parent_id.as_deref())?;
    let collections =
        CollectionApi::list_collections(&app_state, parent_id, page(params.skip, params.limit))
            .await?;

    Ok(Json(collections))
}

/// POST create a Collection
#[utoipa::path(
    post,
    path = "/collections",
    request_body = CreateCollectionRequest,
    responses(
        (status = 201, description = "Successfully created a new Collection", body = domain::collections::Model),
        (status = 400, description = "Invalid slug", body = crate::error::ErrorBody),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create(
    AuthenticatedUser(claims): AuthenticatedUser,
    State(app_state): State<AppState>,
    JsonBody(request): JsonBody<CreateCollectionRequest>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Create a new Collection: {}", request.slug);

    let collection = CollectionApi::create(&app_state, &claims, request).await?;

    Ok((StatusCode::CREATED, Json(collection)))
}
