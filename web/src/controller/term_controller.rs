use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::extractors::{
    authenticated_user::AuthenticatedUser, json_body::JsonBody, query_params::QueryParams,
};
use crate::params::term::IndexParams;
use crate::params::{page, parse_optional_id};
use crate::{AppState, Error};
use domain::term::{self as TermApi, CreateTermRequest};
use log::*;

/// GET the terms under a parent term, or the top-level terms
#[utoipa::path(
    get,
    path = "/terms",
    params(IndexParams),
    responses(
        (status = 200, description = "A page of terms", body = domain::term::TermsResponse),
        (status = 404, description = "Parent term not found", body = crate::error::ErrorBody),
    )
)]
pub async fn index(
    State(app_state): State<AppState>,
    QueryParams(params): QueryParams<IndexParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET Terms with params: {params:?}");

    let parent_id = parse_optional_id(params.parent_id.as_deref())?;
    let terms = TermApi::list_terms(&app_state, parent_id, page(params.skip, params.limit)).await?;

    Ok(Json(terms))
}

/// GET a Term
#[utoipa::path(
    get,
    path = "/terms/{term_id}",
    params(("term_id" = String, Path, description = "Term id")),
    responses(
        (status = 200, description = "The term", body = domain::terms::Model),
        (status = 404, description = "Term not found", body = crate::error::ErrorBody),
    )
)]
pub async fn read(
    State(app_state): State<AppState>,
    Path(term_id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    let term_id = domain::parse_id(&term_id)?;
    debug!("GET Term {term_id}");

    Ok(Json(TermApi::get_term(&app_state, term_id).await?))
}

/// POST create a Term
#[utoipa::path(
    post,
    path = "/terms",
    request_body = CreateTermRequest,
    responses(
        (status = 201, description = "Successfully created a new Term", body = domain::terms::Model),
        (status = 400, description = "Invalid or duplicate slug", body = crate::error::ErrorBody),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Parent term not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create(
    AuthenticatedUser(claims): AuthenticatedUser,
    State(app_state): State<AppState>,
    JsonBody(request): JsonBody<CreateTermRequest>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Create a new Term: {}", request.slug);

    let term = TermApi::create(&app_state, &claims, request).await?;

    Ok((StatusCode::CREATED, Json(term)))
}
