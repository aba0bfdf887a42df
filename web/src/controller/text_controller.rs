use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::extractors::{
    authenticated_user::AuthenticatedUser, json_body::JsonBody, query_params::QueryParams,
};
use crate::params::text::{IndexParams, ListingParams, PageParams};
use crate::params::{page, parse_optional_id};
use crate::{AppState, Error};
use domain::error::Error as DomainError;
use domain::table_of_content::{
    self as TableOfContentApi, CreateTableOfContentRequest, TextDetailsRequest,
};
use domain::text::{self as TextApi, CreateTextRequest, UpdateTextRequest};
use log::*;

/// GET one Text by id, or the Texts filed under a term.
#[utoipa::path(
    get,
    path = "/texts",
    params(IndexParams),
    responses(
        (status = 200, description = "The Text when `text_id` is given, else a `TextsCategoryResponse`", body = domain::text::TextsCategoryResponse),
        (status = 400, description = "Neither text_id nor term_id given, or an id is malformed", body = crate::error::ErrorBody),
        (status = 404, description = "Text or term not found", body = crate::error::ErrorBody),
    )
)]
pub async fn index(
    State(app_state): State<AppState>,
    QueryParams(params): QueryParams<IndexParams>,
) -> Result<Response, Error> {
    debug!("GET Texts with params: {params:?}");

    if let Some(text_id) = parse_optional_id(params.text_id.as_deref())? {
        let text = TextApi::get_text_detail(&app_state, text_id).await?;
        return Ok(Json(text).into_response());
    }

    let Some(term_id) = parse_optional_id(params.term_id.as_deref())? else {
        return Err(DomainError::bad_request("either text_id or term_id is required").into());
    };

    let texts = TextApi::texts_by_term(
        &app_state,
        term_id,
        params.language,
        page(params.skip, params.limit),
    )
    .await?;

    Ok(Json(texts).into_response())
}

/// POST create a Text
#[utoipa::path(
    post,
    path = "/texts",
    request_body = CreateTextRequest,
    responses(
        (status = 201, description = "Successfully created a new Text", body = domain::texts::Model),
        (status = 400, description = "Invalid Text", body = crate::error::ErrorBody),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create(
    AuthenticatedUser(claims): AuthenticatedUser,
    State(app_state): State<AppState>,
    JsonBody(request): JsonBody<CreateTextRequest>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Create a new Text: {}", request.title);

    let text = TextApi::create(&app_state, &claims, request).await?;

    Ok((StatusCode::CREATED, Json(text)))
}

/// PUT update a Text
#[utoipa::path(
    put,
    path = "/texts/{text_id}",
    params(("text_id" = String, Path, description = "Text id to update")),
    request_body = UpdateTextRequest,
    responses(
        (status = 200, description = "Successfully updated the Text", body = domain::texts::Model),
        (status = 400, description = "Invalid Text", body = crate::error::ErrorBody),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Text not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update(
    AuthenticatedUser(claims): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(text_id): Path<String>,
    JsonBody(request): JsonBody<UpdateTextRequest>,
) -> Result<impl IntoResponse, Error> {
    let text_id = domain::parse_id(&text_id)?;
    debug!("PUT Update Text {text_id}");

    let text = TextApi::update(&app_state, &claims, text_id, request).await?;

    Ok(Json(text))
}

/// DELETE a Text together with its segments and tables of contents
#[utoipa::path(
    delete,
    path = "/texts/{text_id}",
    params(("text_id" = String, Path, description = "Text id to delete")),
    responses(
        (status = 204, description = "Successfully deleted the Text"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Text not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete(
    AuthenticatedUser(claims): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(text_id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    let text_id = domain::parse_id(&text_id)?;
    debug!("DELETE Text {text_id}");

    TextApi::delete(&app_state, &claims, text_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET the tables of contents of a Text, sections only
#[utoipa::path(
    get,
    path = "/texts/{text_id}/contents",
    params(
        ("text_id" = String, Path, description = "Text id"),
        ListingParams,
    ),
    responses(
        (status = 200, description = "Tables of contents without segments", body = domain::table_of_content::TableOfContentResponse),
        (status = 404, description = "Text not found", body = crate::error::ErrorBody),
    )
)]
pub async fn contents(
    State(app_state): State<AppState>,
    Path(text_id): Path<String>,
    QueryParams(params): QueryParams<ListingParams>,
) -> Result<impl IntoResponse, Error> {
    let text_id = domain::parse_id(&text_id)?;
    debug!("GET contents of Text {text_id}");

    let contents = TableOfContentApi::get_table_of_contents(
        &app_state,
        text_id,
        params.language,
        page(params.skip, params.limit),
    )
    .await?;

    Ok(Json(contents))
}

/// GET one table of contents of a Text with its segments, top-level sections paged
#[utoipa::path(
    get,
    path = "/texts/{text_id}/contents/{content_id}",
    params(
        ("text_id" = String, Path, description = "Text id"),
        ("content_id" = String, Path, description = "Table of contents id"),
        PageParams,
    ),
    responses(
        (status = 200, description = "The table of contents", body = domain::table_of_contents::Model),
        (status = 400, description = "Malformed id", body = crate::error::ErrorBody),
        (status = 404, description = "No such table of contents for the Text", body = crate::error::ErrorBody),
    )
)]
pub async fn content(
    State(app_state): State<AppState>,
    Path((text_id, content_id)): Path<(String, String)>,
    QueryParams(params): QueryParams<PageParams>,
) -> Result<impl IntoResponse, Error> {
    let text_id = domain::parse_id(&text_id)?;
    let content_id = domain::parse_id(&content_id)?;
    debug!("GET table of contents {content_id} of Text {text_id}");

    let toc = TableOfContentApi::get_table_of_content(
        &app_state,
        text_id,
        content_id,
        page(params.skip, params.limit),
    )
    .await?;

    Ok(Json(toc))
}

/// POST create a table of contents for a Text
#[utoipa::path(
    post,
    path = "/texts/{text_id}/contents",
    params(("text_id" = String, Path, description = "Text id")),
    request_body = CreateTableOfContentRequest,
    responses(
        (status = 201, description = "Successfully created the table of contents", body = domain::table_of_contents::Model),
        (status = 400, description = "Duplicate section numbers or foreign segments", body = crate::error::ErrorBody),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Text not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_contents(
    AuthenticatedUser(claims): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(text_id): Path<String>,
    JsonBody(request): JsonBody<CreateTableOfContentRequest>,
) -> Result<impl IntoResponse, Error> {
    let text_id = domain::parse_id(&text_id)?;
    debug!("POST table of contents for Text {text_id}");

    let toc = TableOfContentApi::create(&app_state, &claims, text_id, request).await?;

    Ok((StatusCode::CREATED, Json(toc)))
}

/// DELETE a table of contents of a Text
#[utoipa::path(
    delete,
    path = "/texts/{text_id}/contents/{content_id}",
    params(
        ("text_id" = String, Path, description = "Text id"),
        ("content_id" = String, Path, description = "Table of contents id"),
    ),
    responses(
        (status = 204, description = "Successfully deleted the table of contents"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Text or table of contents not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_contents(
    AuthenticatedUser(claims): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path((text_id, content_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, Error> {
    let text_id = domain::parse_id(&text_id)?;
    let content_id = domain::parse_id(&content_id)?;
    debug!("DELETE table of contents {content_id} of Text {text_id}");

    TableOfContentApi::delete(&app_state, &claims, text_id, content_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST read a window of a Text with its section tree
#[utoipa::path(
    post,
    path = "/texts/{text_id}/details",
    params(("text_id" = String, Path, description = "Text id")),
    request_body = TextDetailsRequest,
    responses(
        (status = 200, description = "A window of segments in reading order", body = domain::table_of_content::DetailTableOfContentResponse),
        (status = 400, description = "Missing or unknown anchor, or a version of another work", body = crate::error::ErrorBody),
        (status = 404, description = "Text, version or table of contents not found", body = crate::error::ErrorBody),
    )
)]
pub async fn details(
    State(app_state): State<AppState>,
    Path(text_id): Path<String>,
    JsonBody(request): JsonBody<TextDetailsRequest>,
) -> Result<impl IntoResponse, Error> {
    let text_id = domain::parse_id(&text_id)?;
    debug!("POST details of Text {text_id}: {request:?}");

    let details = TableOfContentApi::get_text_details(&app_state, text_id, request).await?;

    Ok(Json(details))
}

/// GET the versions of the work a Text belongs to
#[utoipa::path(
    get,
    path = "/texts/{text_id}/versions",
    params(
        ("text_id" = String, Path, description = "Text id"),
        ListingParams,
    ),
    responses(
        (status = 200, description = "The root Text and the other versions of the work", body = domain::text::TextVersionResponse),
        (status = 404, description = "Text not found", body = crate::error::ErrorBody),
    )
)]
pub async fn versions(
    State(app_state): State<AppState>,
    Path(text_id): Path<String>,
    QueryParams(params): QueryParams<ListingParams>,
) -> Result<impl IntoResponse, Error> {
    let text_id = domain::parse_id(&text_id)?;
    debug!("GET versions of Text {text_id}");

    let versions = TextApi::get_versions(
        &app_state,
        text_id,
        params.language,
        page(params.skip, params.limit),
    )
    .await?;

    Ok(Json(versions))
}

/// GET counts of what relates to a Text
#[utoipa::path(
    get,
    path = "/texts/{text_id}/infos",
    params(
        ("text_id" = String, Path, description = "Text id"),
        ListingParams,
    ),
    responses(
        (status = 200, description = "Translations, commentaries and sheets related to the Text", body = domain::text::TextInfosResponse),
        (status = 404, description = "Text not found", body = crate::error::ErrorBody),
    )
)]
pub async fn infos(
    State(app_state): State<AppState>,
    Path(text_id): Path<String>,
    QueryParams(params): QueryParams<ListingParams>,
) -> Result<impl IntoResponse, Error> {
    let text_id = domain::parse_id(&text_id)?;
    debug!("GET infos of Text {text_id}");

    let infos = TextApi::get_infos(
        &app_state,
        text_id,
        params.language,
        page(params.skip, params.limit),
    )
    .await?;

    Ok(Json(infos))
}
