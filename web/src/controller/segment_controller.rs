use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::extractors::{
    authenticated_user::AuthenticatedUser, json_body::JsonBody, query_params::QueryParams,
};
use crate::params::page;
use crate::params::segment::TranslationsParams;
use crate::{AppState, Error};
use domain::segment::{self as SegmentApi, CreateSegmentRequest, UpdateSegmentContentRequest};
use log::*;

/// GET a single segment
#[utoipa::path(
    get,
    path = "/segments/{segment_id}",
    params(("segment_id" = String, Path, description = "Segment id")),
    responses(
        (status = 200, description = "The segment", body = domain::segments::Model),
        (status = 400, description = "Malformed id", body = crate::error::ErrorBody),
        (status = 404, description = "Segment not found", body = crate::error::ErrorBody),
    )
)]
pub async fn read(
    State(app_state): State<AppState>,
    Path(segment_id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    let segment_id = domain::parse_id(&segment_id)?;
    debug!("GET Segment {segment_id}");

    let segment = SegmentApi::get_segment(&app_state, segment_id).await?;

    Ok(Json(segment))
}

/// POST create segments of a Text
#[utoipa::path(
    post,
    path = "/segments",
    request_body = CreateSegmentRequest,
    responses(
        (status = 201, description = "Successfully created the segments", body = [domain::segments::Model]),
        (status = 400, description = "Empty batch, duplicate pecha ids or invalid mappings", body = crate::error::ErrorBody),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Text not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create(
    AuthenticatedUser(claims): AuthenticatedUser,
    State(app_state): State<AppState>,
    JsonBody(request): JsonBody<CreateSegmentRequest>,
) -> Result<impl IntoResponse, Error> {
    debug!(
        "POST Create {} segments for Text {}",
        request.segments.len(),
        request.text_id
    );

    let segments = SegmentApi::create(&app_state, &claims, request).await?;

    Ok((StatusCode::CREATED, Json(segments)))
}

/// PUT replace the content of segments addressed by their pecha segment id
#[utoipa::path(
    put,
    path = "/segments/content",
    request_body = UpdateSegmentContentRequest,
    responses(
        (status = 200, description = "Successfully updated the segments", body = [domain::segments::Model]),
        (status = 400, description = "Empty batch", body = crate::error::ErrorBody),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Text or segment not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_content(
    AuthenticatedUser(claims): AuthenticatedUser,
    State(app_state): State<AppState>,
    JsonBody(request): JsonBody<UpdateSegmentContentRequest>,
) -> Result<impl IntoResponse, Error> {
    debug!("PUT content of segments in Text {}", request.text_id);

    let segments = SegmentApi::update_contents(&app_state, &claims, request).await?;

    Ok(Json(segments))
}

/// GET the translations of a segment
#[utoipa::path(
    get,
    path = "/segments/{segment_id}/translations",
    params(
        ("segment_id" = String, Path, description = "Segment id"),
        TranslationsParams,
    ),
    responses(
        (status = 200, description = "Segments of other versions mapped to this one", body = domain::segment::SegmentTranslationsResponse),
        (status = 404, description = "Segment not found", body = crate::error::ErrorBody),
    )
)]
pub async fn translations(
    State(app_state): State<AppState>,
    Path(segment_id): Path<String>,
    QueryParams(params): QueryParams<TranslationsParams>,
) -> Result<impl IntoResponse, Error> {
    let segment_id = domain::parse_id(&segment_id)?;
    debug!("GET translations of Segment {segment_id}");

    let translations =
        SegmentApi::translations(&app_state, segment_id, page(params.skip, params.limit)).await?;

    Ok(Json(translations))
}

/// GET the commentaries on a segment, one entry per commentary text
#[utoipa::path(
    get,
    path = "/segments/{segment_id}/commentaries",
    params(("segment_id" = String, Path, description = "Segment id")),
    responses(
        (status = 200, description = "Commentary segments grouped by text", body = domain::segment::SegmentCommentariesResponse),
        (status = 404, description = "Segment not found", body = crate::error::ErrorBody),
    )
)]
pub async fn commentaries(
    State(app_state): State<AppState>,
    Path(segment_id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    let segment_id = domain::parse_id(&segment_id)?;
    debug!("GET commentaries of Segment {segment_id}");

    Ok(Json(SegmentApi::commentaries(&app_state, segment_id).await?))
}

/// GET the root text segments a commentary segment refers to
#[utoipa::path(
    get,
    path = "/segments/{segment_id}/root-mapping",
    params(("segment_id" = String, Path, description = "Segment id")),
    responses(
        (status = 200, description = "Root segments grouped by text", body = domain::segment::SegmentRootMappingResponse),
        (status = 404, description = "Segment not found", body = crate::error::ErrorBody),
    )
)]
pub async fn root_mapping(
    State(app_state): State<AppState>,
    Path(segment_id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    let segment_id = domain::parse_id(&segment_id)?;
    debug!("GET root mapping of Segment {segment_id}");

    Ok(Json(SegmentApi::root_mapping(&app_state, segment_id).await?))
}

/// GET counts of the texts related to a segment
#[utoipa::path(
    get,
    path = "/segments/{segment_id}/info",
    params(("segment_id" = String, Path, description = "Segment id")),
    responses(
        (status = 200, description = "Translation, commentary, root text and sheet counts", body = domain::segment::SegmentInfoResponse),
        (status = 404, description = "Segment not found", body = crate::error::ErrorBody),
    )
)]
pub async fn info(
    State(app_state): State<AppState>,
    Path(segment_id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    let segment_id = domain::parse_id(&segment_id)?;
    debug!("GET info of Segment {segment_id}");

    Ok(Json(SegmentApi::info(&app_state, segment_id).await?))
}
