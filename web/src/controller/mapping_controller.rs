use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::extractors::{authenticated_user::AuthenticatedUser, json_body::JsonBody};
use crate::{AppState, Error};
use domain::mapping::{self as MappingApi, BatchMappingRequest, TextMappingRequest};
use log::*;

/// POST add mappings from one segment to others
#[utoipa::path(
    post,
    path = "/mappings",
    request_body = TextMappingRequest,
    responses(
        (status = 201, description = "The segment with its merged mappings", body = domain::segments::Model),
        (status = 400, description = "Mapping within the same text or unknown targets", body = crate::error::ErrorBody),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Text or segment not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create(
    AuthenticatedUser(claims): AuthenticatedUser,
    State(app_state): State<AppState>,
    JsonBody(request): JsonBody<TextMappingRequest>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST mappings for Segment {}", request.segment_id);

    let segment = MappingApi::update_segment_mapping(&app_state, &claims, request).await?;

    Ok((StatusCode::CREATED, Json(segment)))
}

/// POST add mappings for many segments at once
#[utoipa::path(
    post,
    path = "/mappings/batch",
    request_body = BatchMappingRequest,
    responses(
        (status = 201, description = "The segments with their merged mappings", body = [domain::segments::Model]),
        (status = 400, description = "Empty batch or an invalid entry", body = crate::error::ErrorBody),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Text or segment not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_batch(
    AuthenticatedUser(claims): AuthenticatedUser,
    State(app_state): State<AppState>,
    JsonBody(request): JsonBody<BatchMappingRequest>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST {} batched segment mappings", request.text_mappings.len());

    let segments = MappingApi::update_mappings(&app_state, &claims, request).await?;

    Ok((StatusCode::CREATED, Json(segments)))
}
