use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::extractors::{authenticated_user::AuthenticatedUser, json_body::JsonBody};
use crate::{AppState, Error};
use domain::group::{self as GroupApi, CreateGroupRequest};
use log::*;

/// GET a Group
#[utoipa::path(
    get,
    path = "/groups/{group_id}",
    params(("group_id" = String, Path, description = "Group id")),
    responses(
        (status = 200, description = "The group", body = domain::groups::Model),
        (status = 404, description = "Group not found", body = crate::error::ErrorBody),
    )
)]
pub async fn read(
    State(app_state): State<AppState>,
    Path(group_id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    let group_id = domain::parse_id(&group_id)?;
    debug!("GET Group {group_id}");

    Ok(Json(GroupApi::get_group(&app_state, group_id).await?))
}

/// POST create a Group
#[utoipa::path(
    post,
    path = "/groups",
    request_body = CreateGroupRequest,
    responses(
        (status = 201, description = "Successfully created a new Group", body = domain::groups::Model),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create(
    AuthenticatedUser(claims): AuthenticatedUser,
    State(app_state): State<AppState>,
    JsonBody(request): JsonBody<CreateGroupRequest>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Create a new Group: {:?}", request.group_type);

    let group = GroupApi::create(&app_state, &claims, request).await?;

    Ok((StatusCode::CREATED, Json(group)))
}
