use crate::error::Error;
use crate::jwt::{require_admin, Claims};
use crate::store;
use crate::{group_type::GroupType, groups, Id};
use entity_api::group as group_api;
use log::*;
use serde::{Deserialize, Serialize};
use service::AppState;
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CreateGroupRequest {
    #[serde(rename = "type")]
    pub group_type: GroupType,
}

pub async fn get_group(app_state: &AppState, group_id: Id) -> Result<groups::Model, Error> {
    store::read(
        app_state,
        group_api::find_by_id(app_state.db_conn_ref(), group_id),
    )
    .await?
    .ok_or_else(|| Error::not_found(format!("Group {group_id} not found")))
}

pub async fn create(
    app_state: &AppState,
    claims: &Claims,
    request: CreateGroupRequest,
) -> Result<groups::Model, Error> {
    require_admin(claims)?;

    let now = chrono::Utc::now();
    let group = store::write(
        app_state,
        group_api::create(
            app_state.db_conn_ref(),
            groups::Model {
                id: Id::new_v4(),
                group_type: request.group_type,
                created_at: now.into(),
                updated_at: now.into(),
            },
        ),
    )
    .await?;

    info!("Created {} group {}", group.group_type, group.id);
    Ok(group)
}
