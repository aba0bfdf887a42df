use super::error::Error;
use crate::text::unique_ids;
use entity::groups::{ActiveModel, Column, Entity, Model};
use entity::Id;
use sea_orm::{entity::prelude::*, ActiveValue::Set, TryIntoModel};
use std::collections::HashMap;

use log::*;

pub async fn create(db: &impl ConnectionTrait, group_model: Model) -> Result<Model, Error> {
    debug!("New Group Model to be inserted: {group_model:?}");

    let now = chrono::Utc::now();

    let active_model: ActiveModel = ActiveModel {
        id: Set(group_model.id),
        group_type: Set(group_model.group_type),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    Ok(active_model.insert(db).await?.try_into_model()?)
}

pub async fn find_by_id(db: &impl ConnectionTrait, id: Id) -> Result<Option<Model>, Error> {
    Ok(Entity::find_by_id(id).one(db).await?)
}

pub async fn find_by_ids(
    db: &impl ConnectionTrait,
    ids: &[Id],
) -> Result<HashMap<Id, Model>, Error> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let groups = Entity::find()
        .filter(Column::Id.is_in(unique_ids(ids)))
        .all(db)
        .await?;
    Ok(groups.into_iter().map(|group| (group.id, group)).collect())
}
