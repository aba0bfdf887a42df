use super::error::Error;
use crate::text::unique_ids;
use entity::table_of_contents::{ActiveModel, Column, Entity, Model};
use entity::Id;
use sea_orm::{entity::prelude::*, ActiveValue::Set, QueryOrder, TryIntoModel};

use log::*;

pub async fn create(db: &impl ConnectionTrait, toc_model: Model) -> Result<Model, Error> {
    debug!("New TableOfContent Model to be inserted: {toc_model:?}");

    let now = chrono::Utc::now();

    let active_model: ActiveModel = ActiveModel {
        id: Set(toc_model.id),
        text_id: Set(toc_model.text_id),
        toc_type: Set(toc_model.toc_type),
        sections: Set(toc_model.sections),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    Ok(active_model.insert(db).await?.try_into_model()?)
}

pub async fn find_by_id(db: &impl ConnectionTrait, id: Id) -> Result<Option<Model>, Error> {
    Ok(Entity::find_by_id(id).one(db).await?)
}

/// Looks up a table of contents with its sections sorted and its top-level
/// sections paged by `skip`/`limit`.
pub async fn find_by_id_paginated(
    db: &impl ConnectionTrait,
    id: Id,
    skip: u64,
    limit: u64,
) -> Result<Option<Model>, Error> {
    Ok(find_by_id(db, id).await?.map(|toc| {
        let toc = toc.normalised();
        Model {
            sections: toc.sections.paginated(skip, limit),
            ..toc
        }
    }))
}

/// All tables of contents of a Text, oldest first.
pub async fn find_by_text(db: &impl ConnectionTrait, text_id: Id) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::TextId.eq(text_id))
        .order_by_asc(Column::CreatedAt)
        .order_by_asc(Column::Id)
        .all(db)
        .await?)
}

/// Tables of contents of several Texts, oldest first.
pub async fn find_by_texts(
    db: &impl ConnectionTrait,
    text_ids: &[Id],
) -> Result<Vec<Model>, Error> {
    if text_ids.is_empty() {
        return Ok(Vec::new());
    }
    Ok(Entity::find()
        .filter(Column::TextId.is_in(unique_ids(text_ids)))
        .order_by_asc(Column::CreatedAt)
        .order_by_asc(Column::Id)
        .all(db)
        .await?)
}

pub async fn delete_by_id(db: &impl ConnectionTrait, id: Id) -> Result<(), Error> {
    Entity::delete_by_id(id).exec(db).await?;
    Ok(())
}

pub async fn delete_by_text(db: &impl ConnectionTrait, text_id: Id) -> Result<u64, Error> {
    let result = Entity::delete_many()
        .filter(Column::TextId.eq(text_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
