use super::error::Error;
use entity::collections::{ActiveModel, Column, Entity, Model};
use entity::Id;
use sea_orm::{
    entity::prelude::*,
    sea_query::Expr,
    ActiveValue::Set,
    QueryOrder, QuerySelect, TryIntoModel,
};

use log::*;

/// Inserts a collection and flags its parent, if any, as having children.
pub async fn create(db: &impl ConnectionTrait, collection_model: Model) -> Result<Model, Error> {
    debug!("New Collection Model to be inserted: {collection_model:?}");

    let now = chrono::Utc::now();

    let active_model: ActiveModel = ActiveModel {
        id: Set(collection_model.id),
        slug: Set(collection_model.slug),
        titles: Set(collection_model.titles),
        descriptions: Set(collection_model.descriptions),
        parent_id: Set(collection_model.parent_id),
        has_child: Set(false),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let collection = active_model.insert(db).await?.try_into_model()?;

    if let Some(parent_id) = collection.parent_id {
        Entity::update_many()
            .col_expr(Column::HasChild, Expr::value(true))
            .filter(Column::Id.eq(parent_id))
            .exec(db)
            .await?;
    }

    Ok(collection)
}

pub async fn find_by_id(db: &impl ConnectionTrait, id: Id) -> Result<Option<Model>, Error> {
    Ok(Entity::find_by_id(id).one(db).await?)
}

pub async fn find_by_slug(db: &impl ConnectionTrait, slug: &str) -> Result<Option<Model>, Error> {
    Ok(Entity::find().filter(Column::Slug.eq(slug)).one(db).await?)
}

/// Children of `parent_id`, or the root collections when `parent_id` is `None`.
pub async fn find_by_parent(
    db: &impl ConnectionTrait,
    parent_id: Option<Id>,
    skip: u64,
    limit: u64,
) -> Result<(Vec<Model>, u64), Error> {
    let query = match parent_id {
        Some(parent_id) => Entity::find().filter(Column::ParentId.eq(parent_id)),
        None => Entity::find().filter(Column::ParentId.is_null()),
    };

    let total = query.clone().count(db).await?;
    let collections = query
        .order_by_asc(Column::Slug)
        .offset(skip)
        .limit(limit)
        .all(db)
        .await?;

    Ok((collections, total))
}
