use super::error::Error;
use crate::text::unique_ids;
use crate::EXISTENCE_CHUNK_SIZE;
use entity::mapping::Mappings;
use entity::segments::{ActiveModel, Column, Entity, Model};
use entity::Id;
use sea_orm::{
    entity::prelude::*,
    sea_query::{Expr, SimpleExpr},
    ActiveValue::Set,
    Condition, DatabaseConnection, QueryOrder, TransactionTrait, TryIntoModel,
};
use serde_json::json;
use std::collections::HashMap;

use log::*;

/// JSON containment over the `mapping` document; served by the GIN index on `segments.mapping`.
fn mapping_contains(document: serde_json::Value) -> SimpleExpr {
    Expr::cust_with_values(r#""segments"."mapping" @> $1::jsonb"#, [document])
}

pub async fn create(db: &impl ConnectionTrait, segment_model: Model) -> Result<Model, Error> {
    let now = chrono::Utc::now();

    let active_model: ActiveModel = ActiveModel {
        id: Set(segment_model.id),
        pecha_segment_id: Set(segment_model.pecha_segment_id),
        text_id: Set(segment_model.text_id),
        content: Set(segment_model.content),
        segment_type: Set(segment_model.segment_type),
        mapping: Set(segment_model.mapping),
        revision: Set(0),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    Ok(active_model.insert(db).await?.try_into_model()?)
}

pub async fn find_by_id(db: &impl ConnectionTrait, id: Id) -> Result<Option<Model>, Error> {
    Ok(Entity::find_by_id(id).one(db).await?)
}

/// Batch lookup keyed by id. Ids with no record are simply absent from the map.
pub async fn find_by_ids(
    db: &impl ConnectionTrait,
    ids: &[Id],
) -> Result<HashMap<Id, Model>, Error> {
    let unique = unique_ids(ids);
    let mut segments = HashMap::with_capacity(unique.len());

    for chunk in unique.chunks(EXISTENCE_CHUNK_SIZE) {
        let found = Entity::find()
            .filter(Column::Id.is_in(chunk.to_vec()))
            .all(db)
            .await?;
        segments.extend(found.into_iter().map(|segment| (segment.id, segment)));
    }

    Ok(segments)
}

pub async fn find_by_text(db: &impl ConnectionTrait, text_id: Id) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::TextId.eq(text_id))
        .order_by_asc(Column::PechaSegmentId)
        .order_by_asc(Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn exists(db: &impl ConnectionTrait, id: Id) -> Result<bool, Error> {
    Ok(Entity::find_by_id(id).count(db).await? > 0)
}

/// Checks membership in chunks of [`EXISTENCE_CHUNK_SIZE`], stopping at the first
/// chunk that comes back short.
pub async fn all_exist(db: &impl ConnectionTrait, ids: &[Id]) -> Result<bool, Error> {
    for chunk in unique_ids(ids).chunks(EXISTENCE_CHUNK_SIZE) {
        let found = Entity::find()
            .filter(Column::Id.is_in(chunk.to_vec()))
            .count(db)
            .await?;
        if found < chunk.len() as u64 {
            debug!("Segments chunk short: expected {}, found {found}", chunk.len());
            return Ok(false);
        }
    }
    Ok(true)
}

/// Every segment whose `mapping[*].segments` contains `parent_segment_id`.
pub async fn find_related_mapped(
    db: &impl ConnectionTrait,
    parent_segment_id: Id,
) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(mapping_contains(
            json!([{ "segments": [parent_segment_id] }]),
        ))
        .all(db)
        .await?)
}

/// Reverse lookup for several parents in one round trip. Callers regroup by parent.
pub async fn find_related_mapped_many(
    db: &impl ConnectionTrait,
    parent_segment_ids: &[Id],
) -> Result<Vec<Model>, Error> {
    if parent_segment_ids.is_empty() {
        return Ok(Vec::new());
    }

    let condition = unique_ids(parent_segment_ids)
        .into_iter()
        .fold(Condition::any(), |condition, id| {
            condition.add(mapping_contains(json!([{ "segments": [id] }])))
        });

    Ok(Entity::find().filter(condition).all(db).await?)
}

/// Every segment that maps into any segment of `text_id`.
pub async fn find_mapping_into_text(
    db: &impl ConnectionTrait,
    text_id: Id,
) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(mapping_contains(json!([{ "text_id": text_id }])))
        .all(db)
        .await?)
}

/// Writes `mapping` only if the stored revision still equals `expected_revision`.
/// Returns `false` when another writer got there first.
pub async fn compare_and_set_mapping(
    db: &impl ConnectionTrait,
    id: Id,
    expected_revision: i32,
    mapping: Mappings,
) -> Result<bool, Error> {
    let now: DateTimeWithTimeZone = chrono::Utc::now().into();

    let result = Entity::update_many()
        .col_expr(Column::Mapping, Expr::value(mapping))
        .col_expr(Column::Revision, Expr::col(Column::Revision).add(1))
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .filter(Column::Id.eq(id))
        .filter(Column::Revision.eq(expected_revision))
        .exec(db)
        .await?;

    trace!(
        "compare_and_set_mapping on segment {id} at revision {expected_revision}: {} row(s)",
        result.rows_affected
    );

    Ok(result.rows_affected == 1)
}

/// Replaces the content of the segment of `text_id` identified by `pecha_segment_id`.
/// Returns `None` when no such segment exists.
pub async fn update_content_by_pecha_segment_id(
    db: &impl ConnectionTrait,
    text_id: Id,
    pecha_segment_id: &str,
    content: String,
) -> Result<Option<Model>, Error> {
    let existing = Entity::find()
        .filter(Column::TextId.eq(text_id))
        .filter(Column::PechaSegmentId.eq(pecha_segment_id))
        .one(db)
        .await?;

    match existing {
        Some(segment) => {
            let mut active_model: ActiveModel = segment.into();
            active_model.content = Set(content);
            active_model.updated_at = Set(chrono::Utc::now().into());
            Ok(Some(active_model.update(db).await?))
        }
        None => {
            debug!("No segment with pecha_segment_id {pecha_segment_id} in text {text_id}");
            Ok(None)
        }
    }
}

pub async fn delete_by_text(db: &impl ConnectionTrait, text_id: Id) -> Result<u64, Error> {
    let result = Entity::delete_many()
        .filter(Column::TextId.eq(text_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Creates all `segment_models` in one transaction; none are kept if any insert fails.
pub async fn create_many(
    db: &DatabaseConnection,
    segment_models: Vec<Model>,
) -> Result<Vec<Model>, Error> {
    debug!("Creating {} segments", segment_models.len());

    let txn = db.begin().await?;
    let mut created = Vec::with_capacity(segment_models.len());
    for segment_model in segment_models {
        created.push(create(&txn, segment_model).await?);
    }
    txn.commit().await?;

    Ok(created)
}

/// Applies several revision-guarded mapping writes atomically.
///
/// Returns `false`, with nothing persisted, as soon as one segment's stored
/// revision no longer matches.
pub async fn compare_and_set_mappings(
    db: &DatabaseConnection,
    updates: Vec<(Id, i32, Mappings)>,
) -> Result<bool, Error> {
    let txn = db.begin().await?;
    for (id, expected_revision, mapping) in updates {
        if !compare_and_set_mapping(&txn, id, expected_revision, mapping).await? {
            debug!("Revision of segment {id} moved past {expected_revision}, rolling back");
            txn.rollback().await?;
            return Ok(false);
        }
    }
    txn.commit().await?;
    Ok(true)
}

/// Replaces the content of several segments of `text_id`, keyed by `pecha_segment_id`.
/// Fails with `RecordNotFound`, persisting nothing, if any key has no segment.
pub async fn update_contents(
    db: &DatabaseConnection,
    text_id: Id,
    updates: Vec<(String, String)>,
) -> Result<Vec<Model>, Error> {
    let txn = db.begin().await?;
    let mut updated = Vec::with_capacity(updates.len());
    for (pecha_segment_id, content) in updates {
        match update_content_by_pecha_segment_id(&txn, text_id, &pecha_segment_id, content).await?
        {
            Some(segment) => updated.push(segment),
            None => {
                txn.rollback().await?;
                return Err(Error::record_not_found());
            }
        }
    }
    txn.commit().await?;
    Ok(updated)
}
