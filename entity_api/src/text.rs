use super::error::Error;
use crate::EXISTENCE_CHUNK_SIZE;
use entity::text_type::TextType;
use entity::texts::{ActiveModel, Column, Entity, Model};
use entity::Id;
use sea_orm::{
    entity::prelude::*,
    sea_query::Expr,
    ActiveValue::{Set, Unchanged},
    DatabaseConnection, QueryOrder, QuerySelect, TransactionTrait, TryIntoModel,
};
use std::collections::{HashMap, HashSet};

use log::*;

pub async fn create(db: &impl ConnectionTrait, text_model: Model) -> Result<Model, Error> {
    debug!("New Text Model to be inserted: {text_model:?}");

    let now = chrono::Utc::now();

    let active_model: ActiveModel = ActiveModel {
        id: Set(text_model.id),
        pecha_text_id: Set(text_model.pecha_text_id),
        title: Set(text_model.title),
        language: Set(text_model.language),
        group_id: Set(text_model.group_id),
        text_type: Set(text_model.text_type),
        categories: Set(text_model.categories),
        parent_id: Set(text_model.parent_id),
        is_published: Set(text_model.is_published),
        published_by: Set(text_model.published_by),
        published_at: Set(text_model.published_at),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    Ok(active_model.insert(db).await?.try_into_model()?)
}

/// Overwrites the editable fields of an existing Text with those of `model`.
pub async fn update(db: &impl ConnectionTrait, id: Id, model: Model) -> Result<Model, Error> {
    let existing = find_by_id(db, id).await?.ok_or_else(|| {
        debug!("Text with id {id} not found");
        Error::record_not_found()
    })?;

    debug!("Existing Text model to be Updated: {existing:?}");

    let active_model: ActiveModel = ActiveModel {
        id: Unchanged(existing.id),
        pecha_text_id: Set(model.pecha_text_id),
        title: Set(model.title),
        language: Set(model.language),
        group_id: Unchanged(existing.group_id),
        text_type: Unchanged(existing.text_type),
        categories: Set(model.categories),
        parent_id: Set(model.parent_id),
        is_published: Set(model.is_published),
        published_by: Set(model.published_by),
        published_at: Set(model.published_at),
        created_at: Unchanged(existing.created_at),
        updated_at: Set(chrono::Utc::now().into()),
    };

    Ok(active_model.update(db).await?.try_into_model()?)
}

pub async fn delete_by_id(db: &impl ConnectionTrait, id: Id) -> Result<(), Error> {
    Entity::delete_by_id(id).exec(db).await?;
    Ok(())
}

/// Deletes a Text together with its segments and tables of contents in one transaction.
pub async fn delete_with_dependents(db: &DatabaseConnection, id: Id) -> Result<(), Error> {
    let txn = db.begin().await?;

    let segments = crate::segment::delete_by_text(&txn, id).await?;
    let tocs = crate::table_of_content::delete_by_text(&txn, id).await?;
    let result = Entity::delete_by_id(id).exec(&txn).await?;
    if result.rows_affected == 0 {
        txn.rollback().await?;
        return Err(Error::record_not_found());
    }

    txn.commit().await?;
    info!("Deleted text {id} with {segments} segment(s) and {tocs} table(s) of contents");
    Ok(())
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
    let mut texts = HashMap::with_capacity(unique.len());

    for chunk in unique.chunks(EXISTENCE_CHUNK_SIZE) {
        let found = Entity::find()
            .filter(Column::Id.is_in(chunk.to_vec()))
            .all(db)
            .await?;
        texts.extend(found.into_iter().map(|text| (text.id, text)));
    }

    Ok(texts)
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
            debug!("Texts chunk short: expected {}, found {found}", chunk.len());
            return Ok(false);
        }
    }
    Ok(true)
}

/// Texts filed under `term_id`, excluding versions, with the total matching count.
pub async fn find_by_term(
    db: &impl ConnectionTrait,
    term_id: Id,
    language: Option<&str>,
    skip: u64,
    limit: u64,
) -> Result<(Vec<Model>, u64), Error> {
    let mut query = Entity::find()
        .filter(Expr::cust_with_values(
            r#""texts"."categories" @> ARRAY[$1]::uuid[]"#,
            [term_id],
        ))
        .filter(Column::TextType.ne(TextType::Version));

    if let Some(language) = language {
        query = query.filter(Column::Language.eq(language));
    }

    let total = query.clone().count(db).await?;
    let texts = query
        .order_by_asc(Column::Title)
        .order_by_asc(Column::Id)
        .offset(skip)
        .limit(limit)
        .all(db)
        .await?;

    Ok((texts, total))
}

/// Versions in `group_id`, optionally in one language and optionally leaving out one Text.
pub async fn find_versions_by_group(
    db: &impl ConnectionTrait,
    group_id: Id,
    language: Option<&str>,
    exclude: Option<Id>,
    skip: u64,
    limit: u64,
) -> Result<(Vec<Model>, u64), Error> {
    let mut query = Entity::find()
        .filter(Column::GroupId.eq(group_id))
        .filter(Column::TextType.eq(TextType::Version));

    if let Some(language) = language {
        query = query.filter(Column::Language.eq(language));
    }
    if let Some(exclude) = exclude {
        query = query.filter(Column::Id.ne(exclude));
    }

    let total = query.clone().count(db).await?;
    let versions = query
        .order_by_asc(Column::Language)
        .order_by_asc(Column::CreatedAt)
        .offset(skip)
        .limit(limit)
        .all(db)
        .await?;

    Ok((versions, total))
}

/// Every Text sharing `group_id`, oldest first.
pub async fn find_by_group(db: &impl ConnectionTrait, group_id: Id) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::GroupId.eq(group_id))
        .order_by_asc(Column::CreatedAt)
        .order_by_asc(Column::Id)
        .all(db)
        .await?)
}

pub(crate) fn unique_ids(ids: &[Id]) -> Vec<Id> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
// We need to gate seaORM's mock feature behind conditional compilation because
// the feature removes the Clone trait implementation from seaORM's DatabaseConnection.
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, Transaction};

    fn text_model(text_type: TextType) -> Model {
        let now = chrono::Utc::now();
        Model {
            id: Id::new_v4(),
            pecha_text_id: None,
            title: "Bodhicaryāvatāra".to_owned(),
            language: "bo".to_owned(),
            group_id: Id::new_v4(),
            text_type,
            categories: vec![],
            parent_id: None,
            is_published: true,
            published_by: None,
            published_at: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[tokio::test]
    async fn find_by_id_returns_none_for_missing_text() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<Model>::new()])
            .into_connection();

        assert_eq!(find_by_id(&db, Id::new_v4()).await?, None);

        Ok(())
    }

    #[tokio::test]
    async fn find_by_ids_keys_results_by_id() -> Result<(), Error> {
        let root = text_model(TextType::RootText);
        let version = text_model(TextType::Version);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![root.clone(), version.clone()]])
            .into_connection();

        let texts = find_by_ids(&db, &[root.id, version.id, root.id]).await?;

        assert_eq!(texts.len(), 2);
        assert_eq!(texts.get(&version.id), Some(&version));

        Ok(())
    }

    #[tokio::test]
    async fn find_by_ids_issues_no_query_for_empty_input() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        assert!(find_by_ids(&db, &[]).await?.is_empty());
        assert_eq!(db.into_transaction_log(), Vec::<Transaction>::new());

        Ok(())
    }

    #[tokio::test]
    async fn create_returns_the_inserted_text() -> Result<(), Error> {
        let text = text_model(TextType::Commentary);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![text.clone()]])
            .into_connection();

        let created = create(&db, text.clone()).await?;

        assert_eq!(created.id, text.id);
        assert_eq!(created.text_type, TextType::Commentary);

        Ok(())
    }

    #[test]
    fn unique_ids_keeps_first_occurrence_order() {
        let (a, b) = (Id::new_v4(), Id::new_v4());
        assert_eq!(unique_ids(&[a, b, a, b]), vec![a, b]);
    }
}
