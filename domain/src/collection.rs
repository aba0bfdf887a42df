//! The browsing tree of the library.

use crate::error::Error;
use crate::jwt::{require_admin, Claims};
use crate::page::Page;
use crate::store;
use crate::term::check_slug;
use crate::{collections, localised_text::LocalisedText, Id};
use entity_api::collection as collection_api;
use log::*;
use serde::{Deserialize, Serialize};
use service::AppState;
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CollectionsResponse {
    pub parent: Option<collections::Model>,
    pub collections: Vec<collections::Model>,
    pub total: u64,
    pub skip: u64,
    pub limit: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreateCollectionRequest {
    pub slug: String,
    pub titles: LocalisedText,
    #[serde(default)]
    pub descriptions: LocalisedText,
    #[schema(value_type = Option<String>, format = Uuid)]
    pub parent_id: Option<Id>,
}

pub async fn get_collection(
    app_state: &AppState,
    collection_id: Id,
) -> Result<collections::Model, Error> {
    store::read(
        app_state,
        collection_api::find_by_id(app_state.db_conn_ref(), collection_id),
    )
    .await?
    .ok_or_else(|| Error::not_found(format!("Collection {collection_id} not found")))
}

pub async fn list_collections(
    app_state: &AppState,
    parent_id: Option<Id>,
    page: Page,
) -> Result<CollectionsResponse, Error> {
    let parent = match parent_id {
        Some(parent_id) => Some(get_collection(app_state, parent_id).await?),
        None => None,
    };

    let (collections, total) = store::read(
        app_state,
        collection_api::find_by_parent(app_state.db_conn_ref(), parent_id, page.skip, page.limit),
    )
    .await?;

    Ok(CollectionsResponse {
        parent,
        collections,
        total,
        skip: page.skip,
        limit: page.limit,
    })
}

pub async fn create(
    app_state: &AppState,
    claims: &Claims,
    request: CreateCollectionRequest,
) -> Result<collections::Model, Error> {
    require_admin(claims)?;

    let slug = request.slug.trim().to_lowercase();
    check_slug(&slug)?;

    let db = app_state.db_conn_ref();
    if store::read(app_state, collection_api::find_by_slug(db, &slug))
        .await?
        .is_some()
    {
        return Err(Error::bad_request(format!(
            "collection slug {slug} already exists"
        )));
    }
    if let Some(parent_id) = request.parent_id {
        get_collection(app_state, parent_id).await?;
    }

    let now = chrono::Utc::now();
    let collection = store::write(
        app_state,
        collection_api::create(
            db,
            collections::Model {
                id: Id::new_v4(),
                slug,
                titles: request.titles,
                descriptions: request.descriptions,
                parent_id: request.parent_id,
                has_child: false,
                created_at: now.into(),
                updated_at: now.into(),
            },
        ),
    )
    .await?;

    info!("Created collection {} ({})", collection.slug, collection.id);
    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainErrorKind, RequestErrorKind};
    use crate::test_support::{admin, app_state};

    #[tokio::test]
    async fn create_rejects_bad_slugs_before_touching_the_store() {
        let app_state = app_state();
        let request = CreateCollectionRequest {
            slug: "liturgy / prayers".to_string(),
            titles: LocalisedText::new().with("en", "Liturgy"),
            descriptions: LocalisedText::new(),
            parent_id: None,
        };

        let result = create(&app_state, &admin(), request).await;

        assert!(matches!(
            result.unwrap_err().error_kind,
            DomainErrorKind::Request(RequestErrorKind::BadRequest(_))
        ));
    }
}
