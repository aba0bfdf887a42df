//! The category tree Texts are filed under.

use crate::error::Error;
use crate::jwt::{require_admin, Claims};
use crate::page::Page;
use crate::store;
use crate::{localised_text::LocalisedText, terms, Id};
use entity_api::term as term_api;
use log::*;
use serde::{Deserialize, Serialize};
use service::AppState;
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TermsResponse {
    /// The Term whose children are listed, absent for the root level
    pub parent: Option<terms::Model>,
    pub terms: Vec<terms::Model>,
    pub total: u64,
    pub skip: u64,
    pub limit: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreateTermRequest {
    pub slug: String,
    pub titles: LocalisedText,
    #[serde(default)]
    pub descriptions: LocalisedText,
    #[schema(value_type = Option<String>, format = Uuid)]
    pub parent_id: Option<Id>,
}

/// Slugs are non-empty and made of ASCII letters, digits, `-` and `_`.
pub(crate) fn check_slug(slug: &str) -> Result<(), Error> {
    if slug.is_empty() {
        return Err(Error::bad_request("slug must not be empty"));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::bad_request(format!("invalid slug {slug:?}")));
    }
    Ok(())
}

pub async fn get_term(app_state: &AppState, term_id: Id) -> Result<terms::Model, Error> {
    store::read(app_state, term_api::find_by_id(app_state.db_conn_ref(), term_id))
        .await?
        .ok_or_else(|| Error::not_found(format!("Term {term_id} not found")))
}

/// Children of `parent_id`, or the top-level terms.
pub async fn list_terms(
    app_state: &AppState,
    parent_id: Option<Id>,
    page: Page,
) -> Result<TermsResponse, Error> {
    let parent = match parent_id {
        Some(parent_id) => Some(get_term(app_state, parent_id).await?),
        None => None,
    };

    let (terms, total) = store::read(
        app_state,
        term_api::find_by_parent(app_state.db_conn_ref(), parent_id, page.skip, page.limit),
    )
    .await?;

    Ok(TermsResponse {
        parent,
        terms,
        total,
        skip: page.skip,
        limit: page.limit,
    })
}

pub async fn create(
    app_state: &AppState,
    claims: &Claims,
    request: CreateTermRequest,
) -> Result<terms::Model, Error> {
    require_admin(claims)?;

    let slug = request.slug.trim().to_lowercase();
    check_slug(&slug)?;
    if request.titles.is_empty() {
        return Err(Error::bad_request("at least one title is required"));
    }

    let db = app_state.db_conn_ref();
    if store::read(app_state, term_api::find_by_slug(db, &slug))
        .await?
        .is_some()
    {
        return Err(Error::bad_request(format!("term slug {slug} already exists")));
    }
    if let Some(parent_id) = request.parent_id {
        get_term(app_state, parent_id).await?;
    }

    let now = chrono::Utc::now();
    let term = store::write(
        app_state,
        term_api::create(
            db,
            terms::Model {
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

    info!("Created term {} ({})", term.slug, term.id);
    Ok(term)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainErrorKind, RequestErrorKind};
    use crate::test_support::{admin, app_state, reader};

    #[test]
    fn slugs_are_restricted() {
        assert!(check_slug("madhyamaka").is_ok());
        assert!(check_slug("prajna-paramita_2").is_ok());
        assert!(check_slug("").is_err());
        assert!(check_slug("two words").is_err());
        assert!(check_slug("ཆོས").is_err());
    }

    #[tokio::test]
    async fn create_requires_admin() {
        let app_state = app_state();
        let request = CreateTermRequest {
            slug: "sutra".to_string(),
            titles: LocalisedText::new().with("en", "Sutra"),
            descriptions: LocalisedText::new(),
            parent_id: None,
        };

        let result = create(&app_state, &reader(), request).await;

        assert_eq!(
            result.unwrap_err().error_kind,
            DomainErrorKind::Request(RequestErrorKind::Forbidden)
        );
    }

    #[tokio::test]
    async fn create_rejects_untitled_terms_before_touching_the_store() {
        let app_state = app_state();
        let request = CreateTermRequest {
            slug: "sutra".to_string(),
            titles: LocalisedText::new(),
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
