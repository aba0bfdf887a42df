//! Texts: the Entity Resolver (id validation, batch resolution, family
//! classification), the text listings (by term, versions, infos) and the admin
//! write operations on Texts.

use crate::cache::{self, Cached};
use crate::error::Error;
use crate::jwt::{require_admin, Claims};
use crate::page::Page;
use crate::store;
use crate::{group_type::GroupType, segments, terms, text_type::TextType, texts, Id};
use entity_api::{
    group as group_api, segment as segment_api, table_of_content as toc_api, term as term_api,
    text as text_api,
};
use log::*;
use serde::{Deserialize, Serialize};
use service::AppState;
use std::collections::{BTreeMap, HashMap, HashSet};
use utoipa::ToSchema;

/// The equivalence class of a Text implied by its Group's type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    Root,
    Commentary,
}

impl From<GroupType> for Family {
    fn from(group_type: GroupType) -> Self {
        match group_type {
            GroupType::Commentary => Family::Commentary,
            GroupType::Text | GroupType::Version => Family::Root,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TextsCategoryResponse {
    pub term: terms::Model,
    pub texts: Vec<texts::Model>,
    pub total: u64,
    pub skip: u64,
    pub limit: u64,
}

/// A version of a work together with the ids of its tables of contents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TextVersion {
    #[serde(flatten)]
    pub text: texts::Model,
    #[schema(value_type = Vec<String>, format = Uuid)]
    pub table_of_contents: Vec<Id>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TextVersionResponse {
    /// The root Text of the work, if the group has one
    pub text: Option<texts::Model>,
    pub versions: Vec<TextVersion>,
    pub total: u64,
    pub skip: u64,
    pub limit: u64,
}

/// A Text whose segments map into the requested Text, with how many do.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RelatedText {
    pub text: texts::Model,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TextInfos {
    #[schema(value_type = String, format = Uuid)]
    pub text_id: Id,
    pub translations: u64,
    pub related_texts: Vec<RelatedText>,
    pub sheets: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TextInfosResponse {
    pub text_infos: TextInfos,
    pub total: u64,
    pub skip: u64,
    pub limit: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreateTextRequest {
    pub pecha_text_id: Option<String>,
    pub title: String,
    pub language: String,
    #[schema(value_type = String, format = Uuid)]
    pub group_id: Id,
    #[serde(rename = "type")]
    pub text_type: TextType,
    #[serde(default)]
    #[schema(value_type = Vec<String>, format = Uuid)]
    pub categories: Vec<Id>,
    #[schema(value_type = Option<String>, format = Uuid)]
    pub parent_id: Option<Id>,
    #[serde(default)]
    pub is_published: bool,
    pub published_by: Option<String>,
}

/// Editable fields of a Text. `group_id` and `type` are fixed at creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UpdateTextRequest {
    pub pecha_text_id: Option<String>,
    pub title: String,
    pub language: String,
    #[serde(default)]
    #[schema(value_type = Vec<String>, format = Uuid)]
    pub categories: Vec<Id>,
    #[schema(value_type = Option<String>, format = Uuid)]
    pub parent_id: Option<Id>,
    #[serde(default)]
    pub is_published: bool,
    pub published_by: Option<String>,
}

pub async fn validate_text(app_state: &AppState, text_id: Id) -> Result<(), Error> {
    if store::read(app_state, text_api::exists(app_state.db_conn_ref(), text_id)).await? {
        Ok(())
    } else {
        Err(Error::not_found(format!("Text {text_id} not found")))
    }
}

pub async fn validate_texts(app_state: &AppState, text_ids: &[Id]) -> Result<(), Error> {
    if store::read(app_state, text_api::all_exist(app_state.db_conn_ref(), text_ids)).await? {
        Ok(())
    } else {
        Err(Error::not_found("One or more texts not found"))
    }
}

/// Looks up one Text through the cache.
pub async fn get_text_detail(app_state: &AppState, text_id: Id) -> Result<texts::Model, Error> {
    Cached::text_by_id(text_id)
        .read_through(app_state, move || async move {
            store::read(app_state, text_api::find_by_id(app_state.db_conn_ref(), text_id))
                .await?
                .ok_or_else(|| Error::not_found(format!("Text {text_id} not found")))
        })
        .await
}

/// Resolves many Texts at once. Each is cached individually; ids with no
/// Text are absent from the result.
pub async fn get_texts_detail(
    app_state: &AppState,
    text_ids: &[Id],
) -> Result<HashMap<Id, texts::Model>, Error> {
    let mut resolved = HashMap::with_capacity(text_ids.len());
    let mut misses = Vec::new();

    for text_id in text_ids.iter().copied().collect::<HashSet<_>>() {
        match Cached::text_by_id(text_id).peek(app_state).await {
            Some(text) => {
                resolved.insert(text_id, text);
            }
            None => misses.push(text_id),
        }
    }

    if !misses.is_empty() {
        let found =
            store::read(app_state, text_api::find_by_ids(app_state.db_conn_ref(), &misses)).await?;
        for (text_id, text) in found {
            Cached::text_by_id(text_id).prime(app_state, &text).await;
            resolved.insert(text_id, text);
        }
    }

    Ok(resolved)
}

pub async fn classify_by_group(app_state: &AppState, text_id: Id) -> Result<Family, Error> {
    let text = get_text_detail(app_state, text_id).await?;
    let group = store::read(
        app_state,
        group_api::find_by_id(app_state.db_conn_ref(), text.group_id),
    )
    .await?
    .ok_or_else(|| {
        warn!("Text {text_id} references missing group {}", text.group_id);
        Error::not_found(format!("Group {} not found", text.group_id))
    })?;
    Ok(group.group_type.into())
}

/// Non-version Texts filed under `term_id`.
pub async fn texts_by_term(
    app_state: &AppState,
    term_id: Id,
    language: Option<String>,
    page: Page,
) -> Result<TextsCategoryResponse, Error> {
    Cached::texts_by_term(term_id, language.as_deref(), page.skip, page.limit)
        .read_through(app_state, move || async move {
            let term = store::read(app_state, term_api::find_by_id(app_state.db_conn_ref(), term_id))
                .await?
                .ok_or_else(|| Error::not_found(format!("Term {term_id} not found")))?;

            let (texts, total) = store::read(
                app_state,
                text_api::find_by_term(
                    app_state.db_conn_ref(),
                    term_id,
                    language.as_deref(),
                    page.skip,
                    page.limit,
                ),
            )
            .await?;

            Ok(TextsCategoryResponse {
                term,
                texts,
                total,
                skip: page.skip,
                limit: page.limit,
            })
        })
        .await
}

/// The other versions of the work `text_id` belongs to, with the work's root Text.
pub async fn get_versions(
    app_state: &AppState,
    text_id: Id,
    language: Option<String>,
    page: Page,
) -> Result<TextVersionResponse, Error> {
    let text = get_text_detail(app_state, text_id).await?;
    let group_id = text.group_id;

    Cached::versions_by_group(group_id, text_id, language.as_deref(), page.skip, page.limit)
        .read_through(app_state, move || async move {
            let db = app_state.db_conn_ref();
            let members = store::read(app_state, text_api::find_by_group(db, group_id)).await?;
            let root = members
                .into_iter()
                .find(|member| member.text_type == TextType::RootText);

            let (versions, total) = store::read(
                app_state,
                text_api::find_versions_by_group(
                    db,
                    group_id,
                    language.as_deref(),
                    Some(text_id),
                    page.skip,
                    page.limit,
                ),
            )
            .await?;

            let version_ids: Vec<Id> = versions.iter().map(|version| version.id).collect();
            let tocs = store::read(app_state, toc_api::find_by_texts(db, &version_ids)).await?;
            let mut toc_ids: HashMap<Id, Vec<Id>> = HashMap::new();
            for toc in tocs {
                toc_ids.entry(toc.text_id).or_default().push(toc.id);
            }

            Ok(TextVersionResponse {
                text: root,
                versions: versions
                    .into_iter()
                    .map(|version| TextVersion {
                        table_of_contents: toc_ids.remove(&version.id).unwrap_or_default(),
                        text: version,
                    })
                    .collect(),
                total,
                skip: page.skip,
                limit: page.limit,
            })
        })
        .await
}

/// Counts of what relates to `text_id`: its sibling versions, the commentaries
/// mapping into it (listed, paginated) and the sheets citing it.
pub async fn get_infos(
    app_state: &AppState,
    text_id: Id,
    language: Option<String>,
    page: Page,
) -> Result<TextInfosResponse, Error> {
    Cached::text_infos(text_id, language.as_deref(), page.skip, page.limit)
        .read_through(app_state, move || async move {
            let db = app_state.db_conn_ref();
            let text = get_text_detail(app_state, text_id).await?;

            let siblings = store::read(app_state, text_api::find_by_group(db, text.group_id)).await?;
            let translations = siblings
                .iter()
                .filter(|sibling| sibling.id != text_id && sibling.text_type == TextType::Version)
                .count() as u64;

            let mapped_in =
                store::read(app_state, segment_api::find_mapping_into_text(db, text_id)).await?;
            let source_ids: Vec<Id> = mapped_in.iter().map(|segment| segment.text_id).collect();
            let sources = get_texts_detail(app_state, &source_ids).await?;

            let (related, sheets) =
                summarise_related_texts(text_id, &mapped_in, &sources, language.as_deref());
            let total = related.len() as u64;

            Ok(TextInfosResponse {
                text_infos: TextInfos {
                    text_id,
                    translations,
                    related_texts: page.slice(related),
                    sheets,
                },
                total,
                skip: page.skip,
                limit: page.limit,
            })
        })
        .await
}

/// Groups segments mapping into `text_id` by their Text. Returns the commentary
/// Texts (optionally in one language) sorted by title with their segment counts,
/// and the number of distinct sheet Texts. Unknown Texts are skipped.
pub(crate) fn summarise_related_texts(
    text_id: Id,
    mapped_in: &[segments::Model],
    sources: &HashMap<Id, texts::Model>,
    language: Option<&str>,
) -> (Vec<RelatedText>, u64) {
    let mut counts: BTreeMap<Id, u64> = BTreeMap::new();
    for segment in mapped_in.iter().filter(|segment| segment.text_id != text_id) {
        *counts.entry(segment.text_id).or_default() += 1;
    }

    let mut sheets = 0;
    let mut related = Vec::new();
    for (source_id, count) in counts {
        let Some(source) = sources.get(&source_id) else {
            debug!("Skipping mapping from unknown text {source_id}");
            continue;
        };
        match source.text_type {
            TextType::Sheet => sheets += 1,
            TextType::Commentary if language.map_or(true, |lang| source.language == lang) => {
                related.push(RelatedText {
                    text: source.clone(),
                    count,
                })
            }
            _ => {}
        }
    }

    related.sort_by(|a, b| {
        a.text
            .title
            .cmp(&b.text.title)
            .then_with(|| a.text.id.cmp(&b.text.id))
    });
    (related, sheets)
}

/// A Text's type must belong to the family its Group stands for.
pub(crate) fn check_family(group_type: GroupType, text_type: TextType) -> Result<(), Error> {
    match (Family::from(group_type), text_type) {
        (Family::Root, TextType::Commentary) => Err(Error::bad_request(
            "commentary texts must belong to a commentary group",
        )),
        (Family::Commentary, TextType::RootText) => Err(Error::bad_request(
            "root texts cannot belong to a commentary group",
        )),
        _ => Ok(()),
    }
}

async fn validate_references(
    app_state: &AppState,
    parent_id: Option<Id>,
    categories: &[Id],
) -> Result<(), Error> {
    if let Some(parent_id) = parent_id {
        validate_text(app_state, parent_id).await?;
    }
    for term_id in categories {
        store::read(app_state, term_api::find_by_id(app_state.db_conn_ref(), *term_id))
            .await?
            .ok_or_else(|| Error::bad_request(format!("Term {term_id} does not exist")))?;
    }
    Ok(())
}

async fn with_siblings(
    app_state: &AppState,
    text: &texts::Model,
) -> Result<Vec<texts::Model>, Error> {
    let mut affected = store::read(
        app_state,
        text_api::find_by_group(app_state.db_conn_ref(), text.group_id),
    )
    .await?;
    affected.push(text.clone());
    Ok(affected)
}

pub async fn create(
    app_state: &AppState,
    claims: &Claims,
    request: CreateTextRequest,
) -> Result<texts::Model, Error> {
    require_admin(claims)?;

    if request.title.trim().is_empty() {
        return Err(Error::bad_request("title must not be empty"));
    }

    let group = store::read(
        app_state,
        group_api::find_by_id(app_state.db_conn_ref(), request.group_id),
    )
    .await?
    .ok_or_else(|| Error::not_found(format!("Group {} not found", request.group_id)))?;
    check_family(group.group_type, request.text_type)?;
    validate_references(app_state, request.parent_id, &request.categories).await?;

    let now = chrono::Utc::now();
    let text = store::write(
        app_state,
        text_api::create(
            app_state.db_conn_ref(),
            texts::Model {
                id: Id::new_v4(),
                pecha_text_id: request.pecha_text_id,
                title: request.title,
                language: request.language,
                group_id: request.group_id,
                text_type: request.text_type,
                categories: request.categories,
                parent_id: request.parent_id,
                is_published: request.is_published,
                published_by: request.published_by,
                published_at: request.is_published.then(|| now.into()),
                created_at: now.into(),
                updated_at: now.into(),
            },
        ),
    )
    .await?;

    info!("Created {} text {} ({})", text.text_type, text.id, text.language);
    cache::invalidate_texts(app_state, &with_siblings(app_state, &text).await?).await;
    Ok(text)
}

pub async fn update(
    app_state: &AppState,
    claims: &Claims,
    text_id: Id,
    request: UpdateTextRequest,
) -> Result<texts::Model, Error> {
    require_admin(claims)?;

    if request.title.trim().is_empty() {
        return Err(Error::bad_request("title must not be empty"));
    }
    if request.parent_id == Some(text_id) {
        return Err(Error::bad_request("a text cannot be its own parent"));
    }

    let existing = store::read(app_state, text_api::find_by_id(app_state.db_conn_ref(), text_id))
        .await?
        .ok_or_else(|| Error::not_found(format!("Text {text_id} not found")))?;
    validate_references(app_state, request.parent_id, &request.categories).await?;

    let published_at = match (existing.is_published, request.is_published) {
        (false, true) => Some(chrono::Utc::now().into()),
        (_, true) => existing.published_at,
        (_, false) => None,
    };

    let updated = store::write(
        app_state,
        text_api::update(
            app_state.db_conn_ref(),
            text_id,
            texts::Model {
                pecha_text_id: request.pecha_text_id,
                title: request.title,
                language: request.language,
                categories: request.categories,
                parent_id: request.parent_id,
                is_published: request.is_published,
                published_by: request.published_by,
                published_at,
                ..existing.clone()
            },
        ),
    )
    .await?;

    let mut affected = with_siblings(app_state, &updated).await?;
    affected.push(existing);
    cache::invalidate_texts(app_state, &affected).await;
    Ok(updated)
}

/// Deletes a Text with all of its segments and tables of contents.
pub async fn delete(app_state: &AppState, claims: &Claims, text_id: Id) -> Result<(), Error> {
    require_admin(claims)?;

    let db = app_state.db_conn_ref();
    let text = store::read(app_state, text_api::find_by_id(db, text_id))
        .await?
        .ok_or_else(|| Error::not_found(format!("Text {text_id} not found")))?;

    // Everything linked to the doomed segments is collected before they disappear.
    let own_segments = store::read(app_state, segment_api::find_by_text(db, text_id)).await?;
    let own_ids: Vec<Id> = own_segments.iter().map(|segment| segment.id).collect();
    let mapping_in = store::read(app_state, segment_api::find_mapping_into_text(db, text_id)).await?;

    let mut touched_segments: HashSet<Id> = own_ids.iter().copied().collect();
    let mut touched_texts: HashSet<Id> = HashSet::new();
    for segment in &mapping_in {
        touched_segments.insert(segment.id);
        touched_texts.insert(segment.text_id);
    }
    for segment in &own_segments {
        touched_segments.extend(segment.mapping.segment_ids());
        touched_texts.extend(segment.mapping.iter().map(|mapping| mapping.text_id));
    }

    store::write(app_state, text_api::delete_with_dependents(db, text_id)).await?;

    cache::invalidate_texts(app_state, &with_siblings(app_state, &text).await?).await;
    cache::invalidate_segments(app_state, touched_segments, touched_texts).await;
    Ok(())
}
