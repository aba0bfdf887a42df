//! The Composition Engine: table-of-contents listings and the paginated reading
//! view that joins a table of contents with segment content and, optionally, a
//! translation overlay from one version of the work.

use crate::cache::{self, Cached};
use crate::error::Error;
use crate::jwt::{require_admin, Claims};
use crate::mapping;
use crate::page::Page;
use crate::section::{FlatOrder, Section, Sections};
use crate::store;
use crate::text::get_text_detail;
use crate::{
    segments, table_of_content_type::TableOfContentType, table_of_contents, text_type::TextType,
    texts, Id,
};
use entity_api::{segment as segment_api, table_of_content as toc_api, text as text_api};
use log::*;
use serde::{Deserialize, Serialize};
use service::AppState;
use std::collections::HashMap;
use std::ops::Range;
use utoipa::ToSchema;

pub const DEFAULT_WINDOW_SIZE: u64 = 20;
pub const MAX_WINDOW_SIZE: u64 = 100;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaginationDirection {
    #[default]
    Next,
    Previous,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TableOfContentResponse {
    pub text_detail: texts::Model,
    /// Tables of contents with every section's segments removed
    pub contents: Vec<table_of_contents::Model>,
}

/// Where a reading window starts and how it is shaped.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TextDetailsRequest {
    #[schema(value_type = Option<String>, format = Uuid)]
    pub content_id: Option<Id>,
    #[schema(value_type = Option<String>, format = Uuid)]
    pub section_id: Option<Id>,
    #[schema(value_type = Option<String>, format = Uuid)]
    pub segment_id: Option<Id>,
    /// Text whose aligned segments are attached as translations
    #[schema(value_type = Option<String>, format = Uuid)]
    pub version_id: Option<Id>,
    /// Anchor offset within the requested section, or within the whole order
    /// when no section is given. Ignored when a segment is given.
    pub skip: Option<u64>,
    pub size: Option<u64>,
    pub direction: Option<PaginationDirection>,
}

impl TextDetailsRequest {
    pub fn window_size(&self) -> u64 {
        self.size
            .unwrap_or(DEFAULT_WINDOW_SIZE)
            .clamp(1, MAX_WINDOW_SIZE)
    }

    pub fn pagination_direction(&self) -> PaginationDirection {
        self.direction.unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Translation {
    #[schema(value_type = String, format = Uuid)]
    pub text_id: Id,
    pub language: String,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DetailTextSegment {
    #[schema(value_type = String, format = Uuid)]
    pub segment_id: Id,
    pub segment_number: i32,
    pub content: String,
    pub translation: Option<Translation>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DetailSection {
    #[schema(value_type = String, format = Uuid)]
    pub id: Id,
    pub title: Option<String>,
    pub section_number: i32,
    #[schema(value_type = Option<String>, format = Uuid)]
    pub parent_id: Option<Id>,
    pub segments: Vec<DetailTextSegment>,
    #[schema(no_recursion)]
    pub sections: Vec<DetailSection>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DetailTableOfContent {
    #[schema(value_type = String, format = Uuid)]
    pub id: Id,
    #[schema(value_type = String, format = Uuid)]
    pub text_id: Id,
    pub sections: Vec<DetailSection>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DetailTableOfContentResponse {
    pub text_detail: texts::Model,
    pub content: DetailTableOfContent,
    pub size: u64,
    pub pagination_direction: PaginationDirection,
    pub current_segment_position: u64,
    pub total_segments: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreateTableOfContentRequest {
    #[serde(rename = "type", default)]
    pub toc_type: TableOfContentType,
    pub sections: Sections,
}

/// Picks the member of a work to display for `language`: the requested Text if
/// it already matches, else a sibling in that language, else a sibling in the
/// default language, else the requested Text.
pub(crate) fn choose_language_sibling<'a>(
    requested: &'a texts::Model,
    siblings: &'a [texts::Model],
    language: Option<&str>,
    default_language: &str,
) -> &'a texts::Model {
    let Some(language) = language.filter(|lang| !lang.is_empty()) else {
        return requested;
    };
    if requested.language == language {
        return requested;
    }
    let in_language = |lang: &str| {
        siblings
            .iter()
            .find(|sibling| sibling.language == lang && sibling.text_type != TextType::Commentary)
    };
    in_language(language)
        .or_else(|| {
            debug!("No {language} member in group {}, trying {default_language}", requested.group_id);
            in_language(default_language)
        })
        .unwrap_or(requested)
}

/// The tables of contents of `text_id` (or of the sibling matching `language`),
/// sorted, with top-level sections paged and segments stripped.
pub async fn get_table_of_contents(
    app_state: &AppState,
    text_id: Id,
    language: Option<String>,
    page: Page,
) -> Result<TableOfContentResponse, Error> {
    Cached::toc_by_text(text_id, language.as_deref(), page.skip, page.limit)
        .read_through(app_state, move || async move {
            let db = app_state.db_conn_ref();
            let requested = get_text_detail(app_state, text_id).await?;
            let siblings = store::read(app_state, text_api::find_by_group(db, requested.group_id)).await?;
            let chosen = choose_language_sibling(
                &requested,
                &siblings,
                language.as_deref(),
                &app_state.config.default_language,
            )
            .clone();

            let contents = store::read(app_state, toc_api::find_by_text(db, chosen.id))
                .await?
                .into_iter()
                .map(|toc| {
                    let toc = toc.normalised();
                    table_of_contents::Model {
                        sections: toc.sections.paginated(page.skip, page.limit),
                        ..toc
                    }
                    .stripped()
                })
                .collect();

            Ok(TableOfContentResponse {
                text_detail: chosen,
                contents,
            })
        })
        .await
}

/// One table of contents of `text_id` with its segments, sorted, with the
/// top-level sections paged.
pub async fn get_table_of_content(
    app_state: &AppState,
    text_id: Id,
    content_id: Id,
    page: Page,
) -> Result<table_of_contents::Model, Error> {
    Cached::toc_by_id(text_id, content_id, page.skip, page.limit)
        .read_through(app_state, move || async move {
            store::read(
                app_state,
                toc_api::find_by_id_paginated(
                    app_state.db_conn_ref(),
                    content_id,
                    page.skip,
                    page.limit,
                ),
            )
            .await?
            .filter(|toc| toc.text_id == text_id)
            .ok_or_else(|| {
                Error::not_found(format!(
                    "Table of contents {content_id} not found for text {text_id}"
                ))
            })
        })
        .await
}

/// Where a details request lands in the flattened order: the span of the
/// anchoring section and the anchor's offset inside it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Anchor {
    pub span: Range<usize>,
    pub position: usize,
}

impl Anchor {
    pub fn total(&self) -> usize {
        self.span.len()
    }

    /// The window as a range of the full flattened order. It never leaves the span.
    pub fn window(&self, size: usize, direction: PaginationDirection) -> Range<usize> {
        let relative = window(self.position, size, direction, self.total());
        self.span.start + relative.start..self.span.start + relative.end
    }
}

/// Resolves the anchoring section and the position within it.
///
/// A segment anchors in the section that holds it; a section anchors at its
/// first segment plus `skip`. Without either the whole order is the span.
/// Positions are clamped to the span's length.
pub(crate) fn resolve_anchor(order: &FlatOrder, request: &TextDetailsRequest) -> Result<Anchor, Error> {
    let skip = request.skip.unwrap_or(0) as usize;
    let (span, position) = match (request.segment_id, request.section_id) {
        (Some(segment_id), _) => {
            let index = order.position_of(segment_id).ok_or_else(|| {
                Error::bad_request(format!(
                    "segment {segment_id} is not part of the table of contents"
                ))
            })?;
            let span = order
                .section_span(order.segments[index].section_id)
                .unwrap_or(index..index + 1);
            let position = index - span.start;
            (span, position)
        }
        (None, Some(section_id)) => {
            let span = order.section_span(section_id).ok_or_else(|| {
                Error::bad_request(format!(
                    "section {section_id} is not part of the table of contents"
                ))
            })?;
            (span, skip)
        }
        (None, None) => (0..order.len(), skip),
    };
    let position = position.min(span.len());
    Ok(Anchor { span, position })
}

/// A forward window includes the anchor; a backward window ends just before it.
pub(crate) fn window(
    anchor: usize,
    size: usize,
    direction: PaginationDirection,
    total: usize,
) -> Range<usize> {
    let anchor = anchor.min(total);
    match direction {
        PaginationDirection::Next => anchor..anchor.saturating_add(size).min(total),
        PaginationDirection::Previous => anchor.saturating_sub(size)..anchor,
    }
}

/// Rebuilds the section tree keeping only windowed segments that resolved to
/// content, and only sections that still hold something.
pub(crate) fn assemble_sections(
    sections: &[Section],
    resolved: &HashMap<Id, DetailTextSegment>,
) -> Vec<DetailSection> {
    sections
        .iter()
        .filter_map(|section| {
            let segments: Vec<DetailTextSegment> = section
                .segments
                .iter()
                .filter_map(|text_segment| resolved.get(&text_segment.segment_id).cloned())
                .collect();
            let children = assemble_sections(&section.sections, resolved);
            if segments.is_empty() && children.is_empty() {
                return None;
            }
            Some(DetailSection {
                id: section.id,
                title: section.title.clone(),
                section_number: section.section_number,
                parent_id: section.parent_id,
                segments,
                sections: children,
            })
        })
        .collect()
}

/// The translation attached to each segment of `sources`, taken from the first
/// (in reading order) aligned segment of `version`.
async fn translation_overlay(
    app_state: &AppState,
    version: &texts::Model,
    sources: &[segments::Model],
) -> Result<HashMap<Id, Translation>, Error> {
    if version.text_type != TextType::Version || sources.is_empty() {
        return Ok(HashMap::new());
    }

    let linked = mapping::linked_segments_many(app_state, sources).await?;
    let positions = mapping::text_positions(app_state, &[version.id]).await?;

    Ok(linked
        .into_iter()
        .filter_map(|(source_id, candidates)| {
            let in_version: Vec<segments::Model> = candidates
                .into_iter()
                .filter(|candidate| candidate.text_id == version.id)
                .collect();
            mapping::order_segments(in_version, &positions)
                .into_iter()
                .next()
                .map(|first| {
                    (
                        source_id,
                        Translation {
                            text_id: version.id,
                            language: version.language.clone(),
                            content: first.content,
                        },
                    )
                })
        })
        .collect())
}

async fn anchor_toc(
    app_state: &AppState,
    text_id: Id,
    request: &TextDetailsRequest,
) -> Result<table_of_contents::Model, Error> {
    let db = app_state.db_conn_ref();
    match (request.content_id, request.segment_id) {
        (Some(content_id), _) => store::read(app_state, toc_api::find_by_id(db, content_id))
            .await?
            .filter(|toc| toc.text_id == text_id)
            .ok_or_else(|| {
                Error::not_found(format!(
                    "Table of contents {content_id} not found for text {text_id}"
                ))
            }),
        (None, Some(segment_id)) => store::read(app_state, toc_api::find_by_text(db, text_id))
            .await?
            .into_iter()
            .find(|toc| toc.sections.contains_segment(segment_id))
            .ok_or_else(|| {
                Error::bad_request(format!(
                    "segment {segment_id} is not in any table of contents of text {text_id}"
                ))
            }),
        (None, None) => Err(Error::bad_request(
            "either content_id or segment_id is required",
        )),
    }
}

/// The paginated reading view of `text_id`.
pub async fn get_text_details(
    app_state: &AppState,
    text_id: Id,
    request: TextDetailsRequest,
) -> Result<DetailTableOfContentResponse, Error> {
    let request = TextDetailsRequest {
        size: Some(request.window_size()),
        direction: Some(request.pagination_direction()),
        ..request
    };

    Cached::text_detail(text_id, &request)
        .read_through(app_state, move || async move {
            compose_text_details(app_state, text_id, &request).await
        })
        .await
}

async fn compose_text_details(
    app_state: &AppState,
    text_id: Id,
    request: &TextDetailsRequest,
) -> Result<DetailTableOfContentResponse, Error> {
    let text = get_text_detail(app_state, text_id).await?;

    let version = match request.version_id {
        Some(version_id) => {
            let version = get_text_detail(app_state, version_id).await?;
            if version.group_id != text.group_id {
                return Err(Error::bad_request(format!(
                    "version {version_id} does not belong to the same work as text {text_id}"
                )));
            }
            Some(version)
        }
        None => None,
    };

    let toc = anchor_toc(app_state, text_id, request).await?.normalised();
    let order = toc.sections.flatten();
    let anchor = resolve_anchor(&order, request)?;
    let size = request.window_size();
    let direction = request.pagination_direction();
    let range = anchor.window(size as usize, direction);

    let window_ids: Vec<Id> = order.segments[range]
        .iter()
        .map(|flat| flat.segment_id)
        .collect();
    let mut found = store::read(
        app_state,
        segment_api::find_by_ids(app_state.db_conn_ref(), &window_ids),
    )
    .await?;
    let window_segments: Vec<segments::Model> = window_ids
        .iter()
        .filter_map(|id| {
            let segment = found.remove(id);
            if segment.is_none() {
                warn!("Table of contents {} references missing segment {id}", toc.id);
            }
            segment
        })
        .collect();

    let mut translations = match &version {
        Some(version) => translation_overlay(app_state, version, &window_segments).await?,
        None => HashMap::new(),
    };

    let numbers: HashMap<Id, i32> = order
        .segments
        .iter()
        .map(|flat| (flat.segment_id, flat.segment_number))
        .collect();
    let resolved: HashMap<Id, DetailTextSegment> = window_segments
        .into_iter()
        .map(|segment| {
            let detail = DetailTextSegment {
                segment_id: segment.id,
                segment_number: numbers.get(&segment.id).copied().unwrap_or_default(),
                translation: translations.remove(&segment.id),
                content: segment.content,
            };
            (segment.id, detail)
        })
        .collect();

    debug!(
        "Composed {} segment(s) of text {text_id} from position {} of {} ({direction:?})",
        resolved.len(),
        anchor.position,
        anchor.total()
    );

    Ok(DetailTableOfContentResponse {
        text_detail: text,
        content: DetailTableOfContent {
            id: toc.id,
            text_id: toc.text_id,
            sections: assemble_sections(&toc.sections.0, &resolved),
        },
        size,
        pagination_direction: direction,
        current_segment_position: anchor.position as u64,
        total_segments: anchor.total() as u64,
    })
}

/// Segment references of `sections` that are missing or belong to another Text.
pub(crate) fn foreign_segments(
    text_id: Id,
    referenced: &[Id],
    found: &HashMap<Id, segments::Model>,
) -> Vec<Id> {
    referenced
        .iter()
        .copied()
        .filter(|id| found.get(id).map_or(true, |segment| segment.text_id != text_id))
        .collect()
}

pub async fn create(
    app_state: &AppState,
    claims: &Claims,
    text_id: Id,
    request: CreateTableOfContentRequest,
) -> Result<table_of_contents::Model, Error> {
    require_admin(claims)?;

    let text = get_text_detail(app_state, text_id).await?;
    if let Some(number) = request.sections.duplicate_section_number() {
        return Err(Error::bad_request(format!(
            "section_number {number} is used more than once among siblings"
        )));
    }

    let referenced = request.sections.segment_ids();
    let found = store::read(
        app_state,
        segment_api::find_by_ids(app_state.db_conn_ref(), &referenced),
    )
    .await?;
    if let Some(foreign) = foreign_segments(text_id, &referenced, &found).first() {
        return Err(Error::bad_request(format!(
            "segment {foreign} does not belong to text {text_id}"
        )));
    }

    let now = chrono::Utc::now();
    let toc = store::write(
        app_state,
        toc_api::create(
            app_state.db_conn_ref(),
            table_of_contents::Model {
                id: Id::new_v4(),
                text_id,
                toc_type: request.toc_type,
                sections: request.sections,
                created_at: now.into(),
                updated_at: now.into(),
            },
        ),
    )
    .await?;

    info!("Created table of contents {} for text {text_id}", toc.id);
    invalidate_work(app_state, &text).await?;
    Ok(toc)
}

pub async fn delete(
    app_state: &AppState,
    claims: &Claims,
    text_id: Id,
    toc_id: Id,
) -> Result<(), Error> {
    require_admin(claims)?;

    let text = get_text_detail(app_state, text_id).await?;
    let db = app_state.db_conn_ref();
    store::read(app_state, toc_api::find_by_id(db, toc_id))
        .await?
        .filter(|toc| toc.text_id == text_id)
        .ok_or_else(|| {
            Error::not_found(format!(
                "Table of contents {toc_id} not found for text {text_id}"
            ))
        })?;

    store::write(app_state, toc_api::delete_by_id(db, toc_id)).await?;
    info!("Deleted table of contents {toc_id} of text {text_id}");
    invalidate_work(app_state, &text).await
}

/// Listings of every member of the work may show this Text's tables of contents.
async fn invalidate_work(app_state: &AppState, text: &texts::Model) -> Result<(), Error> {
    let mut affected = store::read(
        app_state,
        text_api::find_by_group(app_state.db_conn_ref(), text.group_id),
    )
    .await?;
    affected.push(text.clone());
    cache::invalidate_texts(app_state, &affected).await;
    Ok(())
}
