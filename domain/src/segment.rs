//! Segments: lookups, admin writes and the per-segment query services
//! (translations, commentaries, root mapping and info counts).

use crate::cache::{self, Cached};
use crate::error::{DomainErrorKind, EntityErrorKind, Error, InternalErrorKind};
use crate::jwt::{require_admin, Claims};
use crate::mapping::{self, merge_mappings, MappingRequest, RelatedGroup};
use crate::page::Page;
use crate::store;
use crate::text::{classify_by_group, get_text_detail, get_texts_detail, validate_text, Family};
use crate::{
    segment_type::SegmentType, segments, text_type::TextType, texts, Id,
};
use entity::mapping::Mappings;
use entity_api::segment as segment_api;
use log::*;
use serde::{Deserialize, Serialize};
use service::cache::CacheTag;
use service::AppState;
use std::collections::{HashMap, HashSet};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ParentSegment {
    #[schema(value_type = String, format = Uuid)]
    pub segment_id: Id,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MappedSegment {
    #[schema(value_type = String, format = Uuid)]
    pub segment_id: Id,
    pub content: String,
}

/// One aligned segment of a translated Text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SegmentTranslation {
    #[schema(value_type = String, format = Uuid)]
    pub segment_id: Id,
    #[schema(value_type = String, format = Uuid)]
    pub text_id: Id,
    pub title: String,
    pub language: String,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SegmentTranslationsResponse {
    pub parent_segment: ParentSegment,
    pub translations: Vec<SegmentTranslation>,
}

/// The commentary of one work on a segment, merged into a single passage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SegmentCommentary {
    #[schema(value_type = String, format = Uuid)]
    pub text_id: Id,
    pub title: String,
    pub language: String,
    pub count: u64,
    pub segments: Vec<MappedSegment>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SegmentCommentariesResponse {
    pub parent_segment: ParentSegment,
    pub commentaries: Vec<SegmentCommentary>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SegmentRootMapping {
    #[schema(value_type = String, format = Uuid)]
    pub text_id: Id,
    pub title: String,
    pub language: String,
    pub segments: Vec<MappedSegment>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SegmentRootMappingResponse {
    pub parent_segment: ParentSegment,
    pub segment_root_mapping: Vec<SegmentRootMapping>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RelatedTextCounts {
    pub commentaries: u64,
    pub root_text: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResourceCounts {
    pub sheets: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SegmentInfoResponse {
    #[schema(value_type = String, format = Uuid)]
    pub segment_id: Id,
    #[schema(value_type = String, format = Uuid)]
    pub text_id: Id,
    pub translations: u64,
    pub related_text: RelatedTextCounts,
    pub resources: ResourceCounts,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CreateSegment {
    pub pecha_segment_id: Option<String>,
    pub content: String,
    #[serde(rename = "type", default)]
    pub segment_type: SegmentType,
    #[serde(default)]
    pub mapping: Vec<MappingRequest>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CreateSegmentRequest {
    #[schema(value_type = String, format = Uuid)]
    pub text_id: Id,
    pub segments: Vec<CreateSegment>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SegmentContent {
    pub pecha_segment_id: String,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UpdateSegmentContentRequest {
    #[schema(value_type = String, format = Uuid)]
    pub text_id: Id,
    pub segments: Vec<SegmentContent>,
}

pub async fn validate_segment(app_state: &AppState, segment_id: Id) -> Result<(), Error> {
    if store::read(
        app_state,
        segment_api::exists(app_state.db_conn_ref(), segment_id),
    )
    .await?
    {
        Ok(())
    } else {
        Err(Error::not_found(format!("Segment {segment_id} not found")))
    }
}

pub async fn validate_segments(app_state: &AppState, segment_ids: &[Id]) -> Result<(), Error> {
    if store::read(
        app_state,
        segment_api::all_exist(app_state.db_conn_ref(), segment_ids),
    )
    .await?
    {
        Ok(())
    } else {
        Err(Error::not_found("One or more segments not found"))
    }
}

pub async fn get_segment(app_state: &AppState, segment_id: Id) -> Result<segments::Model, Error> {
    Cached::segment(CacheTag::SegmentById, segment_id)
        .read_through(app_state, move || async move {
            store::read(
                app_state,
                segment_api::find_by_id(app_state.db_conn_ref(), segment_id),
            )
            .await?
            .ok_or_else(|| Error::not_found(format!("Segment {segment_id} not found")))
        })
        .await
}

/// What every query service needs about a segment: the segment itself, its
/// Text, the family of that Text and every segment linked to it.
struct SegmentContext {
    segment: segments::Model,
    text: texts::Model,
    family: Family,
    linked: Vec<segments::Model>,
}

impl SegmentContext {
    async fn load(app_state: &AppState, segment_id: Id) -> Result<Self, Error> {
        let segment = get_segment(app_state, segment_id).await?;
        let text = get_text_detail(app_state, segment.text_id).await?;
        let family = classify_by_group(app_state, text.id).await?;
        let linked = mapping::linked_segments(app_state, &segment).await?;
        Ok(SegmentContext {
            segment,
            text,
            family,
            linked,
        })
    }

    fn parent_segment(&self) -> ParentSegment {
        ParentSegment {
            segment_id: self.segment.id,
            content: self.segment.content.clone(),
        }
    }
}

/// Only `version` Texts other than the segment's own count as translations.
pub(crate) fn is_translation_of(own: &texts::Model, candidate: &texts::Model) -> bool {
    candidate.id != own.id && candidate.text_type == TextType::Version
}

/// Root-family segments are not mapped onward; everything else maps to any
/// Text of a different type than its own.
pub(crate) fn is_root_of(own: &texts::Model, own_family: Family, candidate: &texts::Model) -> bool {
    own_family != Family::Root
        && candidate.id != own.id
        && candidate.text_type != own.text_type
}

fn mapped(segment: segments::Model) -> MappedSegment {
    MappedSegment {
        segment_id: segment.id,
        content: segment.content,
    }
}

pub(crate) fn translations_from(groups: Vec<RelatedGroup>) -> Vec<SegmentTranslation> {
    groups
        .into_iter()
        .flat_map(|group| {
            let text = group.text;
            group
                .segments
                .into_iter()
                .map(move |segment| SegmentTranslation {
                    segment_id: segment.id,
                    text_id: text.id,
                    title: text.title.clone(),
                    language: text.language.clone(),
                    content: segment.content,
                })
        })
        .collect()
}

/// Concatenates each commentary work's segments, already in reading order, into
/// one passage keyed by the first segment.
pub(crate) fn merge_commentaries(groups: Vec<RelatedGroup>) -> Vec<SegmentCommentary> {
    groups
        .into_iter()
        .filter_map(|group| {
            let first = group.segments.first()?.id;
            let content: String = group
                .segments
                .iter()
                .map(|segment| segment.content.as_str())
                .collect();
            Some(SegmentCommentary {
                text_id: group.text.id,
                title: group.text.title,
                language: group.text.language,
                count: 1,
                segments: vec![MappedSegment {
                    segment_id: first,
                    content,
                }],
            })
        })
        .collect()
}

pub(crate) fn root_mappings_from(groups: Vec<RelatedGroup>) -> Vec<SegmentRootMapping> {
    groups
        .into_iter()
        .map(|group| SegmentRootMapping {
            text_id: group.text.id,
            title: group.text.title,
            language: group.text.language,
            segments: group.segments.into_iter().map(mapped).collect(),
        })
        .collect()
}

/// Counts distinct linked Texts per kind.
pub(crate) fn count_info(
    own: &texts::Model,
    own_family: Family,
    segment_id: Id,
    linked: &[segments::Model],
    texts: &HashMap<Id, texts::Model>,
) -> SegmentInfoResponse {
    let linked_texts: Vec<&texts::Model> = linked
        .iter()
        .map(|segment| segment.text_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .filter_map(|text_id| texts.get(&text_id))
        .collect();
    let count = |keep: &dyn Fn(&texts::Model) -> bool| {
        linked_texts.iter().filter(|text| keep(**text)).count() as u64
    };

    SegmentInfoResponse {
        segment_id,
        text_id: own.id,
        translations: count(&|text| is_translation_of(own, text)),
        related_text: RelatedTextCounts {
            commentaries: count(&|text| text.text_type == TextType::Commentary),
            root_text: count(&|text| is_root_of(own, own_family, text)),
        },
        resources: ResourceCounts {
            sheets: count(&|text| text.text_type == TextType::Sheet),
        },
    }
}

/// Translations of a segment in reading order. The whole list is cached; `page`
/// is applied afterwards.
pub async fn translations(
    app_state: &AppState,
    segment_id: Id,
    page: Page,
) -> Result<SegmentTranslationsResponse, Error> {
    validate_segment(app_state, segment_id).await?;
    let response: SegmentTranslationsResponse = Cached::segment(CacheTag::Translations, segment_id)
        .read_through(app_state, move || async move {
            let context = SegmentContext::load(app_state, segment_id).await?;
            let own = context.text.clone();
            let groups = mapping::group_by_text(app_state, context.linked.clone(), |text| {
                is_translation_of(&own, text)
            })
            .await?;
            Ok(SegmentTranslationsResponse {
                parent_segment: context.parent_segment(),
                translations: translations_from(groups),
            })
        })
        .await?;

    Ok(SegmentTranslationsResponse {
        translations: page.slice(response.translations),
        ..response
    })
}

pub async fn commentaries(
    app_state: &AppState,
    segment_id: Id,
) -> Result<SegmentCommentariesResponse, Error> {
    validate_segment(app_state, segment_id).await?;
    Cached::segment(CacheTag::Commentaries, segment_id)
        .read_through(app_state, move || async move {
            let context = SegmentContext::load(app_state, segment_id).await?;
            let groups = mapping::filter_and_group(
                app_state,
                context.linked.clone(),
                TextType::Commentary,
                None,
            )
            .await?;
            Ok(SegmentCommentariesResponse {
                parent_segment: context.parent_segment(),
                commentaries: merge_commentaries(groups),
            })
        })
        .await
}

pub async fn root_mapping(
    app_state: &AppState,
    segment_id: Id,
) -> Result<SegmentRootMappingResponse, Error> {
    validate_segment(app_state, segment_id).await?;
    Cached::segment(CacheTag::RootMapping, segment_id)
        .read_through(app_state, move || async move {
            let context = SegmentContext::load(app_state, segment_id).await?;
            let parent_segment = context.parent_segment();
            if context.family == Family::Root {
                debug!("Segment {segment_id} belongs to a root work, no root mapping");
                return Ok(SegmentRootMappingResponse {
                    parent_segment,
                    segment_root_mapping: Vec::new(),
                });
            }

            let own = context.text.clone();
            let family = context.family;
            let groups = mapping::group_by_text(app_state, context.linked, |text| {
                is_root_of(&own, family, text)
            })
            .await?;
            Ok(SegmentRootMappingResponse {
                parent_segment,
                segment_root_mapping: root_mappings_from(groups),
            })
        })
        .await
}

pub async fn info(app_state: &AppState, segment_id: Id) -> Result<SegmentInfoResponse, Error> {
    validate_segment(app_state, segment_id).await?;
    Cached::segment(CacheTag::SegmentInfo, segment_id)
        .read_through(app_state, move || async move {
            let context = SegmentContext::load(app_state, segment_id).await?;
            let text_ids: Vec<Id> = context.linked.iter().map(|s| s.text_id).collect();
            let texts = if text_ids.is_empty() {
                HashMap::new()
            } else {
                get_texts_detail(app_state, &text_ids).await?
            };
            Ok(count_info(
                &context.text,
                context.family,
                segment_id,
                &context.linked,
                &texts,
            ))
        })
        .await
}

fn check_create_request(request: &CreateSegmentRequest) -> Result<(), Error> {
    if request.segments.is_empty() {
        return Err(Error::bad_request("segments must not be empty"));
    }
    let mut seen = HashSet::new();
    for segment in &request.segments {
        if let Some(pecha_segment_id) = segment.pecha_segment_id.as_deref() {
            if !seen.insert(pecha_segment_id) {
                return Err(Error::bad_request(format!(
                    "pecha_segment_id {pecha_segment_id} is used more than once"
                )));
            }
        }
    }
    Ok(())
}

/// Creates a batch of segments for one Text, with their initial mappings.
pub async fn create(
    app_state: &AppState,
    claims: &Claims,
    request: CreateSegmentRequest,
) -> Result<Vec<segments::Model>, Error> {
    require_admin(claims)?;
    check_create_request(&request)?;
    validate_text(app_state, request.text_id).await?;

    for segment in request.segments.iter().filter(|s| !s.mapping.is_empty()) {
        mapping::validate_mappings(app_state, request.text_id, &segment.mapping).await?;
    }

    let now = chrono::Utc::now();
    let models: Vec<segments::Model> = request
        .segments
        .into_iter()
        .map(|segment| segments::Model {
            id: Id::new_v4(),
            pecha_segment_id: segment.pecha_segment_id,
            text_id: request.text_id,
            content: segment.content,
            segment_type: segment.segment_type,
            mapping: merge_mappings(&Mappings::default(), &segment.mapping),
            revision: 0,
            created_at: now.into(),
            updated_at: now.into(),
        })
        .collect();

    let created = store::write(
        app_state,
        segment_api::create_many(app_state.db_conn_ref(), models),
    )
    .await?;
    info!(
        "Created {} segment(s) for text {}",
        created.len(),
        request.text_id
    );

    let mut touched_texts = vec![request.text_id];
    let mut touched_segments = Vec::new();
    for segment in &created {
        touched_segments.extend(segment.mapping.segment_ids());
        touched_texts.extend(segment.mapping.iter().map(|m| m.text_id));
    }
    cache::invalidate_segments(app_state, touched_segments, touched_texts).await;

    Ok(created)
}

/// Replaces segment contents of one Text, keyed by `pecha_segment_id`. Nothing
/// is written if any key has no segment.
pub async fn update_contents(
    app_state: &AppState,
    claims: &Claims,
    request: UpdateSegmentContentRequest,
) -> Result<Vec<segments::Model>, Error> {
    require_admin(claims)?;
    if request.segments.is_empty() {
        return Err(Error::bad_request("segments must not be empty"));
    }
    validate_text(app_state, request.text_id).await?;

    let updates = request
        .segments
        .into_iter()
        .map(|segment| (segment.pecha_segment_id, segment.content))
        .collect();
    let updated = store::write(
        app_state,
        segment_api::update_contents(app_state.db_conn_ref(), request.text_id, updates),
    )
    .await
    .map_err(|err| match err.error_kind {
        DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::NotFound)) => Error::not_found(format!(
            "a pecha_segment_id has no segment in text {}",
            request.text_id
        )),
        _ => err,
    })?;
    info!(
        "Updated content of {} segment(s) of text {}",
        updated.len(),
        request.text_id
    );

    // Translations and overlays elsewhere embed this content.
    let mut touched_segments = Vec::new();
    let mut touched_texts = vec![request.text_id];
    for segment in &updated {
        touched_segments.push(segment.id);
        touched_segments.extend(segment.mapping.segment_ids());
        touched_texts.extend(segment.mapping.iter().map(|m| m.text_id));
    }
    let reverse = store::read(
        app_state,
        segment_api::find_related_mapped_many(
            app_state.db_conn_ref(),
            &updated.iter().map(|s| s.id).collect::<Vec<_>>(),
        ),
    )
    .await?;
    for segment in reverse {
        touched_segments.push(segment.id);
        touched_texts.push(segment.text_id);
    }
    cache::invalidate_segments(app_state, touched_segments, touched_texts).await;

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RequestErrorKind;
    use crate::test_support::{admin, app_state, reader, segment, text};

    fn in_group(model: texts::Model, group_id: Id) -> texts::Model {
        texts::Model { group_id, ..model }
    }

    #[test]
    fn commentary_segments_merge_into_one_passage() {
        let root = text("Root", "bo", TextType::RootText);
        let commentary = text("Commentary", "bo", TextType::Commentary);
        let k1 = segment(commentary.id, Some("01"), "first gloss. ");
        let k2 = segment(commentary.id, Some("02"), "second gloss.");
        let positions = HashMap::new();
        let texts: HashMap<Id, texts::Model> = [
            (root.id, root.clone()),
            (commentary.id, commentary.clone()),
        ]
        .into();

        let groups = mapping::group_related(vec![k2.clone(), k1.clone()], &texts, &positions, |t| {
            t.text_type == TextType::Commentary
        });
        let merged = merge_commentaries(groups);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text_id, commentary.id);
        assert_eq!(merged[0].count, 1);
        assert_eq!(
            merged[0].segments,
            vec![MappedSegment {
                segment_id: k1.id,
                content: "first gloss. second gloss.".to_string(),
            }]
        );
    }

    #[test]
    fn translations_keep_one_entry_per_segment() {
        let version = text("English", "en", TextType::Version);
        let v1 = segment(version.id, Some("1"), "one");
        let v2 = segment(version.id, Some("2"), "two");

        let translations = translations_from(vec![RelatedGroup {
            text: version.clone(),
            segments: vec![v1.clone(), v2.clone()],
        }]);

        assert_eq!(translations.len(), 2);
        assert_eq!(translations[0].segment_id, v1.id);
        assert_eq!(translations[1].content, "two");
        assert!(translations.iter().all(|t| t.language == "en"));
    }

    #[test]
    fn only_versions_count_as_translations() {
        let group_id = Id::new_v4();
        let root = in_group(text("Root", "bo", TextType::RootText), group_id);
        let version = in_group(text("English", "en", TextType::Version), group_id);
        let chinese = in_group(text("Chinese", "zh", TextType::Translation), group_id);
        let foreign_version = text("Other work", "en", TextType::Version);
        let commentary = text("Commentary", "bo", TextType::Commentary);

        assert!(is_translation_of(&root, &version));
        assert!(is_translation_of(&root, &foreign_version));
        assert!(is_translation_of(&commentary, &version));
        assert!(!is_translation_of(&version, &root));
        assert!(!is_translation_of(&root, &chinese));
        assert!(!is_translation_of(&root, &commentary));
        assert!(!is_translation_of(&version, &version));
    }

    #[test]
    fn root_mapping_is_empty_for_root_works() {
        let root = text("Root", "bo", TextType::RootText);
        let commentary = text("Commentary", "bo", TextType::Commentary);
        let other_commentary = text("Sub-commentary", "bo", TextType::Commentary);

        assert!(!is_root_of(&root, Family::Root, &commentary));
        assert!(is_root_of(&commentary, Family::Commentary, &root));
        assert!(!is_root_of(&commentary, Family::Commentary, &other_commentary));
    }

    #[test]
    fn unmapped_segment_has_zero_info() {
        let root = text("Root", "bo", TextType::RootText);
        let lone = segment(root.id, Some("1"), "alone");

        let info = count_info(&root, Family::Root, lone.id, &[], &HashMap::new());

        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            serde_json::json!({
                "segment_id": lone.id,
                "text_id": root.id,
                "translations": 0,
                "related_text": { "commentaries": 0, "root_text": 0 },
                "resources": { "sheets": 0 }
            })
        );
    }

    #[test]
    fn info_counts_distinct_texts() {
        let group_id = Id::new_v4();
        let root = in_group(text("Root", "bo", TextType::RootText), group_id);
        let version = in_group(text("English", "en", TextType::Version), group_id);
        let commentary = text("Commentary", "bo", TextType::Commentary);
        let sheet = text("Study sheet", "en", TextType::Sheet);
        let r1 = segment(root.id, Some("1"), "root");
        let linked = vec![
            segment(version.id, Some("1"), "v1"),
            segment(version.id, Some("2"), "v2"),
            segment(commentary.id, Some("1"), "k1"),
            segment(commentary.id, Some("2"), "k2"),
            segment(sheet.id, None, "s"),
        ];
        let texts: HashMap<Id, texts::Model> = [&root, &version, &commentary, &sheet]
            .into_iter()
            .map(|t| (t.id, t.clone()))
            .collect();

        let info = count_info(&root, Family::Root, r1.id, &linked, &texts);

        assert_eq!(info.translations, 1);
        assert_eq!(info.related_text.commentaries, 1);
        assert_eq!(info.related_text.root_text, 0);
        assert_eq!(info.resources.sheets, 1);
    }

    #[tokio::test]
    async fn segment_writes_require_admin() {
        let app_state = app_state();
        let request = CreateSegmentRequest {
            text_id: Id::new_v4(),
            segments: vec![CreateSegment {
                pecha_segment_id: Some("1".to_string()),
                content: "content".to_string(),
                segment_type: SegmentType::Source,
                mapping: vec![],
            }],
        };

        let result = create(&app_state, &reader(), request).await;

        assert_eq!(
            result.unwrap_err().error_kind,
            DomainErrorKind::Request(RequestErrorKind::Forbidden)
        );
    }

    #[tokio::test]
    async fn duplicate_pecha_segment_ids_are_rejected_before_any_write() {
        let app_state = app_state();
        let duplicate = CreateSegment {
            pecha_segment_id: Some("7".to_string()),
            content: "content".to_string(),
            segment_type: SegmentType::Source,
            mapping: vec![],
        };
        let request = CreateSegmentRequest {
            text_id: Id::new_v4(),
            segments: vec![duplicate.clone(), duplicate],
        };

        let result = create(&app_state, &admin(), request).await;

        assert!(matches!(
            result.unwrap_err().error_kind,
            DomainErrorKind::Request(RequestErrorKind::BadRequest(_))
        ));
    }

    #[test]
    fn create_segment_defaults_type_and_mapping() {
        let parsed: CreateSegment = serde_json::from_value(serde_json::json!({
            "pecha_segment_id": "01",
            "content": "<p>text</p>"
        }))
        .unwrap();

        assert_eq!(parsed.segment_type, SegmentType::Source);
        assert!(parsed.mapping.is_empty());
    }
    #[cfg(feature = "mock")]
    mod with_store {
        use super::*;
        use crate::mapping::{update_segment_mapping, TextMappingRequest};
        use crate::test_support::{app_state_with, count_row, group};
        use crate::{group_type::GroupType, table_of_contents};
        use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

        #[tokio::test]
        async fn mapped_segment_is_listed_among_the_translations_of_its_target() {
            let a = text("A", "en", TextType::Version);
            let b = text("B", "bo", TextType::Version);
            let c = text("C", "bo", TextType::Commentary);
            let a1 = segment(a.id, Some("1"), "a1 content");
            let b1 = segment(b.id, Some("1"), "b1 content");
            let c1 = segment(c.id, Some("1"), "c1 content");
            let c2 = segment(c.id, Some("2"), "c2 content");
            let mappings = vec![
                MappingRequest {
                    parent_text_id: b.id,
                    segments: vec![b1.id],
                },
                MappingRequest {
                    parent_text_id: c.id,
                    segments: vec![c1.id, c2.id],
                },
            ];
            let mapped_a1 = segments::Model {
                mapping: merge_mappings(&Mappings::default(), &mappings),
                revision: 1,
                ..a1.clone()
            };

            let db = MockDatabase::new(DatabaseBackend::Postgres)
                // validating the mapping request
                .append_query_results(vec![vec![a1.clone()]])
                .append_query_results(vec![vec![count_row(1)], vec![count_row(2)]])
                .append_query_results(vec![vec![b1.clone(), c1.clone(), c2.clone()]])
                // the revision-guarded write
                .append_query_results(vec![vec![a1.clone()]])
                .append_exec_results(vec![MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                // translations of b1
                .append_query_results(vec![vec![count_row(1)]])
                .append_query_results(vec![vec![b1.clone()]])
                .append_query_results(vec![vec![group(GroupType::Text)]])
                .append_query_results(vec![vec![mapped_a1.clone()]])
                .append_query_results(vec![Vec::<table_of_contents::Model>::new()])
                .into_connection();
            let app_state = app_state_with(db);

            let updated = update_segment_mapping(
                &app_state,
                &admin(),
                TextMappingRequest {
                    text_id: a.id,
                    segment_id: a1.id,
                    mappings,
                },
            )
            .await
            .unwrap();

            assert_eq!(updated.mapping.len(), 2);
            assert_eq!(updated.mapping, mapped_a1.mapping);

            for known in [&a, &b, &c] {
                Cached::text_by_id(known.id).prime(&app_state, known).await;
            }
            let response = translations(&app_state, b1.id, Page::default())
                .await
                .unwrap();

            assert_eq!(
                response.parent_segment,
                ParentSegment {
                    segment_id: b1.id,
                    content: "b1 content".to_string(),
                }
            );
            assert_eq!(
                response.translations,
                vec![SegmentTranslation {
                    segment_id: a1.id,
                    text_id: a.id,
                    title: "A".to_string(),
                    language: "en".to_string(),
                    content: "a1 content".to_string(),
                }]
            );
        }

        #[tokio::test]
        async fn unknown_segment_is_not_found_before_any_cache_read() {
            let db = MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results(vec![vec![count_row(0)]])
                .into_connection();
            let app_state = app_state_with(db);

            let err = commentaries(&app_state, Id::new_v4()).await.unwrap_err();

            assert!(matches!(
                err.error_kind,
                DomainErrorKind::Request(RequestErrorKind::NotFound(_))
            ));
        }
    }
}
