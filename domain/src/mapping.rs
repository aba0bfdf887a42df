//! The Mapping Engine: writes to the segment-to-segment alignment and the
//! traversals over it.
//!
//! A mapping is stored only on the segment that declares it. The reverse
//! direction is always computed from the containment index on
//! `segments.mapping`, never stored.

use crate::cache;
use crate::error::Error;
use crate::jwt::{require_admin, Claims};
use crate::store;
use crate::text::get_texts_detail;
use crate::{segments, table_of_contents, text_type::TextType, texts, Id};
use entity::mapping::{Mapping, Mappings};
use entity_api::{segment as segment_api, table_of_content as toc_api};
use log::*;
use serde::{Deserialize, Serialize};
use service::AppState;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use utoipa::ToSchema;

/// Attempts at a revision-guarded mapping write before giving up.
pub const MAX_MAPPING_ATTEMPTS: usize = 5;

/// "Correspond to `segments` of the Text `parent_text_id`."
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MappingRequest {
    #[schema(value_type = String, format = Uuid)]
    pub parent_text_id: Id,
    #[schema(value_type = Vec<String>, format = Uuid)]
    pub segments: Vec<Id>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TextMappingRequest {
    #[schema(value_type = String, format = Uuid)]
    pub text_id: Id,
    #[schema(value_type = String, format = Uuid)]
    pub segment_id: Id,
    pub mappings: Vec<MappingRequest>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BatchMappingRequest {
    pub text_mappings: Vec<TextMappingRequest>,
}

/// Segments of one Text found by a traversal, in reading order.
#[derive(Clone, Debug, PartialEq)]
pub struct RelatedGroup {
    pub text: texts::Model,
    pub segments: Vec<segments::Model>,
}

/// Set-union of `incoming` into `existing`.
///
/// Existing entries keep their position and their segment order; new segment
/// ids are appended, new Texts become new entries. The result holds at most one
/// entry per Text, so applying the same request twice changes nothing.
pub fn merge_mappings(existing: &Mappings, incoming: &[MappingRequest]) -> Mappings {
    let mut merged: Vec<Mapping> = Vec::with_capacity(existing.len() + incoming.len());

    let entries = existing
        .iter()
        .map(|mapping| (mapping.text_id, mapping.segments.as_slice()))
        .chain(
            incoming
                .iter()
                .map(|request| (request.parent_text_id, request.segments.as_slice())),
        );

    for (text_id, segment_ids) in entries {
        let position = match merged.iter().position(|mapping| mapping.text_id == text_id) {
            Some(position) => position,
            None => {
                merged.push(Mapping {
                    text_id,
                    segments: Vec::new(),
                });
                merged.len() - 1
            }
        };
        let target = &mut merged[position].segments;
        for segment_id in segment_ids {
            if !target.contains(segment_id) {
                target.push(*segment_id);
            }
        }
    }

    Mappings(merged)
}

/// Checks that need no storage access. Same-text mappings are rejected first.
pub(crate) fn check_request_shape(text_id: Id, mappings: &[MappingRequest]) -> Result<(), Error> {
    if mappings
        .iter()
        .any(|mapping| mapping.parent_text_id == text_id)
    {
        return Err(Error::bad_request("mapping within same text not allowed"));
    }
    if mappings.is_empty() {
        return Err(Error::bad_request("at least one mapping is required"));
    }
    if let Some(mapping) = mappings.iter().find(|mapping| mapping.segments.is_empty()) {
        return Err(Error::bad_request(format!(
            "mapping to text {} lists no segments",
            mapping.parent_text_id
        )));
    }
    Ok(())
}

/// Every referenced parent segment must exist and belong to the Text it is listed under.
pub(crate) fn check_parent_segments(
    mappings: &[MappingRequest],
    found: &HashMap<Id, segments::Model>,
) -> Result<(), Error> {
    for mapping in mappings {
        for segment_id in &mapping.segments {
            let segment = found
                .get(segment_id)
                .ok_or_else(|| Error::not_found(format!("Segment {segment_id} not found")))?;
            if segment.text_id != mapping.parent_text_id {
                return Err(Error::bad_request(format!(
                    "segment {segment_id} does not belong to text {}",
                    mapping.parent_text_id
                )));
            }
        }
    }
    Ok(())
}

/// Validates the mapping targets declared by a segment of `text_id`.
pub(crate) async fn validate_mappings(
    app_state: &AppState,
    text_id: Id,
    mappings: &[MappingRequest],
) -> Result<(), Error> {
    check_request_shape(text_id, mappings)?;

    let parent_text_ids: Vec<Id> = mappings.iter().map(|m| m.parent_text_id).collect();
    crate::text::validate_texts(app_state, &parent_text_ids).await?;

    let parent_segment_ids: Vec<Id> = mappings
        .iter()
        .flat_map(|mapping| mapping.segments.iter().copied())
        .collect();
    let found = store::read(
        app_state,
        segment_api::find_by_ids(app_state.db_conn_ref(), &parent_segment_ids),
    )
    .await?;
    check_parent_segments(mappings, &found)
}

/// Full validation of one mapping request. Returns the segment being mapped.
pub async fn validate_mapping_request(
    app_state: &AppState,
    request: &TextMappingRequest,
) -> Result<segments::Model, Error> {
    check_request_shape(request.text_id, &request.mappings)?;

    let segment = store::read(
        app_state,
        segment_api::find_by_id(app_state.db_conn_ref(), request.segment_id),
    )
    .await?
    .ok_or_else(|| Error::not_found(format!("Segment {} not found", request.segment_id)))?;
    if segment.text_id != request.text_id {
        return Err(Error::bad_request(format!(
            "segment {} does not belong to text {}",
            request.segment_id, request.text_id
        )));
    }

    crate::text::validate_text(app_state, request.text_id).await?;
    validate_mappings(app_state, request.text_id, &request.mappings).await?;
    Ok(segment)
}

/// Segments and Texts whose cached views can change when `segment` maps to `mapping`.
fn touched_by(segment: &segments::Model) -> (Vec<Id>, Vec<Id>) {
    let mut segment_ids = vec![segment.id];
    segment_ids.extend(segment.mapping.segment_ids());
    let mut text_ids = vec![segment.text_id];
    text_ids.extend(segment.mapping.iter().map(|mapping| mapping.text_id));
    (segment_ids, text_ids)
}

/// Merges the requested mappings into a segment.
pub async fn update_segment_mapping(
    app_state: &AppState,
    claims: &Claims,
    request: TextMappingRequest,
) -> Result<segments::Model, Error> {
    require_admin(claims)?;
    validate_mapping_request(app_state, &request).await?;
    apply_segment_mapping(app_state, request.segment_id, &request.mappings).await
}

/// The write half of [`update_segment_mapping`], for an already validated request.
///
/// The write is guarded by the segment's revision and retried from a fresh read
/// when another writer got in between, so concurrent updates never lose mappings.
pub(crate) async fn apply_segment_mapping(
    app_state: &AppState,
    segment_id: Id,
    mappings: &[MappingRequest],
) -> Result<segments::Model, Error> {
    let db = app_state.db_conn_ref();
    for attempt in 1..=MAX_MAPPING_ATTEMPTS {
        let current = store::read(app_state, segment_api::find_by_id(db, segment_id))
            .await?
            .ok_or_else(|| Error::not_found(format!("Segment {segment_id} not found")))?;

        let merged = merge_mappings(&current.mapping, mappings);
        if merged == current.mapping {
            debug!("Mapping of segment {} already up to date", current.id);
            return Ok(current);
        }

        let written = store::write(
            app_state,
            segment_api::compare_and_set_mapping(db, current.id, current.revision, merged.clone()),
        )
        .await?;

        if written {
            let updated = segments::Model {
                mapping: merged,
                revision: current.revision + 1,
                updated_at: chrono::Utc::now().into(),
                ..current
            };
            info!(
                "Updated mapping of segment {} to {} text(s)",
                updated.id,
                updated.mapping.len()
            );
            let (segment_ids, text_ids) = touched_by(&updated);
            cache::invalidate_segments(app_state, segment_ids, text_ids).await;
            return Ok(updated);
        }

        debug!(
            "Concurrent mapping write on segment {segment_id} (attempt {attempt}/{MAX_MAPPING_ATTEMPTS})"
        );
    }

    warn!("Giving up on mapping segment {segment_id} after {MAX_MAPPING_ATTEMPTS} attempts");
    Err(Error::internal(
        "segment mapping kept changing during the update",
    ))
}

/// Groups a batch by segment, preserving first appearance. Requests for the same
/// segment are concatenated.
pub(crate) fn group_by_segment(batch: &[TextMappingRequest]) -> Vec<(Id, Vec<MappingRequest>)> {
    let mut grouped: Vec<(Id, Vec<MappingRequest>)> = Vec::new();
    for request in batch {
        match grouped.iter_mut().find(|(id, _)| *id == request.segment_id) {
            Some((_, mappings)) => mappings.extend(request.mappings.iter().cloned()),
            None => grouped.push((request.segment_id, request.mappings.clone())),
        }
    }
    grouped
}

/// Applies many mapping requests as one all-or-nothing write.
///
/// Every entry is validated before anything is written. The merged mappings are
/// then persisted in a single transaction guarded by each segment's revision.
pub async fn update_mappings(
    app_state: &AppState,
    claims: &Claims,
    batch: BatchMappingRequest,
) -> Result<Vec<segments::Model>, Error> {
    require_admin(claims)?;

    if batch.text_mappings.is_empty() {
        return Err(Error::bad_request("text_mappings must not be empty"));
    }
    for request in &batch.text_mappings {
        check_request_shape(request.text_id, &request.mappings)?;
    }
    let mapped_ids: Vec<Id> = batch.text_mappings.iter().map(|r| r.segment_id).collect();
    crate::segment::validate_segments(app_state, &mapped_ids).await?;
    for request in &batch.text_mappings {
        validate_mapping_request(app_state, request).await?;
    }

    let grouped = group_by_segment(&batch.text_mappings);
    let segment_ids: Vec<Id> = grouped.iter().map(|(id, _)| *id).collect();
    let db = app_state.db_conn_ref();

    for attempt in 1..=MAX_MAPPING_ATTEMPTS {
        let mut current = store::read(app_state, segment_api::find_by_ids(db, &segment_ids)).await?;

        let mut results = Vec::with_capacity(grouped.len());
        let mut writes = Vec::new();
        for (segment_id, mappings) in &grouped {
            let segment = current
                .remove(segment_id)
                .ok_or_else(|| Error::not_found(format!("Segment {segment_id} not found")))?;
            let merged = merge_mappings(&segment.mapping, mappings);
            if merged == segment.mapping {
                results.push(segment);
            } else {
                writes.push((segment.id, segment.revision, merged.clone()));
                results.push(segments::Model {
                    mapping: merged,
                    revision: segment.revision + 1,
                    updated_at: chrono::Utc::now().into(),
                    ..segment
                });
            }
        }

        if writes.is_empty() {
            return Ok(results);
        }

        let written_count = writes.len();
        if store::write(app_state, segment_api::compare_and_set_mappings(db, writes)).await? {
            info!("Batch updated mappings of {written_count} segment(s)");
            let mut touched_segments = Vec::new();
            let mut touched_texts = Vec::new();
            for segment in &results {
                let (segment_ids, text_ids) = touched_by(segment);
                touched_segments.extend(segment_ids);
                touched_texts.extend(text_ids);
            }
            cache::invalidate_segments(app_state, touched_segments, touched_texts).await;
            return Ok(results);
        }

        debug!("Concurrent mapping write during batch (attempt {attempt}/{MAX_MAPPING_ATTEMPTS})");
    }

    warn!("Giving up on batch mapping update after {MAX_MAPPING_ATTEMPTS} attempts");
    Err(Error::internal(
        "segment mappings kept changing during the batch update",
    ))
}

/// Every segment with a mapping that references `parent_segment_id`, unordered.
pub async fn related_mapped_segments(
    app_state: &AppState,
    parent_segment_id: Id,
) -> Result<Vec<segments::Model>, Error> {
    store::read(
        app_state,
        segment_api::find_related_mapped(app_state.db_conn_ref(), parent_segment_id),
    )
    .await
}

/// Segments linked to `segment` in either direction: those whose mappings
/// reference it, followed by those its own mappings reference. Dangling
/// forward references are skipped.
pub async fn linked_segments(
    app_state: &AppState,
    segment: &segments::Model,
) -> Result<Vec<segments::Model>, Error> {
    let reverse = related_mapped_segments(app_state, segment.id).await?;

    let forward_ids: Vec<Id> = segment.mapping.segment_ids().collect();
    let mut forward = store::read(
        app_state,
        segment_api::find_by_ids(app_state.db_conn_ref(), &forward_ids),
    )
    .await?;

    let mut seen = HashSet::from([segment.id]);
    let mut linked = Vec::with_capacity(reverse.len() + forward.len());
    for candidate in reverse {
        if seen.insert(candidate.id) {
            linked.push(candidate);
        }
    }
    for id in forward_ids {
        match forward.remove(&id) {
            Some(candidate) if seen.insert(candidate.id) => linked.push(candidate),
            Some(_) => {}
            None if !seen.contains(&id) => debug!("Segment {} maps to missing segment {id}", segment.id),
            None => {}
        }
    }
    Ok(linked)
}

/// [`linked_segments`] for many segments with two store round trips.
pub(crate) async fn linked_segments_many(
    app_state: &AppState,
    sources: &[segments::Model],
) -> Result<HashMap<Id, Vec<segments::Model>>, Error> {
    let db = app_state.db_conn_ref();
    let source_ids: Vec<Id> = sources.iter().map(|segment| segment.id).collect();
    let wanted: HashSet<Id> = source_ids.iter().copied().collect();

    let reverse = store::read(app_state, segment_api::find_related_mapped_many(db, &source_ids)).await?;
    let forward_ids: Vec<Id> = sources
        .iter()
        .flat_map(|segment| segment.mapping.segment_ids())
        .collect();
    let forward = store::read(app_state, segment_api::find_by_ids(db, &forward_ids)).await?;

    let mut linked: HashMap<Id, Vec<segments::Model>> = HashMap::with_capacity(sources.len());
    for candidate in &reverse {
        for target in candidate.mapping.segment_ids().filter(|id| wanted.contains(id)) {
            linked.entry(target).or_default().push(candidate.clone());
        }
    }
    for source in sources {
        for id in source.mapping.segment_ids() {
            if let Some(candidate) = forward.get(&id) {
                linked.entry(source.id).or_default().push(candidate.clone());
            }
        }
    }
    for (source_id, candidates) in linked.iter_mut() {
        let mut seen = HashSet::from([*source_id]);
        candidates.retain(|candidate| seen.insert(candidate.id));
    }
    Ok(linked)
}

/// Reading position of each segment in the first table of contents (by creation)
/// of its Text that contains it.
pub(crate) fn toc_positions(tocs: &[table_of_contents::Model]) -> HashMap<Id, usize> {
    let mut positions = HashMap::new();
    for toc in tocs {
        let order = toc.sections.clone().normalised().flatten();
        for (position, flat) in order.segments.iter().enumerate() {
            positions.entry(flat.segment_id).or_insert(position);
        }
    }
    positions
}

pub(crate) async fn text_positions(
    app_state: &AppState,
    text_ids: &[Id],
) -> Result<HashMap<Id, usize>, Error> {
    let tocs = store::read(
        app_state,
        toc_api::find_by_texts(app_state.db_conn_ref(), text_ids),
    )
    .await?;
    Ok(toc_positions(&tocs))
}

/// Sort key for `pecha_segment_id`: all-digit ids by numeric value, then other
/// ids as text, then segments without one.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum PechaKey<'a> {
    Numeric(usize, &'a str),
    Text(&'a str),
    Missing,
}

impl<'a> PechaKey<'a> {
    fn of(segment: &'a segments::Model) -> Self {
        match segment.pecha_segment_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) => {
                let digits = id.trim_start_matches('0');
                PechaKey::Numeric(digits.len(), digits)
            }
            Some(id) if !id.is_empty() => PechaKey::Text(id),
            _ => PechaKey::Missing,
        }
    }
}

/// Orders segments of one Text: by table-of-contents position first, then by
/// `pecha_segment_id`, then by input order.
pub(crate) fn order_segments(
    mut segments: Vec<segments::Model>,
    positions: &HashMap<Id, usize>,
) -> Vec<segments::Model> {
    segments.sort_by(|a, b| {
        match (positions.get(&a.id), positions.get(&b.id)) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then_with(|| PechaKey::of(a).cmp(&PechaKey::of(b)))
    });
    segments
}

/// Groups `related` by owning Text, keeping only Texts accepted by `keep`.
/// Segments whose Text is unknown are skipped. Groups are ordered by Text title.
pub(crate) fn group_related(
    related: Vec<segments::Model>,
    texts: &HashMap<Id, texts::Model>,
    positions: &HashMap<Id, usize>,
    keep: impl Fn(&texts::Model) -> bool,
) -> Vec<RelatedGroup> {
    let mut by_text: HashMap<Id, Vec<segments::Model>> = HashMap::new();
    for segment in related {
        match texts.get(&segment.text_id) {
            Some(text) if keep(text) => by_text.entry(text.id).or_default().push(segment),
            Some(_) => {}
            None => debug!(
                "Skipping segment {} of unknown text {}",
                segment.id, segment.text_id
            ),
        }
    }

    let mut groups: Vec<RelatedGroup> = by_text
        .into_iter()
        .filter_map(|(text_id, segments)| {
            texts.get(&text_id).map(|text| RelatedGroup {
                text: text.clone(),
                segments: order_segments(segments, positions),
            })
        })
        .collect();
    groups.sort_by(|a, b| {
        a.text
            .title
            .cmp(&b.text.title)
            .then_with(|| a.text.id.cmp(&b.text.id))
    });
    groups
}

/// Resolves the owning Texts of `related` and groups the segments by Text,
/// keeping only Texts accepted by `keep`.
pub(crate) async fn group_by_text(
    app_state: &AppState,
    related: Vec<segments::Model>,
    keep: impl Fn(&texts::Model) -> bool,
) -> Result<Vec<RelatedGroup>, Error> {
    if related.is_empty() {
        return Ok(Vec::new());
    }

    let text_ids: Vec<Id> = related.iter().map(|segment| segment.text_id).collect();
    let texts = get_texts_detail(app_state, &text_ids).await?;
    let kept_ids: Vec<Id> = texts
        .values()
        .filter(|text| keep(text))
        .map(|text| text.id)
        .collect();
    let positions = text_positions(app_state, &kept_ids).await?;

    Ok(group_related(related, &texts, &positions, keep))
}

/// Keeps the related segments whose Text has `requested_type` (and is
/// `target_text_id`, when given) and groups them by Text in reading order.
pub async fn filter_and_group(
    app_state: &AppState,
    related: Vec<segments::Model>,
    requested_type: TextType,
    target_text_id: Option<Id>,
) -> Result<Vec<RelatedGroup>, Error> {
    group_by_text(app_state, related, |text| {
        text.text_type == requested_type && target_text_id.map_or(true, |id| text.id == id)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainErrorKind, RequestErrorKind};
    use crate::test_support::{admin, app_state, reader, segment, text};

    fn request(parent_text_id: Id, segments: Vec<Id>) -> MappingRequest {
        MappingRequest {
            parent_text_id,
            segments,
        }
    }

    fn sorted(mut mappings: Mappings) -> Vec<(Id, Vec<Id>)> {
        let mut entries: Vec<(Id, Vec<Id>)> = mappings
            .0
            .drain(..)
            .map(|mut m| {
                m.segments.sort();
                (m.text_id, m.segments)
            })
            .collect();
        entries.sort();
        entries
    }

    #[test]
    fn merge_unions_existing_and_new_texts() {
        let (b, c) = (Id::new_v4(), Id::new_v4());
        let (b1, b2, c1) = (Id::new_v4(), Id::new_v4(), Id::new_v4());
        let existing = Mappings(vec![Mapping {
            text_id: b,
            segments: vec![b1],
        }]);

        let merged = merge_mappings(&existing, &[request(b, vec![b2]), request(c, vec![c1])]);

        let mut expected = vec![(b, vec![b1, b2]), (c, vec![c1])];
        for (_, segments) in expected.iter_mut() {
            segments.sort();
        }
        expected.sort();
        assert_eq!(sorted(merged), expected);
    }

    #[test]
    fn merge_is_idempotent() {
        let (b, b1, b2) = (Id::new_v4(), Id::new_v4(), Id::new_v4());
        let incoming = [request(b, vec![b1, b2, b1])];

        let once = merge_mappings(&Mappings::default(), &incoming);
        let twice = merge_mappings(&once, &incoming);

        assert_eq!(once, twice);
        assert_eq!(once.0[0].segments, vec![b1, b2]);
    }

    #[test]
    fn merge_keeps_one_entry_per_text() {
        let (b, b1, b2) = (Id::new_v4(), Id::new_v4(), Id::new_v4());
        let merged = merge_mappings(
            &Mappings::default(),
            &[request(b, vec![b1]), request(b, vec![b2])],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.0[0].segments, vec![b1, b2]);
    }

    #[test]
    fn same_text_mapping_is_rejected_first() {
        let a = Id::new_v4();
        let err = check_request_shape(a, &[request(a, vec![])]).unwrap_err();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Request(RequestErrorKind::BadRequest(
                "mapping within same text not allowed".to_string()
            ))
        );
    }

    #[test]
    fn empty_mapping_requests_are_rejected() {
        let (a, b) = (Id::new_v4(), Id::new_v4());
        assert!(check_request_shape(a, &[]).is_err());
        assert!(check_request_shape(a, &[request(b, vec![])]).is_err());
        assert!(check_request_shape(a, &[request(b, vec![Id::new_v4()])]).is_ok());
    }

    #[test]
    fn parent_segments_must_exist_and_belong_to_their_text() {
        let (b, c) = (Id::new_v4(), Id::new_v4());
        let b1 = segment(b, None, "b1");
        let found: HashMap<Id, segments::Model> = [(b1.id, b1.clone())].into();

        assert!(check_parent_segments(&[request(b, vec![b1.id])], &found).is_ok());

        let wrong_text = check_parent_segments(&[request(c, vec![b1.id])], &found).unwrap_err();
        assert!(matches!(
            wrong_text.error_kind,
            DomainErrorKind::Request(RequestErrorKind::BadRequest(_))
        ));

        let missing = check_parent_segments(&[request(b, vec![Id::new_v4()])], &found).unwrap_err();
        assert!(matches!(
            missing.error_kind,
            DomainErrorKind::Request(RequestErrorKind::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn same_text_mapping_fails_before_touching_the_store() {
        // The store is disconnected: any query would fail with a storage error.
        let app_state = app_state();
        let a = Id::new_v4();
        let err = update_segment_mapping(
            &app_state,
            &admin(),
            TextMappingRequest {
                text_id: a,
                segment_id: Id::new_v4(),
                mappings: vec![request(a, vec![Id::new_v4()])],
            },
        )
        .await
        .unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::Request(RequestErrorKind::BadRequest(
                "mapping within same text not allowed".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn mapping_writes_require_admin() {
        let app_state = app_state();
        let err = update_mappings(
            &app_state,
            &reader(),
            BatchMappingRequest {
                text_mappings: vec![],
            },
        )
        .await
        .unwrap_err();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Request(RequestErrorKind::Forbidden)
        );
    }

    #[test]
    fn batch_requests_are_grouped_by_segment() {
        let (a, s1, s2, b) = (Id::new_v4(), Id::new_v4(), Id::new_v4(), Id::new_v4());
        let (b1, b2) = (Id::new_v4(), Id::new_v4());
        let batch = vec![
            TextMappingRequest {
                text_id: a,
                segment_id: s1,
                mappings: vec![request(b, vec![b1])],
            },
            TextMappingRequest {
                text_id: a,
                segment_id: s2,
                mappings: vec![request(b, vec![b2])],
            },
            TextMappingRequest {
                text_id: a,
                segment_id: s1,
                mappings: vec![request(b, vec![b2])],
            },
        ];

        let grouped = group_by_segment(&batch);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].0, s1);
        assert_eq!(grouped[0].1, vec![request(b, vec![b1]), request(b, vec![b2])]);
        assert_eq!(grouped[1].0, s2);
    }

    #[test]
    fn ordering_prefers_toc_then_pecha_id_then_input() {
        let text_id = Id::new_v4();
        let in_toc_late = segment(text_id, Some("1"), "toc 5");
        let in_toc_early = segment(text_id, Some("9"), "toc 2");
        let numeric_ten = segment(text_id, Some("10"), "ten");
        let numeric_two = segment(text_id, Some("002"), "two");
        let textual = segment(text_id, Some("a1"), "text");
        let missing_first = segment(text_id, None, "missing first");
        let missing_second = segment(text_id, None, "missing second");

        let positions: HashMap<Id, usize> = [(in_toc_late.id, 5), (in_toc_early.id, 2)].into();
        let ordered = order_segments(
            vec![
                missing_first.clone(),
                textual.clone(),
                numeric_ten.clone(),
                in_toc_late.clone(),
                missing_second.clone(),
                numeric_two.clone(),
                in_toc_early.clone(),
            ],
            &positions,
        );

        let contents: Vec<&str> = ordered.iter().map(|s| s.content.as_str()).collect();
        assert_eq!(
            contents,
            vec![
                "toc 2",
                "toc 5",
                "two",
                "ten",
                "text",
                "missing first",
                "missing second"
            ]
        );
    }

    #[test]
    fn grouping_an_empty_list_is_empty() {
        let groups = group_related(Vec::new(), &HashMap::new(), &HashMap::new(), |_| true);
        assert!(groups.is_empty());
    }

    #[test]
    fn grouping_filters_by_text_and_skips_unknown_texts() {
        let version = text("English", "en", TextType::Version);
        let commentary = text("Commentary", "bo", TextType::Commentary);
        let texts: HashMap<Id, texts::Model> = [
            (version.id, version.clone()),
            (commentary.id, commentary.clone()),
        ]
        .into();

        let related = vec![
            segment(commentary.id, Some("01"), "k1"),
            segment(version.id, Some("02"), "v2"),
            segment(Id::new_v4(), Some("01"), "orphan"),
            segment(version.id, Some("01"), "v1"),
        ];

        let groups = group_related(related, &texts, &HashMap::new(), |text| {
            text.text_type == TextType::Version
        });

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].text.id, version.id);
        let contents: Vec<&str> = groups[0].segments.iter().map(|s| s.content.as_str()).collect();
        assert_eq!(contents, vec!["v1", "v2"]);
    }

    #[test]
    fn toc_positions_follow_the_flattened_order() {
        use crate::section::{Section, Sections, TextSegment};
        use crate::table_of_content_type::TableOfContentType;

        let text_id = Id::new_v4();
        let (s1, s2, s3) = (Id::new_v4(), Id::new_v4(), Id::new_v4());
        let section = |number: i32, segments: Vec<(Id, i32)>| Section {
            id: Id::new_v4(),
            title: None,
            section_number: number,
            parent_id: None,
            segments: segments
                .into_iter()
                .map(|(segment_id, segment_number)| TextSegment {
                    segment_id,
                    segment_number,
                })
                .collect(),
            sections: vec![],
        };
        let now = chrono::Utc::now();
        let toc = table_of_contents::Model {
            id: Id::new_v4(),
            text_id,
            toc_type: TableOfContentType::Text,
            sections: Sections(vec![section(2, vec![(s1, 1)]), section(1, vec![(s3, 2), (s2, 1)])]),
            created_at: now.into(),
            updated_at: now.into(),
        };

        let positions = toc_positions(&[toc]);

        assert_eq!(positions[&s2], 0);
        assert_eq!(positions[&s3], 1);
        assert_eq!(positions[&s1], 2);
    }
    // MockDatabase hands out query and exec results in the order they are appended.
    #[cfg(feature = "mock")]
    mod with_store {
        use super::*;
        use crate::test_support::{app_state_with, count_row};
        use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

        fn rows_affected(rows_affected: u64) -> MockExecResult {
            MockExecResult {
                last_insert_id: 0,
                rows_affected,
            }
        }

        #[tokio::test]
        async fn lost_race_is_retried_and_keeps_the_other_writers_mapping() {
            let (a, b, c) = (Id::new_v4(), Id::new_v4(), Id::new_v4());
            let (b1, c1) = (Id::new_v4(), Id::new_v4());
            let a1 = segment(a, Some("1"), "a1");
            let after_other_writer = segments::Model {
                mapping: Mappings(vec![Mapping {
                    text_id: c,
                    segments: vec![c1],
                }]),
                revision: 1,
                ..a1.clone()
            };
            let db = MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results(vec![vec![a1.clone()], vec![after_other_writer]])
                .append_exec_results(vec![rows_affected(0), rows_affected(1)])
                .into_connection();
            let app_state = app_state_with(db);

            let updated = apply_segment_mapping(&app_state, a1.id, &[request(b, vec![b1])])
                .await
                .unwrap();

            assert_eq!(updated.revision, 2);
            assert_eq!(
                updated.mapping,
                Mappings(vec![
                    Mapping {
                        text_id: c,
                        segments: vec![c1],
                    },
                    Mapping {
                        text_id: b,
                        segments: vec![b1],
                    },
                ])
            );
        }

        #[tokio::test]
        async fn mapping_write_gives_up_after_repeated_lost_races() {
            let a1 = segment(Id::new_v4(), Some("1"), "a1");
            let reads: Vec<Vec<segments::Model>> =
                (0..MAX_MAPPING_ATTEMPTS).map(|_| vec![a1.clone()]).collect();
            let misses: Vec<MockExecResult> =
                (0..MAX_MAPPING_ATTEMPTS).map(|_| rows_affected(0)).collect();
            let db = MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results(reads)
                .append_exec_results(misses)
                .into_connection();
            let app_state = app_state_with(db);

            let mappings = [request(Id::new_v4(), vec![Id::new_v4()])];

            let err = apply_segment_mapping(&app_state, a1.id, &mappings)
                .await
                .unwrap_err();

            assert!(matches!(
                err.error_kind,
                DomainErrorKind::Internal(crate::error::InternalErrorKind::Other(_))
            ));
        }

        #[tokio::test]
        async fn unchanged_mapping_is_not_written() {
            let (b, b1) = (Id::new_v4(), Id::new_v4());
            let a1 = segments::Model {
                mapping: Mappings(vec![Mapping {
                    text_id: b,
                    segments: vec![b1],
                }]),
                ..segment(Id::new_v4(), Some("1"), "a1")
            };
            // No exec results: a write attempt would fail the test.
            let db = MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results(vec![vec![a1.clone()]])
                .into_connection();
            let app_state = app_state_with(db);

            let updated = apply_segment_mapping(&app_state, a1.id, &[request(b, vec![b1])])
                .await
                .unwrap();

            assert_eq!(updated, a1);
        }

        #[tokio::test]
        async fn batch_with_an_unknown_segment_is_rejected_before_validation() {
            let (a, b) = (Id::new_v4(), Id::new_v4());
            let db = MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results(vec![vec![count_row(1)]])
                .into_connection();
            let app_state = app_state_with(db);
            let entry = |segment_id| TextMappingRequest {
                text_id: a,
                segment_id,
                mappings: vec![request(b, vec![Id::new_v4()])],
            };

            let err = update_mappings(
                &app_state,
                &admin(),
                BatchMappingRequest {
                    text_mappings: vec![entry(Id::new_v4()), entry(Id::new_v4())],
                },
            )
            .await
            .unwrap_err();

            assert_eq!(
                err.error_kind,
                DomainErrorKind::Request(RequestErrorKind::NotFound(
                    "One or more segments not found".to_string()
                ))
            );
        }
    }
}
