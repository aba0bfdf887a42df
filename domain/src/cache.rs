//! Read-through caching for every query path, and the invalidation rules that
//! keep it honest after writes.
//!
//! Each cached response is addressed by a [`Cached`] built through one of its
//! per-tag constructors. Keys are scoped by the response's primary entity so a
//! write can drop everything about that entity with one prefix delete.

use crate::error::Error;
use crate::{texts, Id};
use log::*;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use service::cache::{CacheKey, CacheTag};
use service::AppState;
use std::collections::BTreeSet;
use std::future::Future;

/// Tags whose entries are scoped by a Text id.
pub(crate) const TEXT_TAGS: [CacheTag; 4] = [
    CacheTag::TextById,
    CacheTag::TextDetail,
    CacheTag::TocByText,
    CacheTag::TextInfos,
];

/// Tags whose entries are scoped by a Segment id.
pub(crate) const SEGMENT_TAGS: [CacheTag; 5] = [
    CacheTag::SegmentById,
    CacheTag::Translations,
    CacheTag::Commentaries,
    CacheTag::RootMapping,
    CacheTag::SegmentInfo,
];

/// The address of one cached response.
#[derive(Debug, Clone)]
pub(crate) struct Cached {
    tag: CacheTag,
    scope: Id,
    params: Value,
}

impl Cached {
    fn new(tag: CacheTag, scope: Id, params: Value) -> Self {
        Self { tag, scope, params }
    }

    pub(crate) fn text_by_id(text_id: Id) -> Self {
        Self::new(CacheTag::TextById, text_id, Value::Null)
    }

    pub(crate) fn text_detail(text_id: Id, request: &impl Serialize) -> Self {
        Self::new(
            CacheTag::TextDetail,
            text_id,
            serde_json::to_value(request).unwrap_or(Value::Null),
        )
    }

    pub(crate) fn texts_by_term(
        term_id: Id,
        language: Option<&str>,
        skip: u64,
        limit: u64,
    ) -> Self {
        Self::new(
            CacheTag::TextsByTerm,
            term_id,
            json!([language.unwrap_or_default(), skip, limit]),
        )
    }

    pub(crate) fn toc_by_text(text_id: Id, language: Option<&str>, skip: u64, limit: u64) -> Self {
        Self::new(
            CacheTag::TocByText,
            text_id,
            json!([language.unwrap_or_default(), skip, limit]),
        )
    }

    /// One table of contents, kept under the owning Text so Text writes drop it.
    pub(crate) fn toc_by_id(text_id: Id, content_id: Id, skip: u64, limit: u64) -> Self {
        Self::new(CacheTag::TocByText, text_id, json!([content_id, skip, limit]))
    }

    pub(crate) fn versions_by_group(
        group_id: Id,
        text_id: Id,
        language: Option<&str>,
        skip: u64,
        limit: u64,
    ) -> Self {
        Self::new(
            CacheTag::VersionsByGroup,
            group_id,
            json!([text_id, language.unwrap_or_default(), skip, limit]),
        )
    }

    pub(crate) fn text_infos(text_id: Id, language: Option<&str>, skip: u64, limit: u64) -> Self {
        Self::new(
            CacheTag::TextInfos,
            text_id,
            json!([language.unwrap_or_default(), skip, limit]),
        )
    }

    /// Segment-scoped responses depend on the segment id alone.
    pub(crate) fn segment(tag: CacheTag, segment_id: Id) -> Self {
        Self::new(tag, segment_id, Value::Null)
    }

    fn key(&self) -> Option<String> {
        match CacheKey::build(self.tag, self.scope, &self.params) {
            Ok(key) => Some(key),
            Err(err) => {
                warn!("Could not build {} cache key: {err}", self.tag);
                None
            }
        }
    }

    /// Returns the cached value, or runs `load` and caches what it returns.
    ///
    /// Cache failures are logged and treated as misses. Errors from `load` are
    /// returned and never cached.
    pub(crate) async fn read_through<T, F, Fut>(
        &self,
        app_state: &AppState,
        load: F,
    ) -> Result<T, Error>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let key = self.key();

        if let Some(key) = key.as_deref() {
            if let Some(value) = self.lookup(app_state, key).await {
                return Ok(value);
            }
        }

        let value = load().await?;

        if let Some(key) = key.as_deref() {
            self.store(app_state, key, &value).await;
        }

        Ok(value)
    }

    pub(crate) async fn lookup<T: DeserializeOwned>(
        &self,
        app_state: &AppState,
        key: &str,
    ) -> Option<T> {
        match app_state.cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    trace!("Cache hit for {key}");
                    Some(value)
                }
                Err(err) => {
                    warn!("Discarding undecodable cache entry {key}: {err}");
                    None
                }
            },
            Ok(None) => {
                debug!("Cache miss for {key}");
                None
            }
            Err(err) => {
                warn!("Cache read failed for {key}, treating as miss: {err}");
                None
            }
        }
    }

    async fn store<T: Serialize>(&self, app_state: &AppState, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("Could not serialize {} response for caching: {err}", self.tag);
                return;
            }
        };
        let ttl = app_state.cache_policy.ttl(self.tag);
        if let Err(err) = app_state.cache.set(key, raw, ttl).await {
            warn!("Cache write failed for {key}: {err}");
        }
    }

    /// Caches `value` under this address without reading first.
    pub(crate) async fn prime<T: Serialize>(&self, app_state: &AppState, value: &T) {
        if let Some(key) = self.key() {
            self.store(app_state, &key, value).await;
        }
    }

    pub(crate) async fn peek<T: DeserializeOwned>(&self, app_state: &AppState) -> Option<T> {
        let key = self.key()?;
        self.lookup(app_state, &key).await
    }
}

/// Drops every entry of each tag scoped to `scope_id`.
pub(crate) async fn invalidate(app_state: &AppState, tags: &[CacheTag], scope_id: Id) {
    for tag in tags {
        let prefix = CacheKey::prefix(*tag, scope_id);
        if let Err(err) = app_state.cache.delete_prefix(&prefix).await {
            warn!("Cache invalidation failed for {prefix}: {err}");
        }
    }
}

/// Invalidation after a Text (or its tables of contents) changed.
///
/// `texts` should hold the Text as it was before and after the write together
/// with its group siblings, so that every language fallback is covered.
pub(crate) async fn invalidate_texts(app_state: &AppState, texts: &[texts::Model]) {
    let mut text_ids = BTreeSet::new();
    let mut group_ids = BTreeSet::new();
    let mut term_ids = BTreeSet::new();
    for text in texts {
        text_ids.insert(text.id);
        group_ids.insert(text.group_id);
        term_ids.extend(text.categories.iter().copied());
    }

    debug!(
        "Invalidating caches for {} text(s), {} group(s), {} term(s)",
        text_ids.len(),
        group_ids.len(),
        term_ids.len()
    );

    for text_id in text_ids {
        invalidate(app_state, &TEXT_TAGS, text_id).await;
    }
    for group_id in group_ids {
        invalidate(app_state, &[CacheTag::VersionsByGroup], group_id).await;
    }
    for term_id in term_ids {
        invalidate(app_state, &[CacheTag::TextsByTerm], term_id).await;
    }
}

/// Invalidation after segment content or mappings changed.
///
/// Every segment-scoped response of `segment_ids` is dropped, as are the reading
/// views and text infos of `text_ids` since those embed overlays and counts.
pub(crate) async fn invalidate_segments(
    app_state: &AppState,
    segment_ids: impl IntoIterator<Item = Id>,
    text_ids: impl IntoIterator<Item = Id>,
) {
    let segment_ids: BTreeSet<Id> = segment_ids.into_iter().collect();
    let text_ids: BTreeSet<Id> = text_ids.into_iter().collect();

    debug!(
        "Invalidating caches for {} segment(s) across {} text(s)",
        segment_ids.len(),
        text_ids.len()
    );

    for segment_id in segment_ids {
        invalidate(app_state, &SEGMENT_TAGS, segment_id).await;
    }
    for text_id in text_ids {
        invalidate(
            app_state,
            &[CacheTag::TextDetail, CacheTag::TextInfos],
            text_id,
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::app_state;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn read_through_loads_once_then_serves_from_cache() {
        let app_state = app_state();
        let text_id = Id::new_v4();
        let counter = AtomicUsize::new(0);
        let loads = &counter;
        let cached = Cached::text_infos(text_id, Some("en"), 0, 10);

        for _ in 0..3 {
            let value: Vec<String> = cached
                .read_through(&app_state, move || async move {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(vec!["loaded".to_string()])
                })
                .await
                .unwrap();
            assert_eq!(value, vec!["loaded".to_string()]);
        }

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let app_state = app_state();
        let cached = Cached::text_by_id(Id::new_v4());

        let first: Result<String, Error> = cached
            .read_through(&app_state, || async { Err(Error::not_found("text")) })
            .await;
        assert!(first.is_err());

        let second: String = cached
            .read_through(&app_state, || async { Ok("found".to_string()) })
            .await
            .unwrap();
        assert_eq!(second, "found");
    }

    #[tokio::test]
    async fn different_params_are_cached_separately() {
        let app_state = app_state();
        let term_id = Id::new_v4();

        Cached::texts_by_term(term_id, Some("en"), 0, 10)
            .prime(&app_state, &1)
            .await;
        Cached::texts_by_term(term_id, Some("bo"), 0, 10)
            .prime(&app_state, &2)
            .await;

        let en: Option<i32> = Cached::texts_by_term(term_id, Some("en"), 0, 10)
            .peek(&app_state)
            .await;
        let bo: Option<i32> = Cached::texts_by_term(term_id, Some("bo"), 0, 10)
            .peek(&app_state)
            .await;
        assert_eq!((en, bo), (Some(1), Some(2)));
    }

    #[tokio::test]
    async fn invalidate_segments_drops_segment_and_text_views() {
        let app_state = app_state();
        let (segment_id, other_segment, text_id) = (Id::new_v4(), Id::new_v4(), Id::new_v4());

        Cached::segment(CacheTag::Translations, segment_id)
            .prime(&app_state, &"stale")
            .await;
        Cached::segment(CacheTag::SegmentInfo, other_segment)
            .prime(&app_state, &"kept")
            .await;
        Cached::text_detail(text_id, &json!({"size": 5}))
            .prime(&app_state, &"stale")
            .await;

        invalidate_segments(&app_state, [segment_id], [text_id]).await;

        let translations: Option<String> = Cached::segment(CacheTag::Translations, segment_id)
            .peek(&app_state)
            .await;
        let detail: Option<String> = Cached::text_detail(text_id, &json!({"size": 5}))
            .peek(&app_state)
            .await;
        let kept: Option<String> = Cached::segment(CacheTag::SegmentInfo, other_segment)
            .peek(&app_state)
            .await;
        assert_eq!(translations, None);
        assert_eq!(detail, None);
        assert_eq!(kept, Some("kept".to_string()));
    }
}
