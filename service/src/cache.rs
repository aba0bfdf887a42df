//! Response cache shared by every request handler.
//!
//! Values are stored as serialized JSON strings keyed by
//! `"{tag}:{scope_id}:{params_hash}"`, so an entity's entries can be dropped
//! together with [`CacheStore::delete_prefix`] using [`CacheKey::prefix`].
//! The in-process [`LruCacheStore`] is the only backend; callers only ever see
//! the [`CacheStore`] trait.

use async_trait::async_trait;
use log::*;
use lru::LruCache;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A value or key parameter could not be (de)serialized.
    Serialization(String),
    /// The backend could not serve the request.
    Unavailable(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Serialization(msg) => write!(f, "cache serialization error: {msg}"),
            CacheError::Unavailable(msg) => write!(f, "cache unavailable: {msg}"),
        }
    }
}

impl std::error::Error for CacheError {}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

/// Families of cached responses. Each tag owns its own key namespace and TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTag {
    TextById,
    TextDetail,
    TextsByTerm,
    TocByText,
    VersionsByGroup,
    TextInfos,
    SegmentById,
    Translations,
    Commentaries,
    RootMapping,
    SegmentInfo,
}

impl CacheTag {
    pub const ALL: [CacheTag; 11] = [
        CacheTag::TextById,
        CacheTag::TextDetail,
        CacheTag::TextsByTerm,
        CacheTag::TocByText,
        CacheTag::VersionsByGroup,
        CacheTag::TextInfos,
        CacheTag::SegmentById,
        CacheTag::Translations,
        CacheTag::Commentaries,
        CacheTag::RootMapping,
        CacheTag::SegmentInfo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheTag::TextById => "text_by_id",
            CacheTag::TextDetail => "text_detail",
            CacheTag::TextsByTerm => "texts_by_term",
            CacheTag::TocByText => "toc_by_text",
            CacheTag::VersionsByGroup => "versions_by_group",
            CacheTag::TextInfos => "text_infos",
            CacheTag::SegmentById => "segment_by_id",
            CacheTag::Translations => "translations",
            CacheTag::Commentaries => "commentaries",
            CacheTag::RootMapping => "root_mapping",
            CacheTag::SegmentInfo => "segment_info",
        }
    }
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheTag {
    type Err = CacheError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        CacheTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == value)
            .ok_or_else(|| CacheError::Serialization(format!("unknown cache tag `{value}`")))
    }
}

pub struct CacheKey;

impl CacheKey {
    /// Builds `"{tag}:{scope_id}:{sha256(params) as hex}"`.
    ///
    /// `params` captures everything else that shapes the response (language,
    /// skip, limit, ...). Identical requests always produce identical keys.
    pub fn build<P: Serialize + ?Sized>(
        tag: CacheTag,
        scope_id: impl fmt::Display,
        params: &P,
    ) -> Result<String, CacheError> {
        let encoded = serde_json::to_vec(params)?;
        let digest = hex::encode(Sha256::digest(&encoded));
        Ok(format!("{}{}", Self::prefix(tag, scope_id), digest))
    }

    /// The prefix shared by every key of `tag` scoped to `scope_id`.
    pub fn prefix(tag: CacheTag, scope_id: impl fmt::Display) -> String {
        format!("{}:{}:", tag.as_str(), scope_id)
    }
}

/// Time-to-live policy: a default plus optional per-tag overrides.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    default_ttl: Duration,
    overrides: HashMap<CacheTag, Duration>,
}

impl CachePolicy {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            default_ttl,
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, tag: CacheTag, ttl: Duration) -> Self {
        self.overrides.insert(tag, ttl);
        self
    }

    pub fn from_config(config: &Config) -> Self {
        let (default_ttl, overrides) = config.cache_ttls();
        overrides
            .into_iter()
            .fold(Self::new(default_ttl), |policy, (tag, ttl)| {
                match tag.parse::<CacheTag>() {
                    Ok(tag) => policy.with_override(tag, ttl),
                    Err(err) => {
                        warn!("Ignoring TTL override: {err}");
                        policy
                    }
                }
            })
    }

    pub fn ttl(&self, tag: CacheTag) -> Duration {
        self.overrides
            .get(&tag)
            .copied()
            .unwrap_or(self.default_ttl)
    }
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Removes every entry whose key starts with `prefix`, returning how many were dropped.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError>;
}

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Bounded in-process cache. Least recently used entries are evicted once
/// `capacity` is reached and expired entries are dropped when read.
pub struct LruCacheStore {
    entries: Mutex<LruCache<String, Entry>>,
}

impl LruCacheStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for LruCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries.lock().await;
        let expired = match entries.get(key) {
            None => return Ok(None),
            Some(entry) if entry.expires_at > Instant::now() => {
                return Ok(Some(entry.value.clone()))
            }
            Some(_) => true,
        };
        if expired {
            trace!("Cache entry expired: {key}");
            entries.pop(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        if ttl.is_zero() {
            return Ok(());
        }
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.lock().await.put(key.to_string(), entry);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let mut entries = self.entries.lock().await;
        let doomed: Vec<String> = entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        debug!("Invalidated {} cache entries under {prefix}", doomed.len());
        Ok(doomed.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_params_produce_identical_keys() {
        let params = json!({"language": "en", "skip": 0, "limit": 10});
        let a = CacheKey::build(CacheTag::TextsByTerm, "t1", &params).unwrap();
        let b = CacheKey::build(CacheTag::TextsByTerm, "t1", &params).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("texts_by_term:t1:"));
        assert_eq!(a.len(), "texts_by_term:t1:".len() + 64);
    }

    #[test]
    fn different_params_produce_different_keys() {
        let a = CacheKey::build(CacheTag::TextsByTerm, "t1", &json!({"skip": 0})).unwrap();
        let b = CacheKey::build(CacheTag::TextsByTerm, "t1", &json!({"skip": 10})).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn tags_round_trip_through_their_names() {
        for tag in CacheTag::ALL {
            assert_eq!(tag.as_str().parse::<CacheTag>().unwrap(), tag);
        }
        assert!("nope".parse::<CacheTag>().is_err());
    }

    #[test]
    fn policy_prefers_overrides() {
        let policy = CachePolicy::new(Duration::from_secs(30))
            .with_override(CacheTag::SegmentInfo, Duration::from_secs(5));
        assert_eq!(policy.ttl(CacheTag::SegmentInfo), Duration::from_secs(5));
        assert_eq!(policy.ttl(CacheTag::Translations), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn set_then_get_returns_value() {
        let store = LruCacheStore::new(8);
        store
            .set("text_by_id:a:x", "{}".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            store.get("text_by_id:a:x").await.unwrap(),
            Some("{}".to_string())
        );
        assert_eq!(store.get("text_by_id:b:x").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entries_are_misses() {
        let store = LruCacheStore::new(8);
        store
            .set("k", "v".to_string(), Duration::from_millis(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn zero_ttl_is_never_stored() {
        let store = LruCacheStore::new(8);
        store.set("k", "v".to_string(), Duration::ZERO).await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn least_recently_used_entry_is_evicted() {
        let store = LruCacheStore::new(2);
        let ttl = Duration::from_secs(60);
        store.set("a", "1".to_string(), ttl).await.unwrap();
        store.set("b", "2".to_string(), ttl).await.unwrap();
        store.get("a").await.unwrap();
        store.set("c", "3".to_string(), ttl).await.unwrap();
        assert_eq!(store.get("b").await.unwrap(), None);
        assert_eq!(store.get("a").await.unwrap(), Some("1".to_string()));
        assert_eq!(store.get("c").await.unwrap(), Some("3".to_string()));
    }

    #[tokio::test]
    async fn delete_prefix_only_drops_matching_scope() {
        let store = LruCacheStore::new(16);
        let ttl = Duration::from_secs(60);
        let t1 = CacheKey::build(CacheTag::TextDetail, "t1", &json!({"skip": 0})).unwrap();
        let t1b = CacheKey::build(CacheTag::TextDetail, "t1", &json!({"skip": 5})).unwrap();
        let t10 = CacheKey::build(CacheTag::TextDetail, "t10", &json!({"skip": 0})).unwrap();
        for key in [&t1, &t1b, &t10] {
            store.set(key, "x".to_string(), ttl).await.unwrap();
        }

        let removed = store
            .delete_prefix(&CacheKey::prefix(CacheTag::TextDetail, "t1"))
            .await
            .unwrap();

        assert_eq!(removed, 2);
        assert_eq!(store.get(&t10).await.unwrap(), Some("x".to_string()));
        assert_eq!(store.len().await, 1);
    }
}
