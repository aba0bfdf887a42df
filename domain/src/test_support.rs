//! Fixtures shared by the unit tests of this crate.

use crate::jwt::Claims;
use crate::{segment_type::SegmentType, segments, text_type::TextType, texts, Id};
#[cfg(feature = "mock")]
use crate::{group_type::GroupType, groups};
use entity::mapping::Mappings;
use sea_orm::DatabaseConnection;
use service::cache::LruCacheStore;
use service::config::Config;
use service::AppState;
use std::sync::Arc;

/// An AppState over `db` with a real cache.
pub(crate) fn app_state_with(db: DatabaseConnection) -> AppState {
    AppState::with_cache(
        Config::default(),
        &Arc::new(db),
        Arc::new(LruCacheStore::new(64)),
    )
}

/// The single row a `COUNT(*)` query answers with.
#[cfg(feature = "mock")]
pub(crate) fn count_row(count: i64) -> std::collections::BTreeMap<&'static str, sea_orm::Value> {
    std::collections::BTreeMap::from([("num_items", sea_orm::Value::BigInt(Some(count)))])
}

/// An AppState with a real cache and no database. Anything that reaches the
/// store fails, which lets tests prove validation happens first.
pub(crate) fn app_state() -> AppState {
    app_state_with(DatabaseConnection::Disconnected)
}

fn claims(is_admin: bool) -> Claims {
    Claims {
        sub: Id::new_v4().to_string(),
        email: Some("librarian@example.org".to_string()),
        is_admin,
        exp: usize::MAX,
    }
}

pub(crate) fn admin() -> Claims {
    claims(true)
}

pub(crate) fn reader() -> Claims {
    claims(false)
}

/// A published Text in its own group.
pub(crate) fn text(title: &str, language: &str, text_type: TextType) -> texts::Model {
    let now = chrono::Utc::now();
    texts::Model {
        id: Id::new_v4(),
        pecha_text_id: None,
        title: title.to_string(),
        language: language.to_string(),
        group_id: Id::new_v4(),
        text_type,
        categories: vec![],
        parent_id: None,
        is_published: true,
        published_by: None,
        published_at: Some(now.into()),
        created_at: now.into(),
        updated_at: now.into(),
    }
}

pub(crate) fn segment(text_id: Id, pecha_segment_id: Option<&str>, content: &str) -> segments::Model {
    let now = chrono::Utc::now();
    segments::Model {
        id: Id::new_v4(),
        pecha_segment_id: pecha_segment_id.map(str::to_string),
        text_id,
        content: content.to_string(),
        segment_type: SegmentType::Content,
        mapping: Mappings::default(),
        revision: 0,
        created_at: now.into(),
        updated_at: now.into(),
    }
}

#[cfg(feature = "mock")]
pub(crate) fn group(group_type: GroupType) -> groups::Model {
    let now = chrono::Utc::now();
    groups::Model {
        id: Id::new_v4(),
        group_type,
        created_at: now.into(),
        updated_at: now.into(),
    }
}
