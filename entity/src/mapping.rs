//! Cross-work alignment records stored on a segment.

use crate::Id;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// "The owning segment corresponds to `segments` of the Text `text_id`."
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Mapping {
    #[schema(value_type = String, format = Uuid)]
    pub text_id: Id,
    #[schema(value_type = Vec<String>, format = Uuid)]
    pub segments: Vec<Id>,
}

/// The full `mapping` list of a segment. Stored as a single JSONB document so that
/// the `mapping.segments` containment index can serve reverse lookups.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult, ToSchema,
)]
#[schema(value_type = Vec<Mapping>)]
pub struct Mappings(pub Vec<Mapping>);

impl Mappings {
    pub fn iter(&self) -> std::slice::Iter<'_, Mapping> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn find(&self, text_id: Id) -> Option<&Mapping> {
        self.0.iter().find(|mapping| mapping.text_id == text_id)
    }

    /// Every segment id referenced by any mapping, in stored order.
    pub fn segment_ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.0.iter().flat_map(|mapping| mapping.segments.iter().copied())
    }
}

impl From<Vec<Mapping>> for Mappings {
    fn from(mappings: Vec<Mapping>) -> Self {
        Mappings(mappings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mappings_serialize_as_a_list() {
        let text_id = Id::new_v4();
        let segment_id = Id::new_v4();
        let mappings = Mappings(vec![Mapping {
            text_id,
            segments: vec![segment_id],
        }]);

        let value = serde_json::to_value(&mappings).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{"text_id": text_id, "segments": [segment_id]}])
        );
    }

    #[test]
    fn segment_ids_flattens_all_mappings() {
        let (a, b, c) = (Id::new_v4(), Id::new_v4(), Id::new_v4());
        let mappings = Mappings(vec![
            Mapping {
                text_id: Id::new_v4(),
                segments: vec![a, b],
            },
            Mapping {
                text_id: Id::new_v4(),
                segments: vec![c],
            },
        ]);
        assert_eq!(mappings.segment_ids().collect::<Vec<_>>(), vec![a, b, c]);
    }
}
