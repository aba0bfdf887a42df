//! The section tree of a table of contents and the traversals over it.

use crate::Id;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use utoipa::ToSchema;

/// A reference from a section to one segment of the owning Text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TextSegment {
    #[schema(value_type = String, format = Uuid)]
    pub segment_id: Id,
    pub segment_number: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Section {
    #[schema(value_type = String, format = Uuid)]
    pub id: Id,
    pub title: Option<String>,
    pub section_number: i32,
    #[schema(value_type = Option<String>, format = Uuid)]
    pub parent_id: Option<Id>,
    #[serde(default)]
    pub segments: Vec<TextSegment>,
    #[serde(default)]
    #[schema(no_recursion)]
    pub sections: Vec<Section>,
}

/// One entry of the flattened reading order of a section tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlatSegment {
    pub section_id: Id,
    pub segment_id: Id,
    pub segment_number: i32,
}

/// The flattened reading order of a section tree.
#[derive(Clone, Debug, Default)]
pub struct FlatOrder {
    pub segments: Vec<FlatSegment>,
    /// Range of `segments` covered by each section together with its descendants.
    pub section_spans: HashMap<Id, Range<usize>>,
}

impl FlatOrder {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn position_of(&self, segment_id: Id) -> Option<usize> {
        self.segments
            .iter()
            .position(|flat| flat.segment_id == segment_id)
    }

    pub fn section_span(&self, section_id: Id) -> Option<Range<usize>> {
        self.section_spans.get(&section_id).cloned()
    }
}

/// The top-level sections of a table of contents.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult, ToSchema,
)]
#[schema(value_type = Vec<Section>)]
pub struct Sections(pub Vec<Section>);

impl Section {
    fn sort_recursive(&mut self) {
        self.segments.sort_by_key(|segment| segment.segment_number);
        self.sections.sort_by_key(|section| section.section_number);
        for child in self.sections.iter_mut() {
            child.sort_recursive();
        }
    }

    fn strip_recursive(&mut self) {
        self.segments.clear();
        for child in self.sections.iter_mut() {
            child.strip_recursive();
        }
    }

    fn flatten_into(&self, order: &mut FlatOrder) {
        let start = order.segments.len();
        for segment in &self.segments {
            order.segments.push(FlatSegment {
                section_id: self.id,
                segment_id: segment.segment_id,
                segment_number: segment.segment_number,
            });
        }
        for child in &self.sections {
            child.flatten_into(order);
        }
        order
            .section_spans
            .insert(self.id, start..order.segments.len());
    }

    fn visit<'a>(&'a self, visitor: &mut impl FnMut(&'a Section)) {
        visitor(self);
        for child in &self.sections {
            child.visit(visitor);
        }
    }
}

impl Sections {
    /// Sorts every level by `section_number` and every segment list by `segment_number`.
    pub fn normalised(mut self) -> Self {
        self.0.sort_by_key(|section| section.section_number);
        for section in self.0.iter_mut() {
            section.sort_recursive();
        }
        self
    }

    /// Replaces every section's segments with `[]` while keeping the tree.
    pub fn stripped(mut self) -> Self {
        for section in self.0.iter_mut() {
            section.strip_recursive();
        }
        self
    }

    /// Applies `skip`/`limit` to top-level sections only. Call after [`Sections::normalised`].
    pub fn paginated(self, skip: u64, limit: u64) -> Self {
        Sections(
            self.0
                .into_iter()
                .skip(skip as usize)
                .take(limit as usize)
                .collect(),
        )
    }

    /// Depth-first reading order: a section's own segments precede its children.
    /// Call after [`Sections::normalised`].
    pub fn flatten(&self) -> FlatOrder {
        let mut order = FlatOrder::default();
        for section in &self.0 {
            section.flatten_into(&mut order);
        }
        order
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Section> {
        self.0.iter()
    }

    /// Every section in the tree, parents before children.
    pub fn all_sections(&self) -> Vec<&Section> {
        let mut all = Vec::new();
        for section in &self.0 {
            section.visit(&mut |s| all.push(s));
        }
        all
    }

    pub fn segment_ids(&self) -> Vec<Id> {
        self.all_sections()
            .into_iter()
            .flat_map(|section| section.segments.iter().map(|s| s.segment_id))
            .collect()
    }

    pub fn contains_segment(&self, segment_id: Id) -> bool {
        self.all_sections()
            .into_iter()
            .any(|section| section.segments.iter().any(|s| s.segment_id == segment_id))
    }

    /// Returns the first sibling `section_number` that is not unique, if any.
    pub fn duplicate_section_number(&self) -> Option<i32> {
        fn check(siblings: &[Section]) -> Option<i32> {
            let mut seen = HashSet::new();
            for section in siblings {
                if !seen.insert(section.section_number) {
                    return Some(section.section_number);
                }
            }
            siblings.iter().find_map(|section| check(&section.sections))
        }
        check(&self.0)
    }
}
