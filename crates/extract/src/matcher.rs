//! Fuzzy matching of expected records against extracted ones.
//!
//! Both matchers are first-hit: candidates are scanned in input order and the
//! first one that qualifies is returned, there is no best-match search.

use crate::gold::ExpectedRelationship;
use crate::normalizer::{either_contains, normalize_name, token_overlap};
use crate::schema::{Entity, Relationship};

/// Token overlap needed for a fuzzy name match when neither name contains the other
pub const DEFAULT_TOLERANCE: f64 = 0.8;

#[derive(Debug, Clone, Copy)]
pub struct EntityMatcher {
    tolerance: f64,
}

impl Default for EntityMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl EntityMatcher {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn find_entity_match<'a>(
        &self,
        target_name: &str,
        candidates: &'a [Entity],
    ) -> Option<&'a Entity> {
        let target = normalize_name(target_name);
        if target.is_empty() {
            return None;
        }

        candidates
            .iter()
            .find(|candidate| self.normalized_match(&target, &normalize_name(&candidate.id)))
    }

    fn normalized_match(&self, a: &str, b: &str) -> bool {
        if a.is_empty() || b.is_empty() {
            return false;
        }
        either_contains(a, b) || token_overlap(a, b) >= self.tolerance
    }
}

/// A relationship found for an expected one
#[derive(Debug, Clone, Copy)]
pub struct RelationshipMatch<'a> {
    pub relationship: &'a Relationship,
    pub source: &'a Entity,
    pub target: &'a Entity,
    /// False when the extracted edge points target -> source
    pub same_direction: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RelationshipMatcher {
    entities: EntityMatcher,
}

impl RelationshipMatcher {
    pub fn new(entities: EntityMatcher) -> Self {
        Self { entities }
    }

    pub fn find_relationship_match<'a>(
        &self,
        expected: &ExpectedRelationship,
        actual: &'a [Relationship],
        entities: &'a [Entity],
    ) -> Option<RelationshipMatch<'a>> {
        let source = self.entities.find_entity_match(&expected.source, entities)?;
        let target = self.entities.find_entity_match(&expected.target, entities)?;
        let expected_keywords = expected.keywords.terms();

        actual.iter().find_map(|relationship| {
            let forward =
                relationship.source_id == source.id && relationship.target_id == target.id;
            let backward =
                relationship.source_id == target.id && relationship.target_id == source.id;

            if !(forward || backward) || !relationship.keywords.contains_any(&expected_keywords) {
                return None;
            }

            Some(RelationshipMatch {
                relationship,
                source,
                target,
                same_direction: forward,
            })
        })
    }
}
