//! Extraction data model and fuzzy matchers.
//!
//! Entities and relationships as produced by an upstream extraction run, the
//! gold-standard cases they are validated against, and the name normalization
//! and matching heuristics shared by validation.

pub mod gold;
pub mod matcher;
pub mod normalizer;
pub mod schema;

pub use gold::{ExpectedEntity, ExpectedRelationship, GoldStandardCase, StructuralChecks};
pub use matcher::{EntityMatcher, RelationshipMatch, RelationshipMatcher, DEFAULT_TOLERANCE};
pub use normalizer::normalize_name;
pub use schema::{Entity, ExtractionResult, Keywords, Properties, Relationship, Snapshot};
