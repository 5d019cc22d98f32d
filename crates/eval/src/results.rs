use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use structure::{StructuralMetrics, StructureComparison};

/// An expected entity paired with the actual entity it resolved to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMatchPair {
    pub expected: String,
    pub actual_id: String,
    pub expected_type: String,
    pub actual_type: String,
}

impl EntityMatchPair {
    /// Case-insensitive; a missing type on either side counts as agreeing
    pub fn types_agree(&self) -> bool {
        let expected = self.expected_type.trim();
        let actual = self.actual_type.trim();
        expected.is_empty() || actual.is_empty() || expected.to_lowercase() == actual.to_lowercase()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityValidationResult {
    pub expected_count: usize,
    pub actual_count: usize,
    pub matched_entities: Vec<EntityMatchPair>,
    pub missing_entities: Vec<String>,
    /// Actual entity ids no expected entity resolved to
    pub extra_entities: Vec<String>,
    pub fuzzy_match_score: f64,
    pub type_consistency_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipMatchPair {
    /// `"source -> target"` as written in the gold case
    pub expected: String,
    /// Identity key of the actual relationship
    pub actual: String,
    pub same_direction: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipValidationResult {
    pub expected_count: usize,
    pub actual_count: usize,
    pub matched_relationships: Vec<RelationshipMatchPair>,
    pub missing_relationships: Vec<String>,
    pub extra_relationships: Vec<String>,
    pub fuzzy_match_score: f64,
    /// Fraction of matches oriented the same way as expected
    pub type_consistency_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuralValidation {
    pub metrics: StructuralMetrics,
    pub requirements_passed: bool,
    pub issues: Vec<String>,
    /// Human readable notes about isolated entities
    pub isolation_issues: Vec<String>,
}

/// Verdict for one extraction, either against a gold case or against a
/// baseline snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub case_id: String,
    pub entity_validation: EntityValidationResult,
    pub relationship_validation: RelationshipValidationResult,
    pub structural_validation: StructuralValidation,
    pub overall_score: f64,
    pub passed: bool,
    pub recommendations: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChangeType::Added => "added",
            ChangeType::Removed => "removed",
            ChangeType::Modified => "modified",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Entity,
    Relationship,
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ItemType::Entity => "entity",
            ItemType::Relationship => "relationship",
        })
    }
}

/// `details` key holding the baseline version of a changed item
pub const OLD_VALUE: &str = "old_value";
/// `details` key holding the current version of a changed item
pub const NEW_VALUE: &str = "new_value";

/// One added, removed or modified item between two snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionChange {
    pub change_type: ChangeType,
    pub item_type: ItemType,
    /// Entity id or relationship key
    pub item_id: String,
    pub description: String,
    pub impact_score: f64,
    /// `OLD_VALUE` and/or `NEW_VALUE`, whichever sides the item exists on
    #[serde(default)]
    pub details: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionSummary {
    pub baseline_label: String,
    pub current_label: String,
    pub entities_added: usize,
    pub entities_removed: usize,
    pub entities_modified: usize,
    pub relationships_added: usize,
    pub relationships_removed: usize,
    pub relationships_modified: usize,
    pub baseline_entity_count: usize,
    pub current_entity_count: usize,
    pub baseline_relationship_count: usize,
    pub current_relationship_count: usize,
    pub density_change: f64,
    pub structure: StructureComparison,
    /// Changes at or above `min_impact_score`, highest impact first
    pub significant_changes: Vec<RegressionChange>,
    pub overall_stability_score: f64,
    pub regression_detected: bool,
    pub improvement_detected: bool,
    pub neutral_change: bool,
    pub recommendations: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl RegressionSummary {
    pub fn total_changes(&self) -> usize {
        self.entities_added
            + self.entities_removed
            + self.entities_modified
            + self.relationships_added
            + self.relationships_removed
            + self.relationships_modified
    }
}
