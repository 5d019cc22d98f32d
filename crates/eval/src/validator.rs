use chrono::Utc;
use extract::{
    Entity, EntityMatcher, ExpectedEntity, ExpectedRelationship, ExtractionResult, GoldStandardCase,
    Relationship, RelationshipMatcher, normalize_name,
};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::time::Instant;
use structure::{Communities, KnowledgeGraph, StructuralAnalyzer, StructuralMetrics};
use tracing::{debug, info};

use crate::config::{EvalConfig, ValidatorConfig};
use crate::error::Result;
use crate::results::{
    EntityMatchPair, EntityValidationResult, RelationshipMatchPair, RelationshipValidationResult,
    StructuralValidation, ValidationResult,
};

/// Named items listed in a single recommendation
const MAX_MISSING_ENTITIES_LISTED: usize = 3;
const MAX_MISSING_RELATIONSHIPS_LISTED: usize = 2;
const MAX_ISOLATION_ISSUES_LISTED: usize = 2;

/// Connectivity term of `overall_score` for a disconnected graph
const DISCONNECTED_SCORE: f64 = 0.5;

const BASELINE_CASE_ID: &str = "baseline_comparison";

fn ratio(part: usize, whole: usize, when_empty: f64) -> f64 {
    if whole == 0 { when_empty } else { part as f64 / whole as f64 }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// `items` joined with ", ", cut at `limit` with a "(+N more)" suffix
fn listing(items: &[String], limit: usize) -> String {
    let shown = items.iter().take(limit).cloned().collect::<Vec<_>>().join(", ");
    if items.len() > limit {
        format!("{shown} (+{} more)", items.len() - limit)
    } else {
        shown
    }
}

fn isolation_issues(metrics: &StructuralMetrics) -> Vec<String> {
    metrics
        .isolated_nodes
        .iter()
        .map(|id| format!("Entity '{id}' is isolated and has no relationships"))
        .collect()
}

/// Scores extractions against gold-standard cases or against a baseline
/// snapshot. Immutable after construction, so one validator can serve many
/// concurrent calls.
#[derive(Debug, Clone)]
pub struct ExtractionValidator {
    config: ValidatorConfig,
    entities: EntityMatcher,
    relationships: RelationshipMatcher,
    analyzer: StructuralAnalyzer,
}

impl Default for ExtractionValidator {
    fn default() -> Self {
        Self::from_config(&EvalConfig::default())
    }
}

impl ExtractionValidator {
    pub fn new(tolerance: f64) -> Self {
        Self::from_config(&EvalConfig {
            validator: ValidatorConfig { tolerance },
            ..Default::default()
        })
    }

    pub fn from_config(config: &EvalConfig) -> Self {
        let entities = EntityMatcher::new(config.validator.tolerance);
        Self {
            config: config.validator.clone(),
            entities,
            relationships: RelationshipMatcher::new(entities),
            analyzer: StructuralAnalyzer::new(config.analyzer.clone()),
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.config.tolerance
    }

    pub fn analyzer(&self) -> &StructuralAnalyzer {
        &self.analyzer
    }

    /// Community partition of an extraction's graph by algorithm name
    pub fn detect_communities(
        &self,
        extraction: &ExtractionResult,
        algorithm: &str,
    ) -> Result<Communities> {
        let graph = KnowledgeGraph::from_extraction(extraction);
        Ok(self.analyzer.detect_communities(&graph, algorithm)?)
    }

    pub fn validate_entities(
        &self,
        actual: &[Entity],
        expected: &[ExpectedEntity],
    ) -> EntityValidationResult {
        let mut matched_entities = Vec::new();
        let mut missing_entities = Vec::new();
        let mut consumed: HashSet<&str> = HashSet::new();

        for wanted in expected {
            match self.entities.find_entity_match(&wanted.name, actual) {
                Some(found) => {
                    consumed.insert(found.id.as_str());
                    matched_entities.push(EntityMatchPair {
                        expected: wanted.name.clone(),
                        actual_id: found.id.clone(),
                        expected_type: wanted.entity_type.clone(),
                        actual_type: found.entity_type.clone(),
                    });
                }
                None => missing_entities.push(wanted.name.clone()),
            }
        }

        let extra_entities = actual
            .iter()
            .filter(|entity| !consumed.contains(entity.id.as_str()))
            .map(|entity| entity.id.clone())
            .collect();

        let agreeing = matched_entities.iter().filter(|pair| pair.types_agree()).count();
        let type_consistency_score = if expected.is_empty() {
            1.0
        } else {
            ratio(agreeing, matched_entities.len(), 0.0)
        };

        EntityValidationResult {
            expected_count: expected.len(),
            actual_count: actual.len(),
            fuzzy_match_score: ratio(matched_entities.len(), expected.len(), 1.0),
            type_consistency_score,
            matched_entities,
            missing_entities,
            extra_entities,
        }
    }

    pub fn validate_relationships(
        &self,
        actual: &[Relationship],
        expected: &[ExpectedRelationship],
        entities: &[Entity],
    ) -> RelationshipValidationResult {
        let mut matched_relationships = Vec::new();
        let mut missing_relationships = Vec::new();
        let mut consumed = vec![false; actual.len()];

        for wanted in expected {
            match self.relationships.find_relationship_match(wanted, actual, entities) {
                Some(found) => {
                    let position = actual.iter().position(|r| std::ptr::eq(r, found.relationship));
                    if let Some(position) = position {
                        consumed[position] = true;
                    }
                    matched_relationships.push(RelationshipMatchPair {
                        expected: wanted.label(),
                        actual: found.relationship.key(),
                        same_direction: found.same_direction,
                    });
                }
                None => missing_relationships.push(wanted.label()),
            }
        }

        let extra_relationships = actual
            .iter()
            .zip(&consumed)
            .filter(|(_, used)| !**used)
            .map(|(relationship, _)| relationship.key())
            .collect();

        let aligned = matched_relationships.iter().filter(|pair| pair.same_direction).count();
        let type_consistency_score = if expected.is_empty() {
            1.0
        } else {
            ratio(aligned, matched_relationships.len(), 0.0)
        };

        RelationshipValidationResult {
            expected_count: expected.len(),
            actual_count: actual.len(),
            fuzzy_match_score: ratio(matched_relationships.len(), expected.len(), 1.0),
            type_consistency_score,
            matched_relationships,
            missing_relationships,
            extra_relationships,
        }
    }

    pub fn validate_against_gold_standard(
        &self,
        extraction: &ExtractionResult,
        case: &GoldStandardCase,
    ) -> ValidationResult {
        let start = Instant::now();
        let checks = &case.structural_checks;

        let entity_validation =
            self.validate_entities(&extraction.entities, &case.expected_entities);
        let relationship_validation = self.validate_relationships(
            &extraction.relationships,
            &case.expected_relationships,
            &extraction.entities,
        );

        let metrics = self.analyzer.analyze(&extraction.entities, &extraction.relationships);
        let (requirements_passed, issues) =
            self.analyzer.validate_structure_requirements(&metrics, checks);
        let isolation_issues = isolation_issues(&metrics);

        let connectivity = if metrics.is_connected { 1.0 } else { DISCONNECTED_SCORE };
        let overall_score = mean(&[
            entity_validation.fuzzy_match_score,
            entity_validation.type_consistency_score,
            relationship_validation.fuzzy_match_score,
            connectivity,
        ]);

        let passed = overall_score >= self.config.tolerance
            && extraction.entity_count() >= checks.min_entities
            && extraction.relationship_count() >= checks.min_relationships
            && (!checks.graph_connectivity || metrics.is_connected);

        let mut recommendations = Vec::new();
        if !entity_validation.missing_entities.is_empty() {
            recommendations.push(format!(
                "Missing expected entities: {}",
                listing(&entity_validation.missing_entities, MAX_MISSING_ENTITIES_LISTED)
            ));
        }
        if !relationship_validation.missing_relationships.is_empty() {
            recommendations.push(format!(
                "Missing expected relationships: {}",
                listing(
                    &relationship_validation.missing_relationships,
                    MAX_MISSING_RELATIONSHIPS_LISTED,
                )
            ));
        }
        if !isolation_issues.is_empty() {
            recommendations.push(format!(
                "Connect isolated entities: {}",
                listing(&isolation_issues, MAX_ISOLATION_ISSUES_LISTED)
            ));
        }
        if overall_score < self.config.tolerance {
            recommendations.push(format!(
                "Overall score {:.2} is below tolerance {:.2}; review extraction quality",
                overall_score, self.config.tolerance
            ));
        }

        let duration_secs = start.elapsed().as_secs_f64();
        info!(
            case_id = %case.id,
            score = overall_score,
            passed,
            missing_entities = entity_validation.missing_entities.len(),
            duration_secs,
            "Validated extraction against gold standard"
        );

        ValidationResult {
            case_id: case.id.clone(),
            entity_validation,
            relationship_validation,
            structural_validation: StructuralValidation {
                metrics,
                requirements_passed,
                issues,
                isolation_issues,
            },
            overall_score,
            passed,
            recommendations,
            timestamp: Utc::now(),
            duration_secs,
        }
    }

    /// Regression-flavored validation without a gold case. Entities are
    /// compared by exact normalized id, with no fuzzy matching.
    pub fn compare_extractions(
        &self,
        baseline: &ExtractionResult,
        current: &ExtractionResult,
    ) -> ValidationResult {
        let start = Instant::now();

        let by_name = |entities: &[Entity]| -> BTreeMap<String, Entity> {
            entities
                .iter()
                .map(|entity| (normalize_name(&entity.id), entity.clone()))
                .collect()
        };
        let before = by_name(&baseline.entities);
        let after = by_name(&current.entities);

        let removed: Vec<String> = before
            .iter()
            .filter(|(name, _)| !after.contains_key(*name))
            .map(|(_, entity)| entity.id.clone())
            .collect();
        let added: Vec<String> = after
            .iter()
            .filter(|(name, _)| !before.contains_key(*name))
            .map(|(_, entity)| entity.id.clone())
            .collect();
        let matched_entities: Vec<EntityMatchPair> = before
            .iter()
            .filter_map(|(name, old)| {
                after.get(name).map(|new| EntityMatchPair {
                    expected: old.id.clone(),
                    actual_id: new.id.clone(),
                    expected_type: old.entity_type.clone(),
                    actual_type: new.entity_type.clone(),
                })
            })
            .collect();

        let entity_churn = ratio(
            added.len() + removed.len(),
            before.len(),
            if after.is_empty() { 0.0 } else { 1.0 },
        );
        let entity_stability = (1.0 - entity_churn).clamp(0.0, 1.0);

        let baseline_relationships = baseline.relationship_count();
        let current_relationships = current.relationship_count();
        let relationship_stability = (1.0
            - ratio(
                baseline_relationships.abs_diff(current_relationships),
                baseline_relationships,
                if current_relationships == 0 { 0.0 } else { 1.0 },
            ))
        .clamp(0.0, 1.0);

        let overall_score = mean(&[entity_stability, relationship_stability]);
        let passed = overall_score >= self.config.tolerance;

        let old_keys: BTreeSet<String> =
            baseline.relationships.iter().map(Relationship::key).collect();
        let new_keys: BTreeSet<String> =
            current.relationships.iter().map(Relationship::key).collect();
        let matched_relationships: Vec<RelationshipMatchPair> = old_keys
            .intersection(&new_keys)
            .map(|key| RelationshipMatchPair {
                expected: key.clone(),
                actual: key.clone(),
                same_direction: true,
            })
            .collect();

        let agreeing = matched_entities.iter().filter(|pair| pair.types_agree()).count();
        let entity_validation = EntityValidationResult {
            expected_count: baseline.entity_count(),
            actual_count: current.entity_count(),
            type_consistency_score: ratio(agreeing, matched_entities.len(), 1.0),
            fuzzy_match_score: entity_stability,
            matched_entities,
            missing_entities: removed,
            extra_entities: added,
        };
        let relationship_validation = RelationshipValidationResult {
            expected_count: baseline_relationships,
            actual_count: current_relationships,
            fuzzy_match_score: relationship_stability,
            type_consistency_score: 1.0,
            matched_relationships,
            missing_relationships: old_keys.difference(&new_keys).cloned().collect(),
            extra_relationships: new_keys.difference(&old_keys).cloned().collect(),
        };

        let metrics = self.analyzer.analyze(&current.entities, &current.relationships);
        let isolation_issues = isolation_issues(&metrics);

        let mut recommendations = Vec::new();
        if !entity_validation.missing_entities.is_empty() {
            recommendations.push(format!(
                "Entities removed since baseline: {}",
                listing(&entity_validation.missing_entities, MAX_MISSING_ENTITIES_LISTED)
            ));
        }
        if current_relationships < baseline_relationships {
            recommendations.push(format!(
                "Relationship count dropped from {} to {}",
                baseline_relationships, current_relationships
            ));
        }
        if !isolation_issues.is_empty() {
            recommendations.push(format!(
                "Connect isolated entities: {}",
                listing(&isolation_issues, MAX_ISOLATION_ISSUES_LISTED)
            ));
        }
        if !passed {
            recommendations.push(format!(
                "Stability score {:.2} is below tolerance {:.2}; investigate the extraction change",
                overall_score, self.config.tolerance
            ));
        }

        let duration_secs = start.elapsed().as_secs_f64();
        debug!(
            entity_stability,
            relationship_stability,
            score = overall_score,
            passed,
            "Compared extraction against baseline"
        );

        ValidationResult {
            case_id: BASELINE_CASE_ID.to_string(),
            entity_validation,
            relationship_validation,
            structural_validation: StructuralValidation {
                metrics,
                requirements_passed: true,
                issues: Vec::new(),
                isolation_issues,
            },
            overall_score,
            passed,
            recommendations,
            timestamp: Utc::now(),
            duration_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::StructuralChecks;

    fn jobs_entities() -> Vec<Entity> {
        vec![
            Entity::new("Steve Jobs", "Person"),
            Entity::new("Apple Inc.", "Organization"),
            Entity::new("Cupertino", "Location"),
        ]
    }

    #[test]
    fn test_validate_entities_scores() {
        let expected = vec![
            ExpectedEntity::new("Steve Jobs", "person"),
            ExpectedEntity::new("Apple", "Company"),
            ExpectedEntity::new("Steve Wozniak", "Person"),
        ];

        let result = ExtractionValidator::default().validate_entities(&jobs_entities(), &expected);

        assert_eq!(result.matched_entities.len(), 2);
        assert_eq!(result.missing_entities, vec!["Steve Wozniak".to_string()]);
        assert_eq!(result.extra_entities, vec!["Cupertino".to_string()]);
        assert!((result.fuzzy_match_score - 2.0 / 3.0).abs() < 1e-9);
        assert!((result.type_consistency_score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_validate_entities_empty_expectation() {
        let result = ExtractionValidator::default().validate_entities(&jobs_entities(), &[]);

        assert_eq!(result.fuzzy_match_score, 1.0);
        assert_eq!(result.type_consistency_score, 1.0);
        assert_eq!(result.extra_entities.len(), 3);
    }

    #[test]
    fn test_nothing_matched_scores_zero() {
        let expected = vec![ExpectedEntity::new("Microsoft", "Organization")];
        let result = ExtractionValidator::default().validate_entities(&jobs_entities(), &expected);

        assert_eq!(result.fuzzy_match_score, 0.0);
        assert_eq!(result.type_consistency_score, 0.0);
    }

    #[test]
    fn test_validate_relationships_direction() {
        let actual = vec![
            Relationship::new("Apple Inc.", "Steve Jobs", "founded by"),
            Relationship::new("Apple Inc.", "Cupertino", "headquartered in"),
        ];
        let expected = vec![
            ExpectedRelationship::new("Steve Jobs", "Apple", vec!["founded".to_string()]),
            ExpectedRelationship::new("Apple", "Cupertino", Vec::<String>::new()),
            ExpectedRelationship::new("Steve Jobs", "Cupertino", "lives"),
        ];

        let result = ExtractionValidator::default()
            .validate_relationships(&actual, &expected, &jobs_entities());

        assert_eq!(result.matched_relationships.len(), 2);
        assert!(!result.matched_relationships[0].same_direction);
        assert_eq!(result.missing_relationships, vec!["Steve Jobs -> Cupertino".to_string()]);
        assert!(result.extra_relationships.is_empty());
        assert!((result.fuzzy_match_score - 2.0 / 3.0).abs() < 1e-9);
        assert!((result.type_consistency_score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_gold_standard_recommendations_are_additive() {
        let extraction = ExtractionResult::new(jobs_entities(), vec![]);
        let case = GoldStandardCase {
            id: "jobs".to_string(),
            expected_entities: vec![
                ExpectedEntity::new("Steve Jobs", "Person"),
                ExpectedEntity::new("NeXT", "Organization"),
            ],
            expected_relationships: vec![ExpectedRelationship::new(
                "Steve Jobs",
                "Apple",
                "founded",
            )],
            structural_checks: StructuralChecks {
                min_entities: 2,
                ..Default::default()
            },
            ..Default::default()
        };

        let result =
            ExtractionValidator::default().validate_against_gold_standard(&extraction, &case);

        // (0.5 + 1.0 + 0.0 + 0.5) / 4
        assert!((result.overall_score - 0.5).abs() < 1e-9);
        assert!(!result.passed);
        assert_eq!(result.recommendations.len(), 4);
        assert!(result.recommendations[0].contains("NeXT"));
        assert!(result.recommendations[2].contains("+1 more"));
        assert_eq!(result.structural_validation.isolation_issues.len(), 3);
    }

    #[test]
    fn test_detect_communities_surfaces_unknown_algorithm() {
        let extraction = ExtractionResult::new(
            jobs_entities(),
            vec![Relationship::new("Steve Jobs", "Apple Inc.", "founded")],
        );
        let validator = ExtractionValidator::default();

        let communities = validator
            .detect_communities(&extraction, "connected_components")
            .unwrap();
        assert_eq!(communities.community_count, 2);

        let err = validator.detect_communities(&extraction, "spectral").unwrap_err();
        assert!(matches!(err, crate::error::EvalError::Structure(_)));
    }

    #[test]
    fn test_compare_extractions_identical() {
        let snapshot = ExtractionResult::new(
            jobs_entities(),
            vec![Relationship::new("Steve Jobs", "Apple Inc.", "founded")],
        );

        let result = ExtractionValidator::default().compare_extractions(&snapshot, &snapshot);

        assert_eq!(result.overall_score, 1.0);
        assert!(result.passed);
        assert!(result.entity_validation.missing_entities.is_empty());
        assert!(result.entity_validation.extra_entities.is_empty());
        assert_eq!(result.relationship_validation.matched_relationships.len(), 1);
    }

    #[test]
    fn test_compare_extractions_exact_names_only() {
        let baseline = ExtractionResult::new(
            jobs_entities(),
            vec![Relationship::new("Steve Jobs", "Apple Inc.", "founded")],
        );
        let current = ExtractionResult::new(
            vec![
                Entity::new("the steve jobs", "Person"),
                Entity::new("Apple", "Organization"),
                Entity::new("Cupertino", "Location"),
            ],
            vec![],
        );

        let result = ExtractionValidator::default().compare_extractions(&baseline, &current);

        // "Apple" and "Apple Inc." differ after normalization
        assert_eq!(result.entity_validation.missing_entities, vec!["Apple Inc.".to_string()]);
        assert_eq!(result.entity_validation.extra_entities, vec!["Apple".to_string()]);
        // entity: 1 - 2/3, relationship: 1 - 1/1
        assert!((result.overall_score - (1.0 / 3.0) / 2.0).abs() < 1e-9);
        assert!(!result.passed);
    }
}
