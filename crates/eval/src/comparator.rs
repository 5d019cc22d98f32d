use chrono::Utc;
use extract::{Entity, ExtractionResult, Relationship};
use serde::Serialize;
use std::collections::BTreeMap;
use structure::StructuralAnalyzer;
use tracing::{info, warn};

use crate::config::{EvalConfig, RegressionConfig};
use crate::impact::{
    ADDED_PENALTY_WEIGHT, HIGH_IMPACT_THRESHOLD, MODIFIED_PENALTY_WEIGHT, REMOVED_PENALTY_WEIGHT,
    STABILITY_PENALTY_DIVISOR, entity_impact, relationship_impact,
};
use crate::results::{
    ChangeType, ItemType, NEW_VALUE, OLD_VALUE, RegressionChange, RegressionSummary,
};

/// Stability an extraction must keep for growth to count as an improvement
const IMPROVEMENT_STABILITY_THRESHOLD: f64 = 0.8;

const NO_ISSUES: &str = "No significant issues detected";

/// Set-difference diff of two keyed collections. Items present on both sides
/// whose value differs are reported as modified.
fn diff<T, K, I>(
    baseline: &[T],
    current: &[T],
    item_type: ItemType,
    key: K,
    impact: I,
) -> Vec<RegressionChange>
where
    T: PartialEq + Serialize,
    K: Fn(&T) -> String,
    I: Fn(&T) -> f64,
{
    let before: BTreeMap<String, &T> = baseline.iter().map(|item| (key(item), item)).collect();
    let after: BTreeMap<String, &T> = current.iter().map(|item| (key(item), item)).collect();
    let value = |item: &T| serde_json::to_value(item).ok();

    let change = |change_type: ChangeType, id: &str, old: Option<&T>, new: Option<&T>, score| {
        RegressionChange {
            change_type,
            item_type,
            item_id: id.to_string(),
            description: format!("{item_type} '{id}' {change_type}"),
            impact_score: score,
            details: [(OLD_VALUE, old), (NEW_VALUE, new)]
                .into_iter()
                .filter_map(|(name, item)| Some((name.to_string(), value(item?)?)))
                .collect(),
        }
    };

    let mut changes = Vec::new();
    for (id, new) in &after {
        if !before.contains_key(id) {
            changes.push(change(ChangeType::Added, id, None, Some(*new), impact(*new)));
        }
    }
    for (id, old) in &before {
        match after.get(id) {
            None => changes.push(change(ChangeType::Removed, id, Some(*old), None, impact(*old))),
            Some(new) if old != new => {
                let modified =
                    change(ChangeType::Modified, id, Some(*old), Some(*new), impact(*new));
                changes.push(modified);
            }
            Some(_) => {}
        }
    }
    changes
}

fn count(changes: &[RegressionChange], change_type: ChangeType) -> usize {
    changes.iter().filter(|c| c.change_type == change_type).count()
}

/// Detects regressions between two extraction snapshots. Immutable after
/// construction.
#[derive(Debug, Clone)]
pub struct RegressionComparator {
    config: RegressionConfig,
    analyzer: StructuralAnalyzer,
}

impl Default for RegressionComparator {
    fn default() -> Self {
        Self::from_config(&EvalConfig::default())
    }
}

impl RegressionComparator {
    pub fn new(tolerance: f64, min_impact_score: f64) -> Self {
        Self::from_config(&EvalConfig {
            regression: RegressionConfig {
                tolerance,
                min_impact_score,
                ..Default::default()
            },
            ..Default::default()
        })
    }

    pub fn from_config(config: &EvalConfig) -> Self {
        Self {
            config: config.regression.clone(),
            analyzer: StructuralAnalyzer::new(config.analyzer.clone()),
        }
    }

    pub fn config(&self) -> &RegressionConfig {
        &self.config
    }

    /// Entities keyed by id
    pub fn compare_entities(
        &self,
        baseline: &[Entity],
        current: &[Entity],
    ) -> Vec<RegressionChange> {
        diff(baseline, current, ItemType::Entity, |e| e.id.clone(), entity_impact)
    }

    /// Relationships keyed by `"src->tgt:keywords"`
    pub fn compare_relationships(
        &self,
        baseline: &[Relationship],
        current: &[Relationship],
    ) -> Vec<RegressionChange> {
        diff(baseline, current, ItemType::Relationship, Relationship::key, relationship_impact)
    }

    /// `max(0, 1 - (1.5 removed + 1.0 added + 0.8 modified) / 10)` over
    /// summed impact scores
    pub fn calculate_stability_score(&self, changes: &[RegressionChange]) -> f64 {
        let penalty: f64 = changes
            .iter()
            .map(|change| {
                let weight = match change.change_type {
                    ChangeType::Removed => REMOVED_PENALTY_WEIGHT,
                    ChangeType::Added => ADDED_PENALTY_WEIGHT,
                    ChangeType::Modified => MODIFIED_PENALTY_WEIGHT,
                };
                weight * change.impact_score
            })
            .sum();

        (1.0 - penalty / STABILITY_PENALTY_DIVISOR).clamp(0.0, 1.0)
    }

    pub fn compare_extraction_results(
        &self,
        baseline: &ExtractionResult,
        current: &ExtractionResult,
        baseline_label: &str,
        current_label: &str,
    ) -> RegressionSummary {
        let entity_changes = self.compare_entities(&baseline.entities, &current.entities);
        let relationship_changes =
            self.compare_relationships(&baseline.relationships, &current.relationships);

        let baseline_metrics = self.analyzer.analyze(&baseline.entities, &baseline.relationships);
        let current_metrics = self.analyzer.analyze(&current.entities, &current.relationships);
        let structure = self
            .analyzer
            .compare_structures(&baseline_metrics, &current_metrics, self.config.tolerance);

        let mut changes = entity_changes;
        changes.extend(relationship_changes);
        let overall_stability_score = self.calculate_stability_score(&changes);

        let entity_counts = (baseline.entity_count(), current.entity_count());
        let relationship_counts = (baseline.relationship_count(), current.relationship_count());

        let regression_detected = overall_stability_score < 1.0 - self.config.tolerance;
        let improvement_detected = !regression_detected
            && entity_counts.1 > entity_counts.0
            && relationship_counts.1 > relationship_counts.0
            && overall_stability_score > IMPROVEMENT_STABILITY_THRESHOLD;

        let mut significant_changes: Vec<RegressionChange> = changes
            .iter()
            .filter(|change| change.impact_score >= self.config.min_impact_score)
            .cloned()
            .collect();
        significant_changes.sort_by(|a, b| b.impact_score.total_cmp(&a.impact_score));

        let mut summary = RegressionSummary {
            baseline_label: baseline_label.to_string(),
            current_label: current_label.to_string(),
            entities_added: count_of(&changes, ItemType::Entity, ChangeType::Added),
            entities_removed: count_of(&changes, ItemType::Entity, ChangeType::Removed),
            entities_modified: count_of(&changes, ItemType::Entity, ChangeType::Modified),
            relationships_added: count_of(&changes, ItemType::Relationship, ChangeType::Added),
            relationships_removed: count_of(&changes, ItemType::Relationship, ChangeType::Removed),
            relationships_modified: count_of(
                &changes,
                ItemType::Relationship,
                ChangeType::Modified,
            ),
            baseline_entity_count: entity_counts.0,
            current_entity_count: entity_counts.1,
            baseline_relationship_count: relationship_counts.0,
            current_relationship_count: relationship_counts.1,
            density_change: current_metrics.density - baseline_metrics.density,
            structure,
            significant_changes,
            overall_stability_score,
            regression_detected,
            improvement_detected,
            neutral_change: !regression_detected && !improvement_detected,
            recommendations: Vec::new(),
            timestamp: Utc::now(),
        };
        summary.recommendations = self.recommendations(&summary, &changes);

        if regression_detected {
            warn!(
                baseline = baseline_label,
                current = current_label,
                stability = overall_stability_score,
                changes = changes.len(),
                "Regression detected"
            );
        } else {
            info!(
                baseline = baseline_label,
                current = current_label,
                stability = overall_stability_score,
                improvement = improvement_detected,
                "Compared extraction results"
            );
        }

        summary
    }

    /// Pairwise summaries of consecutive snapshots in a version history
    pub fn compare_series<S: AsRef<str>>(
        &self,
        snapshots: &[(S, ExtractionResult)],
    ) -> Vec<RegressionSummary> {
        snapshots
            .windows(2)
            .map(|pair| {
                let (baseline_label, baseline) = &pair[0];
                let (current_label, current) = &pair[1];
                self.compare_extraction_results(
                    baseline,
                    current,
                    baseline_label.as_ref(),
                    current_label.as_ref(),
                )
            })
            .collect()
    }

    fn recommendations(
        &self,
        summary: &RegressionSummary,
        changes: &[RegressionChange],
    ) -> Vec<String> {
        let mut recommendations = Vec::new();

        let total = summary.total_changes();
        if total > self.config.high_change_volume {
            recommendations.push(format!(
                "High change volume: {total} changes between {} and {}; \
                     check the extraction pipeline for instability",
                summary.baseline_label, summary.current_label
            ));
        }

        let removed = count(changes, ChangeType::Removed);
        if removed > 0 {
            recommendations.push(format!(
                "{} entities and {} relationships were removed; confirm the removals are intended",
                summary.entities_removed, summary.relationships_removed
            ));
        }

        if summary.density_change.abs() > self.config.density_swing_threshold {
            recommendations.push(format!(
                "Graph density changed by {:+.3}; review relationship extraction",
                summary.density_change
            ));
        }

        let high_impact: Vec<&RegressionChange> = changes
            .iter()
            .filter(|change| change.impact_score >= HIGH_IMPACT_THRESHOLD)
            .collect();
        if let Some(first) = high_impact.first() {
            recommendations.push(format!(
                "{} high-impact changes, e.g. {} {} '{}'",
                high_impact.len(),
                first.change_type,
                first.item_type,
                first.item_id
            ));
        }

        if recommendations.is_empty() {
            recommendations.push(NO_ISSUES.to_string());
        }
        recommendations
    }
}

fn count_of(changes: &[RegressionChange], item_type: ItemType, change_type: ChangeType) -> usize {
    changes
        .iter()
        .filter(|c| c.item_type == item_type && c.change_type == change_type)
        .count()
}
