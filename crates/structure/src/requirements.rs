use extract::StructuralChecks;
use std::collections::{BTreeMap, BTreeSet};

use crate::analyzer::StructuralAnalyzer;
use crate::metrics::{StructuralMetrics, StructureComparison};

/// Stability lost per significant structural change
const STABILITY_PENALTY_PER_CHANGE: f64 = 0.1;

/// `|delta| / |baseline|`, treating any change from zero as a full change
fn relative_change(baseline: f64, current: f64) -> f64 {
    let delta = (current - baseline).abs();
    if baseline.abs() < f64::EPSILON {
        if delta < f64::EPSILON { 0.0 } else { 1.0 }
    } else {
        delta / baseline.abs()
    }
}

impl StructuralAnalyzer {
    /// Check metrics against structural requirements. Every applicable check
    /// runs, so all violations are reported together.
    pub fn validate_structure_requirements(
        &self,
        metrics: &StructuralMetrics,
        checks: &StructuralChecks,
    ) -> (bool, Vec<String>) {
        let mut issues = Vec::new();

        if metrics.node_count < checks.min_entities {
            issues.push(format!(
                "Too few entities: {} found, at least {} required",
                metrics.node_count, checks.min_entities
            ));
        }

        if metrics.edge_count < checks.min_relationships {
            issues.push(format!(
                "Too few relationships: {} found, at least {} required",
                metrics.edge_count, checks.min_relationships
            ));
        }

        if checks.graph_connectivity && !metrics.is_connected {
            issues.push(format!(
                "Graph is not connected: {} components",
                metrics.connected_components
            ));
        }

        if let (Some(max), Some(diameter)) = (checks.max_path_length, metrics.diameter) {
            if diameter > max {
                issues.push(format!(
                    "Longest shortest path is {diameter}, maximum allowed is {max}"
                ));
            }
        }

        if let Some(min_density) = checks.min_density {
            if metrics.density < min_density {
                issues.push(format!(
                    "Graph density {:.3} is below the required {:.3}",
                    metrics.density, min_density
                ));
            }
        }

        if checks.allow_isolated_nodes == Some(false) && !metrics.isolated_nodes.is_empty() {
            issues.push(format!(
                "Found {} isolated entities: {}",
                metrics.isolated_nodes.len(),
                metrics.isolated_nodes.join(", ")
            ));
        }

        (issues.is_empty(), issues)
    }

    /// Deltas between two analyses. `significant_changes` keeps only the
    /// metrics whose relative change exceeds `tolerance`.
    pub fn compare_structures(
        &self,
        baseline: &StructuralMetrics,
        current: &StructuralMetrics,
        tolerance: f64,
    ) -> StructureComparison {
        let baseline_isolated: BTreeSet<&String> = baseline.isolated_nodes.iter().collect();
        let current_isolated: BTreeSet<&String> = current.isolated_nodes.iter().collect();
        let connectivity_changed = baseline.is_connected != current.is_connected;

        let relative = [
            ("node_count", relative_change(baseline.node_count as f64, current.node_count as f64)),
            ("edge_count", relative_change(baseline.edge_count as f64, current.edge_count as f64)),
            ("density", relative_change(baseline.density, current.density)),
            (
                "connected_components",
                relative_change(
                    baseline.connected_components as f64,
                    current.connected_components as f64,
                ),
            ),
            ("connectivity", if connectivity_changed { 1.0 } else { 0.0 }),
        ];

        let significant_changes: BTreeMap<String, f64> = relative
            .into_iter()
            .filter(|(_, change)| *change > tolerance)
            .map(|(name, change)| (name.to_string(), change))
            .collect();

        let stability_score =
            (1.0 - STABILITY_PENALTY_PER_CHANGE * significant_changes.len() as f64).max(0.0);

        StructureComparison {
            node_count_change: current.node_count as i64 - baseline.node_count as i64,
            edge_count_change: current.edge_count as i64 - baseline.edge_count as i64,
            density_change: current.density - baseline.density,
            connectivity_changed,
            component_change: current.connected_components as i64
                - baseline.connected_components as i64,
            new_isolated_nodes: current_isolated
                .difference(&baseline_isolated)
                .map(|id| id.to_string())
                .collect(),
            resolved_isolated_nodes: baseline_isolated
                .difference(&current_isolated)
                .map(|id| id.to_string())
                .collect(),
            significant_changes,
            stability_score,
        }
    }
}
