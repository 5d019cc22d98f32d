//! Heuristic importance weights for regression changes.
//!
//! These are calibration constants, not derived values. Tune them here.

use extract::{Entity, Relationship};

/// Base impact per entity type (matched case-insensitively)
pub const ENTITY_TYPE_WEIGHTS: [(&str, f64); 6] = [
    ("organization", 0.9),
    ("person", 0.8),
    ("event", 0.7),
    ("location", 0.7),
    ("concept", 0.6),
    ("theory", 0.5),
];
pub const DEFAULT_ENTITY_WEIGHT: f64 = 0.5;

pub const PROPERTY_BONUS: f64 = 0.1;
pub const ENTITY_PROPERTY_BONUS_CAP: f64 = 0.3;
pub const RELATIONSHIP_PROPERTY_BONUS_CAP: f64 = 0.2;

pub const IMPORTANT_RELATIONSHIP_KEYWORDS: [&str; 11] = [
    "founded",
    "created",
    "developed",
    "discovered",
    "leads",
    "manages",
    "controls",
    "owns",
    "acquired",
    "merged",
    "partnered",
];
pub const IMPORTANT_RELATIONSHIP_WEIGHT: f64 = 0.8;
pub const DEFAULT_RELATIONSHIP_WEIGHT: f64 = 0.5;

pub const REMOVED_PENALTY_WEIGHT: f64 = 1.5;
pub const ADDED_PENALTY_WEIGHT: f64 = 1.0;
pub const MODIFIED_PENALTY_WEIGHT: f64 = 0.8;
/// Changes at or above this impact are called out in recommendations
pub const HIGH_IMPACT_THRESHOLD: f64 = 0.8;

/// Fixed normalization of the weighted penalty; independent of graph size
pub const STABILITY_PENALTY_DIVISOR: f64 = 10.0;

fn property_bonus(count: usize, cap: f64) -> f64 {
    (PROPERTY_BONUS * count as f64).min(cap)
}

pub fn entity_impact(entity: &Entity) -> f64 {
    let entity_type = entity.entity_type.trim().to_lowercase();
    let base = ENTITY_TYPE_WEIGHTS
        .iter()
        .find(|(name, _)| *name == entity_type)
        .map_or(DEFAULT_ENTITY_WEIGHT, |(_, weight)| *weight);

    (base + property_bonus(entity.properties.len(), ENTITY_PROPERTY_BONUS_CAP)).clamp(0.0, 1.0)
}

pub fn relationship_impact(relationship: &Relationship) -> f64 {
    let keywords = relationship.keywords.as_text().to_lowercase();
    let base = if IMPORTANT_RELATIONSHIP_KEYWORDS
        .iter()
        .any(|keyword| keywords.contains(keyword))
    {
        IMPORTANT_RELATIONSHIP_WEIGHT
    } else {
        DEFAULT_RELATIONSHIP_WEIGHT
    };

    let bonus = property_bonus(relationship.properties.len(), RELATIONSHIP_PROPERTY_BONUS_CAP);
    (base + bonus).clamp(0.0, 1.0)
}
