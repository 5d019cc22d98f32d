use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::schema::Keywords;

/// A curated expectation for one source text. Storage and lifecycle of these
/// cases live outside this crate; they are read-only input here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoldStandardCase {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub expected_entities: Vec<ExpectedEntity>,
    #[serde(default)]
    pub expected_relationships: Vec<ExpectedRelationship>,
    #[serde(default)]
    pub structural_checks: StructuralChecks,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedEntity {
    pub name: String,
    #[serde(rename = "type", default)]
    pub entity_type: String,
}

impl ExpectedEntity {
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedRelationship {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub keywords: Keywords,
}

impl ExpectedRelationship {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        keywords: impl Into<Keywords>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            keywords: keywords.into(),
        }
    }

    pub fn label(&self) -> String {
        format!("{} -> {}", self.source, self.target)
    }
}

/// Structural requirements a valid extraction graph must meet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuralChecks {
    #[serde(default)]
    pub min_entities: usize,
    #[serde(default)]
    pub min_relationships: usize,
    #[serde(default)]
    pub graph_connectivity: bool,
    #[serde(default)]
    pub max_path_length: Option<usize>,
    #[serde(default)]
    pub min_density: Option<f64>,
    /// Unset means isolated nodes are tolerated
    #[serde(default)]
    pub allow_isolated_nodes: Option<bool>,
}

impl GoldStandardCase {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse gold standard case")
    }
}
