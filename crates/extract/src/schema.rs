use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Open-ended metadata attached to entities and relationships.
pub type Properties = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(rename = "type", default)]
    pub entity_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub properties: Properties,
}

impl Entity {
    pub fn new(id: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity_type: entity_type.into(),
            description: String::new(),
            properties: Properties::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

/// Relationship keywords as produced upstream: either one comma separated
/// string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Keywords {
    List(Vec<String>),
    Text(String),
}

impl Default for Keywords {
    fn default() -> Self {
        Keywords::Text(String::new())
    }
}

impl Keywords {
    /// Flat text form, used for identity keys and substring checks
    pub fn as_text(&self) -> String {
        match self {
            Keywords::Text(text) => text.clone(),
            Keywords::List(items) => items.join(", "),
        }
    }

    /// Individual keywords, splitting the text form on commas
    pub fn terms(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            Keywords::Text(text) => text.split(',').collect(),
            Keywords::List(items) => items.iter().map(String::as_str).collect(),
        };

        raw.into_iter()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.terms().is_empty()
    }

    /// Case-insensitive substring check against any of `expected`.
    /// An empty `expected` list always matches.
    pub fn contains_any(&self, expected: &[String]) -> bool {
        let haystack = self.as_text().to_lowercase();
        let mut needles = expected
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .peekable();

        if needles.peek().is_none() {
            return true;
        }
        needles.any(|needle| haystack.contains(&needle))
    }
}

impl From<&str> for Keywords {
    fn from(text: &str) -> Self {
        Keywords::Text(text.to_string())
    }
}

impl From<Vec<String>> for Keywords {
    fn from(items: Vec<String>) -> Self {
        Keywords::List(items)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub source_id: String,
    pub target_id: String,
    #[serde(default)]
    pub keywords: Keywords,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub properties: Properties,
}

impl Relationship {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        keywords: impl Into<Keywords>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            keywords: keywords.into(),
            description: String::new(),
            properties: Properties::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Identity used when diffing snapshots: `"src->tgt:keywords"`
    pub fn key(&self) -> String {
        format!("{}->{}:{}", self.source_id, self.target_id, self.keywords.as_text())
    }
}

/// One extraction snapshot: the unit validated against a gold case or
/// compared against another snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

pub type Snapshot = ExtractionResult;

impl ExtractionResult {
    pub fn new(entities: Vec<Entity>, relationships: Vec<Relationship>) -> Self {
        Self {
            entities,
            relationships,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse extraction result")
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relationships.is_empty()
    }
}
