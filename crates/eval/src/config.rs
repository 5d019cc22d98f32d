use anyhow::Context;
use extract::DEFAULT_TOLERANCE;
use serde::{Deserialize, Serialize};
use std::path::Path;
use structure::AnalyzerConfig;

use crate::error::{EvalError, Result};

/// Settings for gold-standard validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Token-overlap threshold for fuzzy matching, and the pass threshold
    /// for `overall_score`
    pub tolerance: f64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// Settings for snapshot regression analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionConfig {
    /// A regression is flagged when stability drops below `1 - tolerance`
    pub tolerance: f64,
    /// Changes below this impact are left out of `significant_changes`
    pub min_impact_score: f64,
    /// Total change count that triggers a "high change volume" recommendation
    pub high_change_volume: usize,
    /// Absolute density change that triggers a density recommendation
    pub density_swing_threshold: f64,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.1,
            min_impact_score: 0.1,
            high_change_volume: 10,
            density_swing_threshold: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Upper bound on validation or comparison calls running at once
    pub max_concurrent: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { max_concurrent: 4 }
    }
}

/// Top-level configuration, loadable from TOML. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    pub validator: ValidatorConfig,
    pub regression: RegressionConfig,
    pub analyzer: AnalyzerConfig,
    pub batch: BatchConfig,
}

impl EvalConfig {
    /// Tighter matching and a lower regression budget
    pub fn strict() -> Self {
        Self {
            validator: ValidatorConfig { tolerance: 0.9 },
            regression: RegressionConfig {
                tolerance: 0.05,
                min_impact_score: 0.0,
                high_change_volume: 5,
                density_swing_threshold: 0.05,
            },
            ..Default::default()
        }
    }

    /// Looser matching for noisy extractors
    pub fn lenient() -> Self {
        Self {
            validator: ValidatorConfig { tolerance: 0.6 },
            regression: RegressionConfig {
                tolerance: 0.2,
                min_impact_score: 0.3,
                high_change_volume: 25,
                density_swing_threshold: 0.2,
            },
            ..Default::default()
        }
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse eval config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize eval config")
    }

    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, value: f64| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(EvalError::InvalidConfig(format!("{name} must be in [0, 1], got {value}")))
            }
        };

        unit("validator.tolerance", self.validator.tolerance)?;
        unit("regression.tolerance", self.regression.tolerance)?;
        unit("regression.min_impact_score", self.regression.min_impact_score)?;

        if self.regression.density_swing_threshold < 0.0 {
            return Err(EvalError::InvalidConfig(
                "regression.density_swing_threshold must not be negative".to_string(),
            ));
        }
        if self.batch.max_concurrent == 0 {
            return Err(EvalError::InvalidConfig(
                "batch.max_concurrent must be greater than 0".to_string(),
            ));
        }

        self.analyzer.validate().map_err(EvalError::InvalidConfig)
    }
}
