use serde::{Deserialize, Serialize};

/// Caps and tolerances for the structural algorithms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// BFS sources used for path metrics on large components
    pub max_path_samples: usize,
    pub eigenvector_max_iter: usize,
    pub eigenvector_tolerance: f64,
    pub pagerank_damping: f64,
    pub pagerank_max_iter: usize,
    pub pagerank_tolerance: f64,
    /// Simple cycles reported before the search stops
    pub max_cycles: usize,
    pub community_max_iterations: usize,
    pub label_propagation_seed: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_path_samples: 100,
            eigenvector_max_iter: 100,
            eigenvector_tolerance: 1e-6,
            pagerank_damping: 0.85,
            pagerank_max_iter: 100,
            pagerank_tolerance: 1e-6,
            max_cycles: 10,
            community_max_iterations: 10,
            label_propagation_seed: 42,
        }
    }
}

impl AnalyzerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_path_samples == 0 {
            return Err("max_path_samples must be greater than 0".to_string());
        }
        if self.eigenvector_max_iter == 0 || self.pagerank_max_iter == 0 {
            return Err("centrality iteration caps must be greater than 0".to_string());
        }
        if !(0.0..1.0).contains(&self.pagerank_damping) {
            return Err("pagerank_damping must be in [0, 1)".to_string());
        }
        if self.eigenvector_tolerance <= 0.0 || self.pagerank_tolerance <= 0.0 {
            return Err("convergence tolerances must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AnalyzerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_damping() {
        let config = AnalyzerConfig {
            pagerank_damping: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
