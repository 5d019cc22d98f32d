use thiserror::Error;

#[derive(Debug, Error)]
pub enum StructureError {
    /// Caller asked for an algorithm this crate does not implement
    #[error("unsupported algorithm '{name}', expected one of: {supported}")]
    UnsupportedAlgorithm { name: String, supported: String },

    #[error("path computation failed: {0}")]
    PathComputation(String),

    #[error("{measure} did not converge after {iterations} iterations")]
    NonConvergence { measure: &'static str, iterations: usize },
}

pub type Result<T> = std::result::Result<T, StructureError>;
