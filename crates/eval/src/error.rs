use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Structure(#[from] structure::StructureError),

    /// A batch task panicked or was cancelled
    #[error("batch task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("batch scheduler closed: {0}")]
    Scheduler(#[from] tokio::sync::AcquireError),
}

pub type Result<T> = std::result::Result<T, EvalError>;
