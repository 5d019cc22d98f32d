//! Extraction validation and regression analysis.
//!
//! `ExtractionValidator` scores an extraction against a gold-standard case
//! (fuzzy entity and relationship matching plus structural health), and
//! `RegressionComparator` diffs two snapshots into an impact-weighted
//! stability verdict. `BatchRunner` fans either out over many inputs.

pub mod batch;
pub mod comparator;
pub mod config;
pub mod error;
pub mod impact;
pub mod results;
pub mod validator;

pub use batch::{BatchReport, BatchRunner, BatchStats, ComparisonJob, ValidationJob};
pub use comparator::RegressionComparator;
pub use config::{BatchConfig, EvalConfig, RegressionConfig, ValidatorConfig};
pub use error::{EvalError, Result};
pub use results::{
    ChangeType, EntityMatchPair, EntityValidationResult, ItemType, NEW_VALUE, OLD_VALUE,
    RegressionChange, RegressionSummary, RelationshipMatchPair, RelationshipValidationResult,
    StructuralValidation, ValidationResult,
};
pub use validator::ExtractionValidator;
