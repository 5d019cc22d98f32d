use extract::{ExtractionResult, GoldStandardCase};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::info;

use crate::comparator::RegressionComparator;
use crate::config::EvalConfig;
use crate::error::Result;
use crate::results::{RegressionSummary, ValidationResult};
use crate::validator::ExtractionValidator;

/// One gold-standard validation to run
#[derive(Debug, Clone)]
pub struct ValidationJob {
    pub extraction: ExtractionResult,
    pub case: GoldStandardCase,
}

/// One baseline/current comparison to run
#[derive(Debug, Clone)]
pub struct ComparisonJob {
    pub baseline_label: String,
    pub baseline: ExtractionResult,
    pub current_label: String,
    pub current: ExtractionResult,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f64,
    pub mean_score: f64,
    pub p50_duration_secs: f64,
    pub p95_duration_secs: f64,
}

impl BatchStats {
    pub fn from_results(results: &[ValidationResult]) -> Self {
        if results.is_empty() {
            return Self::default();
        }

        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        let mut durations: Vec<f64> = results.iter().map(|r| r.duration_secs).collect();
        durations.sort_by(|a, b| a.total_cmp(b));

        Self {
            total,
            passed,
            failed: total - passed,
            pass_rate: passed as f64 / total as f64,
            mean_score: results.iter().map(|r| r.overall_score).sum::<f64>() / total as f64,
            p50_duration_secs: percentile(&durations, 50),
            p95_duration_secs: percentile(&durations, 95),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// In the same order as the submitted jobs
    pub results: Vec<ValidationResult>,
    pub stats: BatchStats,
}

/// Runs many validations or comparisons in parallel, one blocking task per
/// call, never more than `max_concurrent` at once.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    validator: Arc<ExtractionValidator>,
    comparator: Arc<RegressionComparator>,
    max_concurrent: usize,
}

impl BatchRunner {
    pub fn new(config: &EvalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            validator: Arc::new(ExtractionValidator::from_config(config)),
            comparator: Arc::new(RegressionComparator::from_config(config)),
            max_concurrent: config.batch.max_concurrent,
        })
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub async fn validate_cases(&self, jobs: Vec<ValidationJob>) -> Result<BatchReport> {
        info!(cases = jobs.len(), max_concurrent = self.max_concurrent, "Running validation batch");

        let validator = Arc::clone(&self.validator);
        let results = self
            .run(jobs, move |job: ValidationJob| {
                validator.validate_against_gold_standard(&job.extraction, &job.case)
            })
            .await?;

        let stats = BatchStats::from_results(&results);
        info!(
            total = stats.total,
            passed = stats.passed,
            pass_rate = stats.pass_rate,
            mean_score = stats.mean_score,
            p95_duration_secs = stats.p95_duration_secs,
            "Validation batch complete"
        );

        Ok(BatchReport { results, stats })
    }

    pub async fn compare_pairs(&self, jobs: Vec<ComparisonJob>) -> Result<Vec<RegressionSummary>> {
        info!(pairs = jobs.len(), max_concurrent = self.max_concurrent, "Running comparison batch");

        let comparator = Arc::clone(&self.comparator);
        let summaries = self
            .run(jobs, move |job: ComparisonJob| {
                comparator.compare_extraction_results(
                    &job.baseline,
                    &job.current,
                    &job.baseline_label,
                    &job.current_label,
                )
            })
            .await?;

        let regressions = summaries.iter().filter(|s| s.regression_detected).count();
        info!(pairs = summaries.len(), regressions, "Comparison batch complete");
        Ok(summaries)
    }

    async fn run<J, R, F>(&self, jobs: Vec<J>, work: F) -> Result<Vec<R>>
    where
        J: Send + 'static,
        R: Send + 'static,
        F: Fn(J) -> R + Send + Sync + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let work = Arc::new(work);
        let mut handles: Vec<JoinHandle<R>> = Vec::with_capacity(jobs.len());

        for job in jobs {
            let permit = Arc::clone(&semaphore).acquire_owned().await?;
            let work = Arc::clone(&work);
            handles.push(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                work(job)
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.await?);
        }
        Ok(results)
    }
}

/// Nearest-rank percentile of already sorted data; 0 for empty input
fn percentile(sorted_data: &[f64], p: usize) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }
    let index = (p as f64 / 100.0 * sorted_data.len() as f64) as usize;
    sorted_data[index.min(sorted_data.len() - 1)]
}
