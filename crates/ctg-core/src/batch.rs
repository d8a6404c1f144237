//! Batch Analysis API
//!
//! Analyses many independent sessions with one shared analyzer. Sessions
//! run on the rayon pool when the `parallel` feature is enabled; output
//! order always follows input order.
//!
//! # Example
//!
//! ```rust
//! use ctg_core::batch::{BatchAnalyzer, BatchConfig};
//! use ctg_core::{AnalysisConfig, AnalysisInput, CtgAnalyzer, RiskFactorSet, TimeSeries};
//!
//! let input = AnalysisInput::new(
//!     TimeSeries::fhr_from_values(&[140.0; 180]).unwrap(),
//!     TimeSeries::uc_from_values(&[10.0; 180]).unwrap(),
//!     RiskFactorSet::none(),
//! );
//!
//! let analyzer = CtgAnalyzer::new(AnalysisConfig::default()).unwrap();
//! let batch = BatchAnalyzer::new(analyzer, BatchConfig::default().with_skip_invalid(true));
//!
//! let result = batch.analyze(&[input.clone(), input]).unwrap();
//! assert_eq!(result.success_count(), 2);
//! ```

use crate::analysis::{AnalysisInput, AnalysisResult, CtgAnalyzer};
use crate::{CtgError, Result};
use tracing::info;

/// Configuration for batch analysis
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Enable parallel processing
    pub parallel: bool,
    /// Record failing sessions and keep going instead of erroring
    pub skip_invalid: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            parallel: true,
            skip_invalid: false,
        }
    }
}

impl BatchConfig {
    /// Enable/disable parallel processing
    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    /// Skip invalid sessions
    pub fn with_skip_invalid(mut self, skip: bool) -> Self {
        self.skip_invalid = skip;
        self
    }
}

/// A successful session with its input position
#[derive(Clone, Debug)]
pub struct IndexedResult {
    pub index: usize,
    pub result: AnalysisResult,
}

/// A skipped session with the reason it failed
#[derive(Debug)]
pub struct BatchFailure {
    pub index: usize,
    pub error: CtgError,
}

/// Result from batch analysis
#[derive(Debug)]
pub struct BatchResult {
    /// Successful sessions in input order
    pub items: Vec<IndexedResult>,
    pub failures: Vec<BatchFailure>,
    pub stats: BatchStats,
}

impl BatchResult {
    pub fn success_count(&self) -> usize {
        self.items.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    pub fn total_count(&self) -> usize {
        self.items.len() + self.failures.len()
    }

    pub fn failed_indices(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.index).collect()
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_count() == 0 {
            0.0
        } else {
            self.items.len() as f64 / self.total_count() as f64
        }
    }
}

/// Statistics from batch processing
#[derive(Clone, Debug, Default)]
pub struct BatchStats {
    /// Total processing time in milliseconds
    pub processing_time_ms: u64,
    /// Average time per session in microseconds
    pub avg_session_time_us: f64,
    /// Whether the rayon pool was used
    pub parallel: bool,
}

/// Batch analyzer over independent sessions
pub struct BatchAnalyzer {
    analyzer: CtgAnalyzer,
    config: BatchConfig,
}

impl BatchAnalyzer {
    pub fn new(analyzer: CtgAnalyzer, config: BatchConfig) -> Self {
        BatchAnalyzer { analyzer, config }
    }

    pub fn analyzer(&self) -> &CtgAnalyzer {
        &self.analyzer
    }

    /// Analyse every session
    ///
    /// Without `skip_invalid` the first failing session (by input order)
    /// aborts the batch with its error.
    pub fn analyze(&self, inputs: &[AnalysisInput]) -> Result<BatchResult> {
        let start_time = std::time::Instant::now();

        let (outcomes, parallel) = if self.config.parallel {
            self.analyze_parallel(inputs)
        } else {
            (self.analyze_sequential(inputs), false)
        };

        let mut items = Vec::with_capacity(inputs.len());
        let mut failures = Vec::new();

        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(result) => items.push(IndexedResult { index, result }),
                Err(error) if self.config.skip_invalid => failures.push(BatchFailure { index, error }),
                Err(error) => return Err(error),
            }
        }

        let elapsed = start_time.elapsed();
        let stats = BatchStats {
            processing_time_ms: elapsed.as_millis() as u64,
            avg_session_time_us: if inputs.is_empty() {
                0.0
            } else {
                elapsed.as_micros() as f64 / inputs.len() as f64
            },
            parallel,
        };

        info!(
            sessions = inputs.len(),
            failed = failures.len(),
            elapsed_ms = stats.processing_time_ms,
            "batch analysis complete"
        );

        Ok(BatchResult { items, failures, stats })
    }

    #[cfg(feature = "parallel")]
    fn analyze_parallel(&self, inputs: &[AnalysisInput]) -> (Vec<Result<AnalysisResult>>, bool) {
        use rayon::prelude::*;

        let outcomes = inputs.par_iter().map(|input| self.analyzer.analyze(input)).collect();
        (outcomes, true)
    }

    /// Fallback when parallel feature is disabled
    #[cfg(not(feature = "parallel"))]
    fn analyze_parallel(&self, inputs: &[AnalysisInput]) -> (Vec<Result<AnalysisResult>>, bool) {
        (self.analyze_sequential(inputs), false)
    }

    fn analyze_sequential(&self, inputs: &[AnalysisInput]) -> Vec<Result<AnalysisResult>> {
        inputs.iter().map(|input| self.analyzer.analyze(input)).collect()
    }
}
