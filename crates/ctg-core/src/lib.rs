//! CTG Core - Cardiotocography Risk Analysis
//!
//! Pure Rust analysis of fetal heart rate (FHR) and uterine contraction (UC)
//! recordings. Every series carries its own sampling rate (1 Hz by default).
//!
//! # Features
//!
//! - Baseline, variability, acceleration and deceleration metrics
//! - FIGO/NICE and NICHD/ACOG classification with history risk escalation
//! - Heuristic outcome predictor (stand-in for a trained model)
//! - Sliding-window hypoxia risk series
//! - 15/30/60 minute forecasts merging all of the above
//!
//! # Example
//!
//! ```rust
//! use ctg_core::{AnalysisConfig, AnalysisInput, CtgAnalyzer, RiskFactorSet, TimeSeries};
//!
//! let fhr: Vec<f64> = (0..300).map(|i| if i % 2 == 0 { 137.0 } else { 153.0 }).collect();
//! let uc = vec![10.0; 300];
//!
//! let input = AnalysisInput::new(
//!     TimeSeries::fhr_from_values(&fhr).unwrap(),
//!     TimeSeries::uc_from_values(&uc).unwrap(),
//!     RiskFactorSet::none(),
//! );
//!
//! let analyzer = CtgAnalyzer::new(AnalysisConfig::default()).unwrap();
//! let result = analyzer.analyze(&input).unwrap();
//!
//! println!("Baseline: {:.1} bpm", result.metrics.baseline_bpm);
//! for forecast in &result.forecasts {
//!     println!("{}: {:?}", forecast.horizon, forecast.status);
//! }
//! ```

pub mod signal;
pub mod variability;
pub mod risk;
pub mod figo;
pub mod nichd;
pub mod predictor;
pub mod hypoxia;
pub mod forecast;
pub mod analysis;
pub mod config;
pub mod record;
pub mod batch;

#[cfg(feature = "simulator")]
pub mod simulator;

// Re-export commonly used types for convenience
pub use analysis::{
    AnalysisInput, AnalysisResult, AnalysisStatistics, BaselineMetrics, Classifier,
    ClassifierOutcome, CtgAnalyzer, RhythmStatus,
};
pub use batch::{BatchAnalyzer, BatchConfig, BatchResult};
pub use config::{AnalysisConfig, HypoxiaConfig, Locale};
pub use figo::FigoClassifier;
pub use forecast::{ForecastHorizon, ForecastStatus, Horizon};
pub use hypoxia::{HypoxiaEstimator, HypoxiaLevel, HypoxiaPoint};
pub use nichd::NichdClassifier;
pub use predictor::{HeuristicPredictor, OutcomePrediction};
pub use record::SessionRecord;
pub use risk::{ClassificationResult, RiskFactor, RiskFactorSet, Severity, Standard};
pub use variability::VariabilityClass;

#[cfg(feature = "simulator")]
pub use simulator::{SimulatedChunk, SimulatorConfig, StreamSimulator};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Nominal CTG sampling rate assumed when a caller does not supply one
pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 1.0;

/// Default gestational age in weeks
pub const DEFAULT_GESTATIONAL_AGE_WEEKS: u32 = 37;

/// Which physiological channel a series carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// Fetal heart rate, beats per minute
    Fhr,
    /// Uterine contraction / tonus
    Uc,
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Fhr => write!(f, "FHR"),
            Signal::Uc => write!(f, "UC"),
        }
    }
}

/// A single timestamped measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds from recording start
    pub time: f64,
    pub value: f64,
}

impl Sample {
    pub fn new(time: f64, value: f64) -> Self {
        Sample { time, value }
    }
}

/// An ordered, validated time series with an explicit sampling rate
///
/// Timestamps are strictly increasing and every timestamp and value is
/// finite. Uniform spacing is assumed, not checked: every window length in
/// the crate is converted from seconds to samples through `sample_rate_hz`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    signal: Signal,
    times: Vec<f64>,
    values: Vec<f64>,
    sample_rate_hz: f64,
}

impl TimeSeries {
    /// Build a series from samples, validating ordering and finiteness
    pub fn new(signal: Signal, samples: Vec<Sample>, sample_rate_hz: f64) -> Result<Self> {
        if !sample_rate_hz.is_finite() || sample_rate_hz <= 0.0 {
            return Err(CtgError::InvalidSampleRate(sample_rate_hz));
        }

        let mut times = Vec::with_capacity(samples.len());
        let mut values = Vec::with_capacity(samples.len());

        for (index, sample) in samples.iter().enumerate() {
            if !sample.time.is_finite() || !sample.value.is_finite() {
                return Err(CtgError::NonFiniteValue { signal, index });
            }
            if let Some(&previous) = times.last() {
                if sample.time <= previous {
                    return Err(CtgError::NonIncreasingTimestamp { signal, index });
                }
            }
            times.push(sample.time);
            values.push(sample.value);
        }

        Ok(TimeSeries { signal, times, values, sample_rate_hz })
    }

    /// Build a series from bare values, stamping sample `i` at `i / rate`
    pub fn from_values(signal: Signal, values: &[f64], sample_rate_hz: f64) -> Result<Self> {
        let samples = values
            .iter()
            .enumerate()
            .map(|(i, &v)| Sample::new(i as f64 / sample_rate_hz, v))
            .collect();
        Self::new(signal, samples, sample_rate_hz)
    }

    /// Convenience constructor for a 1 Hz FHR trace
    pub fn fhr_from_values(values: &[f64]) -> Result<Self> {
        Self::from_values(Signal::Fhr, values, DEFAULT_SAMPLE_RATE_HZ)
    }

    /// Convenience constructor for a 1 Hz UC trace
    pub fn uc_from_values(values: &[f64]) -> Result<Self> {
        Self::from_values(Signal::Uc, values, DEFAULT_SAMPLE_RATE_HZ)
    }

    pub fn signal(&self) -> Signal {
        self.signal
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over the series as samples
    pub fn samples(&self) -> impl Iterator<Item = Sample> + '_ {
        self.times
            .iter()
            .zip(self.values.iter())
            .map(|(&time, &value)| Sample { time, value })
    }

    /// Number of samples spanning `seconds` at this series' rate (at least 1)
    pub fn samples_for(&self, seconds: f64) -> usize {
        samples_for(seconds, self.sample_rate_hz)
    }
}

/// Convert a duration to a sample count at the given rate (at least 1)
pub fn samples_for(seconds: f64, sample_rate_hz: f64) -> usize {
    let n = (seconds * sample_rate_hz).round();
    if n.is_finite() && n >= 1.0 {
        n as usize
    } else {
        1
    }
}

/// A 32-byte seed for reproducible signal simulation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seed(pub [u8; 32]);

impl Seed {
    /// Create a seed from a string (hashed to 32 bytes)
    pub fn from_string(s: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(s.as_bytes());
        let result = hasher.finalize();
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&result);
        Seed(seed)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Default for Seed {
    fn default() -> Self {
        Seed([0u8; 32])
    }
}

/// Errors that can occur while validating input or assembling a result
#[derive(Debug, thiserror::Error)]
pub enum CtgError {
    /// A required series has no samples
    #[error("{signal} series is empty")]
    EmptySeries { signal: Signal },
    /// Timestamps must be strictly increasing
    #[error("{signal} timestamp at index {index} does not increase")]
    NonIncreasingTimestamp { signal: Signal, index: usize },
    /// NaN or infinite timestamp/value
    #[error("{signal} sample at index {index} is not finite")]
    NonFiniteValue { signal: Signal, index: usize },
    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(f64),
    /// Risk factor document is not an object of booleans
    #[error("malformed risk factors: {0}")]
    MalformedRiskFactors(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A classifier could not evaluate the metrics it was given
    #[error("{standard} classification failed: {reason}")]
    DegenerateMetrics { standard: Standard, reason: String },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type used across the crate
pub type Result<T> = std::result::Result<T, CtgError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_from_string() {
        let seed1 = Seed::from_string("ward-3");
        let seed2 = Seed::from_string("ward-3");
        let seed3 = Seed::from_string("ward-4");

        assert_eq!(seed1, seed2);
        assert_ne!(seed1, seed3);
    }

    #[test]
    fn test_series_rejects_non_increasing_time() {
        let samples = vec![Sample::new(0.0, 140.0), Sample::new(1.0, 141.0), Sample::new(1.0, 142.0)];
        let err = TimeSeries::new(Signal::Fhr, samples, 1.0).unwrap_err();
        assert!(matches!(err, CtgError::NonIncreasingTimestamp { signal: Signal::Fhr, index: 2 }));
    }

    #[test]
    fn test_series_rejects_nan() {
        let err = TimeSeries::from_values(Signal::Uc, &[10.0, f64::NAN], 1.0).unwrap_err();
        assert!(matches!(err, CtgError::NonFiniteValue { signal: Signal::Uc, index: 1 }));
    }

    #[test]
    fn test_series_rejects_bad_rate() {
        assert!(matches!(
            TimeSeries::from_values(Signal::Fhr, &[140.0], 0.0),
            Err(CtgError::InvalidSampleRate(_))
        ));
    }

    #[test]
    fn test_samples_for_rate() {
        let series = TimeSeries::from_values(Signal::Fhr, &[140.0; 10], 4.0).unwrap();
        assert_eq!(series.samples_for(15.0), 60);
        assert_eq!(series.times()[4], 1.0);
        assert_eq!(samples_for(0.0, 1.0), 1);
    }
}
