//! Analysis orchestration
//!
//! `CtgAnalyzer` runs every stage over one validated recording: metrics,
//! the enabled classifiers, the predictor, the hypoxia estimator and finally
//! the forecast synthesizer. A classifier that fails is reported as
//! `ClassifierOutcome::Failed` and the rest of the analysis still completes.

use crate::config::AnalysisConfig;
use crate::figo::FigoClassifier;
use crate::forecast::{self, ForecastHorizon, ForecastStatus, Horizon};
use crate::hypoxia::{HypoxiaEstimator, HypoxiaPoint};
use crate::nichd::NichdClassifier;
use crate::predictor::{HeuristicPredictor, OutcomePrediction};
use crate::risk::{ActiveFactor, ClassificationResult, RiskFactorSet, Standard};
use crate::signal::{self, MIN_EVENT_SECS};
use crate::variability::{self, VariabilityClass, VariabilityIndex, LTV_WINDOW_SECS};
use crate::{CtgError, Result, Signal, TimeSeries};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// ============================================================================
// Metrics
// ============================================================================

/// Core trace metrics shared by every classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineMetrics {
    pub baseline_bpm: f64,
    /// Short-term variability
    pub variability_ms: f64,
    pub variability_class: VariabilityClass,
    pub acceleration_count: usize,
    pub deceleration_count: usize,
}

impl BaselineMetrics {
    pub fn new(baseline_bpm: f64, variability_ms: f64, acceleration_count: usize, deceleration_count: usize) -> Self {
        BaselineMetrics {
            baseline_bpm,
            variability_ms,
            variability_class: VariabilityClass::classify(variability_ms),
            acceleration_count,
            deceleration_count,
        }
    }

    /// Measure an FHR trace; event durations follow the series' sample rate
    pub fn compute(fhr: &TimeSeries, ga_weeks: u32) -> Self {
        let values = fhr.values();
        let baseline = signal::calc_baseline(values);
        let min_len = fhr.samples_for(MIN_EVENT_SECS);

        Self::new(
            baseline,
            variability::short_term_variability(values),
            signal::detect_accelerations(values, baseline, ga_weeks, min_len),
            signal::detect_decelerations(values, baseline, min_len),
        )
    }

    /// Reject metrics no rule set can grade
    pub fn ensure_finite(&self, standard: Standard) -> Result<()> {
        let reason = if !self.baseline_bpm.is_finite() {
            "baseline is not finite"
        } else if !self.variability_ms.is_finite() {
            "variability is not finite"
        } else {
            return Ok(());
        };

        Err(CtgError::DegenerateMetrics { standard, reason: reason.to_string() })
    }
}

/// Heart rhythm status from the baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RhythmStatus {
    Normal,
    Bradycardia,
    Tachycardia,
}

impl RhythmStatus {
    pub fn from_baseline(baseline_bpm: f64) -> Self {
        if baseline_bpm < 110.0 {
            RhythmStatus::Bradycardia
        } else if baseline_bpm > 160.0 {
            RhythmStatus::Tachycardia
        } else {
            RhythmStatus::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RhythmStatus::Normal => "normal",
            RhythmStatus::Bradycardia => "bradycardia",
            RhythmStatus::Tachycardia => "tachycardia",
        }
    }
}

// ============================================================================
// Classifiers
// ============================================================================

/// A clinical rule set that grades trace metrics
pub trait Classifier: Send + Sync {
    fn standard(&self) -> Standard;

    fn classify(&self, metrics: &BaselineMetrics, risk: &RiskFactorSet) -> Result<ClassificationResult>;
}

/// Result slot for one classifier in an analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClassifierOutcome {
    Classified(ClassificationResult),
    /// The classifier failed; the others still reported
    Failed { standard: Standard, reason: String },
}

impl ClassifierOutcome {
    pub fn standard(&self) -> Standard {
        match self {
            ClassifierOutcome::Classified(result) => result.standard,
            ClassifierOutcome::Failed { standard, .. } => *standard,
        }
    }

    pub fn classified(&self) -> Option<&ClassificationResult> {
        match self {
            ClassifierOutcome::Classified(result) => Some(result),
            ClassifierOutcome::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ClassifierOutcome::Failed { .. })
    }
}

// ============================================================================
// Input and result
// ============================================================================

/// One recording to analyse
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisInput {
    pub fhr: TimeSeries,
    pub uc: TimeSeries,
    pub risk_factors: RiskFactorSet,
}

impl AnalysisInput {
    pub fn new(fhr: TimeSeries, uc: TimeSeries, risk_factors: RiskFactorSet) -> Self {
        AnalysisInput { fhr, uc, risk_factors }
    }
}

/// Raw statistics snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisStatistics {
    pub baseline_fhr: f64,
    pub variability: f64,
    pub accelerations: usize,
    pub decelerations: usize,
    pub risk_score: u32,
    pub rhythm: RhythmStatus,
    pub variability_index: VariabilityIndex,
    pub active_factors: Vec<ActiveFactor>,
}

/// Everything produced by one analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub metrics: BaselineMetrics,
    pub rhythm: RhythmStatus,
    /// One entry per enabled classifier, FIGO/NICE first
    pub classifications: Vec<ClassifierOutcome>,
    pub prediction: Option<OutcomePrediction>,
    pub hypoxia_risk: Vec<HypoxiaPoint>,
    pub forecasts: Vec<ForecastHorizon>,
    pub statistics: AnalysisStatistics,
}

impl AnalysisResult {
    pub fn classification(&self, standard: Standard) -> Option<&ClassifierOutcome> {
        self.classifications.iter().find(|c| c.standard() == standard)
    }

    pub fn forecast(&self, horizon: Horizon) -> Option<&ForecastHorizon> {
        self.forecasts.iter().find(|f| f.horizon == horizon)
    }

    /// Worst status across all horizons
    pub fn worst_status(&self) -> ForecastStatus {
        self.forecasts
            .iter()
            .map(|f| f.status)
            .max()
            .unwrap_or(ForecastStatus::Normal)
    }

    /// Latest hypoxia risk, 0 when no window fit
    pub fn current_hypoxia_risk(&self) -> f64 {
        self.hypoxia_risk.last().map(|p| p.risk).unwrap_or(0.0)
    }
}

// ============================================================================
// Analyzer
// ============================================================================

/// Runs the full analysis pipeline; holds no mutable state
pub struct CtgAnalyzer {
    config: AnalysisConfig,
    classifiers: Vec<Box<dyn Classifier>>,
    predictor: HeuristicPredictor,
    hypoxia: HypoxiaEstimator,
}

impl CtgAnalyzer {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;

        let mut classifiers: Vec<Box<dyn Classifier>> = Vec::new();
        if config.use_figo {
            classifiers.push(Box::new(FigoClassifier));
        }
        if config.use_nichd {
            classifiers.push(Box::new(NichdClassifier));
        }

        Ok(CtgAnalyzer {
            config,
            classifiers,
            predictor: HeuristicPredictor::new(config.locale),
            hypoxia: HypoxiaEstimator::new(config.hypoxia),
        })
    }

    /// Replace the classifier for the same standard, or add it
    pub fn with_classifier(mut self, classifier: Box<dyn Classifier>) -> Self {
        let standard = classifier.standard();
        match self.classifiers.iter().position(|c| c.standard() == standard) {
            Some(slot) => self.classifiers[slot] = classifier,
            None => {
                let slot = self
                    .classifiers
                    .iter()
                    .position(|c| c.standard() > standard)
                    .unwrap_or(self.classifiers.len());
                self.classifiers.insert(slot, classifier);
            }
        }
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn analyze(&self, input: &AnalysisInput) -> Result<AnalysisResult> {
        if input.fhr.is_empty() {
            return Err(CtgError::EmptySeries { signal: Signal::Fhr });
        }
        if input.uc.is_empty() {
            return Err(CtgError::EmptySeries { signal: Signal::Uc });
        }

        let metrics = BaselineMetrics::compute(&input.fhr, self.config.gestational_age_weeks);
        let rhythm = RhythmStatus::from_baseline(metrics.baseline_bpm);
        debug!(
            baseline = metrics.baseline_bpm,
            variability = metrics.variability_ms,
            accelerations = metrics.acceleration_count,
            decelerations = metrics.deceleration_count,
            "computed trace metrics"
        );

        let classifications: Vec<ClassifierOutcome> = self
            .classifiers
            .iter()
            .map(|classifier| match classifier.classify(&metrics, &input.risk_factors) {
                Ok(result) => ClassifierOutcome::Classified(result),
                Err(e) => {
                    warn!(standard = %classifier.standard(), error = %e, "classifier failed");
                    ClassifierOutcome::Failed { standard: classifier.standard(), reason: e.to_string() }
                }
            })
            .collect();

        let prediction = self.config.use_predictor.then(|| {
            self.predictor
                .predict(input.fhr.values(), input.uc.values(), &input.risk_factors)
        });

        let hypoxia_risk = self.hypoxia.estimate(&input.fhr, &input.uc, metrics.variability_ms);
        debug!(windows = hypoxia_risk.len(), "estimated hypoxia risk");

        let forecasts = forecast::synthesize(&classifications, prediction.as_ref(), &hypoxia_risk, self.config.locale);

        let statistics = AnalysisStatistics {
            baseline_fhr: metrics.baseline_bpm,
            variability: metrics.variability_ms,
            accelerations: metrics.acceleration_count,
            decelerations: metrics.deceleration_count,
            risk_score: input.risk_factors.score(),
            rhythm,
            variability_index: VariabilityIndex::compute(input.fhr.values(), input.fhr.samples_for(LTV_WINDOW_SECS)),
            active_factors: input.risk_factors.active_factors(),
        };

        let result = AnalysisResult {
            metrics,
            rhythm,
            classifications,
            prediction,
            hypoxia_risk,
            forecasts,
            statistics,
        };

        info!(
            samples = input.fhr.len(),
            rhythm = rhythm.as_str(),
            status = result.worst_status().as_str(),
            "analysis complete"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::RiskFactor;

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn standard(&self) -> Standard {
            Standard::FigoNice
        }

        fn classify(&self, _metrics: &BaselineMetrics, _risk: &RiskFactorSet) -> Result<ClassificationResult> {
            Err(CtgError::DegenerateMetrics {
                standard: Standard::FigoNice,
                reason: "rule table unavailable".to_string(),
            })
        }
    }

    fn healthy_input(risk: RiskFactorSet) -> AnalysisInput {
        let fhr: Vec<f64> = (0..300).map(|i| if i % 2 == 0 { 137.0 } else { 153.0 }).collect();
        AnalysisInput::new(
            TimeSeries::fhr_from_values(&fhr).unwrap(),
            TimeSeries::uc_from_values(&[10.0; 300]).unwrap(),
            risk,
        )
    }

    #[test]
    fn test_metrics_compute() {
        let mut fhr = vec![140.0; 120];
        for v in fhr.iter_mut().skip(40).take(20) {
            *v = 160.0;
        }
        let metrics = BaselineMetrics::compute(&TimeSeries::fhr_from_values(&fhr).unwrap(), 37);
        assert_eq!(metrics.baseline_bpm, 140.0);
        assert_eq!(metrics.acceleration_count, 1);
        assert_eq!(metrics.deceleration_count, 0);
    }

    #[test]
    fn test_event_duration_follows_sample_rate() {
        // 20 samples at 4 Hz is 5 seconds: too short to count
        let mut fhr = vec![140.0; 480];
        for v in fhr.iter_mut().skip(100).take(20) {
            *v = 160.0;
        }
        let series = TimeSeries::from_values(Signal::Fhr, &fhr, 4.0).unwrap();
        assert_eq!(BaselineMetrics::compute(&series, 37).acceleration_count, 0);
    }

    #[test]
    fn test_rhythm_status() {
        assert_eq!(RhythmStatus::from_baseline(100.0), RhythmStatus::Bradycardia);
        assert_eq!(RhythmStatus::from_baseline(110.0), RhythmStatus::Normal);
        assert_eq!(RhythmStatus::from_baseline(160.0), RhythmStatus::Normal);
        assert_eq!(RhythmStatus::from_baseline(161.0), RhythmStatus::Tachycardia);
    }

    #[test]
    fn test_empty_series_rejected() {
        let analyzer = CtgAnalyzer::new(AnalysisConfig::default()).unwrap();
        let input = AnalysisInput::new(
            TimeSeries::fhr_from_values(&[]).unwrap(),
            TimeSeries::uc_from_values(&[10.0]).unwrap(),
            RiskFactorSet::none(),
        );
        assert!(matches!(
            analyzer.analyze(&input),
            Err(CtgError::EmptySeries { signal: Signal::Fhr })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AnalysisConfig::default().with_gestational_age(10);
        assert!(matches!(CtgAnalyzer::new(config), Err(CtgError::InvalidConfig(_))));
    }

    #[test]
    fn test_disabled_components() {
        let config = AnalysisConfig::default().with_nichd(false).with_predictor(false);
        let analyzer = CtgAnalyzer::new(config).unwrap();
        let result = analyzer.analyze(&healthy_input(RiskFactorSet::none())).unwrap();

        assert_eq!(result.classifications.len(), 1);
        assert!(result.classification(Standard::NichdAcog).is_none());
        assert!(result.prediction.is_none());
        assert_eq!(result.forecasts.len(), 3);
        assert!(!result.forecast(Horizon::Min15).unwrap().narrative.contains("AI:"));
    }

    #[test]
    fn test_failing_classifier_is_isolated() {
        let analyzer = CtgAnalyzer::new(AnalysisConfig::default())
            .unwrap()
            .with_classifier(Box::new(FailingClassifier));
        let result = analyzer.analyze(&healthy_input(RiskFactorSet::none())).unwrap();

        assert_eq!(result.classifications.len(), 2);
        assert!(result.classifications[0].is_failed());
        assert_eq!(result.classifications[0].standard(), Standard::FigoNice);
        assert!(result.classification(Standard::NichdAcog).unwrap().classified().is_some());
        assert!(result.forecasts[0].narrative.starts_with("FIGO/NICE: error | NICHD/ACOG:"));
    }

    #[test]
    fn test_added_classifier_keeps_standard_order() {
        let analyzer = CtgAnalyzer::new(AnalysisConfig::default().with_figo(false))
            .unwrap()
            .with_classifier(Box::new(FigoClassifier));
        let result = analyzer.analyze(&healthy_input(RiskFactorSet::none())).unwrap();

        let order: Vec<Standard> = result.classifications.iter().map(|c| c.standard()).collect();
        assert_eq!(order, vec![Standard::FigoNice, Standard::NichdAcog]);
        assert!(result.forecasts[0].narrative.starts_with("FIGO/NICE: "));
    }

    #[test]
    fn test_statistics_snapshot() {
        let risk = RiskFactorSet::none().with(RiskFactor::Diabetes).with(RiskFactor::Anemia);
        let analyzer = CtgAnalyzer::new(AnalysisConfig::default()).unwrap();
        let result = analyzer.analyze(&healthy_input(risk)).unwrap();

        assert_eq!(result.statistics.risk_score, 3);
        assert_eq!(result.statistics.active_factors.len(), 2);
        assert_eq!(result.statistics.rhythm, RhythmStatus::Normal);
        assert_eq!(result.statistics.variability_index.short_term, 16.0);
        assert_eq!(result.statistics.variability_index.long_term, 16.0);
    }

    #[test]
    fn test_outcome_serialization_is_tagged() {
        let failed = ClassifierOutcome::Failed { standard: Standard::NichdAcog, reason: "x".to_string() };
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["standard"], "nichd_acog");
    }
}
