//! Sliding-window hypoxia risk
//!
//! Every window gets an integer score from its median FHR, the recording's
//! variability and pointwise threshold crossings. Crossings are counted per
//! sample with no minimum duration, which keeps the estimator cheap on dense
//! windows. The score is divided by 10 and clamped to [0, 1].

use crate::config::HypoxiaConfig;
use crate::signal::{self, CONTRACTION_THRESHOLD};
use crate::TimeSeries;
use serde::{Deserialize, Serialize};

/// Highest attainable window score (2 + 2 + 2 + 1 + 1 + 2)
pub const MAX_WINDOW_SCORE: u32 = 10;

/// Coarse hypoxia risk band
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HypoxiaLevel {
    /// Below 0.3
    Low,
    /// 0.3 to 0.6 inclusive
    Moderate,
    /// Above 0.6
    High,
}

impl HypoxiaLevel {
    pub fn classify(risk: f64) -> Self {
        if risk < 0.3 {
            HypoxiaLevel::Low
        } else if risk <= 0.6 {
            HypoxiaLevel::Moderate
        } else {
            HypoxiaLevel::High
        }
    }
}

/// One point of the hypoxia risk series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HypoxiaPoint {
    /// Timestamp of the window center
    pub time: f64,
    pub risk: f64,
    pub level: HypoxiaLevel,
    /// Contractions seen in the aligned UC window
    #[serde(default)]
    pub uc_contractions: usize,
}

impl HypoxiaPoint {
    pub fn new(time: f64, risk: f64) -> Self {
        let risk = risk.clamp(0.0, 1.0);
        HypoxiaPoint { time, risk, level: HypoxiaLevel::classify(risk), uc_contractions: 0 }
    }

    pub fn with_uc_contractions(mut self, count: usize) -> Self {
        self.uc_contractions = count;
        self
    }
}

/// Raw observations for one window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowFeatures {
    pub baseline: f64,
    /// Samples at or above baseline + accel threshold
    pub accel_points: usize,
    /// Samples at or below baseline - decel threshold
    pub decel_points: usize,
    /// Contractions in the aligned UC window (reported, not scored)
    pub uc_contractions: usize,
}

impl WindowFeatures {
    pub fn observe(fhr: &[f64], uc: &[f64], config: &HypoxiaConfig) -> Self {
        let baseline = signal::median(fhr);
        let accel_level = baseline + config.accel_threshold_bpm;
        let decel_level = baseline - config.decel_threshold_bpm;

        WindowFeatures {
            baseline,
            accel_points: fhr.iter().filter(|v| **v >= accel_level).count(),
            decel_points: fhr.iter().filter(|v| **v <= decel_level).count(),
            uc_contractions: signal::count_contractions(uc, CONTRACTION_THRESHOLD),
        }
    }

    /// Integer window score in 0..=MAX_WINDOW_SCORE
    pub fn score(&self, variability: f64) -> u32 {
        let baseline_score = baseline_score(self.baseline);
        let variability_score = variability_score(variability);
        let decel_presence = if self.decel_points > 0 { 2 } else { 0 };
        let accel_absence = if self.accel_points == 0 { 1 } else { 0 };
        let accel_count_score = 2usize.saturating_sub(self.accel_points).min(1) as u32;
        let decel_count_score = (self.decel_points / 5).min(2) as u32;

        baseline_score + variability_score + decel_presence + accel_absence + accel_count_score + decel_count_score
    }
}

/// 0 in 110-160, 1 in [105,110) or (160,165], otherwise 2 (including no data)
pub fn baseline_score(baseline: f64) -> u32 {
    if baseline == 0.0 {
        2
    } else if (110.0..=160.0).contains(&baseline) {
        0
    } else if (105.0..110.0).contains(&baseline) || (baseline > 160.0 && baseline <= 165.0) {
        1
    } else {
        2
    }
}

/// 0 from 5 up, 1 in [3,5), otherwise 2 (missing counts as worst)
pub fn variability_score(variability: f64) -> u32 {
    if variability >= 5.0 {
        0
    } else if variability >= 3.0 {
        1
    } else {
        2
    }
}

/// Sliding-window estimator over aligned FHR and UC series
#[derive(Debug, Clone, Copy, Default)]
pub struct HypoxiaEstimator {
    config: HypoxiaConfig,
}

impl HypoxiaEstimator {
    pub fn new(config: HypoxiaConfig) -> Self {
        HypoxiaEstimator { config }
    }

    /// Risk series anchored at window centers
    ///
    /// `variability` is the recording-level STV. A recording shorter than
    /// one window yields an empty series.
    pub fn estimate(&self, fhr: &TimeSeries, uc: &TimeSeries, variability: f64) -> Vec<HypoxiaPoint> {
        let size = fhr.samples_for(self.config.window_secs);
        let step = fhr.samples_for(self.config.step_secs);
        let values = fhr.values();
        let times = fhr.times();

        if values.len() < size {
            return Vec::new();
        }

        (0..=values.len() - size)
            .step_by(step)
            .map(|start| {
                let end = start + size;
                let uc_window = if end <= uc.len() { &uc.values()[start..end] } else { &[][..] };
                let features = WindowFeatures::observe(&values[start..end], uc_window, &self.config);
                let risk = features.score(variability) as f64 / MAX_WINDOW_SCORE as f64;

                let center = start + size / 2;
                let time = if center < times.len() { times[center] } else { times[start] };
                HypoxiaPoint::new(time, risk).with_uc_contractions(features.uc_contractions)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> TimeSeries {
        TimeSeries::fhr_from_values(values).unwrap()
    }

    #[test]
    fn test_window_count_and_anchor() {
        let fhr = series(&vec![140.0; 300]);
        let uc = TimeSeries::uc_from_values(&vec![10.0; 300]).unwrap();
        let points = HypoxiaEstimator::default().estimate(&fhr, &uc, 10.0);

        assert_eq!(points.len(), 4);
        assert_eq!(points[0].time, 60.0);
        assert_eq!(points[3].time, 240.0);
    }

    #[test]
    fn test_short_recording_has_no_windows() {
        let fhr = series(&vec![140.0; 119]);
        let uc = TimeSeries::uc_from_values(&[]).unwrap();
        assert!(HypoxiaEstimator::default().estimate(&fhr, &uc, 10.0).is_empty());
    }

    #[test]
    fn test_flat_trace_score() {
        // Baseline fine, variability fine, no decels, no accels (+1 absence, +1 count)
        let features = WindowFeatures::observe(&[140.0; 120], &[], &HypoxiaConfig::default());
        assert_eq!(features.score(10.0), 2);
        assert_eq!(features.score(0.0), 4);
        assert_eq!(features.score(f64::NAN), 4);
    }

    #[test]
    fn test_zero_window_is_worst_baseline() {
        let features = WindowFeatures::observe(&[0.0; 120], &[], &HypoxiaConfig::default());
        assert_eq!(baseline_score(features.baseline), 2);
        let risk = features.score(0.0) as f64 / MAX_WINDOW_SCORE as f64;
        assert!((0.0..=1.0).contains(&risk));
    }

    #[test]
    fn test_deceleration_heavy_window() {
        let mut window = vec![140.0; 100];
        window.extend(vec![100.0; 20]);
        let features = WindowFeatures::observe(&window, &[], &HypoxiaConfig::default());
        assert_eq!(features.decel_points, 20);
        // 0 + 0 + 2 + 1 + 1 + 2
        assert_eq!(features.score(10.0), 6);
    }

    #[test]
    fn test_baseline_bands() {
        assert_eq!(baseline_score(110.0), 0);
        assert_eq!(baseline_score(107.0), 1);
        assert_eq!(baseline_score(165.0), 1);
        assert_eq!(baseline_score(166.0), 2);
        assert_eq!(baseline_score(95.0), 2);
    }

    #[test]
    fn test_levels() {
        assert_eq!(HypoxiaLevel::classify(0.2), HypoxiaLevel::Low);
        assert_eq!(HypoxiaLevel::classify(0.6), HypoxiaLevel::Moderate);
        assert_eq!(HypoxiaLevel::classify(0.7), HypoxiaLevel::High);
    }

    #[test]
    fn test_uc_window_only_when_covered() {
        let fhr = series(&vec![140.0; 240]);
        let uc = TimeSeries::uc_from_values(&vec![40.0; 150]).unwrap();
        // Window [60, 180) is not covered by 150 UC samples; still scored
        let points = HypoxiaEstimator::default().estimate(&fhr, &uc, 10.0);
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].uc_contractions, 1);
        assert_eq!(points[1].uc_contractions, 0);
        assert_eq!(points[0].risk, points[1].risk);
    }
}
