//! FHR variability estimation
//!
//! Short-term variability (STV) is the mean absolute successive difference.
//! Long-term variability (LTV) is the mean max-min range over consecutive
//! one-minute windows.

use crate::signal::{max, mean, min};
use serde::{Deserialize, Serialize};

/// Long-term variability window, in seconds
pub const LTV_WINDOW_SECS: f64 = 60.0;

/// Clinical variability amplitude class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariabilityClass {
    /// No measurable fluctuation
    Absent,
    /// Below 5
    Minimal,
    /// 5 to 25 inclusive (normal)
    Moderate,
    /// Above 25
    Marked,
}

impl VariabilityClass {
    /// Classify a variability amplitude
    ///
    /// Zero, negative and non-finite inputs fall to `Absent`.
    pub fn classify(variability: f64) -> Self {
        if variability > 0.0 && variability < 5.0 {
            VariabilityClass::Minimal
        } else if (5.0..=25.0).contains(&variability) {
            VariabilityClass::Moderate
        } else if variability > 25.0 && variability.is_finite() {
            VariabilityClass::Marked
        } else {
            VariabilityClass::Absent
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VariabilityClass::Absent => "absent",
            VariabilityClass::Minimal => "minimal",
            VariabilityClass::Moderate => "moderate",
            VariabilityClass::Marked => "marked",
        }
    }
}

impl std::fmt::Display for VariabilityClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mean absolute difference between consecutive samples
pub fn short_term_variability(fhr: &[f64]) -> f64 {
    if fhr.len() < 2 {
        return 0.0;
    }
    let total: f64 = fhr.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
    total / (fhr.len() - 1) as f64
}

/// Mean per-window range over consecutive windows of `window` samples
///
/// Series shorter than one window use their global range.
pub fn long_term_variability(fhr: &[f64], window: usize) -> f64 {
    let window = window.max(1);
    if fhr.len() < window {
        return max(fhr) - min(fhr);
    }

    let ranges: Vec<f64> = fhr
        .chunks_exact(window)
        .map(|w| max(w) - min(w))
        .collect();
    mean(&ranges)
}

/// Composite variability report for secondary display
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariabilityIndex {
    pub short_term: f64,
    pub long_term: f64,
    pub short_term_class: VariabilityClass,
    pub long_term_class: VariabilityClass,
    /// Mean of STV and LTV
    pub overall: f64,
}

impl VariabilityIndex {
    pub fn compute(fhr: &[f64], ltv_window: usize) -> Self {
        let short_term = short_term_variability(fhr);
        let long_term = long_term_variability(fhr, ltv_window);

        VariabilityIndex {
            short_term,
            long_term,
            short_term_class: VariabilityClass::classify(short_term),
            long_term_class: VariabilityClass::classify(long_term),
            overall: (short_term + long_term) / 2.0,
        }
    }
}
