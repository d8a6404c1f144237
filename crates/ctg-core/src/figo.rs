//! FIGO/NICE classification
//!
//! Each of the four trace features is graded reassuring, non-reassuring or
//! abnormal. All reassuring gives Normal, any abnormal gives Pathological,
//! anything else Suspicious. History risk may then escalate one step.

use crate::analysis::{BaselineMetrics, Classifier};
use crate::risk::{ClassificationResult, Criteria, RiskFactorSet, Severity, Standard};
use crate::variability::VariabilityClass;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Accelerations expected within the reference window for a reassuring trace
pub const MIN_REASSURING_ACCELERATIONS: usize = 2;

/// Reference window the acceleration count refers to, in minutes
pub const ACCELERATION_REFERENCE_MINUTES: u32 = 20;

/// Grade of a single trace feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Assessment {
    Reassuring,
    NonReassuring,
    Abnormal,
}

/// Per-feature grades behind a FIGO/NICE category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FigoCriteria {
    pub baseline: Assessment,
    pub variability: Assessment,
    pub accelerations: Assessment,
    pub decelerations: Assessment,
}

impl FigoCriteria {
    pub fn evaluate(metrics: &BaselineMetrics) -> Self {
        FigoCriteria {
            baseline: evaluate_baseline(metrics.baseline_bpm),
            variability: evaluate_variability(metrics.variability_class),
            accelerations: evaluate_accelerations(metrics.acceleration_count),
            decelerations: evaluate_decelerations(metrics.deceleration_count),
        }
    }

    pub fn all(&self) -> [Assessment; 4] {
        [self.baseline, self.variability, self.accelerations, self.decelerations]
    }

    /// Category before any history adjustment
    pub fn category(&self) -> Severity {
        let grades = self.all();
        if grades.iter().all(|g| *g == Assessment::Reassuring) {
            Severity::Normal
        } else if grades.contains(&Assessment::Abnormal) {
            Severity::Abnormal
        } else {
            Severity::Indeterminate
        }
    }
}

/// 110-160 reassuring, 100-109 or 161-180 non-reassuring, otherwise abnormal
pub fn evaluate_baseline(baseline: f64) -> Assessment {
    if (110.0..=160.0).contains(&baseline) {
        Assessment::Reassuring
    } else if (100.0..110.0).contains(&baseline) || (161.0..=180.0).contains(&baseline) {
        Assessment::NonReassuring
    } else {
        Assessment::Abnormal
    }
}

pub fn evaluate_variability(class: VariabilityClass) -> Assessment {
    match class {
        VariabilityClass::Moderate => Assessment::Reassuring,
        VariabilityClass::Minimal | VariabilityClass::Marked => Assessment::NonReassuring,
        VariabilityClass::Absent => Assessment::Abnormal,
    }
}

pub fn evaluate_accelerations(count: usize) -> Assessment {
    if count >= MIN_REASSURING_ACCELERATIONS {
        Assessment::Reassuring
    } else {
        Assessment::NonReassuring
    }
}

/// None reassuring, one or two non-reassuring, three or more abnormal
pub fn evaluate_decelerations(count: usize) -> Assessment {
    match count {
        0 => Assessment::Reassuring,
        1 | 2 => Assessment::NonReassuring,
        _ => Assessment::Abnormal,
    }
}

/// FIGO/NICE rule set
#[derive(Debug, Clone, Copy, Default)]
pub struct FigoClassifier;

impl Classifier for FigoClassifier {
    fn standard(&self) -> Standard {
        Standard::FigoNice
    }

    fn classify(&self, metrics: &BaselineMetrics, risk: &RiskFactorSet) -> Result<ClassificationResult> {
        metrics.ensure_finite(Standard::FigoNice)?;

        let criteria = FigoCriteria::evaluate(metrics);
        Ok(ClassificationResult::new(
            Standard::FigoNice,
            Criteria::FigoNice(criteria),
            criteria.category(),
            risk.score(),
        ))
    }
}
