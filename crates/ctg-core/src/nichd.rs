//! NICHD/ACOG three-tier classification
//!
//! The deceleration pattern is inferred from the deceleration count alone.
//! Early, variable and late decelerations really differ by their timing
//! against contractions, not by how many there are; the count proxy is kept
//! as-is until contraction-aligned morphology is available.

use crate::analysis::{BaselineMetrics, Classifier};
use crate::risk::{ClassificationResult, Criteria, RiskFactorSet, Severity, Standard};
use crate::variability::VariabilityClass;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Deceleration count above which Category III no longer needs a pattern
pub const CATEGORY_III_DECELERATIONS: usize = 3;

/// Deceleration pattern proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecelerationPattern {
    None,
    /// One or two decelerations
    Early,
    /// Three to five decelerations
    Variable,
    /// More than five decelerations
    Late,
}

impl DecelerationPattern {
    pub fn from_count(count: usize) -> Self {
        match count {
            0 => DecelerationPattern::None,
            1..=2 => DecelerationPattern::Early,
            3..=5 => DecelerationPattern::Variable,
            _ => DecelerationPattern::Late,
        }
    }
}

/// Inputs behind a NICHD/ACOG category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NichdCriteria {
    pub baseline_bpm: f64,
    pub variability_class: VariabilityClass,
    pub deceleration_count: usize,
    pub deceleration_pattern: DecelerationPattern,
}

impl NichdCriteria {
    pub fn evaluate(metrics: &BaselineMetrics) -> Self {
        NichdCriteria {
            baseline_bpm: metrics.baseline_bpm,
            variability_class: metrics.variability_class,
            deceleration_count: metrics.deceleration_count,
            deceleration_pattern: DecelerationPattern::from_count(metrics.deceleration_count),
        }
    }

    /// Category before any history adjustment
    pub fn category(&self) -> Severity {
        let pattern = self.deceleration_pattern;

        let category_i = (110.0..=160.0).contains(&self.baseline_bpm)
            && self.variability_class == VariabilityClass::Moderate
            && matches!(pattern, DecelerationPattern::None | DecelerationPattern::Early);
        if category_i {
            return Severity::Normal;
        }

        let category_iii = self.variability_class == VariabilityClass::Absent
            && (matches!(pattern, DecelerationPattern::Late | DecelerationPattern::Variable)
                || self.baseline_bpm < 110.0
                || self.deceleration_count > CATEGORY_III_DECELERATIONS);
        if category_iii {
            return Severity::Abnormal;
        }

        Severity::Indeterminate
    }
}

/// NICHD/ACOG rule set
#[derive(Debug, Clone, Copy, Default)]
pub struct NichdClassifier;

impl Classifier for NichdClassifier {
    fn standard(&self) -> Standard {
        Standard::NichdAcog
    }

    fn classify(&self, metrics: &BaselineMetrics, risk: &RiskFactorSet) -> Result<ClassificationResult> {
        metrics.ensure_finite(Standard::NichdAcog)?;

        let criteria = NichdCriteria::evaluate(metrics);
        Ok(ClassificationResult::new(
            Standard::NichdAcog,
            Criteria::NichdAcog(criteria),
            criteria.category(),
            risk.score(),
        ))
    }
}
