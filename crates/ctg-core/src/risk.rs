//! Maternal history risk factors and severity escalation
//!
//! A fixed set of history factors is scored with static weights. Both
//! classification standards share the same rule: a score of
//! `ESCALATION_THRESHOLD` or more moves the category exactly one step
//! towards the most severe level.

use crate::{figo::FigoCriteria, nichd::NichdCriteria, CtgError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// History score from which a classification is escalated one step
pub const ESCALATION_THRESHOLD: u32 = 4;

/// Maternal history risk factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    Diabetes,
    Anemia,
    /// Chronic hypertension
    Hypertension,
    Preeclampsia,
    Infections,
    MultipleGestation,
    /// Placental or umbilical cord pathology
    PlacentalPathology,
    /// Term below 37 or above 41 weeks
    GestationalTermAbnormal,
}

impl RiskFactor {
    pub const ALL: [RiskFactor; 8] = [
        RiskFactor::Diabetes,
        RiskFactor::Anemia,
        RiskFactor::Hypertension,
        RiskFactor::Preeclampsia,
        RiskFactor::Infections,
        RiskFactor::MultipleGestation,
        RiskFactor::PlacentalPathology,
        RiskFactor::GestationalTermAbnormal,
    ];

    /// Static scoring weight
    pub fn weight(&self) -> u32 {
        match self {
            RiskFactor::Diabetes => 2,
            RiskFactor::Anemia => 1,
            RiskFactor::Hypertension => 2,
            RiskFactor::Preeclampsia => 3,
            RiskFactor::Infections => 2,
            RiskFactor::MultipleGestation => 2,
            RiskFactor::PlacentalPathology => 3,
            RiskFactor::GestationalTermAbnormal => 2,
        }
    }

    /// Canonical key
    pub fn key(&self) -> &'static str {
        match self {
            RiskFactor::Diabetes => "diabetes",
            RiskFactor::Anemia => "anemia",
            RiskFactor::Hypertension => "hypertension",
            RiskFactor::Preeclampsia => "preeclampsia",
            RiskFactor::Infections => "infections",
            RiskFactor::MultipleGestation => "multiple_gestation",
            RiskFactor::PlacentalPathology => "placental_pathology",
            RiskFactor::GestationalTermAbnormal => "gestational_term_abnormal",
        }
    }

    /// Parse a canonical key or its short storage alias
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "diabetes" => Some(RiskFactor::Diabetes),
            "anemia" => Some(RiskFactor::Anemia),
            "hypertension" => Some(RiskFactor::Hypertension),
            "preeclampsia" => Some(RiskFactor::Preeclampsia),
            "infections" => Some(RiskFactor::Infections),
            "multiple_gestation" | "multiple" => Some(RiskFactor::MultipleGestation),
            "placental_pathology" | "placenta" => Some(RiskFactor::PlacentalPathology),
            "gestational_term_abnormal" | "term" => Some(RiskFactor::GestationalTermAbnormal),
            _ => None,
        }
    }

    /// Human-readable name for reports
    pub fn display_name(&self) -> &'static str {
        match self {
            RiskFactor::Diabetes => "Diabetes mellitus",
            RiskFactor::Anemia => "Anemia",
            RiskFactor::Hypertension => "Chronic hypertension",
            RiskFactor::Preeclampsia => "Preeclampsia",
            RiskFactor::Infections => "Infectious disease",
            RiskFactor::MultipleGestation => "Multiple gestation",
            RiskFactor::PlacentalPathology => "Placental or cord pathology",
            RiskFactor::GestationalTermAbnormal => "Abnormal gestational term",
        }
    }
}

/// Presence of each history factor for one patient
///
/// Built once at the system boundary and passed by reference to every
/// stage of an analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFactorSet {
    present: [bool; 8],
}

/// An active factor with its weight, for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveFactor {
    pub factor: RiskFactor,
    pub name: String,
    pub weight: u32,
}

impl RiskFactorSet {
    /// A set with no factors present
    pub fn none() -> Self {
        Self::default()
    }

    /// Return a copy with `factor` present
    pub fn with(mut self, factor: RiskFactor) -> Self {
        self.present[Self::slot(factor)] = true;
        self
    }

    /// Build from key/flag pairs, ignoring unknown keys
    ///
    /// A factor is present once any of its keys is `true`; a later `false`
    /// alias does not clear it.
    pub fn from_flags<'a, I>(flags: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, bool)>,
    {
        let mut set = Self::none();
        for (key, value) in flags {
            match RiskFactor::from_key(key) {
                Some(factor) if value => set.present[Self::slot(factor)] = true,
                Some(_) => {}
                None => debug!(key, "ignoring unknown risk factor key"),
            }
        }
        set
    }

    /// Build from a stored JSON object of `key: bool` pairs
    ///
    /// Unknown keys are ignored; a known key with a non-boolean value, or a
    /// document that is not an object, is rejected.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            CtgError::MalformedRiskFactors("expected an object of boolean flags".to_string())
        })?;

        let mut flags = Vec::with_capacity(object.len());
        for (key, flag) in object {
            if RiskFactor::from_key(key).is_none() {
                debug!(key = key.as_str(), "ignoring unknown risk factor key");
                continue;
            }
            let flag = flag.as_bool().ok_or_else(|| {
                CtgError::MalformedRiskFactors(format!("'{}' must be a boolean, got {}", key, flag))
            })?;
            flags.push((key.as_str(), flag));
        }

        Ok(Self::from_flags(flags))
    }

    pub fn contains(&self, factor: RiskFactor) -> bool {
        self.present[Self::slot(factor)]
    }

    /// Iterate over present factors in canonical order
    pub fn iter(&self) -> impl Iterator<Item = RiskFactor> + '_ {
        RiskFactor::ALL.iter().copied().filter(move |f| self.contains(*f))
    }

    /// Weighted history score
    pub fn score(&self) -> u32 {
        self.iter().map(|f| f.weight()).sum()
    }

    /// Present factors with their weights
    pub fn active_factors(&self) -> Vec<ActiveFactor> {
        self.iter()
            .map(|factor| ActiveFactor {
                factor,
                name: factor.display_name().to_string(),
                weight: factor.weight(),
            })
            .collect()
    }

    fn slot(factor: RiskFactor) -> usize {
        RiskFactor::ALL
            .iter()
            .position(|f| *f == factor)
            .unwrap_or_default()
    }
}

/// Clinical interpretation standard
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Standard {
    FigoNice,
    NichdAcog,
}

impl Standard {
    pub fn name(&self) -> &'static str {
        match self {
            Standard::FigoNice => "FIGO/NICE",
            Standard::NichdAcog => "NICHD/ACOG",
        }
    }

    /// Category label this standard uses for a severity
    pub fn label(&self, severity: Severity) -> &'static str {
        match (self, severity) {
            (Standard::FigoNice, Severity::Normal) => "Normal",
            (Standard::FigoNice, Severity::Indeterminate) => "Suspicious",
            (Standard::FigoNice, Severity::Abnormal) => "Pathological",
            (Standard::NichdAcog, Severity::Normal) => "Category I",
            (Standard::NichdAcog, Severity::Indeterminate) => "Category II",
            (Standard::NichdAcog, Severity::Abnormal) => "Category III",
        }
    }
}

impl std::fmt::Display for Standard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Three-level category ordinal shared by both standards
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Code 0: FIGO Normal, NICHD Category I
    Normal,
    /// Code 1: FIGO Suspicious, NICHD Category II
    Indeterminate,
    /// Code 2: FIGO Pathological, NICHD Category III
    Abnormal,
}

impl Severity {
    pub fn code(&self) -> u8 {
        match self {
            Severity::Normal => 0,
            Severity::Indeterminate => 1,
            Severity::Abnormal => 2,
        }
    }

    /// One step more severe; the ceiling stays put
    pub fn escalate(self) -> Self {
        match self {
            Severity::Normal => Severity::Indeterminate,
            Severity::Indeterminate | Severity::Abnormal => Severity::Abnormal,
        }
    }
}

/// Apply the history-score escalation rule
///
/// Returns the adjusted severity and, when a step was taken, the reason.
pub fn adjust(base: Severity, risk_score: u32) -> (Severity, Option<String>) {
    if risk_score < ESCALATION_THRESHOLD {
        return (base, None);
    }
    let adjusted = base.escalate();
    if adjusted == base {
        (base, None)
    } else {
        (adjusted, Some(format!("elevated history risk score ({})", risk_score)))
    }
}

/// Per-criterion evaluation, tagged by standard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "standard", rename_all = "snake_case")]
pub enum Criteria {
    FigoNice(FigoCriteria),
    NichdAcog(NichdCriteria),
}

/// Outcome of one classification standard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub standard: Standard,
    pub criteria: Criteria,
    /// Category from the trace alone
    pub base: Severity,
    pub risk_score: u32,
    /// Category after history escalation, never below `base`
    pub adjusted: Severity,
    pub adjustment_reason: Option<String>,
}

impl ClassificationResult {
    /// Assemble a result, applying the escalation rule to `base`
    pub fn new(standard: Standard, criteria: Criteria, base: Severity, risk_score: u32) -> Self {
        let (adjusted, adjustment_reason) = adjust(base, risk_score);
        ClassificationResult {
            standard,
            criteria,
            base,
            risk_score,
            adjusted,
            adjustment_reason,
        }
    }

    pub fn base_label(&self) -> &'static str {
        self.standard.label(self.base)
    }

    pub fn base_code(&self) -> u8 {
        self.base.code()
    }

    pub fn adjusted_label(&self) -> &'static str {
        self.standard.label(self.adjusted)
    }

    pub fn adjusted_code(&self) -> u8 {
        self.adjusted.code()
    }

    pub fn adjustment_applied(&self) -> bool {
        self.adjusted != self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_weights() {
        assert_eq!(RiskFactorSet::none().score(), 0);

        let all = RiskFactor::ALL
            .iter()
            .fold(RiskFactorSet::none(), |set, f| set.with(*f));
        assert_eq!(all.score(), 17);

        let set = RiskFactorSet::none()
            .with(RiskFactor::Preeclampsia)
            .with(RiskFactor::Anemia);
        assert_eq!(set.score(), 4);
    }

    #[test]
    fn test_from_flags_aliases_and_unknown_keys() {
        let set = RiskFactorSet::from_flags([
            ("placenta", true),
            ("term", true),
            ("smoking", true),
            ("diabetes", false),
        ]);
        assert!(set.contains(RiskFactor::PlacentalPathology));
        assert!(set.contains(RiskFactor::GestationalTermAbnormal));
        assert!(!set.contains(RiskFactor::Diabetes));
        assert_eq!(set.score(), 5);
    }

    #[test]
    fn test_false_alias_does_not_clear_factor() {
        let set = RiskFactorSet::from_flags([("multiple_gestation", true), ("multiple", false)]);
        assert!(set.contains(RiskFactor::MultipleGestation));
        assert_eq!(set.score(), 2);

        let reversed = RiskFactorSet::from_flags([("multiple", false), ("multiple_gestation", true)]);
        assert_eq!(reversed, set);

        let value = serde_json::json!({"multiple_gestation": true, "multiple": false});
        assert_eq!(RiskFactorSet::from_json(&value).unwrap(), set);

        let value = serde_json::json!({"placental_pathology": false, "placenta": true});
        assert!(RiskFactorSet::from_json(&value).unwrap().contains(RiskFactor::PlacentalPathology));
    }

    #[test]
    fn test_from_json() {
        let value = serde_json::json!({"diabetes": true, "multiple": true, "notes": "n/a"});
        let set = RiskFactorSet::from_json(&value).unwrap();
        assert_eq!(set.score(), 4);

        let bad = serde_json::json!({"anemia": "yes"});
        assert!(matches!(
            RiskFactorSet::from_json(&bad),
            Err(CtgError::MalformedRiskFactors(_))
        ));
        assert!(RiskFactorSet::from_json(&serde_json::json!([true])).is_err());
    }

    #[test]
    fn test_active_factors() {
        let set = RiskFactorSet::none().with(RiskFactor::Hypertension);
        let active = set.active_factors();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].weight, 2);
        assert_eq!(active[0].name, "Chronic hypertension");
    }

    #[test]
    fn test_adjust_one_step() {
        assert_eq!(adjust(Severity::Normal, 3), (Severity::Normal, None));
        assert_eq!(adjust(Severity::Normal, 4).0, Severity::Indeterminate);
        assert_eq!(adjust(Severity::Indeterminate, 9).0, Severity::Abnormal);
        assert_eq!(adjust(Severity::Abnormal, 17), (Severity::Abnormal, None));
    }

    #[test]
    fn test_labels() {
        assert_eq!(Standard::FigoNice.label(Severity::Indeterminate), "Suspicious");
        assert_eq!(Standard::NichdAcog.label(Severity::Abnormal), "Category III");
        assert_eq!(Severity::Abnormal.code(), 2);
    }
}

#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    fn severity() -> impl Strategy<Value = Severity> {
        prop_oneof![
            Just(Severity::Normal),
            Just(Severity::Indeterminate),
            Just(Severity::Abnormal),
        ]
    }

    proptest! {
        /// Escalation never lowers a category and never skips a level
        #[test]
        fn escalation_is_monotonic_single_step(base in severity(), score in 0u32..20) {
            let (adjusted, reason) = adjust(base, score);
            prop_assert!(adjusted >= base);
            prop_assert!(adjusted.code() - base.code() <= 1);
            prop_assert_eq!(reason.is_some(), adjusted != base);
        }
    }
}
