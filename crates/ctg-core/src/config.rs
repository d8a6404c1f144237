//! Analysis configuration

use crate::{CtgError, Result, DEFAULT_GESTATIONAL_AGE_WEEKS};
use serde::{Deserialize, Serialize};

/// Gestational ages accepted by the analyzer, in weeks
pub const GESTATIONAL_AGE_RANGE: std::ops::RangeInclusive<u32> = 20..=45;

/// Language of narrative and predictor text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ru,
}

/// Sliding-window parameters for the hypoxia estimator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HypoxiaConfig {
    pub window_secs: f64,
    pub step_secs: f64,
    pub accel_threshold_bpm: f64,
    pub decel_threshold_bpm: f64,
}

impl Default for HypoxiaConfig {
    fn default() -> Self {
        Self {
            window_secs: 120.0,
            step_secs: 60.0,
            accel_threshold_bpm: 15.0,
            decel_threshold_bpm: 15.0,
        }
    }
}

impl HypoxiaConfig {
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("window_secs", self.window_secs),
            ("step_secs", self.step_secs),
            ("accel_threshold_bpm", self.accel_threshold_bpm),
            ("decel_threshold_bpm", self.decel_threshold_bpm),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(CtgError::InvalidConfig(format!("hypoxia {} must be positive, got {}", name, value)));
            }
        }
        Ok(())
    }
}

/// Configuration for a single analysis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Gestational age in weeks; below 32 lowers the acceleration threshold
    pub gestational_age_weeks: u32,
    pub use_figo: bool,
    pub use_nichd: bool,
    /// Run the heuristic outcome predictor
    pub use_predictor: bool,
    pub locale: Locale,
    pub hypoxia: HypoxiaConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            gestational_age_weeks: DEFAULT_GESTATIONAL_AGE_WEEKS,
            use_figo: true,
            use_nichd: true,
            use_predictor: true,
            locale: Locale::En,
            hypoxia: HypoxiaConfig::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn with_gestational_age(mut self, weeks: u32) -> Self {
        self.gestational_age_weeks = weeks;
        self
    }

    pub fn with_figo(mut self, enabled: bool) -> Self {
        self.use_figo = enabled;
        self
    }

    pub fn with_nichd(mut self, enabled: bool) -> Self {
        self.use_nichd = enabled;
        self
    }

    pub fn with_predictor(mut self, enabled: bool) -> Self {
        self.use_predictor = enabled;
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_hypoxia(mut self, hypoxia: HypoxiaConfig) -> Self {
        self.hypoxia = hypoxia;
        self
    }

    /// Parse a (possibly partial) JSON document and validate it
    pub fn from_json(json: &str) -> Result<Self> {
        let config: AnalysisConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !GESTATIONAL_AGE_RANGE.contains(&self.gestational_age_weeks) {
            return Err(CtgError::InvalidConfig(format!(
                "gestational age {} weeks outside {}-{}",
                self.gestational_age_weeks,
                GESTATIONAL_AGE_RANGE.start(),
                GESTATIONAL_AGE_RANGE.end()
            )));
        }
        self.hypoxia.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.gestational_age_weeks, 37);
        assert!(config.use_figo && config.use_nichd && config.use_predictor);
        assert_eq!(config.locale, Locale::En);
        assert_eq!(config.hypoxia.window_secs, 120.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = AnalysisConfig::default()
            .with_gestational_age(30)
            .with_predictor(false)
            .with_locale(Locale::Ru);
        assert_eq!(config.gestational_age_weeks, 30);
        assert!(!config.use_predictor);
        assert_eq!(config.locale, Locale::Ru);
    }

    #[test]
    fn test_partial_json() {
        let config = AnalysisConfig::from_json(r#"{"use_nichd": false, "locale": "ru", "hypoxia": {"step_secs": 30}}"#).unwrap();
        assert!(!config.use_nichd);
        assert!(config.use_figo);
        assert_eq!(config.locale, Locale::Ru);
        assert_eq!(config.hypoxia.step_secs, 30.0);
        assert_eq!(config.hypoxia.window_secs, 120.0);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            AnalysisConfig::from_json(r#"{"gestational_age_weeks": 50}"#),
            Err(CtgError::InvalidConfig(_))
        ));
        assert!(matches!(
            AnalysisConfig::from_json(r#"{"hypoxia": {"window_secs": 0}}"#),
            Err(CtgError::InvalidConfig(_))
        ));
        assert!(matches!(
            AnalysisConfig::from_json("not json"),
            Err(CtgError::Serialization(_))
        ));
    }
}
