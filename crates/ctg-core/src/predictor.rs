//! Heuristic outcome predictor
//!
//! Rule-based stand-in for a trained sequence model. Summary features are
//! extracted from both channels, turned into a single risk level, then
//! scaled per forecast horizon to reflect growing uncertainty.

use crate::config::Locale;
use crate::forecast::{ForecastStatus, Horizon};
use crate::risk::RiskFactorSet;
use crate::signal::{self, CONTRACTION_THRESHOLD};
use serde::{Deserialize, Serialize};

/// Version tag reported with every prediction
pub const MODEL_VERSION: &str = "v1.0_heuristic";

/// Largest contribution the history score can make to the risk level
pub const MAX_HISTORY_CONTRIBUTION: f64 = 0.3;

/// Summary features fed to the model, kept for auditability
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictorFeatures {
    pub fhr_mean: f64,
    pub fhr_std: f64,
    pub fhr_min: f64,
    pub fhr_max: f64,
    /// Least-squares slope in bpm per sample
    pub fhr_trend: f64,
    pub uc_mean: f64,
    pub uc_max: f64,
    pub uc_contractions: usize,
    pub risk_score: u32,
}

impl PredictorFeatures {
    pub fn extract(fhr: &[f64], uc: &[f64], risk: &RiskFactorSet) -> Self {
        PredictorFeatures {
            fhr_mean: signal::mean(fhr),
            fhr_std: signal::std_dev(fhr),
            fhr_min: signal::min(fhr),
            fhr_max: signal::max(fhr),
            fhr_trend: signal::linear_trend(fhr),
            uc_mean: signal::mean(uc),
            uc_max: signal::max(uc),
            uc_contractions: signal::count_contractions(uc, CONTRACTION_THRESHOLD),
            risk_score: risk.score(),
        }
    }

    /// Horizon-independent risk level, before scaling and clamping
    pub fn risk_level(&self) -> f64 {
        let mut risk = 0.0;

        if self.fhr_mean < 110.0 || self.fhr_mean > 160.0 {
            risk += 0.3;
        }

        if self.fhr_std < 5.0 {
            risk += 0.3;
        } else if self.fhr_std > 25.0 {
            risk += 0.2;
        }

        if self.fhr_trend < -0.5 {
            risk += 0.2;
        } else if self.fhr_trend > 0.5 {
            risk += 0.1;
        }

        risk + (self.risk_score as f64 / 10.0).min(MAX_HISTORY_CONTRIBUTION)
    }
}

/// Prediction for one horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonPrediction {
    pub horizon: Horizon,
    pub status: ForecastStatus,
    pub text: String,
    /// Scaled and clamped risk in [0, 1]
    pub risk_level: f64,
    pub confidence: f64,
}

impl HorizonPrediction {
    fn from_risk(horizon: Horizon, base_risk: f64, locale: Locale) -> Self {
        let risk_level = (base_risk * horizon.predictor_factor()).clamp(0.0, 1.0);
        let status = bucket(risk_level);

        HorizonPrediction {
            horizon,
            status,
            text: prediction_text(status, locale).to_string(),
            risk_level,
            confidence: confidence(status),
        }
    }
}

/// Status bucket for a horizon risk level
pub fn bucket(risk_level: f64) -> ForecastStatus {
    if risk_level < 0.3 {
        ForecastStatus::Normal
    } else if risk_level < 0.6 {
        ForecastStatus::Warning
    } else {
        ForecastStatus::Danger
    }
}

/// Fixed confidence the heuristic model reports per bucket
pub fn confidence(status: ForecastStatus) -> f64 {
    match status {
        ForecastStatus::Normal => 0.85,
        ForecastStatus::Warning => 0.70,
        ForecastStatus::Danger => 0.60,
    }
}

fn prediction_text(status: ForecastStatus, locale: Locale) -> &'static str {
    match (locale, status) {
        (Locale::En, ForecastStatus::Normal) => "Stable condition",
        (Locale::En, ForecastStatus::Warning) => "Possible deviations, monitoring recommended",
        (Locale::En, ForecastStatus::Danger) => "High risk of complications, attention required",
        (Locale::Ru, ForecastStatus::Normal) => "Стабильное состояние",
        (Locale::Ru, ForecastStatus::Warning) => "Возможны отклонения, рекомендуется наблюдение",
        (Locale::Ru, ForecastStatus::Danger) => "Высокий риск осложнений, требуется внимание",
    }
}

/// Predictor output across all horizons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomePrediction {
    pub model_version: String,
    pub features: PredictorFeatures,
    pub horizons: Vec<HorizonPrediction>,
}

impl OutcomePrediction {
    pub fn for_horizon(&self, horizon: Horizon) -> Option<&HorizonPrediction> {
        self.horizons.iter().find(|p| p.horizon == horizon)
    }
}

/// Rule-based outcome predictor
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicPredictor {
    locale: Locale,
}

impl HeuristicPredictor {
    pub fn new(locale: Locale) -> Self {
        HeuristicPredictor { locale }
    }

    pub fn predict(&self, fhr: &[f64], uc: &[f64], risk: &RiskFactorSet) -> OutcomePrediction {
        let features = PredictorFeatures::extract(fhr, uc, risk);
        let base_risk = features.risk_level();

        OutcomePrediction {
            model_version: MODEL_VERSION.to_string(),
            features,
            horizons: Horizon::ALL
                .iter()
                .map(|h| HorizonPrediction::from_risk(*h, base_risk, self.locale))
                .collect(),
        }
    }
}
