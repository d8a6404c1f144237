//! Forecast synthesis
//!
//! Merges classifier labels, predictor output and the hypoxia risk trend
//! into one forecast per horizon.
//!
//! Status only ever escalates: the base status comes from the predictor (or
//! the classifiers when the predictor did not run), and predicted hypoxia
//! risk can raise it but never lower it.

use crate::analysis::ClassifierOutcome;
use crate::config::Locale;
use crate::hypoxia::HypoxiaPoint;
use crate::predictor::OutcomePrediction;
use crate::risk::Standard;
use crate::signal;
use serde::{Deserialize, Serialize};

/// Trailing hypoxia points used for the risk trend
pub const TREND_POINTS: usize = 10;

/// Predicted risk above which a horizon is always danger
pub const DANGER_RISK: f64 = 0.7;

/// Predicted risk above which a normal horizon becomes warning
pub const WARNING_RISK: f64 = 0.4;

/// Forecast horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Horizon {
    #[serde(rename = "15min")]
    Min15,
    #[serde(rename = "30min")]
    Min30,
    #[serde(rename = "60min")]
    Min60,
}

impl Horizon {
    pub const ALL: [Horizon; 3] = [Horizon::Min15, Horizon::Min30, Horizon::Min60];

    pub fn id(&self) -> &'static str {
        match self {
            Horizon::Min15 => "15min",
            Horizon::Min30 => "30min",
            Horizon::Min60 => "60min",
        }
    }

    pub fn minutes(&self) -> u32 {
        match self {
            Horizon::Min15 => 15,
            Horizon::Min30 => 30,
            Horizon::Min60 => 60,
        }
    }

    /// Scale applied to the predictor's risk level
    pub fn predictor_factor(&self) -> f64 {
        match self {
            Horizon::Min15 => 1.0,
            Horizon::Min30 => 1.2,
            Horizon::Min60 => 1.5,
        }
    }

    /// Weight of the hypoxia trend when continuing the current risk
    pub fn trend_multiplier(&self) -> f64 {
        match self {
            Horizon::Min15 => 1.1,
            Horizon::Min30 => 1.3,
            Horizon::Min60 => 1.6,
        }
    }
}

impl std::fmt::Display for Horizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Forecast status, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastStatus {
    Normal,
    Warning,
    Danger,
}

impl ForecastStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastStatus::Normal => "normal",
            ForecastStatus::Warning => "warning",
            ForecastStatus::Danger => "danger",
        }
    }
}

/// Forecast for one horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastHorizon {
    pub horizon: Horizon,
    pub status: ForecastStatus,
    pub narrative: String,
    pub predicted_hypoxia_risk: f64,
}

/// Slope of the trailing risks, scaled by 10 and clamped to [-1, 1]
pub fn risk_trend(series: &[HypoxiaPoint]) -> f64 {
    let tail = &series[series.len().saturating_sub(TREND_POINTS)..];
    let risks: Vec<f64> = tail.iter().map(|p| p.risk).collect();
    (signal::linear_trend(&risks) * 10.0).clamp(-1.0, 1.0)
}

/// Relative continuation of the current risk along its trend
pub fn predicted_risk(series: &[HypoxiaPoint], horizon: Horizon) -> f64 {
    let current = series.last().map(|p| p.risk).unwrap_or(0.0);
    if series.len() < 2 {
        return current;
    }
    let trend = risk_trend(series);
    (current * (1.0 + trend * horizon.trend_multiplier())).clamp(0.0, 1.0)
}

/// Status derived from classifier codes when the predictor did not run
pub fn status_from_classifiers(outcomes: &[ClassifierOutcome]) -> ForecastStatus {
    let codes: Vec<u8> = [Standard::FigoNice, Standard::NichdAcog]
        .iter()
        .filter_map(|standard| {
            outcomes
                .iter()
                .filter_map(ClassifierOutcome::classified)
                .find(|c| c.standard == *standard)
                .map(|c| c.adjusted_code())
        })
        .collect();

    if codes.iter().any(|c| *c >= 2) {
        ForecastStatus::Danger
    } else if codes.iter().any(|c| *c == 1) {
        ForecastStatus::Warning
    } else {
        ForecastStatus::Normal
    }
}

/// Apply hypoxia overrides to a base status; never lowers it
pub fn apply_risk_override(base: ForecastStatus, predicted_risk: f64) -> ForecastStatus {
    if predicted_risk > DANGER_RISK {
        ForecastStatus::Danger
    } else if predicted_risk > WARNING_RISK && base == ForecastStatus::Normal {
        ForecastStatus::Warning
    } else {
        base
    }
}

fn narrative_level(risk: f64, locale: Locale) -> &'static str {
    let level = if risk < 0.3 {
        0
    } else if risk < 0.6 {
        1
    } else {
        2
    };
    match locale {
        Locale::En => ["low", "moderate", "high"][level],
        Locale::Ru => ["низкий", "умеренный", "высокий"][level],
    }
}

fn narrative(
    outcomes: &[ClassifierOutcome],
    prediction: Option<&OutcomePrediction>,
    horizon: Horizon,
    risk: f64,
    locale: Locale,
) -> String {
    let mut parts: Vec<String> = outcomes
        .iter()
        .map(|outcome| match outcome {
            ClassifierOutcome::Classified(result) => {
                format!("{}: {}", result.standard.name(), result.adjusted_label())
            }
            ClassifierOutcome::Failed { standard, .. } => match locale {
                Locale::En => format!("{}: error", standard.name()),
                Locale::Ru => format!("{}: ошибка", standard.name()),
            },
        })
        .collect();

    if let Some(text) = prediction.and_then(|p| p.for_horizon(horizon)).map(|p| &p.text) {
        let prefix = match locale {
            Locale::En => "AI",
            Locale::Ru => "ИИ",
        };
        parts.push(format!("{}: {}", prefix, text));
    }

    let percent = (risk * 100.0) as u32;
    let level = narrative_level(risk, locale);
    parts.push(match locale {
        Locale::En => format!("Hypoxia risk: {}% ({})", percent, level),
        Locale::Ru => format!("Риск гипоксии: {}% ({})", percent, level),
    });

    parts.join(" | ")
}

/// Build the forecast for every horizon
pub fn synthesize(
    outcomes: &[ClassifierOutcome],
    prediction: Option<&OutcomePrediction>,
    hypoxia: &[HypoxiaPoint],
    locale: Locale,
) -> Vec<ForecastHorizon> {
    Horizon::ALL
        .iter()
        .map(|&horizon| {
            let risk = predicted_risk(hypoxia, horizon);
            let base = match prediction.and_then(|p| p.for_horizon(horizon)) {
                Some(p) => p.status,
                None => status_from_classifiers(outcomes),
            };

            ForecastHorizon {
                horizon,
                status: apply_risk_override(base, risk),
                narrative: narrative(outcomes, prediction, horizon, risk, locale),
                predicted_hypoxia_risk: risk,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::BaselineMetrics;
    use crate::figo::FigoClassifier;
    use crate::nichd::NichdClassifier;
    use crate::predictor::HeuristicPredictor;
    use crate::risk::RiskFactorSet;
    use crate::Classifier;

    fn points(risks: &[f64]) -> Vec<HypoxiaPoint> {
        risks
            .iter()
            .enumerate()
            .map(|(i, r)| HypoxiaPoint::new(60.0 * (i + 1) as f64, *r))
            .collect()
    }

    fn outcomes(metrics: &BaselineMetrics) -> Vec<ClassifierOutcome> {
        let risk = RiskFactorSet::none();
        vec![
            ClassifierOutcome::Classified(FigoClassifier.classify(metrics, &risk).unwrap()),
            ClassifierOutcome::Classified(NichdClassifier.classify(metrics, &risk).unwrap()),
        ]
    }

    #[test]
    fn test_horizon_ids() {
        assert_eq!(Horizon::Min30.to_string(), "30min");
        assert_eq!(serde_json::to_string(&Horizon::Min60).unwrap(), "\"60min\"");
    }

    #[test]
    fn test_predicted_risk_short_series() {
        assert_eq!(predicted_risk(&[], Horizon::Min15), 0.0);
        assert_eq!(predicted_risk(&points(&[0.4]), Horizon::Min60), 0.4);
    }

    #[test]
    fn test_predicted_risk_follows_trend() {
        // Slope 0.05 per point, x10 = 0.5
        let series = points(&[0.2, 0.25, 0.3, 0.35, 0.4]);
        assert!((risk_trend(&series) - 0.5).abs() < 1e-9);
        let p15 = predicted_risk(&series, Horizon::Min15);
        assert!((p15 - 0.4 * 1.55).abs() < 1e-9);
        let p60 = predicted_risk(&series, Horizon::Min60);
        assert!((p60 - 0.72).abs() < 1e-9);
    }

    #[test]
    fn test_trend_uses_trailing_points_only() {
        let mut risks = vec![0.9, 0.0, 0.9];
        risks.extend(vec![0.3; 10]);
        assert!(risk_trend(&points(&risks)).abs() < 1e-9);
    }

    #[test]
    fn test_status_from_classifiers() {
        assert_eq!(
            status_from_classifiers(&outcomes(&BaselineMetrics::new(140.0, 10.0, 2, 0))),
            ForecastStatus::Normal
        );
        assert_eq!(
            status_from_classifiers(&outcomes(&BaselineMetrics::new(140.0, 10.0, 1, 0))),
            ForecastStatus::Warning
        );
        assert_eq!(
            status_from_classifiers(&outcomes(&BaselineMetrics::new(140.0, 0.0, 2, 6))),
            ForecastStatus::Danger
        );
        assert_eq!(status_from_classifiers(&[]), ForecastStatus::Normal);
    }

    #[test]
    fn test_risk_override() {
        assert_eq!(apply_risk_override(ForecastStatus::Normal, 0.5), ForecastStatus::Warning);
        assert_eq!(apply_risk_override(ForecastStatus::Normal, 0.4), ForecastStatus::Normal);
        assert_eq!(apply_risk_override(ForecastStatus::Warning, 0.71), ForecastStatus::Danger);
        assert_eq!(apply_risk_override(ForecastStatus::Warning, 0.0), ForecastStatus::Warning);
    }

    #[test]
    fn test_danger_never_downgraded() {
        for risk in [0.0, 0.3, 0.41, 0.7, 0.71, 1.0] {
            assert_eq!(apply_risk_override(ForecastStatus::Danger, risk), ForecastStatus::Danger);
        }
    }

    #[test]
    fn test_narrative_format() {
        let outcomes = outcomes(&BaselineMetrics::new(140.0, 10.0, 2, 0));
        let forecasts = synthesize(&outcomes, None, &points(&[0.2, 0.2]), Locale::En);

        assert_eq!(forecasts.len(), 3);
        assert_eq!(
            forecasts[0].narrative,
            "FIGO/NICE: Normal | NICHD/ACOG: Category I | Hypoxia risk: 20% (low)"
        );
        assert_eq!(forecasts[0].status, ForecastStatus::Normal);
    }

    #[test]
    fn test_narrative_with_prediction_and_failure() {
        let outcomes = vec![ClassifierOutcome::Failed {
            standard: Standard::FigoNice,
            reason: "baseline is not finite".to_string(),
        }];
        let prediction = HeuristicPredictor::default().predict(&[140.0; 60], &[], &RiskFactorSet::none());
        let forecasts = synthesize(&outcomes, Some(&prediction), &[], Locale::En);

        assert_eq!(
            forecasts[0].narrative,
            "FIGO/NICE: error | AI: Possible deviations, monitoring recommended | Hypoxia risk: 0% (low)"
        );
        // Predictor status wins over the classifiers
        assert_eq!(forecasts[0].status, ForecastStatus::Warning);
    }

    #[test]
    fn test_russian_narrative() {
        let forecasts = synthesize(&[], None, &points(&[0.65]), Locale::Ru);
        assert_eq!(forecasts[0].narrative, "Риск гипоксии: 65% (высокий)");
        assert_eq!(forecasts[0].status, ForecastStatus::Warning);
    }
}
