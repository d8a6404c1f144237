//! Storage boundary
//!
//! `SessionRecord` is the flat row a collaborator persists for one analysed
//! session. Structured results are carried as JSON text columns and only
//! turned back into typed values here.

use crate::analysis::{AnalysisResult, AnalysisStatistics, BaselineMetrics, ClassifierOutcome, RhythmStatus};
use crate::forecast::{ForecastHorizon, Horizon};
use crate::hypoxia::HypoxiaPoint;
use crate::predictor::OutcomePrediction;
use crate::risk::Standard;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Module name the predictor's output is reported under
pub const PREDICTOR_MODULE: &str = "AI";

/// One persisted session row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub baseline_fhr: f64,
    pub variability: f64,
    pub accelerations_count: usize,
    pub decelerations_count: usize,
    /// Rhythm status from the baseline
    pub status: RhythmStatus,
    pub figo_result: Option<String>,
    pub nichd_result: Option<String>,
    pub ai_result: Option<String>,
    pub forecast_15min: Option<String>,
    pub forecast_30min: Option<String>,
    pub forecast_60min: Option<String>,
    pub hypoxia_risk: String,
    pub statistics: String,
    pub analyzed_at: DateTime<Utc>,
}

/// One module's contribution to the detailed statistics view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSource {
    pub module: String,
    pub data: serde_json::Value,
}

/// Counts plus the raw output of every module that ran
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedStatistics {
    pub baseline_fhr: f64,
    pub variability: f64,
    pub accelerations: usize,
    pub decelerations: usize,
    pub status: RhythmStatus,
    pub sources: Vec<StatisticsSource>,
}

fn to_column<T: Serialize>(value: Option<&T>) -> Result<Option<String>> {
    value.map(serde_json::to_string).transpose().map_err(Into::into)
}

fn from_column<T: for<'de> Deserialize<'de>>(column: Option<&String>) -> Result<Option<T>> {
    column.map(|s| serde_json::from_str(s)).transpose().map_err(Into::into)
}

impl SessionRecord {
    pub fn from_result(result: &AnalysisResult, analyzed_at: DateTime<Utc>) -> Result<Self> {
        Ok(SessionRecord {
            baseline_fhr: result.metrics.baseline_bpm,
            variability: result.metrics.variability_ms,
            accelerations_count: result.metrics.acceleration_count,
            decelerations_count: result.metrics.deceleration_count,
            status: result.rhythm,
            figo_result: to_column(result.classification(Standard::FigoNice))?,
            nichd_result: to_column(result.classification(Standard::NichdAcog))?,
            ai_result: to_column(result.prediction.as_ref())?,
            forecast_15min: to_column(result.forecast(Horizon::Min15))?,
            forecast_30min: to_column(result.forecast(Horizon::Min30))?,
            forecast_60min: to_column(result.forecast(Horizon::Min60))?,
            hypoxia_risk: serde_json::to_string(&result.hypoxia_risk)?,
            statistics: serde_json::to_string(&result.statistics)?,
            analyzed_at,
        })
    }

    /// Rebuild the typed result this row was made from
    pub fn to_result(&self) -> Result<AnalysisResult> {
        let metrics = BaselineMetrics::new(
            self.baseline_fhr,
            self.variability,
            self.accelerations_count,
            self.decelerations_count,
        );

        let classifications: Vec<ClassifierOutcome> = [&self.figo_result, &self.nichd_result]
            .into_iter()
            .map(|column| from_column::<ClassifierOutcome>(column.as_ref()))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect();

        let forecasts: Vec<ForecastHorizon> = [&self.forecast_15min, &self.forecast_30min, &self.forecast_60min]
            .into_iter()
            .map(|column| from_column::<ForecastHorizon>(column.as_ref()))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect();

        let prediction: Option<OutcomePrediction> = from_column(self.ai_result.as_ref())?;
        let hypoxia_risk: Vec<HypoxiaPoint> = serde_json::from_str(&self.hypoxia_risk)?;
        let statistics: AnalysisStatistics = serde_json::from_str(&self.statistics)?;

        Ok(AnalysisResult {
            metrics,
            rhythm: self.status,
            classifications,
            prediction,
            hypoxia_risk,
            forecasts,
            statistics,
        })
    }

    pub fn detailed_statistics(&self) -> Result<DetailedStatistics> {
        let columns = [
            (Standard::FigoNice.name(), &self.figo_result),
            (Standard::NichdAcog.name(), &self.nichd_result),
            (PREDICTOR_MODULE, &self.ai_result),
        ];

        let mut sources = Vec::new();
        for (module, column) in columns {
            if let Some(data) = from_column::<serde_json::Value>(column.as_ref())? {
                sources.push(StatisticsSource { module: module.to_string(), data });
            }
        }

        Ok(DetailedStatistics {
            baseline_fhr: self.baseline_fhr,
            variability: self.variability,
            accelerations: self.accelerations_count,
            decelerations: self.decelerations_count,
            status: self.status,
            sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AnalysisConfig, AnalysisInput, CtgAnalyzer, RiskFactorSet, TimeSeries};
    use chrono::TimeZone;

    fn analyzed_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap()
    }

    fn result(config: AnalysisConfig) -> AnalysisResult {
        let fhr: Vec<f64> = (0..240).map(|i| if i % 2 == 0 { 138.5 } else { 151.25 }).collect();
        let input = AnalysisInput::new(
            TimeSeries::fhr_from_values(&fhr).unwrap(),
            TimeSeries::uc_from_values(&[12.0; 240]).unwrap(),
            RiskFactorSet::none(),
        );
        CtgAnalyzer::new(config).unwrap().analyze(&input).unwrap()
    }

    #[test]
    fn test_columns() {
        let record = SessionRecord::from_result(&result(AnalysisConfig::default()), analyzed_at()).unwrap();
        assert_eq!(record.status, RhythmStatus::Normal);
        assert!(record.figo_result.is_some());
        assert!(record.ai_result.is_some());
        assert!(record.forecast_60min.unwrap().contains("\"60min\""));
    }

    #[test]
    fn test_disabled_modules_leave_columns_empty() {
        let config = AnalysisConfig::default().with_nichd(false).with_predictor(false);
        let record = SessionRecord::from_result(&result(config), analyzed_at()).unwrap();
        assert!(record.nichd_result.is_none());
        assert!(record.ai_result.is_none());

        let stats = record.detailed_statistics().unwrap();
        assert_eq!(stats.sources.len(), 1);
        assert_eq!(stats.sources[0].module, "FIGO/NICE");
    }

    #[test]
    fn test_detailed_statistics_sources() {
        let record = SessionRecord::from_result(&result(AnalysisConfig::default()), analyzed_at()).unwrap();
        let stats = record.detailed_statistics().unwrap();

        let modules: Vec<&str> = stats.sources.iter().map(|s| s.module.as_str()).collect();
        assert_eq!(modules, vec!["FIGO/NICE", "NICHD/ACOG", "AI"]);
        assert_eq!(stats.sources[2].data["model_version"], "v1.0_heuristic");
    }

    #[test]
    fn test_corrupt_column_is_an_error() {
        let mut record = SessionRecord::from_result(&result(AnalysisConfig::default()), analyzed_at()).unwrap();
        record.hypoxia_risk = "{not json".to_string();
        assert!(record.to_result().is_err());
    }
}
