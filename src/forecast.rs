//! Scenario forecasting of the EWMA fatigue signal
//!
//! A scenario fixes a constant daily stress for the future (the recent mean,
//! a fraction of it, or nothing) and runs the same EWMA recurrence the load
//! engine uses forward from the last known `ewma_stress`.

use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, OrderStatistics, Statistics};
use tracing::debug;

use crate::error::{CalculationError, LiftRsError, Result};
use crate::load::span_alpha;
use crate::models::{ForecastRow, LiftDayRow, ScenarioMode};

/// Forecast configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// EWMA span used for the forward recurrence (default: 7)
    pub span: u32,

    /// Number of future days to project (default: 14)
    pub horizon: u32,

    /// Fraction of recent mean stress assumed by `reduce` (default: 0.7)
    pub reduce_scale: f64,

    /// Trailing observations averaged into the scenario stress (default: 7)
    pub recent_window: usize,

    /// Quantile of historical EWMA stress used as the default recovery
    /// threshold (default: 0.25)
    pub recovery_quantile: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        ForecastConfig {
            span: 7,
            horizon: 14,
            reduce_scale: 0.7,
            recent_window: 7,
            recovery_quantile: 0.25,
        }
    }
}

impl ForecastConfig {
    pub fn validate(&self) -> Result<()> {
        if self.span == 0 {
            return Err(LiftRsError::Configuration(
                "forecast span must be at least 1".to_string(),
            ));
        }
        if self.recent_window == 0 {
            return Err(LiftRsError::Configuration(
                "forecast recent_window must be at least 1".to_string(),
            ));
        }
        if !(self.reduce_scale >= 0.0) {
            return Err(LiftRsError::Configuration(format!(
                "forecast reduce_scale must be non-negative, got {}",
                self.reduce_scale
            )));
        }
        if !(0.0..=1.0).contains(&self.recovery_quantile) {
            return Err(LiftRsError::Configuration(format!(
                "recovery_quantile must be within [0, 1], got {}",
                self.recovery_quantile
            )));
        }
        Ok(())
    }
}

/// Run the EWMA recurrence over assumed future stress
pub fn forecast_ewma(last_ewma: f64, future_stress: &[f64], alpha: f64) -> Vec<f64> {
    let mut prev = last_ewma;
    future_stress
        .iter()
        .map(|&stress| {
            prev = alpha * stress + (1.0 - alpha) * prev;
            prev
        })
        .collect()
}

/// First day whose forecast EWMA falls strictly below `threshold`
pub fn days_until_recovery(forecast: &[ForecastRow], threshold: f64) -> Option<u32> {
    forecast
        .iter()
        .find(|row| row.forecasted_ewma < threshold)
        .map(|row| row.day_ahead)
}

/// Scenario forecast engine
pub struct ScenarioForecaster {
    config: ForecastConfig,
}

impl ScenarioForecaster {
    /// Create new forecaster with default configuration
    pub fn new() -> Self {
        ScenarioForecaster {
            config: ForecastConfig::default(),
        }
    }

    /// Create new forecaster with custom configuration
    pub fn with_config(config: ForecastConfig) -> Result<Self> {
        config.validate()?;
        Ok(ScenarioForecaster { config })
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Constant daily stress assumed by a scenario
    ///
    /// `stress_history` is only used through the mean of its most recent
    /// `recent_window` observations.
    pub fn scenario_stress(&self, stress_history: &[f64], mode: ScenarioMode) -> Result<f64> {
        if mode == ScenarioMode::Deload {
            return Ok(0.0);
        }

        if stress_history.is_empty() {
            return Err(CalculationError::InsufficientData {
                calculation: format!("{} scenario", mode),
                reason: "no stress history to average".to_string(),
            }
            .into());
        }

        let start = stress_history.len().saturating_sub(self.config.recent_window);
        let recent_mean = (&stress_history[start..]).mean();

        Ok(match mode {
            ScenarioMode::Maintain => recent_mean,
            ScenarioMode::Reduce => recent_mean * self.config.reduce_scale,
            ScenarioMode::Deload => 0.0,
        })
    }

    /// Project `horizon` days of EWMA fatigue under a scenario
    pub fn forecast(
        &self,
        stress_history: &[f64],
        last_ewma: f64,
        mode: ScenarioMode,
        horizon: u32,
    ) -> Result<Vec<ForecastRow>> {
        let assumed_stress = self.scenario_stress(stress_history, mode)?;
        let future_stress = vec![assumed_stress; horizon as usize];
        let projected = forecast_ewma(last_ewma, &future_stress, span_alpha(self.config.span));

        debug!(
            scenario = %mode,
            horizon,
            assumed_stress,
            last_ewma,
            final_ewma = projected.last().copied().unwrap_or(last_ewma),
            "Forecast fatigue scenario"
        );

        Ok(projected
            .into_iter()
            .zip(1..)
            .map(|(forecasted_ewma, day_ahead)| ForecastRow {
                day_ahead,
                assumed_stress,
                forecasted_ewma,
                scenario: mode,
            })
            .collect())
    }

    /// Forecast from the tail of one exercise's enriched lift days
    ///
    /// `rows` must be that exercise's history in date order. Returns `None`
    /// when there is no EWMA history to start from.
    pub fn forecast_history(
        &self,
        rows: &[&LiftDayRow],
        mode: ScenarioMode,
        horizon: u32,
    ) -> Result<Option<Vec<ForecastRow>>> {
        let Some(last_ewma) = rows.last().and_then(|r| r.ewma_stress()) else {
            return Ok(None);
        };

        let stress: Vec<f64> = rows.iter().filter_map(|r| r.stress_value()).collect();
        self.forecast(&stress, last_ewma, mode, horizon).map(Some)
    }

    /// Recovery threshold as the configured quantile of historical EWMA stress
    pub fn recovery_threshold(&self, rows: &[&LiftDayRow]) -> Option<f64> {
        let history: Vec<f64> = rows.iter().filter_map(|r| r.ewma_stress()).collect();
        if history.is_empty() {
            return None;
        }

        let mut data = Data::new(history);
        Some(data.quantile(self.config.recovery_quantile))
    }
}

impl Default for ScenarioForecaster {
    fn default() -> Self {
        Self::new()
    }
}

/// One scenario forecast together with its recovery estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    pub exercise: String,
    pub scenario: ScenarioMode,
    pub horizon: u32,
    pub recovery_threshold: Option<f64>,
    pub days_until_recovery: Option<u32>,
    pub forecast: Vec<ForecastRow>,
}

impl ForecastReport {
    pub fn new(
        exercise: &str,
        scenario: ScenarioMode,
        recovery_threshold: Option<f64>,
        forecast: Vec<ForecastRow>,
    ) -> Self {
        let days_until_recovery =
            recovery_threshold.and_then(|threshold| days_until_recovery(&forecast, threshold));
        ForecastReport {
            exercise: exercise.to_string(),
            scenario,
            horizon: forecast.len() as u32,
            recovery_threshold,
            days_until_recovery,
            forecast,
        }
    }
}
