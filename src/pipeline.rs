use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use crate::aggregate::aggregate_lift_days;
use crate::error::{LiftRsError, Result};
use crate::global::{aggregate_global_daily, EwmaAggregation};
use crate::load::add_rolling_load;
use crate::models::{GlobalDailyRow, LiftDayRow, PhaseRun, SetRecord};
use crate::phase::{add_fatigue_phase, aggregate_phase_runs};
use crate::stress::add_stress_metrics;

/// Feature pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Trailing-row windows for rolling stress sums (default: 7, 14)
    pub stress_windows: Vec<u32>,

    /// EWMA span of the load signal `ewma_stress` (default: 7)
    pub load_span: u32,

    /// EWMA span of the second smoothing pass `ewma_smooth` (default: 14)
    pub phase_span: u32,

    /// EWMA span applied to the slope (default: 7)
    pub slope_span: u32,

    /// Slope tolerance separating stable from trending phases (default: 5)
    pub phase_tolerance: f64,

    /// Cross-exercise combination of `ewma_stress` in the global view
    pub global_ewma_aggregation: EwmaAggregation,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            stress_windows: vec![7, 14],
            load_span: 7,
            phase_span: 14,
            slope_span: 7,
            phase_tolerance: 5.0,
            global_ewma_aggregation: EwmaAggregation::Mean,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.stress_windows.is_empty() {
            return Err(LiftRsError::Configuration(
                "at least one stress window is required".to_string(),
            ));
        }
        if let Some(w) = self.stress_windows.iter().find(|&&w| w == 0) {
            return Err(LiftRsError::Configuration(format!(
                "stress windows must be positive, got {}",
                w
            )));
        }
        for (name, span) in [
            ("load_span", self.load_span),
            ("phase_span", self.phase_span),
            ("slope_span", self.slope_span),
        ] {
            if span == 0 {
                return Err(LiftRsError::Configuration(format!(
                    "{} must be at least 1",
                    name
                )));
            }
        }
        if !(self.phase_tolerance >= 0.0) {
            return Err(LiftRsError::Configuration(format!(
                "phase_tolerance must be non-negative, got {}",
                self.phase_tolerance
            )));
        }
        Ok(())
    }
}

/// Every table produced by one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Fully enriched lift days, ordered by exercise then date
    pub lift_days: Vec<LiftDayRow>,
    pub phase_runs: Vec<PhaseRun>,
    pub global_daily: Vec<GlobalDailyRow>,
}

/// Batch feature pipeline from set records to fatigue phases
pub struct FatiguePipeline {
    config: PipelineConfig,
}

impl FatiguePipeline {
    /// Create new pipeline with default configuration
    pub fn new() -> Self {
        FatiguePipeline {
            config: PipelineConfig::default(),
        }
    }

    /// Create new pipeline with custom configuration
    pub fn with_config(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(FatiguePipeline { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build the enriched per-exercise-day table
    pub fn enrich(&self, sets: &[SetRecord]) -> Result<Vec<LiftDayRow>> {
        let mut rows = aggregate_lift_days(sets);
        add_stress_metrics(&mut rows);
        add_rolling_load(&mut rows, &self.config.stress_windows, self.config.load_span)?;
        add_fatigue_phase(
            &mut rows,
            self.config.phase_span,
            self.config.slope_span,
            self.config.phase_tolerance,
        )?;
        Ok(rows)
    }

    /// Run every stage
    pub fn run(&self, sets: &[SetRecord]) -> Result<PipelineOutput> {
        let _span = info_span!("pipeline", sets = sets.len()).entered();

        let lift_days = self.enrich(sets)?;
        let phase_runs = aggregate_phase_runs(&lift_days)?;
        let global_daily =
            aggregate_global_daily(&lift_days, self.config.global_ewma_aggregation)?;

        info!(
            lift_days = lift_days.len(),
            phase_runs = phase_runs.len(),
            days = global_daily.len(),
            "Pipeline completed"
        );

        Ok(PipelineOutput {
            lift_days,
            phase_runs,
            global_daily,
        })
    }
}

impl Default for FatiguePipeline {
    fn default() -> Self {
        Self::new()
    }
}
