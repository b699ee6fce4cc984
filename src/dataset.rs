//! Regression-ready feature matrix
//!
//! Model fitting happens outside this crate; this module hands the fitter a
//! fixed-width numeric matrix. The categorical fatigue phase becomes two
//! dummy columns against a validated baseline phase.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::models::{filter_exercise, FatiguePhase, LiftDayRow};

/// Dummy encoding of [`FatiguePhase`] against a baseline category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseEncoder {
    baseline: FatiguePhase,
}

impl PhaseEncoder {
    pub fn new(baseline: FatiguePhase) -> Self {
        PhaseEncoder { baseline }
    }

    /// Parse the baseline from user input, rejecting unknown phases
    pub fn from_baseline_name(name: &str) -> Result<Self> {
        Ok(Self::new(name.parse()?))
    }

    pub fn baseline(&self) -> FatiguePhase {
        self.baseline
    }

    /// The two non-baseline phases, in canonical order
    pub fn encoded_phases(&self) -> [FatiguePhase; 2] {
        let mut phases = FatiguePhase::ALL.iter().filter(|&&p| p != self.baseline);
        // ALL has three distinct phases, so two remain
        let first = phases.next().copied().unwrap_or(FatiguePhase::Stable);
        let second = phases.next().copied().unwrap_or(FatiguePhase::Stable);
        [first, second]
    }

    /// Column names of the dummy variables
    pub fn column_names(&self) -> [String; 2] {
        self.encoded_phases()
            .map(|phase| format!("fatigue_phase_{}", phase.as_str()))
    }

    /// One-hot vector; the baseline phase encodes as all zeros
    pub fn encode(&self, phase: FatiguePhase) -> [f64; 2] {
        self.encoded_phases()
            .map(|p| if p == phase { 1.0 } else { 0.0 })
    }
}

impl Default for PhaseEncoder {
    fn default() -> Self {
        PhaseEncoder::new(FatiguePhase::Accumulating)
    }
}

/// Feature rows for one exercise, with `max_weight` as the target
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDataset {
    pub exercise_pattern: String,
    pub columns: Vec<String>,
    pub dates: Vec<NaiveDate>,
    pub features: Vec<Vec<f64>>,
    pub target: Vec<f64>,

    /// Matching rows dropped for an undefined feature
    pub dropped_rows: usize,
}

impl ModelDataset {
    pub const TARGET: &'static str = "max_weight";

    /// Build the dataset for lift days matching `exercise_pattern`
    ///
    /// Rows with any undefined feature (typically each exercise's first
    /// session) are dropped. Returns `None` when no lift day matches.
    pub fn build(
        rows: &[LiftDayRow],
        exercise_pattern: &str,
        encoder: &PhaseEncoder,
    ) -> Option<Self> {
        let matched = filter_exercise(rows, exercise_pattern)?;

        let mut columns = vec![
            "ewma_stress".to_string(),
            "days_since_last_session".to_string(),
        ];
        columns.extend(encoder.column_names());
        columns.push("ewma_slope_magnitude".to_string());
        columns.push("sessions_in_phase".to_string());

        let mut dates = Vec::new();
        let mut features = Vec::new();
        let mut target = Vec::new();

        for row in &matched {
            let Some(vector) = Self::feature_vector(row, encoder) else {
                continue;
            };
            dates.push(row.date);
            features.push(vector);
            target.push(row.max_weight);
        }

        let dropped_rows = matched.len() - features.len();
        info!(
            exercise = exercise_pattern,
            rows = features.len(),
            dropped_rows,
            "Built model dataset"
        );

        Some(ModelDataset {
            exercise_pattern: exercise_pattern.to_string(),
            columns,
            dates,
            features,
            target,
            dropped_rows,
        })
    }

    fn feature_vector(row: &LiftDayRow, encoder: &PhaseEncoder) -> Option<Vec<f64>> {
        let load = row.load.as_ref()?;
        let phase = row.phase.as_ref()?;
        let days_since = load.days_since_last_session? as f64;
        let slope_magnitude = phase.ewma_slope_magnitude?;

        let mut vector = vec![load.ewma_stress, days_since];
        vector.extend(encoder.encode(phase.fatigue_phase));
        vector.push(slope_magnitude);
        vector.push(phase.sessions_in_phase as f64);
        Some(vector)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
