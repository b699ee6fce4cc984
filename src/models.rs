use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LiftRsError;

/// One logged working set, as produced by the session loader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetRecord {
    /// Calendar date of the session (time of day discarded)
    pub date: NaiveDate,

    /// Original session timestamp, kept for stable ordering
    pub datetime: NaiveDateTime,

    /// Workout name, lowercased ("unknown" when absent)
    pub workout: String,

    /// Exercise name, lowercased and trimmed
    pub exercise: String,

    /// Set order within the exercise, if logged
    pub set_order: Option<u32>,

    /// Load lifted (always > 0)
    pub weight: f64,

    /// Repetitions performed (always > 0)
    pub reps: f64,

    /// Rate of perceived exertion in [0, 10]
    pub rpe: Option<f64>,

    /// weight × reps
    pub volume: f64,
}

impl SetRecord {
    /// Build a set record, deriving `date` and `volume`
    pub fn new(
        datetime: NaiveDateTime,
        exercise: impl Into<String>,
        weight: f64,
        reps: f64,
        rpe: Option<f64>,
    ) -> Self {
        SetRecord {
            date: datetime.date(),
            datetime,
            workout: "unknown".to_string(),
            exercise: exercise.into(),
            set_order: None,
            weight,
            reps,
            rpe,
            volume: weight * reps,
        }
    }
}

/// Stress columns appended by the stress calculator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StressMetrics {
    /// Pure volume stress
    pub stress_volume: f64,

    /// Volume weighted by mean RPE, undefined without RPE
    pub stress_rpe: Option<f64>,

    /// Selected stress signal
    pub stress: f64,
}

/// Trailing-window stress sum for one configured window size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollingStress {
    /// Window size in observations
    pub window: u32,

    /// Sum of stress over the window
    pub sum: f64,
}

impl RollingStress {
    /// Column name used in exported tables
    pub fn column_name(window: u32) -> String {
        format!("rolling_stress_{}d", window)
    }
}

/// Load columns appended by the rolling/EWMA engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadMetrics {
    /// One entry per configured window, in configuration order
    pub rolling_stress: Vec<RollingStress>,

    /// Exponentially weighted stress
    pub ewma_stress: f64,

    /// Calendar days since the previous session of the same exercise
    pub days_since_last_session: Option<i64>,
}

/// Phase columns appended by the fatigue phase classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseMetrics {
    /// Second-pass EWMA of `ewma_stress`
    pub ewma_smooth: f64,

    /// First difference of `ewma_smooth`; undefined on an exercise's first row
    pub ewma_slope: Option<f64>,

    /// EWMA of `ewma_slope`
    pub ewma_slope_smooth: Option<f64>,

    /// |ewma_slope_smooth|
    pub ewma_slope_magnitude: Option<f64>,

    /// Classified phase
    pub fatigue_phase: FatiguePhase,

    /// 1-based position of this session within its phase run
    pub sessions_in_phase: u32,
}

/// One exercise on one calendar date, enriched stage by stage
///
/// Each stage only fills its own block; earlier columns are never rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiftDayRow {
    pub date: NaiveDate,
    pub exercise: String,
    pub total_volume: f64,
    pub max_weight: f64,
    pub total_sets: u32,
    pub total_reps: f64,

    /// Mean RPE over sets with RPE recorded
    pub mean_rpe: Option<f64>,

    /// Fraction of sets with RPE recorded, in [0, 1]
    pub rpe_coverage: f64,

    pub stress: Option<StressMetrics>,
    pub load: Option<LoadMetrics>,
    pub phase: Option<PhaseMetrics>,
}

impl LiftDayRow {
    /// Selected stress value, if the stress calculator has run
    pub fn stress_value(&self) -> Option<f64> {
        self.stress.map(|s| s.stress)
    }

    /// EWMA stress, if the load engine has run
    pub fn ewma_stress(&self) -> Option<f64> {
        self.load.as_ref().map(|l| l.ewma_stress)
    }

    /// Rolling stress sum for `window`, if configured and computed
    pub fn rolling_stress(&self, window: u32) -> Option<f64> {
        self.load
            .as_ref()?
            .rolling_stress
            .iter()
            .find(|r| r.window == window)
            .map(|r| r.sum)
    }

    /// Fatigue phase, if the classifier has run
    pub fn fatigue_phase(&self) -> Option<FatiguePhase> {
        self.phase.map(|p| p.fatigue_phase)
    }
}

/// Stable sort into per-exercise, date-ascending order
///
/// Every per-exercise stage calls this on entry rather than trusting the
/// caller's ordering.
pub fn sort_by_exercise_date(rows: &mut [LiftDayRow]) {
    rows.sort_by(|a, b| a.exercise.cmp(&b.exercise).then(a.date.cmp(&b.date)));
}

/// Rows whose exercise name contains `pattern`; `None` when nothing matches
pub fn filter_exercise<'a>(rows: &'a [LiftDayRow], pattern: &str) -> Option<Vec<&'a LiftDayRow>> {
    let pattern = pattern.trim().to_lowercase();
    let matched: Vec<&LiftDayRow> = rows
        .iter()
        .filter(|row| row.exercise.contains(&pattern))
        .collect();

    if matched.is_empty() {
        None
    } else {
        Some(matched)
    }
}

/// Direction of the smoothed fatigue trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FatiguePhase {
    Accumulating,
    Recovering,
    Stable,
}

impl FatiguePhase {
    /// Every phase, in canonical order
    pub const ALL: [FatiguePhase; 3] = [
        FatiguePhase::Accumulating,
        FatiguePhase::Recovering,
        FatiguePhase::Stable,
    ];

    /// Classify a smoothed slope against a symmetric tolerance
    ///
    /// Both boundaries are exclusive. An undefined slope is `Stable`: neither
    /// comparison can hold for it.
    pub fn classify(slope: Option<f64>, tol: f64) -> Self {
        match slope {
            Some(s) if s > tol => FatiguePhase::Accumulating,
            Some(s) if s < -tol => FatiguePhase::Recovering,
            _ => FatiguePhase::Stable,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FatiguePhase::Accumulating => "accumulating",
            FatiguePhase::Recovering => "recovering",
            FatiguePhase::Stable => "stable",
        }
    }
}

impl fmt::Display for FatiguePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FatiguePhase {
    type Err = LiftRsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "accumulating" => Ok(FatiguePhase::Accumulating),
            "recovering" => Ok(FatiguePhase::Recovering),
            "stable" => Ok(FatiguePhase::Stable),
            other => Err(LiftRsError::Configuration(format!(
                "Unknown fatigue phase '{}', expected one of accumulating, recovering, stable",
                other
            ))),
        }
    }
}

/// Maximal run of consecutive sessions sharing one phase, for one exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseRun {
    pub exercise: String,

    /// 1-based run number within the exercise
    pub run_index: u32,

    #[serde(rename = "fatigue_phase")]
    pub phase: FatiguePhase,

    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    /// Elapsed days, inclusive of both ends
    pub calendar_days: i64,

    pub mean_ewma_stress: f64,
    pub mean_stress: f64,

    /// Lift-day rows inside the run
    pub session_count: u32,
}

/// Whole-body view of one calendar date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalDailyRow {
    pub date: NaiveDate,

    /// Sum of stress across exercises
    pub total_stress: f64,

    /// Cross-exercise EWMA stress (mean or sum, per configuration)
    pub ewma_stress: f64,

    /// Distinct exercises trained
    pub num_lifts: u32,

    /// Rolling sums added up across exercises
    pub rolling_stress: Vec<RollingStress>,
}

/// Hypothetical future training regime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioMode {
    /// Keep training at the recent mean stress
    Maintain,
    /// Train at a fraction of the recent mean stress
    Reduce,
    /// No training stress at all
    Deload,
}

impl ScenarioMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioMode::Maintain => "maintain",
            ScenarioMode::Reduce => "reduce",
            ScenarioMode::Deload => "deload",
        }
    }
}

impl fmt::Display for ScenarioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioMode {
    type Err = LiftRsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "maintain" => Ok(ScenarioMode::Maintain),
            "reduce" => Ok(ScenarioMode::Reduce),
            "deload" => Ok(ScenarioMode::Deload),
            other => Err(LiftRsError::Configuration(format!(
                "Unknown scenario mode: {}",
                other
            ))),
        }
    }
}

/// One projected day of a scenario forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    /// 1..=horizon
    pub day_ahead: u32,
    pub assumed_stress: f64,
    pub forecasted_ewma: f64,
    pub scenario: ScenarioMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn bare_row(exercise: &str, date: NaiveDate) -> LiftDayRow {
        LiftDayRow {
            date,
            exercise: exercise.to_string(),
            total_volume: 1000.0,
            max_weight: 100.0,
            total_sets: 2,
            total_reps: 10.0,
            mean_rpe: None,
            rpe_coverage: 0.0,
            stress: None,
            load: None,
            phase: None,
        }
    }

    #[test]
    fn test_classification_boundaries_are_exclusive() {
        let tol = 5.0;
        assert_eq!(FatiguePhase::classify(Some(tol + 1.0), tol), FatiguePhase::Accumulating);
        assert_eq!(FatiguePhase::classify(Some(-tol - 1.0), tol), FatiguePhase::Recovering);
        assert_eq!(FatiguePhase::classify(Some(0.0), tol), FatiguePhase::Stable);
        assert_eq!(FatiguePhase::classify(Some(tol), tol), FatiguePhase::Stable);
        assert_eq!(FatiguePhase::classify(Some(-tol), tol), FatiguePhase::Stable);
    }

    #[test]
    fn test_undefined_slope_is_stable() {
        // First observation of an exercise has no slope; it lands in Stable.
        assert_eq!(FatiguePhase::classify(None, 5.0), FatiguePhase::Stable);
        assert_eq!(FatiguePhase::classify(Some(f64::NAN), 5.0), FatiguePhase::Stable);
    }

    #[test]
    fn test_phase_parsing() {
        assert_eq!("Recovering".parse::<FatiguePhase>().unwrap(), FatiguePhase::Recovering);
        assert!("tapering".parse::<FatiguePhase>().is_err());
    }

    #[test]
    fn test_unknown_scenario_mode_rejected() {
        assert_eq!("deload".parse::<ScenarioMode>().unwrap(), ScenarioMode::Deload);
        let err = "taper".parse::<ScenarioMode>().unwrap_err();
        assert!(matches!(err, LiftRsError::Configuration(_)));
        assert!(err.to_string().contains("taper"));
    }

    #[test]
    fn test_sort_by_exercise_date() {
        let mut rows = vec![
            bare_row("squat", day(2)),
            bare_row("bench press", day(3)),
            bare_row("squat", day(1)),
            bare_row("bench press", day(1)),
        ];
        sort_by_exercise_date(&mut rows);

        let order: Vec<(&str, u32)> = rows
            .iter()
            .map(|r| (r.exercise.as_str(), chrono::Datelike::day(&r.date)))
            .collect();
        assert_eq!(
            order,
            vec![("bench press", 1), ("bench press", 3), ("squat", 1), ("squat", 2)]
        );
    }

    #[test]
    fn test_filter_exercise() {
        let rows = vec![
            bare_row("bench press (barbell)", day(1)),
            bare_row("incline bench press (dumbbell)", day(1)),
            bare_row("squat (barbell)", day(1)),
        ];
        assert_eq!(filter_exercise(&rows, "Bench Press").map(|r| r.len()), Some(2));
        assert!(filter_exercise(&rows, "deadlift").is_none());
    }

    #[test]
    fn test_rolling_lookup() {
        let mut row = bare_row("squat", day(1));
        assert_eq!(row.rolling_stress(7), None);
        row.load = Some(LoadMetrics {
            rolling_stress: vec![RollingStress { window: 7, sum: 42.0 }],
            ewma_stress: 10.0,
            days_since_last_session: None,
        });
        assert_eq!(row.rolling_stress(7), Some(42.0));
        assert_eq!(row.rolling_stress(14), None);
        assert_eq!(RollingStress::column_name(14), "rolling_stress_14d");
    }
}
