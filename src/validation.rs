use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::{filter_exercise, LiftDayRow, PhaseRun, RollingStress};

/// Share of undefined values in one optional column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMissingness {
    pub column: String,
    pub missing_pct: f64,
}

/// Percentage of undefined values per optional column, highest first
///
/// Rolling columns are reported for every window seen on any row.
pub fn missingness(rows: &[LiftDayRow]) -> Vec<ColumnMissingness> {
    type Probe = fn(&LiftDayRow) -> bool;
    let probes: [(&str, Probe); 10] = [
        ("mean_rpe", |r| r.mean_rpe.is_none()),
        ("stress_rpe", |r| r.stress.and_then(|s| s.stress_rpe).is_none()),
        ("stress", |r| r.stress.is_none()),
        ("ewma_stress", |r| r.load.is_none()),
        ("days_since_last_session", |r| {
            r.load
                .as_ref()
                .and_then(|l| l.days_since_last_session)
                .is_none()
        }),
        ("ewma_smooth", |r| r.phase.is_none()),
        ("ewma_slope", |r| r.phase.and_then(|p| p.ewma_slope).is_none()),
        ("ewma_slope_smooth", |r| {
            r.phase.and_then(|p| p.ewma_slope_smooth).is_none()
        }),
        ("ewma_slope_magnitude", |r| {
            r.phase.and_then(|p| p.ewma_slope_magnitude).is_none()
        }),
        ("fatigue_phase", |r| r.phase.is_none()),
    ];

    let total = rows.len().max(1) as f64;
    let pct = |missing: usize| missing as f64 / total * 100.0;

    let mut report: Vec<ColumnMissingness> = probes
        .iter()
        .map(|(column, is_missing)| ColumnMissingness {
            column: column.to_string(),
            missing_pct: pct(rows.iter().filter(|r| is_missing(r)).count()),
        })
        .collect();

    let windows: BTreeSet<u32> = rows
        .iter()
        .filter_map(|r| r.load.as_ref())
        .flat_map(|l| l.rolling_stress.iter().map(|rs| rs.window))
        .collect();
    report.extend(windows.into_iter().map(|w| ColumnMissingness {
        column: RollingStress::column_name(w),
        missing_pct: pct(rows.iter().filter(|r| r.rolling_stress(w).is_none()).count()),
    }));

    report.sort_by(|a, b| b.missing_pct.total_cmp(&a.missing_pct));
    report
}

/// Lift days found inside one phase run's date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunCoverage {
    pub run: PhaseRun,
    pub computed_lift_days: usize,
}

/// Whether phase runs account for every lift day of an exercise exactly once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub exercise: String,
    pub runs: Vec<RunCoverage>,
    pub lift_days: usize,
    pub covered: usize,
    pub double_counted: usize,
}

impl CoverageReport {
    pub fn is_complete(&self) -> bool {
        self.covered == self.lift_days && self.double_counted == 0
    }
}

/// Cross-check phase runs against lift days, one report per exercise
///
/// Returns `None` when no lift day matches `pattern`.
pub fn phase_coverage(
    rows: &[LiftDayRow],
    runs: &[PhaseRun],
    pattern: &str,
) -> Option<Vec<CoverageReport>> {
    let matched = filter_exercise(rows, pattern)?;

    let mut exercises: Vec<&str> = matched.iter().map(|r| r.exercise.as_str()).collect();
    exercises.sort_unstable();
    exercises.dedup();

    let reports = exercises
        .into_iter()
        .map(|exercise| {
            let days: Vec<&LiftDayRow> = matched
                .iter()
                .copied()
                .filter(|r| r.exercise == exercise)
                .collect();
            let mut hits = vec![0usize; days.len()];

            let run_coverage: Vec<RunCoverage> = runs
                .iter()
                .filter(|run| run.exercise == exercise)
                .map(|run| {
                    let mut count = 0;
                    for (i, day) in days.iter().enumerate() {
                        if day.date >= run.start_date && day.date <= run.end_date {
                            hits[i] += 1;
                            count += 1;
                        }
                    }
                    RunCoverage {
                        run: run.clone(),
                        computed_lift_days: count,
                    }
                })
                .collect();

            CoverageReport {
                exercise: exercise.to_string(),
                runs: run_coverage,
                lift_days: days.len(),
                covered: hits.iter().filter(|&&h| h > 0).count(),
                double_counted: hits.iter().filter(|&&h| h > 1).count(),
            }
        })
        .collect();

    Some(reports)
}
