//! Fatigue phase classification and phase-run segmentation
//!
//! The classifier smooths `ewma_stress` a second time, differences it, smooths
//! the difference, and buckets the result against a symmetric tolerance. The
//! run aggregator then collapses consecutive same-phase sessions of one
//! exercise into [`PhaseRun`] summaries that partition the exercise's history.

use tracing::{debug, info};

use crate::error::{CalculationError, Result};
use crate::load::{ewma, ewma_optional};
use crate::models::{sort_by_exercise_date, FatiguePhase, LiftDayRow, PhaseMetrics, PhaseRun};

/// Classify every lift day into a fatigue phase
///
/// Rows are re-sorted by exercise then date. The first session of each
/// exercise has no slope and is therefore `Stable`.
pub fn add_fatigue_phase(
    rows: &mut [LiftDayRow],
    phase_span: u32,
    slope_span: u32,
    tol: f64,
) -> Result<()> {
    if rows.iter().any(|r| r.load.is_none()) {
        return Err(CalculationError::MissingStage {
            stage: "fatigue phase classifier",
            required: "rolling load engine",
        }
        .into());
    }

    sort_by_exercise_date(rows);

    for partition in rows.chunk_by_mut(|a, b| a.exercise == b.exercise) {
        let ewma_stress: Vec<f64> = partition
            .iter()
            .map(|r| r.ewma_stress().unwrap_or_default())
            .collect();

        let smooth = ewma(&ewma_stress, phase_span);
        let slope: Vec<Option<f64>> = std::iter::once(None)
            .chain(smooth.windows(2).map(|w| Some(w[1] - w[0])))
            .collect();
        let slope_smooth = ewma_optional(&slope, slope_span);

        let mut previous_phase: Option<FatiguePhase> = None;
        let mut sessions_in_phase = 0u32;

        for (i, row) in partition.iter_mut().enumerate() {
            let fatigue_phase = FatiguePhase::classify(slope_smooth[i], tol);

            sessions_in_phase = if previous_phase == Some(fatigue_phase) {
                sessions_in_phase + 1
            } else {
                1
            };
            previous_phase = Some(fatigue_phase);

            row.phase = Some(PhaseMetrics {
                ewma_smooth: smooth[i],
                ewma_slope: slope[i],
                ewma_slope_smooth: slope_smooth[i],
                ewma_slope_magnitude: slope_smooth[i].map(f64::abs),
                fatigue_phase,
                sessions_in_phase,
            });
        }

        debug!(
            exercise = %partition[0].exercise,
            current_phase = ?previous_phase,
            "Classified fatigue phases"
        );
    }

    Ok(())
}

/// Running totals for the run currently being built
struct RunBuilder<'a> {
    first: &'a LiftDayRow,
    last: &'a LiftDayRow,
    phase: FatiguePhase,
    ewma_sum: f64,
    stress_sum: f64,
    sessions: u32,
}

impl<'a> RunBuilder<'a> {
    fn start(row: &'a LiftDayRow, phase: FatiguePhase) -> Self {
        RunBuilder {
            first: row,
            last: row,
            phase,
            ewma_sum: row.ewma_stress().unwrap_or_default(),
            stress_sum: row.stress_value().unwrap_or_default(),
            sessions: 1,
        }
    }

    fn push(&mut self, row: &'a LiftDayRow) {
        self.last = row;
        self.ewma_sum += row.ewma_stress().unwrap_or_default();
        self.stress_sum += row.stress_value().unwrap_or_default();
        self.sessions += 1;
    }

    fn finish(self, run_index: u32) -> PhaseRun {
        let n = self.sessions as f64;
        PhaseRun {
            exercise: self.first.exercise.clone(),
            run_index,
            phase: self.phase,
            start_date: self.first.date,
            end_date: self.last.date,
            calendar_days: (self.last.date - self.first.date).num_days() + 1,
            mean_ewma_stress: self.ewma_sum / n,
            mean_stress: self.stress_sum / n,
            session_count: self.sessions,
        }
    }
}

/// Collapse consecutive same-phase sessions into phase runs
///
/// A run boundary is any row whose phase differs from the previous row of the
/// same exercise; the first row of each exercise always opens a run. The
/// input is not reordered; rows are visited in exercise/date order.
pub fn aggregate_phase_runs(rows: &[LiftDayRow]) -> Result<Vec<PhaseRun>> {
    if rows.iter().any(|r| r.phase.is_none()) {
        return Err(CalculationError::MissingStage {
            stage: "phase run aggregator",
            required: "fatigue phase classifier",
        }
        .into());
    }

    let mut ordered: Vec<&LiftDayRow> = rows.iter().collect();
    ordered.sort_by(|a, b| a.exercise.cmp(&b.exercise).then(a.date.cmp(&b.date)));

    let mut runs = Vec::new();
    for exercise_rows in ordered.chunk_by(|a, b| a.exercise == b.exercise) {
        let mut run_index = 0u32;
        let mut current: Option<RunBuilder> = None;

        for &row in exercise_rows {
            let phase = row.fatigue_phase().unwrap_or(FatiguePhase::Stable);
            if let Some(run) = current.as_mut() {
                if run.phase == phase {
                    run.push(row);
                    continue;
                }
            }

            if let Some(done) = current.replace(RunBuilder::start(row, phase)) {
                run_index += 1;
                runs.push(done.finish(run_index));
            }
        }

        if let Some(done) = current {
            run_index += 1;
            runs.push(done.finish(run_index));
        }
    }

    info!(lift_days = rows.len(), phase_runs = runs.len(), "Aggregated phase runs");
    Ok(runs)
}
