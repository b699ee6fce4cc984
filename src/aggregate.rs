use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::info;

use crate::models::{LiftDayRow, SetRecord};

/// Running totals for one (date, exercise) group
#[derive(Debug, Default)]
struct DayAccumulator {
    total_volume: f64,
    max_weight: f64,
    total_sets: u32,
    total_reps: f64,
    rpe_sum: f64,
    rpe_count: u32,
}

impl DayAccumulator {
    fn add(&mut self, set: &SetRecord) {
        self.total_volume += set.volume;
        self.max_weight = self.max_weight.max(set.weight);
        self.total_sets += 1;
        self.total_reps += set.reps;
        if let Some(rpe) = set.rpe {
            self.rpe_sum += rpe;
            self.rpe_count += 1;
        }
    }

    fn into_row(self, date: NaiveDate, exercise: String) -> LiftDayRow {
        let mean_rpe = if self.rpe_count > 0 {
            Some(self.rpe_sum / self.rpe_count as f64)
        } else {
            None
        };

        LiftDayRow {
            date,
            exercise,
            total_volume: self.total_volume,
            max_weight: self.max_weight,
            total_sets: self.total_sets,
            total_reps: self.total_reps,
            mean_rpe,
            rpe_coverage: self.rpe_count as f64 / self.total_sets as f64,
            stress: None,
            load: None,
            phase: None,
        }
    }
}

/// Collapse set-level records into one row per (date, exercise)
///
/// Output is ordered by date, then exercise. Empty input gives empty output.
pub fn aggregate_lift_days(sets: &[SetRecord]) -> Vec<LiftDayRow> {
    let mut groups: BTreeMap<(NaiveDate, String), DayAccumulator> = BTreeMap::new();

    for set in sets {
        groups
            .entry((set.date, set.exercise.clone()))
            .or_default()
            .add(set);
    }

    let rows: Vec<LiftDayRow> = groups
        .into_iter()
        .map(|((date, exercise), acc)| acc.into_row(date, exercise))
        .collect();

    info!(sets = sets.len(), lift_days = rows.len(), "Aggregated lift days");
    rows
}
