//! Flat delimited tables, one per pipeline stage
//!
//! Undefined values are written as empty cells. Column sets only ever grow,
//! so readers should select by header name rather than position.

use ::csv::{Writer, WriterBuilder};
use serde::Serialize;
use std::path::Path;

use crate::error::Result;
use crate::models::{GlobalDailyRow, LiftDayRow, PhaseRun, RollingStress, SetRecord};

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(String::new, |v| v.to_string())
}

/// Columns of the normalized set table, in `SetRecord` field order
pub const SET_HEADER: [&str; 9] = [
    "date",
    "datetime",
    "workout",
    "exercise",
    "set_order",
    "weight",
    "reps",
    "rpe",
    "volume",
];

/// Columns of the phase-run table, in `PhaseRun` field order
pub const PHASE_RUN_HEADER: [&str; 9] = [
    "exercise",
    "run_index",
    "fatigue_phase",
    "start_date",
    "end_date",
    "calendar_days",
    "mean_ewma_stress",
    "mean_stress",
    "session_count",
];

/// Serialize records under a fixed header, written even when `records` is empty
fn write_records<T: Serialize, P: AsRef<Path>>(
    header: &[&str],
    records: &[T],
    output_path: P,
) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(output_path)?;
    writer.write_record(header)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Export normalized set records
pub fn export_sets<P: AsRef<Path>>(sets: &[SetRecord], output_path: P) -> Result<()> {
    write_records(&SET_HEADER, sets, output_path)
}

/// Export phase-run summaries
pub fn export_phase_runs<P: AsRef<Path>>(runs: &[PhaseRun], output_path: P) -> Result<()> {
    write_records(&PHASE_RUN_HEADER, runs, output_path)
}

/// Header of the lift-day table for the given rolling windows
pub fn lift_day_header(windows: &[u32]) -> Vec<String> {
    let mut header: Vec<String> = [
        "date",
        "exercise",
        "total_volume",
        "max_weight",
        "total_sets",
        "total_reps",
        "mean_rpe",
        "rpe_coverage",
        "stress_volume",
        "stress_rpe",
        "stress",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    header.extend(windows.iter().map(|&w| RollingStress::column_name(w)));

    header.extend(
        [
            "ewma_stress",
            "days_since_last_session",
            "ewma_smooth",
            "ewma_slope",
            "ewma_slope_smooth",
            "ewma_slope_magnitude",
            "fatigue_phase",
            "sessions_in_phase",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    header
}

fn lift_day_record(row: &LiftDayRow, windows: &[u32]) -> Vec<String> {
    let stress = row.stress.as_ref();
    let load = row.load.as_ref();
    let phase = row.phase.as_ref();

    let mut record = vec![
        row.date.format("%Y-%m-%d").to_string(),
        row.exercise.clone(),
        row.total_volume.to_string(),
        row.max_weight.to_string(),
        row.total_sets.to_string(),
        row.total_reps.to_string(),
        opt(row.mean_rpe),
        row.rpe_coverage.to_string(),
        opt(stress.map(|s| s.stress_volume)),
        opt(stress.and_then(|s| s.stress_rpe)),
        opt(stress.map(|s| s.stress)),
    ];

    record.extend(windows.iter().map(|&w| opt(row.rolling_stress(w))));

    record.extend([
        opt(load.map(|l| l.ewma_stress)),
        opt(load.and_then(|l| l.days_since_last_session)),
        opt(phase.map(|p| p.ewma_smooth)),
        opt(phase.and_then(|p| p.ewma_slope)),
        opt(phase.and_then(|p| p.ewma_slope_smooth)),
        opt(phase.and_then(|p| p.ewma_slope_magnitude)),
        opt(phase.map(|p| p.fatigue_phase)),
        opt(phase.map(|p| p.sessions_in_phase)),
    ]);
    record
}

/// Export the enriched per-exercise-day table
pub fn export_lift_days<P: AsRef<Path>>(
    rows: &[LiftDayRow],
    windows: &[u32],
    output_path: P,
) -> Result<()> {
    let mut writer = Writer::from_path(output_path)?;
    writer.write_record(lift_day_header(windows))?;
    for row in rows {
        writer.write_record(lift_day_record(row, windows))?;
    }
    writer.flush()?;
    Ok(())
}

/// Export the whole-body daily table
pub fn export_global_daily<P: AsRef<Path>>(
    rows: &[GlobalDailyRow],
    windows: &[u32],
    output_path: P,
) -> Result<()> {
    let mut writer = Writer::from_path(output_path)?;

    let mut header = vec![
        "date".to_string(),
        "total_stress".to_string(),
        "ewma_stress".to_string(),
        "num_lifts".to_string(),
    ];
    header.extend(windows.iter().map(|&w| RollingStress::column_name(w)));
    writer.write_record(&header)?;

    for row in rows {
        let mut record = vec![
            row.date.format("%Y-%m-%d").to_string(),
            row.total_stress.to_string(),
            row.ewma_stress.to_string(),
            row.num_lifts.to_string(),
        ];
        record.extend(windows.iter().map(|&w| {
            opt(row
                .rolling_stress
                .iter()
                .find(|r| r.window == w)
                .map(|r| r.sum))
        }));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Export a regression feature matrix with its target column
pub fn export_model_dataset<P: AsRef<Path>>(
    dataset: &crate::dataset::ModelDataset,
    output_path: P,
) -> Result<()> {
    let mut writer = Writer::from_path(output_path)?;

    let mut header = vec!["date".to_string()];
    header.extend(dataset.columns.iter().cloned());
    header.push(crate::dataset::ModelDataset::TARGET.to_string());
    writer.write_record(&header)?;

    for ((date, features), target) in dataset
        .dates
        .iter()
        .zip(&dataset.features)
        .zip(&dataset.target)
    {
        let mut record = vec![date.format("%Y-%m-%d").to_string()];
        record.extend(features.iter().map(|v| v.to_string()));
        record.push(target.to_string());
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}
