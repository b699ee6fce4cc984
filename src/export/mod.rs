use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{ExportError, Result};
use crate::models::SetRecord;
use crate::pipeline::PipelineOutput;

pub mod csv;
pub mod json;

/// File names of the per-stage artifacts written by a full run
pub struct ArtifactNames;

impl ArtifactNames {
    pub const SETS: &'static str = "training_sets_normalized.csv";
    pub const LIFT_DAYS: &'static str = "training_lift_day_aggregates.csv";
    pub const PHASE_RUNS: &'static str = "fatigue_phase_summary.csv";
    pub const GLOBAL_DAILY: &'static str = "global_daily_fatigue.csv";
}

/// Paths written by [`export_all`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArtifacts {
    pub sets: PathBuf,
    pub lift_days: PathBuf,
    pub phase_runs: PathBuf,
    pub global_daily: PathBuf,
}

/// Write every stage table of one run into `output_dir`
pub fn export_all(
    sets: &[SetRecord],
    output: &PipelineOutput,
    windows: &[u32],
    output_dir: &Path,
) -> Result<WrittenArtifacts> {
    fs::create_dir_all(output_dir).map_err(|e| ExportError::WriteFailed {
        path: output_dir.to_path_buf(),
        reason: e.to_string(),
    })?;

    let written = WrittenArtifacts {
        sets: output_dir.join(ArtifactNames::SETS),
        lift_days: output_dir.join(ArtifactNames::LIFT_DAYS),
        phase_runs: output_dir.join(ArtifactNames::PHASE_RUNS),
        global_daily: output_dir.join(ArtifactNames::GLOBAL_DAILY),
    };

    csv::export_sets(sets, &written.sets)?;
    csv::export_lift_days(&output.lift_days, windows, &written.lift_days)?;
    csv::export_phase_runs(&output.phase_runs, &written.phase_runs)?;
    csv::export_global_daily(&output.global_daily, windows, &written.global_daily)?;

    info!(dir = %output_dir.display(), "Wrote stage artifacts");
    Ok(written)
}
