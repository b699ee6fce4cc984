use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use liftrs::dataset::{ModelDataset, PhaseEncoder};
use liftrs::export::{export_all, ArtifactNames};
use liftrs::forecast::{days_until_recovery, ScenarioForecaster};
use liftrs::import::ImportManager;
use liftrs::models::{filter_exercise, FatiguePhase, ScenarioMode};
use liftrs::pipeline::{FatiguePipeline, PipelineConfig};
use liftrs::validation::{missingness, phase_coverage};
use liftrs::EwmaAggregation;

/// End-to-end tests from a Strong export to every stage artifact

const HEADER: &str =
    "Date,Workout Name,Duration,Exercise Name,Set Order,Weight,Reps,Distance,Seconds,Notes,Workout Notes,RPE\n";

fn write_strong_export(dir: &TempDir) -> PathBuf {
    let mut content = String::from(HEADER);
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    // eight weeks of squat twice a week: a ramp then a cut
    for week in 0..8u64 {
        for offset in [0u64, 3] {
            let date = start + chrono::Days::new(week * 7 + offset);
            let weight = if week < 5 { 100 + week * 10 } else { 80 };
            for set in 1..=3 {
                let rpe = if set == 3 { "9" } else { "" };
                content.push_str(&format!(
                    "{} 18:00:00,Legs,1h,Squat (Barbell),{},{},5,0,0,,,{}\n",
                    date, set, weight, rpe
                ));
            }
        }
        // bench once a week, never with RPE
        let date = start + chrono::Days::new(week * 7 + 1);
        content.push_str(&format!(
            "{} 18:00:00,Push,1h,Bench Press (Barbell),1,70,8,0,0,,,\n",
            date
        ));
    }
    // cardio rows carry no weight and are dropped
    content.push_str("2024-01-02 07:00:00,Cardio,30m,Running,1,0,0,5000,1800,,,\n");

    let path = dir.path().join("strong_workouts.csv");
    fs::write(&path, content).unwrap();
    path
}

fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let header = reader.headers().unwrap().iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    (header, rows)
}

#[test]
fn test_complete_pipeline_workflow() {
    let dir = TempDir::new().unwrap();
    let input = write_strong_export(&dir);

    let sets = ImportManager::new().import_path(&input).unwrap();
    assert_eq!(sets.len(), 8 * 2 * 3 + 8);

    let output = FatiguePipeline::new().run(&sets).unwrap();
    assert_eq!(output.lift_days.len(), 16 + 8);
    assert_eq!(output.global_daily.len(), 24);

    // squat: one RPE set out of three, so RPE-weighted stress
    let first_squat = output
        .lift_days
        .iter()
        .find(|r| r.exercise == "squat (barbell)")
        .unwrap();
    assert_eq!(first_squat.total_sets, 3);
    assert_eq!(first_squat.total_volume, 1500.0);
    assert_eq!(first_squat.mean_rpe, Some(9.0));
    assert!((first_squat.rpe_coverage - 1.0 / 3.0).abs() < 1e-12);
    assert_eq!(first_squat.stress_value(), Some(13500.0));
    assert_eq!(first_squat.ewma_stress(), Some(13500.0));
    assert_eq!(first_squat.fatigue_phase(), Some(FatiguePhase::Stable));

    // phase runs partition each exercise's lift days
    for exercise in ["squat (barbell)", "bench press (barbell)"] {
        let days = output.lift_days.iter().filter(|r| r.exercise == exercise).count();
        let sessions: u32 = output
            .phase_runs
            .iter()
            .filter(|r| r.exercise == exercise)
            .map(|r| r.session_count)
            .sum();
        assert_eq!(sessions as usize, days);
    }

    // the ramp accumulates, the cut recovers
    let squat_phases: Vec<FatiguePhase> = output
        .phase_runs
        .iter()
        .filter(|r| r.exercise == "squat (barbell)")
        .map(|r| r.phase)
        .collect();
    assert!(squat_phases.contains(&FatiguePhase::Accumulating));
    assert!(squat_phases.contains(&FatiguePhase::Recovering));

    let artifacts = dir.path().join("processed");
    let written = export_all(&sets, &output, &[7, 14], &artifacts).unwrap();
    assert_eq!(written.lift_days, artifacts.join(ArtifactNames::LIFT_DAYS));

    let (header, rows) = read_csv(&written.lift_days);
    assert_eq!(rows.len(), 24);
    assert!(header.contains(&"rolling_stress_7d".to_string()));
    let phase_col = header.iter().position(|h| h == "fatigue_phase").unwrap();
    assert!(rows
        .iter()
        .all(|r| ["accumulating", "recovering", "stable"].contains(&r[phase_col].as_str())));

    let (header, rows) = read_csv(&written.phase_runs);
    assert_eq!(rows.len(), output.phase_runs.len());
    assert!(header.contains(&"calendar_days".to_string()));

    let (_, rows) = read_csv(&written.sets);
    assert_eq!(rows.len(), sets.len());
}

#[test]
fn test_global_aggregation_policies() {
    let dir = TempDir::new().unwrap();
    let sets = ImportManager::new()
        .import_path(&write_strong_export(&dir))
        .unwrap();

    let mean = FatiguePipeline::new().run(&sets).unwrap();
    let sum = FatiguePipeline::with_config(PipelineConfig {
        global_ewma_aggregation: EwmaAggregation::Sum,
        ..PipelineConfig::default()
    })
    .unwrap()
    .run(&sets)
    .unwrap();

    // one exercise per date in this log, so both policies agree
    for (m, s) in mean.global_daily.iter().zip(&sum.global_daily) {
        assert_eq!(m.num_lifts, 1);
        assert!((m.ewma_stress - s.ewma_stress).abs() < 1e-9);
    }
}

#[test]
fn test_forecast_and_dataset_from_history() {
    let dir = TempDir::new().unwrap();
    let sets = ImportManager::new()
        .import_path(&write_strong_export(&dir))
        .unwrap();
    let output = FatiguePipeline::new().run(&sets).unwrap();

    let squat = filter_exercise(&output.lift_days, "squat").unwrap();
    assert!(filter_exercise(&output.lift_days, "deadlift").is_none());

    let forecaster = ScenarioForecaster::new();
    let deload = forecaster
        .forecast_history(&squat, ScenarioMode::Deload, 14)
        .unwrap()
        .unwrap();
    assert_eq!(deload.len(), 14);
    assert!(deload
        .windows(2)
        .all(|w| w[1].forecasted_ewma < w[0].forecasted_ewma));

    let threshold = forecaster.recovery_threshold(&squat).unwrap();
    let last = squat.last().unwrap().ewma_stress().unwrap();
    if last >= threshold {
        assert!(days_until_recovery(&deload, threshold).is_some());
    }

    let dataset =
        ModelDataset::build(&output.lift_days, "squat", &PhaseEncoder::default()).unwrap();
    assert_eq!(dataset.len() + dataset.dropped_rows, 16);
    assert_eq!(dataset.columns.len(), 6);
    assert!(dataset.features.iter().all(|f| f.len() == 6));
}

#[test]
fn test_validation_reports() {
    let dir = TempDir::new().unwrap();
    let sets = ImportManager::new()
        .import_path(&write_strong_export(&dir))
        .unwrap();
    let output = FatiguePipeline::new().run(&sets).unwrap();

    let report = missingness(&output.lift_days);
    let mean_rpe = report.iter().find(|c| c.column == "mean_rpe").unwrap();
    // bench days never carry RPE
    assert!((mean_rpe.missing_pct - 8.0 / 24.0 * 100.0).abs() < 1e-9);

    let coverage = phase_coverage(&output.lift_days, &output.phase_runs, "barbell").unwrap();
    assert_eq!(coverage.len(), 2);
    assert!(coverage.iter().all(|c| c.is_complete()));
}

#[test]
fn test_missing_columns_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("partial.csv");
    fs::write(&path, "Date,Exercise Name,Weight,Reps\n2024-01-01,Squat,100,5\n").unwrap();

    let err = ImportManager::new().import_path(&path).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("workout"));
    assert!(message.contains("rpe"));
}
