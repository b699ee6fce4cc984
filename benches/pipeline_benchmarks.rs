use chrono::{Days, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use liftrs::forecast::ScenarioForecaster;
use liftrs::load::ewma;
use liftrs::models::{filter_exercise, ScenarioMode, SetRecord};
use liftrs::pipeline::FatiguePipeline;

/// Pipeline benchmarks over synthetic multi-exercise training logs
///
/// Sizes are in training days; every day logs three exercises of four sets.

const EXERCISES: [&str; 6] = [
    "squat (barbell)",
    "bench press (barbell)",
    "deadlift (barbell)",
    "overhead press (barbell)",
    "barbell row",
    "pull up",
];

fn create_training_log(days: u64) -> Vec<SetRecord> {
    let start = NaiveDate::from_ymd_opt(2022, 1, 3)
        .unwrap()
        .and_hms_opt(18, 0, 0)
        .unwrap();

    let mut sets = Vec::new();
    for day in 0..days {
        let when = start + Days::new(day);
        for (slot, exercise) in EXERCISES.iter().enumerate() {
            // three of six exercises per day, alternating
            if (slot as u64 + day) % 2 != 0 {
                continue;
            }
            let weight = 60.0 + ((day * 7 + slot as u64 * 13) % 50) as f64;
            for set in 0..4 {
                let rpe = (set % 2 == 0).then_some(7.0 + (set as f64) * 0.5);
                sets.push(SetRecord::new(when, *exercise, weight, 5.0, rpe));
            }
        }
    }
    sets
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("Fatigue Pipeline");
    let pipeline = FatiguePipeline::new();

    for &days in &[30u64, 180, 365, 1095] {
        let sets = create_training_log(days);

        group.throughput(Throughput::Elements(sets.len() as u64));
        group.bench_with_input(BenchmarkId::new("run", days), &sets, |b, sets| {
            b.iter(|| pipeline.run(black_box(sets)));
        });
    }

    group.finish();
}

fn bench_ewma(c: &mut Criterion) {
    let mut group = c.benchmark_group("EWMA");

    for &len in &[100usize, 1_000, 10_000] {
        let values: Vec<f64> = (0..len).map(|i| (i % 97) as f64 * 120.0).collect();

        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::new("span_7", len), &values, |b, values| {
            b.iter(|| ewma(black_box(values), 7));
        });
    }

    group.finish();
}

fn bench_forecast(c: &mut Criterion) {
    let output = FatiguePipeline::new().run(&create_training_log(365)).unwrap();
    let history = filter_exercise(&output.lift_days, "squat").unwrap();
    let forecaster = ScenarioForecaster::new();

    let mut group = c.benchmark_group("Scenario Forecast");
    for mode in [ScenarioMode::Maintain, ScenarioMode::Reduce, ScenarioMode::Deload] {
        group.bench_function(mode.as_str(), |b| {
            b.iter(|| forecaster.forecast_history(black_box(&history), mode, 28));
        });
    }
    group.bench_function("recovery_threshold", |b| {
        b.iter(|| forecaster.recovery_threshold(black_box(&history)));
    });

    group.finish();
}

criterion_group!(benches, bench_pipeline, bench_ewma, bench_forecast);
criterion_main!(benches);
