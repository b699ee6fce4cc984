use chrono::{Days, NaiveDate};
use proptest::prelude::*;

use liftrs::load::{ewma, rolling_sum, span_alpha};
use liftrs::models::{FatiguePhase, SetRecord};
use liftrs::pipeline::FatiguePipeline;

/// Property tests for the smoothing primitives and phase segmentation

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-6 * a.abs().max(b.abs()).max(1.0)
}

proptest! {
    #[test]
    fn test_rolling_sum_matches_trailing_window(
        values in prop::collection::vec(0.0f64..10_000.0, 0..60),
        window in 1usize..20
    ) {
        let sums = rolling_sum(&values, window);
        prop_assert_eq!(sums.len(), values.len());

        for (i, sum) in sums.iter().enumerate() {
            let start = (i + 1).saturating_sub(window);
            let expected: f64 = values[start..=i].iter().sum();
            prop_assert!(close(*sum, expected));
        }
    }

    #[test]
    fn test_ewma_follows_recurrence(
        values in prop::collection::vec(0.0f64..50_000.0, 1..60),
        span in 1u32..30
    ) {
        let smoothed = ewma(&values, span);
        let alpha = span_alpha(span);

        prop_assert_eq!(smoothed[0], values[0]);
        for i in 1..values.len() {
            let expected = alpha * values[i] + (1.0 - alpha) * smoothed[i - 1];
            prop_assert!(close(smoothed[i], expected));
        }

        // a weighted average never leaves the range of its inputs
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(smoothed.iter().all(|v| *v >= min - 1e-6 && *v <= max + 1e-6));
    }

    #[test]
    fn test_phase_classification_boundaries(tol in 0.0f64..100.0) {
        prop_assert_eq!(FatiguePhase::classify(Some(tol + 1.0), tol), FatiguePhase::Accumulating);
        prop_assert_eq!(FatiguePhase::classify(Some(-tol - 1.0), tol), FatiguePhase::Recovering);
        prop_assert_eq!(FatiguePhase::classify(Some(0.0), tol), FatiguePhase::Stable);
        prop_assert_eq!(FatiguePhase::classify(Some(tol), tol), FatiguePhase::Stable);
        prop_assert_eq!(FatiguePhase::classify(Some(-tol), tol), FatiguePhase::Stable);
    }

    #[test]
    fn test_phase_runs_partition_lift_days(
        sessions in prop::collection::vec(
            (1u64..5, 40.0f64..200.0, prop::option::of(5.0f64..10.0)),
            1..40
        )
    ) {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();

        let mut when = start;
        let mut sets = Vec::new();
        for (i, (gap, weight, rpe)) in sessions.iter().enumerate() {
            when = when + Days::new(*gap);
            sets.push(SetRecord::new(when, "squat", *weight, 5.0, *rpe));
            if i % 3 == 0 {
                sets.push(SetRecord::new(when, "bench press", *weight * 0.7, 8.0, None));
            }
        }

        let output = FatiguePipeline::new().run(&sets).unwrap();

        for exercise in ["squat", "bench press"] {
            let mut days: Vec<NaiveDate> = output
                .lift_days
                .iter()
                .filter(|r| r.exercise == exercise)
                .map(|r| r.date)
                .collect();
            days.sort();

            let runs: Vec<_> = output
                .phase_runs
                .iter()
                .filter(|r| r.exercise == exercise)
                .collect();

            // every lift day falls in exactly one run
            for day in &days {
                let hits = runs
                    .iter()
                    .filter(|r| r.start_date <= *day && *day <= r.end_date)
                    .count();
                prop_assert_eq!(hits, 1);
            }

            // consecutive runs change phase and are numbered from one
            for (i, pair) in runs.windows(2).enumerate() {
                prop_assert_ne!(pair[0].phase, pair[1].phase);
                prop_assert!(pair[0].end_date < pair[1].start_date);
                prop_assert_eq!(pair[0].run_index as usize, i + 1);
            }

            let sessions: u32 = runs.iter().map(|r| r.session_count).sum();
            prop_assert_eq!(sessions as usize, days.len());
            for run in &runs {
                prop_assert_eq!(run.calendar_days, (run.end_date - run.start_date).num_days() + 1);
            }
        }
    }
}
