//! Rolling and exponentially weighted stress load
//!
//! All smoothing in the pipeline goes through [`ewma`] and [`ewma_optional`]:
//! a recurrence seeded with the first observation,
//!
//! > ewma[0] = x[0]
//! > ewma[i] = α·x[i] + (1 − α)·ewma[i − 1],  α = 2 / (span + 1)
//!
//! Rolling sums are taken over trailing *rows* of one exercise, not trailing
//! calendar days, and accept a shrinking window at the start of the series.

use chrono::NaiveDate;
use tracing::debug;

use crate::error::{CalculationError, Result};
use crate::models::{sort_by_exercise_date, LiftDayRow, LoadMetrics, RollingStress};

/// Smoothing factor for a span
pub fn span_alpha(span: u32) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// EWMA of a dense series
pub fn ewma(values: &[f64], span: u32) -> Vec<f64> {
    let alpha = span_alpha(span);
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;

    for &x in values {
        let next = match prev {
            None => x,
            Some(p) => alpha * x + (1.0 - alpha) * p,
        };
        out.push(next);
        prev = Some(next);
    }

    out
}

/// EWMA of a series with undefined entries
///
/// Leading undefined values stay undefined; the first defined value seeds the
/// average. An undefined value after that carries the previous average.
pub fn ewma_optional(values: &[Option<f64>], span: u32) -> Vec<Option<f64>> {
    let alpha = span_alpha(span);
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;

    for x in values {
        prev = match (prev, *x) {
            (None, x) => x,
            (Some(p), Some(x)) => Some(alpha * x + (1.0 - alpha) * p),
            (Some(p), None) => Some(p),
        };
        out.push(prev);
    }

    out
}

/// Trailing sum over at most `window` rows, minimum one observation
pub fn rolling_sum(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            values[start..=i].iter().sum()
        })
        .collect()
}

/// Attach rolling sums, EWMA stress and days since last session
///
/// Rows are re-sorted by exercise then date; each exercise is computed
/// independently.
pub fn add_rolling_load(rows: &mut [LiftDayRow], windows: &[u32], ewma_span: u32) -> Result<()> {
    if rows.iter().any(|r| r.stress.is_none()) {
        return Err(CalculationError::MissingStage {
            stage: "rolling load engine",
            required: "stress metric calculator",
        }
        .into());
    }

    sort_by_exercise_date(rows);

    for partition in rows.chunk_by_mut(|a, b| a.exercise == b.exercise) {
        let stress: Vec<f64> = partition
            .iter()
            .map(|r| r.stress_value().unwrap_or_default())
            .collect();

        let rolling: Vec<(u32, Vec<f64>)> = windows
            .iter()
            .map(|&w| (w, rolling_sum(&stress, w as usize)))
            .collect();
        let smoothed = ewma(&stress, ewma_span);

        let mut previous_date: Option<NaiveDate> = None;
        for (i, row) in partition.iter_mut().enumerate() {
            let days_since_last_session = previous_date.map(|prev| (row.date - prev).num_days());
            previous_date = Some(row.date);

            row.load = Some(LoadMetrics {
                rolling_stress: rolling
                    .iter()
                    .map(|(window, sums)| RollingStress {
                        window: *window,
                        sum: sums[i],
                    })
                    .collect(),
                ewma_stress: smoothed[i],
                days_since_last_session,
            });
        }

        debug!(
            exercise = %partition[0].exercise,
            sessions = partition.len(),
            last_ewma = smoothed.last().copied().unwrap_or_default(),
            "Computed rolling load"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LiftRsError;
    use crate::models::StressMetrics;
    use chrono::NaiveDate;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn row(exercise: &str, day: u32, stress: f64) -> LiftDayRow {
        LiftDayRow {
            date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            exercise: exercise.to_string(),
            total_volume: stress,
            max_weight: 100.0,
            total_sets: 1,
            total_reps: 5.0,
            mean_rpe: None,
            rpe_coverage: 0.0,
            stress: Some(StressMetrics {
                stress_volume: stress,
                stress_rpe: None,
                stress,
            }),
            load: None,
            phase: None,
        }
    }

    #[test]
    fn test_span_alpha() {
        assert_eq!(span_alpha(7), 0.25);
        assert_eq!(span_alpha(1), 1.0);
    }

    #[test]
    fn test_ewma_recurrence() {
        let values = [100.0, 0.0, 50.0, 200.0];
        let out = ewma(&values, 7);
        assert_eq!(out[0], 100.0);
        for i in 1..values.len() {
            assert!(close(out[i], 0.25 * values[i] + 0.75 * out[i - 1]));
        }
        assert!(ewma(&[], 7).is_empty());
    }

    #[test]
    fn test_ewma_optional_leading_gap() {
        let out = ewma_optional(&[None, Some(8.0), Some(0.0), None], 7);
        assert_eq!(out[0], None);
        assert_eq!(out[1], Some(8.0));
        assert_eq!(out[2], Some(6.0));
        assert_eq!(out[3], Some(6.0));
    }

    #[test]
    fn test_rolling_sum_shrinking_window() {
        let values: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let sums = rolling_sum(&values, 7);
        // rows 1..7 see the whole prefix
        assert_eq!(&sums[..7], &[1.0, 3.0, 6.0, 10.0, 15.0, 21.0, 28.0]);
        // then exactly the last seven
        assert_eq!(sums[7], (2..=8).sum::<i32>() as f64);
        assert_eq!(sums[9], (4..=10).sum::<i32>() as f64);
    }

    #[test]
    fn test_per_exercise_isolation() {
        let mut rows = vec![
            row("squat", 1, 100.0),
            row("bench press", 1, 1000.0),
            row("squat", 3, 200.0),
            row("bench press", 2, 3000.0),
        ];
        add_rolling_load(&mut rows, &[7, 14], 7).unwrap();

        let squat: Vec<&LiftDayRow> = rows.iter().filter(|r| r.exercise == "squat").collect();
        assert_eq!(squat[0].rolling_stress(7), Some(100.0));
        assert_eq!(squat[1].rolling_stress(7), Some(300.0));
        assert_eq!(squat[1].rolling_stress(14), Some(300.0));
        assert!(close(squat[1].ewma_stress().unwrap(), 0.25 * 200.0 + 0.75 * 100.0));
        assert_eq!(squat[1].load.as_ref().unwrap().days_since_last_session, Some(2));
        assert_eq!(squat[0].load.as_ref().unwrap().days_since_last_session, None);

        // re-sorted: bench press rows first, by date
        assert_eq!(rows[0].exercise, "bench press");
        assert_eq!(rows[1].rolling_stress(7), Some(4000.0));
    }

    #[test]
    fn test_single_observation_identity() {
        let mut rows = vec![row("overhead press", 5, 640.0)];
        add_rolling_load(&mut rows, &[7, 14], 7).unwrap();
        assert_eq!(rows[0].rolling_stress(7), Some(640.0));
        assert_eq!(rows[0].rolling_stress(14), Some(640.0));
        assert_eq!(rows[0].ewma_stress(), Some(640.0));
    }

    #[test]
    fn test_requires_stress() {
        let mut rows = vec![row("squat", 1, 1.0)];
        rows[0].stress = None;
        let err = add_rolling_load(&mut rows, &[7], 7).unwrap_err();
        assert!(matches!(
            err,
            LiftRsError::Calculation(CalculationError::MissingStage { .. })
        ));
    }
}
