use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::error::{CalculationError, LiftRsError, Result};
use crate::models::{GlobalDailyRow, LiftDayRow, RollingStress};

/// How per-exercise `ewma_stress` values combine into one daily value
///
/// `Mean` reads as typical fatigue intensity of the day, `Sum` as cumulative
/// systemic load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EwmaAggregation {
    #[default]
    Mean,
    Sum,
}

impl fmt::Display for EwmaAggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EwmaAggregation::Mean => write!(f, "mean"),
            EwmaAggregation::Sum => write!(f, "sum"),
        }
    }
}

impl FromStr for EwmaAggregation {
    type Err = LiftRsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mean" => Ok(EwmaAggregation::Mean),
            "sum" => Ok(EwmaAggregation::Sum),
            other => Err(LiftRsError::Configuration(format!(
                "Unknown EWMA aggregation '{}', expected mean or sum",
                other
            ))),
        }
    }
}

#[derive(Default)]
struct DailyTotals<'a> {
    stress: f64,
    ewma_sum: f64,
    rows: u32,
    exercises: BTreeSet<&'a str>,
    rolling: Vec<RollingStress>,
}

/// Roll per-exercise lift days up into one whole-body row per date
///
/// Rolling columns are summed across exercises, keeping the windows of the
/// first row seen for each date.
pub fn aggregate_global_daily(
    rows: &[LiftDayRow],
    aggregation: EwmaAggregation,
) -> Result<Vec<GlobalDailyRow>> {
    let mut days: BTreeMap<NaiveDate, DailyTotals> = BTreeMap::new();

    for row in rows {
        let (Some(stress), Some(load)) = (row.stress_value(), row.load.as_ref()) else {
            return Err(CalculationError::MissingStage {
                stage: "global daily aggregator",
                required: "rolling load engine",
            }
            .into());
        };

        let day = days.entry(row.date).or_default();
        day.stress += stress;
        day.ewma_sum += load.ewma_stress;
        day.rows += 1;
        day.exercises.insert(row.exercise.as_str());

        if day.rolling.is_empty() {
            day.rolling = load
                .rolling_stress
                .iter()
                .map(|r| RollingStress { window: r.window, sum: 0.0 })
                .collect();
        }
        for total in day.rolling.iter_mut() {
            total.sum += row.rolling_stress(total.window).unwrap_or_default();
        }
    }

    let daily: Vec<GlobalDailyRow> = days
        .into_iter()
        .map(|(date, totals)| GlobalDailyRow {
            date,
            total_stress: totals.stress,
            ewma_stress: match aggregation {
                EwmaAggregation::Mean => totals.ewma_sum / totals.rows as f64,
                EwmaAggregation::Sum => totals.ewma_sum,
            },
            num_lifts: totals.exercises.len() as u32,
            rolling_stress: totals.rolling,
        })
        .collect();

    info!(days = daily.len(), %aggregation, "Aggregated global daily fatigue");
    Ok(daily)
}
