use tracing::debug;

use crate::models::{LiftDayRow, StressMetrics};

/// Stress for one lift day
///
/// RPE-weighted volume when any set that day carried RPE, otherwise raw
/// volume. A positive coverage with no mean RPE cannot come out of the
/// aggregator, but degrades to volume as well.
pub fn stress_metrics(row: &LiftDayRow) -> StressMetrics {
    let stress_volume = row.total_volume;
    let stress_rpe = row.mean_rpe.map(|rpe| row.total_volume * rpe);

    let stress = match stress_rpe {
        Some(weighted) if row.rpe_coverage > 0.0 => weighted,
        _ => stress_volume,
    };

    StressMetrics {
        stress_volume,
        stress_rpe,
        stress,
    }
}

/// Attach stress metrics to every row
pub fn add_stress_metrics(rows: &mut [LiftDayRow]) {
    let mut rpe_weighted = 0usize;
    for row in rows.iter_mut() {
        let metrics = stress_metrics(row);
        if row.rpe_coverage > 0.0 && metrics.stress_rpe.is_some() {
            rpe_weighted += 1;
        }
        row.stress = Some(metrics);
    }

    debug!(
        rows = rows.len(),
        rpe_weighted,
        volume_only = rows.len() - rpe_weighted,
        "Added stress metrics"
    );
}
