use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{ImportError, Result};
use crate::import::ImportFormat;
use crate::models::SetRecord;

/// Columns that must be present after header normalization
pub const REQUIRED_COLUMNS: [&str; 7] =
    ["datetime", "workout", "exercise", "set", "weight", "reps", "rpe"];

/// Importer for Strong app CSV exports
pub struct StrongCsvImporter {
    column_mapping: HashMap<String, String>,
}

impl StrongCsvImporter {
    pub fn new() -> Self {
        let mut column_mapping = HashMap::new();

        Self::add_mapping(&mut column_mapping, "datetime", &["date", "datetime", "timestamp"]);
        Self::add_mapping(&mut column_mapping, "workout", &["workout_name", "workout"]);
        Self::add_mapping(&mut column_mapping, "exercise", &["exercise_name", "exercise"]);
        Self::add_mapping(&mut column_mapping, "set", &["set_order", "set"]);
        Self::add_mapping(&mut column_mapping, "weight", &["weight", "weight_kg", "weight_lbs"]);
        Self::add_mapping(&mut column_mapping, "reps", &["reps", "repetitions"]);
        Self::add_mapping(&mut column_mapping, "rpe", &["rpe"]);

        Self { column_mapping }
    }

    fn add_mapping(mapping: &mut HashMap<String, String>, standard: &str, variations: &[&str]) {
        for variation in variations {
            mapping.insert(variation.to_lowercase(), standard.to_string());
        }
    }

    fn normalize_column_name(&self, name: &str) -> String {
        let normalized = name.trim().to_lowercase().replace([' ', '-'], "_");

        self.column_mapping
            .get(&normalized)
            .cloned()
            .unwrap_or(normalized)
    }

    /// Parse a session timestamp; date-only values land at midnight
    pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
        let formats = [
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%SZ",
            "%d/%m/%Y %H:%M:%S",
            "%m/%d/%Y %H:%M:%S",
        ];

        let value = value.trim();
        for format in &formats {
            if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
                return Some(dt);
            }
        }

        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    }

    fn parse_number(value: Option<&str>) -> Option<f64> {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    /// Strong writes `;` in some locales
    fn sniff_delimiter(file_path: &Path) -> Result<u8> {
        let mut first_line = String::new();
        BufReader::new(File::open(file_path)?).read_line(&mut first_line)?;

        Ok(if first_line.contains(';') && !first_line.contains(',') {
            b';'
        } else {
            b','
        })
    }

    fn column_index(
        &self,
        headers: &StringRecord,
        file_path: &Path,
    ) -> Result<HashMap<String, usize>> {
        let mut index = HashMap::new();
        for (i, header) in headers.iter().enumerate() {
            index.entry(self.normalize_column_name(header)).or_insert(i);
        }

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| !index.contains_key(**c))
            .map(|c| c.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(ImportError::MissingColumns {
                path: file_path.to_path_buf(),
                columns: missing,
            }
            .into());
        }

        Ok(index)
    }

    /// Turn one CSV record into a set, or `None` for rows that are not lifts
    fn parse_record(record: &StringRecord, index: &HashMap<String, usize>) -> Option<SetRecord> {
        let field = |name: &str| index.get(name).and_then(|&i| record.get(i));

        let datetime = field("datetime").and_then(Self::parse_datetime)?;
        let weight = Self::parse_number(field("weight")).filter(|w| *w > 0.0)?;
        let reps = Self::parse_number(field("reps")).filter(|r| *r > 0.0)?;

        let exercise = field("exercise")?.trim().to_lowercase();
        if exercise.is_empty() {
            return None;
        }

        let workout = field("workout")
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .unwrap_or_else(|| "unknown".to_string());

        let rpe = Self::parse_number(field("rpe")).filter(|r| (0.0..=10.0).contains(r));
        let set_order = Self::parse_number(field("set"))
            .filter(|s| *s >= 0.0)
            .map(|s| s as u32);

        Some(SetRecord {
            date: datetime.date(),
            datetime,
            workout,
            exercise,
            set_order,
            weight,
            reps,
            rpe,
            volume: weight * reps,
        })
    }
}

/// Order sets by timestamp, exercise, then set order
pub fn sort_sets(sets: &mut [SetRecord]) {
    sets.sort_by(|a, b| {
        a.datetime
            .cmp(&b.datetime)
            .then_with(|| a.exercise.cmp(&b.exercise))
            .then_with(|| a.set_order.cmp(&b.set_order))
    });
}

impl Default for StrongCsvImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportFormat for StrongCsvImporter {
    fn can_import(&self, file_path: &Path) -> bool {
        file_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false)
    }

    fn import_file(&self, file_path: &Path) -> Result<Vec<SetRecord>> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound {
                path: file_path.to_path_buf(),
            }
            .into());
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .delimiter(Self::sniff_delimiter(file_path)?)
            .from_path(file_path)?;

        let headers = reader.headers()?.clone();
        let index = self.column_index(&headers, file_path)?;

        let mut sets = Vec::new();
        let mut total = 0usize;
        let mut bad_dates = 0usize;

        for result in reader.records() {
            let record = result?;
            total += 1;

            match Self::parse_record(&record, &index) {
                Some(set) => sets.push(set),
                None => {
                    let unparseable = index
                        .get("datetime")
                        .and_then(|&i| record.get(i))
                        .and_then(Self::parse_datetime)
                        .is_none();
                    if unparseable {
                        bad_dates += 1;
                    }
                }
            }
        }

        if bad_dates > 0 {
            warn!(
                file = %file_path.display(),
                rows = bad_dates,
                "Skipped rows with unparseable dates"
            );
        }
        debug!(
            dropped = total - sets.len() - bad_dates,
            "Dropped rows without positive weight and reps"
        );

        sort_sets(&mut sets);
        info!(file = %file_path.display(), rows = total, sets = sets.len(), "Loaded training log");
        Ok(sets)
    }

    fn get_format_name(&self) -> &'static str {
        "Strong CSV"
    }
}
