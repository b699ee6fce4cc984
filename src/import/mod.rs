use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{ImportError, LiftRsError, Result};
use crate::models::SetRecord;

pub mod strong;

/// Trait for importing set-level training logs from different sources
pub trait ImportFormat {
    /// Check if this importer can handle the given file
    fn can_import(&self, file_path: &Path) -> bool;

    /// Import set records from the file
    fn import_file(&self, file_path: &Path) -> Result<Vec<SetRecord>>;

    /// Get the format name for this importer
    fn get_format_name(&self) -> &'static str;
}

/// Manager for coordinating different import formats
pub struct ImportManager {
    importers: Vec<Box<dyn ImportFormat>>,
}

impl ImportManager {
    /// Create a new import manager with all available importers
    pub fn new() -> Self {
        let importers: Vec<Box<dyn ImportFormat>> =
            vec![Box::new(strong::StrongCsvImporter::new())];
        Self { importers }
    }

    /// Import a single file, auto-detecting the format
    pub fn import_file(&self, file_path: &Path) -> Result<Vec<SetRecord>> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound {
                path: file_path.to_path_buf(),
            }
            .into());
        }

        for importer in &self.importers {
            if importer.can_import(file_path) {
                info!(
                    file = %file_path.display(),
                    format = importer.get_format_name(),
                    "Importing training log"
                );
                return importer.import_file(file_path);
            }
        }

        Err(ImportError::Parse {
            path: file_path.to_path_buf(),
            reason: "no importer recognizes this file type".to_string(),
        }
        .into())
    }

    /// Import every recognized file in a directory into one set table
    ///
    /// Files that fail to import are reported and skipped; the merged table is
    /// re-sorted by timestamp, exercise and set order.
    pub fn import_directory(&self, dir_path: &Path) -> Result<Vec<SetRecord>> {
        let files = self.collect_importable_files(dir_path)?;
        let mut all_sets = Vec::new();

        if files.is_empty() {
            warn!(dir = %dir_path.display(), "No importable files found");
            return Ok(all_sets);
        }

        let pb = ProgressBar::new(files.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({msg})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }

        for file_path in files {
            pb.set_message(
                file_path
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
                    .to_string(),
            );

            match self.import_file(&file_path) {
                Ok(mut sets) => {
                    pb.println(format!(
                        "✓ Imported {} sets from {}",
                        sets.len(),
                        file_path.display()
                    ));
                    all_sets.append(&mut sets);
                }
                Err(e) => {
                    warn!(file = %file_path.display(), error = %e, "Skipping file");
                    pb.println(format!("✗ Failed to import {}: {}", file_path.display(), e));
                }
            }

            pb.inc(1);
        }

        pb.finish_with_message("Import complete");
        strong::sort_sets(&mut all_sets);
        Ok(all_sets)
    }

    /// Import a file or every file of a directory
    pub fn import_path(&self, path: &Path) -> Result<Vec<SetRecord>> {
        if path.is_dir() {
            self.import_directory(path)
        } else {
            self.import_file(path)
        }
    }

    fn collect_importable_files(&self, dir_path: &Path) -> Result<Vec<PathBuf>> {
        if !dir_path.is_dir() {
            return Err(LiftRsError::Validation(format!(
                "Path is not a directory: {}",
                dir_path.display()
            )));
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir_path)? {
            let path = entry?.path();
            if path.is_file() && self.importers.iter().any(|i| i.can_import(&path)) {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }
}

impl Default for ImportManager {
    fn default() -> Self {
        Self::new()
    }
}
