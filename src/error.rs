//! Unified error hierarchy for LiftRS
//!
//! Fatal conditions (unreadable input, missing columns, bad configuration)
//! surface as errors. Sparse data never does: missing RPE, single-session
//! exercises and undefined slopes all have fallback policies in the stages
//! themselves, and empty results are returned as `None`.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all LiftRS operations
#[derive(Debug, Error)]
pub enum LiftRsError {
    /// Session log import errors
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// Feature pipeline calculation errors
    #[error("Calculation error: {0}")]
    Calculation(#[from] CalculationError),

    /// Artifact export errors
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader/writer errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Session log import errors
#[derive(Debug, Error)]
pub enum ImportError {
    /// File not found at specified path
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Required columns absent after header normalization
    #[error("Missing expected columns in {path}: {}", columns.join(", "))]
    MissingColumns { path: PathBuf, columns: Vec<String> },

    /// Malformed file structure
    #[error("Parse error in {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

/// Feature pipeline calculation errors
#[derive(Debug, Error)]
pub enum CalculationError {
    /// A stage ran before the stage that produces its inputs
    #[error("{stage} requires {required} to run first")]
    MissingStage {
        stage: &'static str,
        required: &'static str,
    },

    /// Insufficient data for calculation
    #[error("Insufficient data for {calculation}: {reason}")]
    InsufficientData { calculation: String, reason: String },
}

/// Artifact export errors
#[derive(Debug, Error)]
pub enum ExportError {
    /// Output could not be written
    #[error("Export failed to {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for LiftRS operations
pub type Result<T> = std::result::Result<T, LiftRsError>;

impl LiftRsError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            LiftRsError::Validation(_) => ErrorSeverity::Warning,
            LiftRsError::Calculation(CalculationError::MissingStage { .. }) => {
                ErrorSeverity::Critical
            }
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            LiftRsError::Import(ImportError::FileNotFound { path }) => {
                format!("Could not find training log: {}", path.display())
            }
            LiftRsError::Import(ImportError::MissingColumns { columns, .. }) => {
                format!(
                    "Training log is missing required columns: {}. Is this a Strong export?",
                    columns.join(", ")
                )
            }
            LiftRsError::Configuration(reason) => {
                format!("Invalid configuration: {}", reason)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Programming error in stage ordering
    Critical,
    /// Error that aborts the run
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}
