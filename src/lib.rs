// Library interface for liftrs modules
// This allows integration tests and benches to access the pipeline stages

pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod forecast;
pub mod global;
pub mod import;
pub mod load;
pub mod logging;
pub mod models;
pub mod phase;
pub mod pipeline;
pub mod stress;
pub mod validation;

// Re-export commonly used types for convenience
pub use dataset::{ModelDataset, PhaseEncoder};
pub use error::{LiftRsError, Result};
pub use forecast::{ForecastConfig, ForecastReport, ScenarioForecaster};
pub use global::EwmaAggregation;
pub use import::ImportManager;
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use models::*;
pub use pipeline::{FatiguePipeline, PipelineConfig, PipelineOutput};
