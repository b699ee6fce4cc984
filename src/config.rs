use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::forecast::ForecastConfig;
use crate::logging::LogConfig;
use crate::pipeline::PipelineConfig;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Input and output locations
    pub paths: PathSettings,

    /// Feature pipeline settings
    pub pipeline: PipelineConfig,

    /// Scenario forecast settings
    pub forecast: ForecastConfig,

    pub logging: LogConfig,
}

/// Default locations used when the command line does not name them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Strong CSV export, or a directory of them
    pub input: PathBuf,

    /// Directory receiving stage artifacts
    pub output_dir: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        PathSettings {
            input: PathBuf::from("data/raw/strong_workouts.csv"),
            output_dir: PathBuf::from("data/processed"),
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".liftrs")
            .join("config.toml")
    }

    /// Load the given file, or the default location, falling back to defaults
    ///
    /// An explicitly named file must exist; a missing default file is not an
    /// error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_path = Self::default_config_path();
                if default_path.exists() {
                    Self::load_from_file(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Check every section for out-of-range values
    pub fn validate(&self) -> Result<()> {
        self.pipeline
            .validate()
            .context("Invalid [pipeline] configuration")?;
        self.forecast
            .validate()
            .context("Invalid [forecast] configuration")?;
        Ok(())
    }
}
