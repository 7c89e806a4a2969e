//! Service configuration.
//!
//! Read from a YAML file (path in `DUES_TRACKER_CONFIG`, default
//! `dues_tracker.yaml`). A missing file means all defaults; fields left out
//! of the file keep their defaults. A few settings can be overridden from
//! the environment after the file is read.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::backend::domain::models::{AcademicWindow, DuesPolicy, YearMonth};
use crate::backend::domain::upload_service::DEFAULT_MAX_FILE_SIZE;

pub const CONFIG_PATH_ENV: &str = "DUES_TRACKER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "dues_tracker.yaml";

const BIND_ENV: &str = "DUES_TRACKER_BIND";
const DATABASE_URL_ENV: &str = "DATABASE_URL";
const UPLOAD_ROOT_ENV: &str = "DUES_TRACKER_UPLOAD_ROOT";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// First month of the academic year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcademicYearConfig {
    pub start_year: i32,
    pub start_month: u32,
}

impl Default for AcademicYearConfig {
    fn default() -> Self {
        Self {
            start_year: 2025,
            start_month: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind_address: String,
    pub database_url: String,
    /// Directory receipts are written to and served from at `/uploads`
    pub upload_root: PathBuf,
    /// Origin allowed by CORS, typically the frontend dev server
    pub allowed_origin: String,
    pub monthly_fee: i64,
    pub max_upload_bytes: u64,
    pub academic_year: AcademicYearConfig,
    /// Optional `name,class,gender` CSV loaded into the roster at startup
    pub students_csv: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3001".to_string(),
            database_url: "sqlite:dues_tracker.db".to_string(),
            upload_root: PathBuf::from("public/uploads"),
            allowed_origin: "http://localhost:8080".to_string(),
            monthly_fee: 30000,
            max_upload_bytes: DEFAULT_MAX_FILE_SIZE,
            academic_year: AcademicYearConfig::default(),
            students_csv: None,
        }
    }
}

impl AppConfig {
    /// Load from the file named by `DUES_TRACKER_CONFIG`, then apply environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_file(Path::new(&path))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML config file; a missing file yields the defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Override settings from variables visible through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(bind) = non_empty(BIND_ENV) {
            self.bind_address = bind;
        }
        if let Some(url) = non_empty(DATABASE_URL_ENV) {
            self.database_url = url;
        }
        if let Some(root) = non_empty(UPLOAD_ROOT_ENV) {
            self.upload_root = PathBuf::from(root);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if YearMonth::new(self.academic_year.start_year, self.academic_year.start_month).is_none() {
            return Err(ConfigError::Invalid(format!(
                "academic_year.start_month must be 1-12, got {}",
                self.academic_year.start_month
            )));
        }
        if self.monthly_fee <= 0 {
            return Err(ConfigError::Invalid("monthly_fee must be positive".to_string()));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid("max_upload_bytes must be positive".to_string()));
        }
        Ok(())
    }

    /// Fee and window derived from this config
    pub fn dues_policy(&self) -> Result<DuesPolicy, ConfigError> {
        let start = YearMonth::new(self.academic_year.start_year, self.academic_year.start_month).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "invalid academic year start {}-{}",
                self.academic_year.start_year, self.academic_year.start_month
            ))
        })?;
        Ok(DuesPolicy::new(self.monthly_fee, AcademicWindow::starting_at(start)))
    }
}
