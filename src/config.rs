//! Pipeline configuration
//!
//! This module contains the configuration structures loaded from the
//! pipeline's YAML document: layer roots, source locations, HTTP session
//! tuning and transform options.

use crate::error::{Error, Result};
use crate::types::{BackoffType, Handoff, HolidayJoin, ParsePolicy};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the configuration document
pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Layer root directories
    pub paths: PathsConfig,

    /// Source definitions
    pub sources: SourcesConfig,

    /// HTTP session configuration
    #[serde(default)]
    pub http: HttpConfig,

    /// Transform options
    #[serde(default)]
    pub pipeline: PipelineOptions,
}

// ============================================================================
// Paths
// ============================================================================

/// Root directories of the three layers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Raw layer root
    pub bronze: PathBuf,
    /// Standardized layer root
    pub silver: PathBuf,
    /// Aggregate layer root
    pub gold: PathBuf,
}

impl PathsConfig {
    fn all(&self) -> [(&'static str, &Path); 3] {
        [
            ("bronze", self.bronze.as_path()),
            ("silver", self.silver.as_path()),
            ("gold", self.gold.as_path()),
        ]
    }
}

// ============================================================================
// Sources
// ============================================================================

/// All external sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Collision records download
    pub collisions: FileSourceConfig,
    /// Weather observations download
    pub weather: FileSourceConfig,
    /// Holiday calendar API
    pub holidays: HolidaySourceConfig,
}

/// A single downloadable file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSourceConfig {
    /// Download URL
    pub url: String,
    /// File name inside the raw layer
    pub filename: String,
}

/// Holiday calendar API, fetched one page per year
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolidaySourceConfig {
    /// API base URL; pages are `{url_base}/{year}/{country_code}`
    pub url_base: String,
    /// ISO country code
    pub country_code: String,
    /// Years to fetch
    pub years: Vec<i32>,
    /// File name inside the raw layer
    #[serde(default = "default_holidays_filename")]
    pub filename: String,
}

fn default_holidays_filename() -> String {
    "holidays.json".to_string()
}

// ============================================================================
// HTTP Config
// ============================================================================

/// HTTP session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Maximum number of retries on transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry, in seconds
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,

    /// How the delay grows between retries
    #[serde(default)]
    pub backoff_type: BackoffType,

    /// Total time allowed for one file download, in seconds
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// Idle time allowed between two body chunks, in seconds
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,

    /// Timeout of a single API page request, in seconds
    #[serde(default = "default_api_timeout")]
    pub api_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_secs: default_backoff_secs(),
            backoff_type: BackoffType::default(),
            download_timeout_secs: default_download_timeout(),
            read_timeout_secs: default_read_timeout(),
            api_timeout_secs: default_api_timeout(),
        }
    }
}

impl HttpConfig {
    /// Base backoff delay
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    /// Download timeout
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    /// Idle read timeout
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// API page timeout
    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_secs() -> u64 {
    1
}

fn default_download_timeout() -> u64 {
    1800
}

fn default_read_timeout() -> u64 {
    60
}

fn default_api_timeout() -> u64 {
    10
}

// ============================================================================
// Pipeline Options
// ============================================================================

/// Transform options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Representation handed from one layer to the next
    #[serde(default)]
    pub handoff: Handoff,

    /// First date kept by the weather and aggregate layers
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,

    /// How holidays sharing a date are joined
    #[serde(default)]
    pub holiday_join: HolidayJoin,

    /// How malformed rows in delimited text sources are handled
    #[serde(default)]
    pub parse_policy: ParsePolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            handoff: Handoff::default(),
            start_date: default_start_date(),
            holiday_join: HolidayJoin::default(),
            parse_policy: ParsePolicy::default(),
        }
    }
}

/// First day covered by the aggregate layer
pub fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default()
}

// ============================================================================
// Loading
// ============================================================================

/// Load and validate the pipeline configuration from a YAML file
///
/// A missing file is a startup-fatal configuration error.
pub fn load_config(path: impl AsRef<Path>) -> Result<PipelineConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::config(format!("Config file '{}' not found", path.display()))
        } else {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        }
    })?;
    load_config_from_str(&content)
}

/// Load and validate the pipeline configuration from a YAML string
pub fn load_config_from_str(yaml: &str) -> Result<PipelineConfig> {
    let config: PipelineConfig = serde_yaml::from_str(yaml)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &PipelineConfig) -> Result<()> {
    for (name, path) in config.paths.all() {
        if path.as_os_str().is_empty() {
            return Err(Error::missing_field(format!("paths.{name}")));
        }
    }

    let files = [
        ("collisions", &config.sources.collisions),
        ("weather", &config.sources.weather),
    ];
    for (name, source) in files {
        url::Url::parse(&source.url)
            .map_err(|e| Error::invalid_value(format!("sources.{name}.url"), e.to_string()))?;
        if source.filename.trim().is_empty() {
            return Err(Error::missing_field(format!("sources.{name}.filename")));
        }
    }

    let holidays = &config.sources.holidays;
    url::Url::parse(&holidays.url_base)
        .map_err(|e| Error::invalid_value("sources.holidays.url_base", e.to_string()))?;
    if holidays.country_code.trim().is_empty() {
        return Err(Error::missing_field("sources.holidays.country_code"));
    }
    if holidays.years.is_empty() {
        return Err(Error::invalid_value(
            "sources.holidays.years",
            "at least one year is required",
        ));
    }
    if holidays.filename.trim().is_empty() {
        return Err(Error::missing_field("sources.holidays.filename"));
    }

    Ok(())
}

/// Create the three layer roots if they do not exist yet
pub fn ensure_directories(paths: &PathsConfig) -> Result<()> {
    for (_, path) in paths.all() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}
