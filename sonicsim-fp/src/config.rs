//! Configuration for sonicsim-fp
//!
//! Resolution order, highest priority first:
//! 1. Explicit TOML path from the host
//! 2. `SONICSIM_CONFIG` environment variable
//! 3. Platform config file (`<config_dir>/sonicsim/sonicsim.toml`)
//! 4. Compiled defaults
//!
//! `SONICSIM_WORKERS` and `SONICSIM_DATABASE` are applied on top of whichever
//! file was loaded.

use crate::models::{MAX_FREQ_BIN, MAX_TIME_DELTA};
use serde::{Deserialize, Serialize};
use sonicsim_common::config::{
    default_config_path, read_toml_config, resolve_data_folder, write_toml_config,
    DATABASE_FILE_NAME, DATA_DIR_ENV,
};
use sonicsim_common::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming the TOML config file
pub const CONFIG_ENV: &str = "SONICSIM_CONFIG";

/// Environment variable overriding `service.workers`
pub const WORKERS_ENV: &str = "SONICSIM_WORKERS";

/// Environment variable overriding `storage.database_path`
pub const DATABASE_ENV: &str = "SONICSIM_DATABASE";

/// SQLite's default cap on bound parameters per statement
pub const SQLITE_MAX_BIND_PARAMS: usize = 32766;

/// Largest multi-row INSERT: three bound values per row
pub const MAX_INSERT_BATCH_ROWS: usize = SQLITE_MAX_BIND_PARAMS / 3;

/// Largest hash lookup: one slot is reserved for the excluded path
pub const MAX_LOOKUP_BATCH_SIZE: usize = SQLITE_MAX_BIND_PARAMS - 1;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    /// Data folder holding the database when no explicit path is set
    pub data_folder: Option<PathBuf>,
    pub analysis: AnalysisConfig,
    pub peaks: PeakConfig,
    pub hashing: HashingConfig,
    pub matching: MatchingConfig,
    pub service: ServiceConfig,
    pub storage: StorageConfig,
}

/// STFT parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Rate every waveform is resampled to before analysis (Hz)
    pub sample_rate: u32,
    /// FFT window length in samples
    pub n_fft: usize,
    /// Hop between successive frames in samples
    pub hop_length: usize,
    /// Only the leading part of each file is analysed
    pub max_duration_secs: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            n_fft: 2048,
            hop_length: 512,
            max_duration_secs: 30.0,
        }
    }
}

impl AnalysisConfig {
    /// Sample cap derived from `max_duration_secs`
    pub fn max_samples(&self) -> usize {
        (self.max_duration_secs * f64::from(self.sample_rate)).round() as usize
    }

    /// Number of frequency bins per frame
    pub fn bin_count(&self) -> usize {
        self.n_fft / 2 + 1
    }
}

/// Peak picking parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakConfig {
    /// Side of the square max-filter neighbourhood (cells)
    pub neighborhood_size: usize,
    /// Peaks must be strictly louder than this (dB relative to max)
    pub amplitude_threshold_db: f32,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            neighborhood_size: 20,
            amplitude_threshold_db: -50.0,
        }
    }
}

/// Landmark pairing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingConfig {
    /// Maximum targets paired with one anchor
    pub fan_out: usize,
    /// Maximum anchor→target distance in frames
    pub target_time_delta: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            fan_out: 15,
            target_time_delta: 200,
        }
    }
}

/// Scoring parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Offset histogram bucket width in frames
    pub bucket_width: i64,
    /// Multiplier applied to `best_bucket / query_len`
    pub score_scale: f64,
    /// Scores are capped here
    pub max_score: f64,
    /// Results must score strictly above this
    pub min_score: f64,
    /// Default number of results returned by a search
    pub default_limit: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            bucket_width: 5,
            score_scale: 500.0,
            max_score: 100.0,
            min_score: 5.0,
            default_limit: 25,
        }
    }
}

/// Worker pool parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Number of concurrent fingerprint jobs
    pub workers: usize,
    /// Bounded queue length; `generate_async` fails fast beyond it
    pub queue_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 64,
        }
    }
}

/// Persistence parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Explicit database file; defaults to `<data_folder>/sonicsim.db`
    pub database_path: Option<PathBuf>,
    /// Total time a save keeps retrying on a locked database
    pub max_lock_wait_ms: u64,
    /// Rows per multi-row INSERT
    pub insert_batch_rows: usize,
    /// Hash values per `IN (...)` lookup
    pub lookup_batch_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            max_lock_wait_ms: 5000,
            insert_batch_rows: 300,
            lookup_batch_size: 900,
        }
    }
}

impl FingerprintConfig {
    /// Load configuration following the documented resolution order
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match Self::locate(explicit) {
            Some(path) => {
                info!(path = %path.display(), "Loading fingerprint config");
                read_toml_config::<Self>(&path)?
            }
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        default_config_path().filter(|p| p.exists())
    }

    /// Apply `SONICSIM_WORKERS` and `SONICSIM_DATABASE`
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var(WORKERS_ENV) {
            let workers = value.trim().parse::<usize>().map_err(|e| {
                Error::Config(format!("{} must be a positive integer: {}", WORKERS_ENV, e))
            })?;
            debug!(workers, "Worker count from environment");
            self.service.workers = workers;
        }

        if let Ok(value) = std::env::var(DATABASE_ENV) {
            if value.trim().is_empty() {
                warn!("{} is set but empty, ignoring", DATABASE_ENV);
            } else {
                debug!(path = %value, "Database path from environment");
                self.storage.database_path = Some(PathBuf::from(value));
            }
        }

        Ok(())
    }

    /// Reject settings the pipeline or hash layout cannot honour
    pub fn validate(&self) -> Result<()> {
        let a = &self.analysis;
        if a.sample_rate == 0 {
            return Err(Error::Config("analysis.sample_rate must be > 0".into()));
        }
        if a.n_fft < 2 {
            return Err(Error::Config("analysis.n_fft must be >= 2".into()));
        }
        if a.hop_length == 0 {
            return Err(Error::Config("analysis.hop_length must be > 0".into()));
        }
        if !(a.max_duration_secs > 0.0) {
            return Err(Error::Config(
                "analysis.max_duration_secs must be > 0".into(),
            ));
        }
        if a.bin_count() > MAX_FREQ_BIN as usize + 1 {
            return Err(Error::Config(format!(
                "analysis.n_fft {} yields {} bins; at most {} fit in a hash",
                a.n_fft,
                a.bin_count(),
                MAX_FREQ_BIN + 1
            )));
        }

        if self.peaks.neighborhood_size == 0 {
            return Err(Error::Config("peaks.neighborhood_size must be > 0".into()));
        }

        if self.hashing.fan_out == 0 {
            return Err(Error::Config("hashing.fan_out must be > 0".into()));
        }
        if self.hashing.target_time_delta == 0 || self.hashing.target_time_delta > MAX_TIME_DELTA {
            return Err(Error::Config(format!(
                "hashing.target_time_delta must be in 1..={}",
                MAX_TIME_DELTA
            )));
        }

        if self.matching.bucket_width <= 0 {
            return Err(Error::Config("matching.bucket_width must be > 0".into()));
        }
        if self.matching.default_limit == 0 {
            return Err(Error::Config("matching.default_limit must be > 0".into()));
        }

        if self.service.workers == 0 {
            return Err(Error::Config("service.workers must be > 0".into()));
        }
        if self.service.queue_capacity == 0 {
            return Err(Error::Config("service.queue_capacity must be > 0".into()));
        }

        if !(1..=MAX_INSERT_BATCH_ROWS).contains(&self.storage.insert_batch_rows) {
            return Err(Error::Config(format!(
                "storage.insert_batch_rows must be in 1..={}",
                MAX_INSERT_BATCH_ROWS
            )));
        }
        if !(1..=MAX_LOOKUP_BATCH_SIZE).contains(&self.storage.lookup_batch_size) {
            return Err(Error::Config(format!(
                "storage.lookup_batch_size must be in 1..={}",
                MAX_LOOKUP_BATCH_SIZE
            )));
        }

        Ok(())
    }

    /// Database file: explicit setting, else `<data folder>/sonicsim.db`
    pub fn database_path(&self) -> PathBuf {
        if let Some(path) = &self.storage.database_path {
            return path.clone();
        }
        resolve_data_folder(self.data_folder.as_deref(), DATA_DIR_ENV, None)
            .join(DATABASE_FILE_NAME)
    }

    /// Write the configuration back as TOML (atomic replace)
    pub fn save(&self, path: &Path) -> Result<()> {
        write_toml_config(self, path)
    }
}
