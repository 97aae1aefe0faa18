//! Configuration — defaults, per-user config file, environment overrides.
//!
//! Load order: built-in defaults, then `<config_dir>/snap-qr/config.json`
//! if present, then a `.env` file and process environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScannerConfig {
    pub default_size: f64,
    pub min_size: f64,
    pub max_size: f64,
    pub size_step: f64,
    pub capture_padding: u32,
    pub scan_interval_ms: u64,
    pub position_threshold_px: f64,
    pub size_threshold_px: f64,
    pub static_frame_resample_ms: u64,
    pub recent_payload_ttl_ms: u64,
    pub recent_payload_cache_size: usize,
    pub recenter_throttle_ms: u64,
    pub resize_throttle_ms: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            default_size: 240.0,
            min_size: 120.0,
            max_size: 820.0,
            size_step: 20.0,
            capture_padding: 100,
            scan_interval_ms: 220,
            position_threshold_px: 12.0,
            size_threshold_px: 12.0,
            static_frame_resample_ms: 1500,
            recent_payload_ttl_ms: 4000,
            recent_payload_cache_size: 16,
            recenter_throttle_ms: 12,
            resize_throttle_ms: 16,
        }
    }
}

impl ScannerConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    pub fn static_frame_resample(&self) -> Duration {
        Duration::from_millis(self.static_frame_resample_ms)
    }

    pub fn recent_payload_ttl(&self) -> Duration {
        Duration::from_millis(self.recent_payload_ttl_ms)
    }

    pub fn recenter_throttle(&self) -> Duration {
        Duration::from_millis(self.recenter_throttle_ms)
    }

    pub fn resize_throttle(&self) -> Duration {
        Duration::from_millis(self.resize_throttle_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_size > 0.0 && self.min_size <= self.max_size) {
            return Err(ConfigError::Invalid(format!(
                "size bounds {}..{} are not a positive range",
                self.min_size, self.max_size
            )));
        }
        if self.default_size < self.min_size || self.default_size > self.max_size {
            return Err(ConfigError::Invalid(format!(
                "default size {} outside {}..{}",
                self.default_size, self.min_size, self.max_size
            )));
        }
        if !(self.size_step > 0.0) {
            return Err(ConfigError::Invalid("size step must be positive".into()));
        }
        for (name, value) in [
            ("position threshold", self.position_threshold_px),
            ("size threshold", self.size_threshold_px),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if self.scan_interval_ms == 0 {
            return Err(ConfigError::Invalid("scan interval must be non-zero".into()));
        }
        if self.recent_payload_cache_size == 0 {
            return Err(ConfigError::Invalid(
                "recent payload cache size must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HostConfig {
    /// Host executable name or path; bare names are looked up on `PATH`.
    pub command: PathBuf,
    pub args: Vec<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            command: PathBuf::from("snap-qr-host"),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub scanner: ScannerConfig,
    pub host: HostConfig,
}

impl AppConfig {
    /// Loads the full configuration and validates it.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match config_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };

        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("[CONFIG] Loaded {}", path.display());
        }
        config.apply_env(|key| std::env::var(key).ok())?;
        config.scanner.validate()?;

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("[CONFIG] Using {}", path.display());
        Ok(config)
    }

    /// Applies `SNAP_QR_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("SNAP_QR_HOST").filter(|v| !v.trim().is_empty()) {
            self.host.command = PathBuf::from(host.trim());
        }

        let s = &mut self.scanner;
        override_from(&lookup, "SNAP_QR_SCAN_INTERVAL_MS", &mut s.scan_interval_ms)?;
        override_from(&lookup, "SNAP_QR_POSITION_THRESHOLD_PX", &mut s.position_threshold_px)?;
        override_from(&lookup, "SNAP_QR_SIZE_THRESHOLD_PX", &mut s.size_threshold_px)?;
        override_from(&lookup, "SNAP_QR_STATIC_RESAMPLE_MS", &mut s.static_frame_resample_ms)?;
        override_from(&lookup, "SNAP_QR_PAYLOAD_TTL_MS", &mut s.recent_payload_ttl_ms)?;
        override_from(&lookup, "SNAP_QR_PAYLOAD_CACHE_SIZE", &mut s.recent_payload_cache_size)?;
        override_from(&lookup, "SNAP_QR_CAPTURE_PADDING", &mut s.capture_padding)?;
        Ok(())
    }
}

/// Per-user config file location.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("snap-qr").join("config.json"))
}

fn override_from<T, F>(lookup: &F, key: &str, field: &mut T) -> Result<(), ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(());
    };
    *field = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: raw.clone(),
    })?;
    log::debug!("[CONFIG] {} overridden from environment", key);
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnv { key: String, value: String },

    #[error("Invalid scanner config: {0}")]
    Invalid(String),
}
