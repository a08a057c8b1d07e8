//! Configuration for pdfgrep.
//!
//! Config lives at `<config dir>/config.toml` next to the database. Every
//! section is optional and falls back to its defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// File name of the config file inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

// ============================================================================
// Indexing Configuration
// ============================================================================

/// Indexing pass configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
  /// Number of worker processes (0 = half the detected cores, at least 1)
  pub workers: usize,

  /// How often the coordinator polls workers and staging output (default: 500)
  pub poll_interval_ms: u64,

  /// Grace period between SIGTERM and a forced kill on cancellation (default: 2000)
  pub terminate_grace_ms: u64,

  /// Parent directory for per-run staging areas (default: system temp dir)
  #[serde(skip_serializing_if = "Option::is_none")]
  pub staging_dir: Option<PathBuf>,
}

impl Default for IndexConfig {
  fn default() -> Self {
    Self {
      workers: 0,
      poll_interval_ms: 500,
      terminate_grace_ms: 2000,
      staging_dir: None,
    }
  }
}

impl IndexConfig {
  /// Resolve the worker count against the number of detected cores.
  pub fn worker_count(&self, detected_cores: usize) -> usize {
    if self.workers > 0 {
      self.workers
    } else {
      (detected_cores / 2).max(1)
    }
  }

  pub fn poll_interval(&self) -> Duration {
    Duration::from_millis(self.poll_interval_ms)
  }

  pub fn terminate_grace(&self) -> Duration {
    Duration::from_millis(self.terminate_grace_ms)
  }
}

// ============================================================================
// OCR Configuration
// ============================================================================

/// External rasterizer and OCR tool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
  /// Path or name of the poppler `pdftoppm` executable
  pub pdftoppm: String,

  /// Path or name of the `tesseract` executable
  pub tesseract: String,

  /// Rasterization resolution in DPI (default: 200)
  pub dpi: u32,

  /// Tesseract language(s), e.g. "eng" or "eng+deu"
  pub language: String,

  /// Timeout for a single external tool invocation in seconds (default: 300)
  pub timeout_secs: u64,
}

impl Default for OcrConfig {
  fn default() -> Self {
    Self {
      pdftoppm: "pdftoppm".to_string(),
      tesseract: "tesseract".to_string(),
      dpi: 200,
      language: "eng".to_string(),
      timeout_secs: 300,
    }
  }
}

// ============================================================================
// Logging Configuration
// ============================================================================

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
  /// Log level: off, error, warn, info, debug, trace (default: warn)
  pub level: String,

  /// Also write logs to `pdfgrep.log` in the config directory
  pub file: bool,

  /// Log file rotation: daily, hourly, never (default: daily)
  pub rotation: String,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: "warn".to_string(),
      file: false,
      rotation: "daily".to_string(),
    }
  }
}

// ============================================================================
// Main Configuration
// ============================================================================

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  pub index: IndexConfig,
  pub ocr: OcrConfig,
  pub logging: LoggingConfig,
}

/// Why the config file could not be used
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Failed to read config file {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("Invalid config file {}: {source}", .path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },
}

impl Config {
  /// Load config from the given config directory.
  ///
  /// A missing file yields the defaults. An unreadable or invalid file is an
  /// error; callers fall back to the defaults and report it once logging is up.
  pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
    let path = Self::path(config_dir);
    if !path.exists() {
      debug!(path = %path.display(), "No config file, using defaults");
      return Ok(Self::default());
    }

    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
      path: path.clone(),
      source,
    })?;

    toml::from_str(&content).map_err(|source| ConfigError::Parse { path, source })
  }

  /// Path of the config file inside a config directory
  pub fn path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
  }
}
