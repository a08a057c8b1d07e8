pub mod config;
pub mod dirs;
pub mod document;
pub mod os_path;
pub mod paths;

pub use config::{Config, ConfigError, IndexConfig, LoggingConfig, OcrConfig};
pub use dirs::{database_path, default_config_dir, ensure_private_dir};
pub use document::{DocumentRecord, Fingerprint, StagedDocument, WorkItem, path_key};
pub use paths::{normalize, normalize_all, under_any};
