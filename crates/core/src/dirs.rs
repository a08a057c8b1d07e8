//! Per-user directories.

use std::io;
use std::path::{Path, PathBuf};

/// File name of the persisted database inside the config directory
pub const DATABASE_FILE_NAME: &str = "database.db";

/// Get the default config directory
///
/// Respects the following environment variables (in order of precedence):
/// 1. PDFGREP_CONFIG_DIR - explicit config directory override
/// 2. XDG_CONFIG_HOME - standard XDG config home directory
/// 3. dirs::config_dir() - platform default
pub fn default_config_dir() -> PathBuf {
  if let Ok(dir) = std::env::var("PDFGREP_CONFIG_DIR") {
    return PathBuf::from(dir);
  }

  if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
    return PathBuf::from(xdg_config).join("pdfgrep");
  }

  dirs::config_dir()
    .unwrap_or_else(|| PathBuf::from("."))
    .join("pdfgrep")
}

/// Database file path inside a config directory
pub fn database_path(config_dir: &Path) -> PathBuf {
  config_dir.join(DATABASE_FILE_NAME)
}

/// Create a directory (and missing parents) readable only by its owner.
///
/// Existing directories are left as they are.
pub fn ensure_private_dir(path: &Path) -> io::Result<()> {
  if path.is_dir() {
    return Ok(());
  }

  let mut builder = std::fs::DirBuilder::new();
  builder.recursive(true);
  #[cfg(unix)]
  {
    use std::os::unix::fs::DirBuilderExt;
    builder.mode(0o700);
  }
  builder.create(path)
}
