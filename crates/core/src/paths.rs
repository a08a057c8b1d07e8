//! Path normalization and prefix matching.

use std::path::{Path, PathBuf};

/// Normalize a user-supplied root or ignore path.
///
/// Existing paths are canonicalized so they compare equal to discovered
/// documents; anything else is made absolute against the current directory.
pub fn normalize(path: &Path) -> PathBuf {
  if let Ok(canonical) = path.canonicalize() {
    return canonical;
  }
  std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

pub fn normalize_all(paths: &[PathBuf]) -> Vec<PathBuf> {
  paths.iter().map(|p| normalize(p)).collect()
}

/// True if `path` equals or lies beneath any of `prefixes` (component-wise).
pub fn under_any(path: &Path, prefixes: &[PathBuf]) -> bool {
  prefixes.iter().any(|prefix| path.starts_with(prefix))
}
