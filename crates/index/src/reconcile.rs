//! Reconciliation: drop database entries for deleted or newly ignored files.

use std::{
  collections::HashSet,
  fmt,
  path::{Path, PathBuf},
};

use db::Database;
use pdfgrep_core::{path_key, under_any};
use tracing::debug;

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
  /// No longer found on disk under its root
  Deleted,
  /// Now under an ignore path
  Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
  pub path: String,
  pub reason: RemovalReason,
}

impl fmt::Display for Removal {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.reason {
      RemovalReason::Deleted => write!(f, "cleanup, file deleted: {}", self.path),
      RemovalReason::Ignored => write!(f, "cleanup, path ignored: {}", self.path),
    }
  }
}

/// Remove stale entries under `roots` and persist once.
///
/// An entry is stale if it is under an ignore path or missing from
/// `candidates`. Entries outside every root are never touched. All arguments
/// must be normalized the same way as database keys.
pub fn reconcile(
  db: &mut Database,
  roots: &[PathBuf],
  candidates: &[PathBuf],
  ignores: &[PathBuf],
) -> Result<Vec<Removal>> {
  let present: HashSet<String> = candidates.iter().map(|p| path_key(p)).collect();

  let removals: Vec<Removal> = db
    .paths()
    .filter(|path| under_any(Path::new(path.as_str()), roots))
    .filter_map(|path| {
      let reason = if under_any(Path::new(path.as_str()), ignores) {
        RemovalReason::Ignored
      } else if !present.contains(path) {
        RemovalReason::Deleted
      } else {
        return None;
      };
      Some(Removal {
        path: path.clone(),
        reason,
      })
    })
    .collect();

  if removals.is_empty() {
    return Ok(removals);
  }

  for removal in &removals {
    db.remove(&removal.path);
  }
  db.save()?;

  debug!(removed = removals.len(), remaining = db.len(), "Reconciled database");
  Ok(removals)
}
