//! Workload partitioning: diff candidates against the database and deal the
//! outstanding items round-robin across worker slots.

use std::path::PathBuf;

use db::Database;
use pdfgrep_core::{Fingerprint, WorkItem, path_key};
use tracing::{debug, trace};

/// Outstanding work for one indexing pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workload {
  /// Per-slot items in processing order; `slots.len()` is the worker count
  pub slots: Vec<Vec<WorkItem>>,
  /// Total outstanding items across all slots
  pub total: usize,
}

impl Workload {
  pub fn is_empty(&self) -> bool {
    self.total == 0
  }

  /// All items across slots, slot by slot
  pub fn items(&self) -> impl Iterator<Item = &WorkItem> {
    self.slots.iter().flatten()
  }
}

/// Compute outstanding work for `candidates`.
///
/// A candidate is skipped only when the database holds a record whose
/// fingerprint equals the file's current one exactly. Candidates that vanish
/// before they can be stat'ed are dropped silently.
pub fn partition(candidates: &[PathBuf], db: &Database, workers: usize) -> Workload {
  let workers = workers.max(1);
  let mut slots: Vec<Vec<WorkItem>> = vec![Vec::new(); workers];
  let mut total = 0;

  for path in candidates {
    let fingerprint = match Fingerprint::of(path) {
      Ok(fp) => fp,
      Err(e) => {
        trace!(path = %path.display(), err = %e, "Candidate vanished before stat");
        continue;
      }
    };

    if db.fingerprint(&path_key(path)) == Some(fingerprint) {
      continue;
    }

    slots[total % workers].push(WorkItem::new(path.clone(), fingerprint));
    total += 1;
  }

  debug!(candidates = candidates.len(), outstanding = total, workers, "Partitioned workload");
  Workload { slots, total }
}
