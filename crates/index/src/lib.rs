//! Concurrent OCR indexing of PDF collections.
//!
//! A pass runs discovery, partitioning, one worker per slot with the
//! coordinator harvesting their results, and optionally reconciliation:
//!
//! ```text
//! discover → partition → { workers ∥ coordinator } → database → reconcile
//! ```

use std::{path::PathBuf, time::Duration};

use db::Database;
use pdfgrep_core::{IndexConfig, normalize_all};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub mod coordinator;
pub mod discover;
mod error;
pub mod partition;
pub mod progress;
pub mod reconcile;
pub mod spawn;
pub mod staging;
pub mod worker;

#[cfg(test)]
mod __tests__;

pub use coordinator::{Coordinator, PassOutcome};
pub use discover::discover;
pub use error::{IndexError, Result};
pub use partition::{Workload, partition};
pub use progress::{IndexProgress, ProgressTracker, format_eta};
pub use reconcile::{Removal, RemovalReason, reconcile};
pub use spawn::{ProcessSpawner, WORKER_FLAG, WorkerExit, WorkerHandle, WorkerSpawner};
pub use staging::{StagingArea, StagingWriter};
pub use worker::{Assignment, OcrPipeline, WorkerSummary, run_worker};

/// Runtime settings for an indexing pass
#[derive(Debug, Clone)]
pub struct IndexContext {
  pub workers: usize,
  pub poll_interval: Duration,
  pub terminate_grace: Duration,
  /// Parent directory for the per-run staging area; system temp dir if unset
  pub staging_parent: Option<PathBuf>,
}

impl IndexContext {
  pub fn from_config(config: &IndexConfig) -> Self {
    Self {
      workers: config.worker_count(num_cpus::get()),
      poll_interval: config.poll_interval(),
      terminate_grace: config.terminate_grace(),
      staging_parent: config.staging_dir.clone(),
    }
  }
}

/// What to index
#[derive(Debug, Clone, Default)]
pub struct IndexRequest {
  pub roots: Vec<PathBuf>,
  pub ignores: Vec<PathBuf>,
  /// Run reconciliation after the pass
  pub cleanup: bool,
}

#[derive(Debug, Clone, Default)]
pub struct IndexReport {
  pub outcome: PassOutcome,
  /// Empty unless cleanup was requested and the pass ran to completion
  pub removals: Vec<Removal>,
}

/// Run a full indexing pass for `request` against `db`.
pub async fn run_index(
  db: &mut Database,
  request: &IndexRequest,
  ctx: &IndexContext,
  spawner: &dyn WorkerSpawner,
  progress: Option<mpsc::Sender<IndexProgress>>,
  cancel: &CancellationToken,
) -> Result<IndexReport> {
  let roots = normalize_all(&request.roots);
  let ignores = normalize_all(&request.ignores);

  let candidates = discover(&roots, &ignores);
  let workload = partition(&candidates, db, ctx.workers);
  info!(
    candidates = candidates.len(),
    outstanding = workload.total,
    "Prepared indexing workload"
  );

  let mut coordinator = Coordinator::new(db, spawner, ctx);
  if let Some(progress) = progress {
    coordinator = coordinator.with_progress(progress);
  }
  let outcome = coordinator.run(&workload, cancel).await?;

  let removals = if request.cleanup && !outcome.cancelled {
    reconcile(db, &roots, &candidates, &ignores)?
  } else {
    Vec::new()
  };

  Ok(IndexReport { outcome, removals })
}
