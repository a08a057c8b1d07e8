//! Coordinator: run one worker per slot, harvest staged results into the
//! database, report progress, and handle cancellation.
//!
//! The coordinator is the only writer of the database. Each harvested result
//! is merged and the whole database saved before the staging file is
//! removed, so an interrupted pass loses at most the documents still in
//! flight.

use std::path::PathBuf;

use db::Database;
use pdfgrep_core::WorkItem;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
  IndexContext, Result,
  partition::Workload,
  progress::{IndexProgress, ProgressTracker},
  spawn::{WorkerHandle, WorkerSpawner},
  staging::{self, StagingArea},
  worker::Assignment,
};

/// Result of one indexing pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassOutcome {
  /// Documents merged into the database
  pub completed: usize,
  /// Documents that were outstanding at the start of the pass
  pub total: usize,
  pub cancelled: bool,
  /// Outstanding items still missing from the database after a full pass
  pub unindexed: Vec<WorkItem>,
}

struct Slot {
  handle: Box<dyn WorkerHandle>,
  staging_dir: PathBuf,
  exited: bool,
}

pub struct Coordinator<'a> {
  db: &'a mut Database,
  spawner: &'a dyn WorkerSpawner,
  ctx: &'a IndexContext,
  progress: Option<mpsc::Sender<IndexProgress>>,
}

impl<'a> Coordinator<'a> {
  pub fn new(db: &'a mut Database, spawner: &'a dyn WorkerSpawner, ctx: &'a IndexContext) -> Self {
    Self {
      db,
      spawner,
      ctx,
      progress: None,
    }
  }

  /// Send a progress snapshot whenever the completed count advances.
  pub fn with_progress(mut self, progress: mpsc::Sender<IndexProgress>) -> Self {
    self.progress = Some(progress);
    self
  }

  /// Index `workload` until every worker has exited or `cancel` fires.
  pub async fn run(mut self, workload: &Workload, cancel: &CancellationToken) -> Result<PassOutcome> {
    if workload.is_empty() {
      debug!("Nothing to index");
      return Ok(PassOutcome::default());
    }

    self.spawner.check()?;

    // Dropped on return, which removes anything a cancelled worker left behind
    let staging = StagingArea::create(self.ctx.staging_parent.as_deref())?;
    let mut slots = self.spawn_workers(workload, &staging).await?;

    info!(workers = slots.len(), documents = workload.total, "Indexing pass started");

    let mut tracker = ProgressTracker::new(workload.total);
    let mut completed = 0;
    let mut cancelled = false;

    loop {
      let mut all_exited = true;

      for slot in &mut slots {
        if !slot.exited {
          match slot.handle.try_exit() {
            Ok(Some(exit)) => {
              slot.exited = true;
              if exit.success {
                debug!(slot = slot.handle.slot(), "Worker exited");
              } else {
                warn!(slot = slot.handle.slot(), status = %exit.description, "Worker exited abnormally");
              }
            }
            Ok(None) => all_exited = false,
            Err(e) => {
              warn!(slot = slot.handle.slot(), err = %e, "Failed to poll worker, treating as exited");
              slot.exited = true;
            }
          }
        }

        // Harvest regardless of liveness; an exited worker may have left results
        completed += self.harvest(&slot.staging_dir)?;
      }

      if all_exited {
        break;
      }

      tokio::select! {
        biased;

        _ = cancel.cancelled() => {
          info!(completed, total = workload.total, "Indexing pass cancelled, terminating workers");
          for slot in slots.iter_mut().filter(|s| !s.exited) {
            slot.handle.terminate(self.ctx.terminate_grace).await;
            slot.exited = true;
          }
          // Results published since the last poll are complete; keep them
          for slot in &slots {
            completed += self.harvest(&slot.staging_dir)?;
          }
          cancelled = true;
          break;
        }

        _ = tokio::time::sleep(self.ctx.poll_interval) => {}
      }

      self.report(&mut tracker, completed).await;
    }

    self.report(&mut tracker, completed).await;

    let unindexed = if cancelled {
      Vec::new()
    } else {
      workload
        .items()
        .filter(|item| self.db.fingerprint(&item.key()) != Some(item.fingerprint))
        .cloned()
        .collect()
    };

    info!(
      completed,
      total = workload.total,
      cancelled,
      unindexed = unindexed.len(),
      "Indexing pass finished"
    );

    Ok(PassOutcome {
      completed,
      total: workload.total,
      cancelled,
      unindexed,
    })
  }

  async fn spawn_workers(&self, workload: &Workload, staging: &StagingArea) -> Result<Vec<Slot>> {
    let mut slots: Vec<Slot> = Vec::with_capacity(workload.slots.len());

    for (slot, items) in workload.slots.iter().enumerate() {
      if items.is_empty() {
        continue;
      }

      let staging_dir = staging.prepare_slot(slot)?;
      let assignment = Assignment {
        slot,
        staging_dir: staging_dir.clone(),
        items: items.clone(),
      };

      match self.spawner.spawn(assignment).await {
        Ok(handle) => slots.push(Slot {
          handle,
          staging_dir,
          exited: false,
        }),
        Err(e) => {
          for started in &mut slots {
            started.handle.terminate(self.ctx.terminate_grace).await;
          }
          return Err(e);
        }
      }
    }

    Ok(slots)
  }

  /// Merge every published result in `dir`; returns how many were merged.
  fn harvest(&mut self, dir: &std::path::Path) -> Result<usize> {
    let mut merged = 0;

    for (seq, path) in staging::pending(dir)? {
      match staging::read_staged(&path) {
        Ok(doc) => {
          debug!(seq, path = %doc.path, pages = doc.record.pages.len(), "Merging result");
          self.db.merge(doc);
          self.db.save()?;
          merged += 1;
        }
        Err(e) => {
          warn!(file = %path.display(), err = %e, "Discarding unreadable staging file");
        }
      }
      std::fs::remove_file(&path)?;
    }

    Ok(merged)
  }

  async fn report(&self, tracker: &mut ProgressTracker, completed: usize) {
    let Some(progress) = &self.progress else {
      return;
    };
    if let Some(snapshot) = tracker.update(completed) {
      // A dropped receiver just means nobody is watching
      let _ = progress.send(snapshot).await;
    }
  }
}
