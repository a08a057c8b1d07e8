//! Worker spawning and handles.
//!
//! Production workers are separate OS processes: the current executable
//! re-run with `--worker`, fed its [`Assignment`] as JSON on stdin. Their
//! stdout and stderr are inherited so per-page progress and diagnostics land
//! on the same stream as the coordinator's output.

use std::{
  ffi::OsString,
  path::PathBuf,
  process::{ExitStatus, Stdio},
  time::Duration,
};

use async_trait::async_trait;
use pdfgrep_core::OcrConfig;
use tokio::{
  io::AsyncWriteExt,
  process::{Child, Command},
};
use tracing::{debug, trace, warn};

use crate::{IndexError, Result, worker::Assignment};

/// Flag that switches the binary into worker mode
pub const WORKER_FLAG: &str = "--worker";

/// How a worker ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerExit {
  pub success: bool,
  /// Human readable status, e.g. `exit status: 1`
  pub description: String,
}

impl WorkerExit {
  pub fn success() -> Self {
    Self {
      success: true,
      description: "success".to_string(),
    }
  }

  pub fn failed(description: impl Into<String>) -> Self {
    Self {
      success: false,
      description: description.into(),
    }
  }
}

impl From<ExitStatus> for WorkerExit {
  fn from(status: ExitStatus) -> Self {
    Self {
      success: status.success(),
      description: status.to_string(),
    }
  }
}

/// A running worker owned by the coordinator
#[async_trait]
pub trait WorkerHandle: Send {
  fn slot(&self) -> usize;

  /// Non-blocking liveness check; `Some` once the worker has exited.
  fn try_exit(&mut self) -> std::io::Result<Option<WorkerExit>>;

  /// Ask the worker to stop, force it after `grace`, and wait for it.
  async fn terminate(&mut self, grace: Duration);
}

/// Starts workers for assignments
#[async_trait]
pub trait WorkerSpawner: Send + Sync {
  /// Verify workers can do useful work before any are spawned.
  fn check(&self) -> Result<()> {
    Ok(())
  }

  async fn spawn(&self, assignment: Assignment) -> Result<Box<dyn WorkerHandle>>;
}

/// Spawns workers as child processes of `program`
#[derive(Debug, Clone)]
pub struct ProcessSpawner {
  program: PathBuf,
  args: Vec<OsString>,
  ocr: OcrConfig,
}

impl ProcessSpawner {
  pub fn new(program: impl Into<PathBuf>, args: Vec<OsString>, ocr: OcrConfig) -> Self {
    Self {
      program: program.into(),
      args,
      ocr,
    }
  }

  /// Spawn workers by re-running the current executable in worker mode.
  pub fn current_exe(ocr: OcrConfig) -> std::io::Result<Self> {
    Ok(Self::new(std::env::current_exe()?, vec![WORKER_FLAG.into()], ocr))
  }
}

#[async_trait]
impl WorkerSpawner for ProcessSpawner {
  fn check(&self) -> Result<()> {
    ocr::create_rasterizer(&self.ocr)?;
    ocr::create_recognizer(&self.ocr)?;
    Ok(())
  }

  async fn spawn(&self, assignment: Assignment) -> Result<Box<dyn WorkerHandle>> {
    let slot = assignment.slot;
    let payload = serde_json::to_vec(&assignment)?;

    let mut child = Command::new(&self.program)
      .args(&self.args)
      .stdin(Stdio::piped())
      .stdout(Stdio::inherit())
      .stderr(Stdio::inherit())
      .kill_on_drop(true)
      .spawn()
      .map_err(|source| IndexError::Spawn { slot, source })?;

    if let Some(mut stdin) = child.stdin.take() {
      stdin
        .write_all(&payload)
        .await
        .map_err(|source| IndexError::Spawn { slot, source })?;
      // Dropping stdin closes the pipe so the worker sees EOF
    }

    debug!(slot, pid = ?child.id(), items = assignment.items.len(), "Spawned worker process");
    Ok(Box::new(ProcessHandle { slot, child }))
  }
}

struct ProcessHandle {
  slot: usize,
  child: Child,
}

#[async_trait]
impl WorkerHandle for ProcessHandle {
  fn slot(&self) -> usize {
    self.slot
  }

  fn try_exit(&mut self) -> std::io::Result<Option<WorkerExit>> {
    Ok(self.child.try_wait()?.map(WorkerExit::from))
  }

  async fn terminate(&mut self, grace: Duration) {
    if let Ok(Some(_)) = self.child.try_wait() {
      return;
    }

    if let Some(pid) = self.child.id() {
      if signal_terminate(pid) {
        trace!(slot = self.slot, pid, "Sent SIGTERM to worker");
        if tokio::time::timeout(grace, self.child.wait()).await.is_ok() {
          return;
        }
        warn!(slot = self.slot, pid, "Worker ignored SIGTERM, killing");
      }
    }

    if let Err(e) = self.child.kill().await {
      debug!(slot = self.slot, err = %e, "Failed to kill worker");
    }
  }
}

#[cfg(unix)]
fn signal_terminate(pid: u32) -> bool {
  unsafe { libc::kill(pid as i32, libc::SIGTERM) == 0 }
}

#[cfg(not(unix))]
fn signal_terminate(_pid: u32) -> bool {
  false
}
