//! Page rasterization and text recognition via external tools
//!
//! Both steps shell out: poppler's `pdftoppm` renders pages to PNG and
//! `tesseract` recognizes each image. Failures specific to one document
//! (password protection, corrupt input, a tool crashing on that input) are
//! reported as [`OcrError`] so callers can skip the document and move on.

use std::{
  process::{Output, Stdio},
  sync::Arc,
  time::{Duration, Instant},
};

use pdfgrep_core::OcrConfig;
use tokio::{process::Command, time::timeout};
use tracing::{debug, trace};

mod poppler;
mod provider;
mod tesseract;

pub use poppler::PopplerRasterizer;
pub use provider::{Rasterizer, Result, TextRecognizer};
pub use tesseract::TesseractRecognizer;

/// Errors from rasterization or recognition of a single document
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
  #[error("password protected")]
  PasswordProtected,
  #[error("corrupt or unreadable PDF: {0}")]
  Corrupt(String),
  #[error("no pages rendered")]
  NoPages,
  #[error("{0} not found in PATH")]
  ToolNotFound(String),
  #[error("{tool} exited with status {code}: {stderr}")]
  ProcessFailed { tool: String, code: i32, stderr: String },
  #[error("{tool} timed out after {secs}s")]
  Timeout { tool: String, secs: u64 },
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
}

/// Create the configured rasterizer, failing if its executable is missing.
pub fn create_rasterizer(config: &OcrConfig) -> Result<Arc<dyn Rasterizer>> {
  let rasterizer = PopplerRasterizer::from_config(config);
  if !rasterizer.is_available() {
    return Err(OcrError::ToolNotFound(config.pdftoppm.clone()));
  }
  Ok(Arc::new(rasterizer))
}

/// Create the configured recognizer, failing if its executable is missing.
pub fn create_recognizer(config: &OcrConfig) -> Result<Arc<dyn TextRecognizer>> {
  let recognizer = TesseractRecognizer::from_config(config);
  if !recognizer.is_available() {
    return Err(OcrError::ToolNotFound(config.tesseract.clone()));
  }
  Ok(Arc::new(recognizer))
}

/// Resolve an executable name via PATH.
///
/// Values containing a path separator are taken as-is and only checked for
/// existence.
pub fn find_executable(name: &str) -> Option<String> {
  if name.is_empty() {
    return None;
  }

  if name.contains(std::path::MAIN_SEPARATOR) {
    return std::path::Path::new(name).is_file().then(|| name.to_string());
  }

  let which_cmd = if cfg!(windows) { "where" } else { "which" };
  let output = std::process::Command::new(which_cmd)
    .arg(name)
    .output()
    .map_err(|e| debug!(err = %e, tool = name, "Failed to execute '{}'", which_cmd))
    .ok()?;

  if !output.status.success() {
    debug!(tool = name, "Executable not found in PATH");
    return None;
  }

  let path = String::from_utf8_lossy(&output.stdout)
    .lines()
    .next()
    .map(|s| s.trim().to_string())
    .filter(|s| !s.is_empty())?;

  trace!(tool = name, path = %path, "Found executable");
  Some(path)
}

/// Run an external tool to completion, capturing its output.
///
/// The child is killed if the timeout elapses or the future is dropped.
pub(crate) async fn run_tool(tool: &str, mut cmd: Command, timeout_secs: u64) -> Result<Output> {
  let start = Instant::now();
  cmd
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);

  let output = match timeout(Duration::from_secs(timeout_secs), cmd.output()).await {
    Ok(result) => result?,
    Err(_) => {
      return Err(OcrError::Timeout {
        tool: tool.to_string(),
        secs: timeout_secs,
      });
    }
  };

  trace!(
    tool,
    status = ?output.status.code(),
    elapsed_ms = start.elapsed().as_millis() as u64,
    "External tool finished"
  );
  Ok(output)
}

/// First non-empty stderr line, for compact diagnostics
pub(crate) fn stderr_summary(output: &Output) -> String {
  String::from_utf8_lossy(&output.stderr)
    .lines()
    .map(str::trim)
    .find(|l| !l.is_empty())
    .unwrap_or("no diagnostic output")
    .to_string()
}
