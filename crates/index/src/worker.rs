//! Worker: OCR assigned documents one at a time and publish each result.

use std::{
  io::Write,
  path::PathBuf,
  sync::Arc,
};

use ocr::{OcrError, Rasterizer, TextRecognizer};
use pdfgrep_core::{OcrConfig, StagedDocument, WorkItem};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{Result, staging::StagingWriter};

/// Everything a worker needs, sent to the worker process as JSON on stdin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
  pub slot: usize,
  /// Slot-private staging directory; must already exist
  #[serde(with = "pdfgrep_core::os_path")]
  pub staging_dir: PathBuf,
  pub items: Vec<WorkItem>,
}

/// What a worker got through before exiting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
  pub indexed: usize,
  pub skipped: usize,
}

/// Rasterizer and recognizer pair used to turn a PDF into page text
#[derive(Clone)]
pub struct OcrPipeline {
  rasterizer: Arc<dyn Rasterizer>,
  recognizer: Arc<dyn TextRecognizer>,
}

impl OcrPipeline {
  pub fn new(rasterizer: Arc<dyn Rasterizer>, recognizer: Arc<dyn TextRecognizer>) -> Self {
    Self { rasterizer, recognizer }
  }

  /// Build the CLI-backed pipeline, failing if either tool is missing.
  pub fn from_config(config: &OcrConfig) -> Result<Self> {
    Ok(Self::new(
      ocr::create_rasterizer(config)?,
      ocr::create_recognizer(config)?,
    ))
  }

  /// OCR every page of `item`, in page order.
  ///
  /// `on_page` is called with the 1-based page number before each page is
  /// recognized. Page images live in a temporary directory that is removed
  /// before returning.
  pub async fn extract<F>(&self, item: &WorkItem, mut on_page: F) -> ocr::Result<Vec<String>>
  where
    F: FnMut(usize) + Send,
  {
    let images_dir = tempfile::Builder::new().prefix("pdfgrep-pages-").tempdir()?;
    let images = self.rasterizer.rasterize(&item.path, images_dir.path()).await?;

    let mut pages = Vec::with_capacity(images.len());
    for (i, image) in images.iter().enumerate() {
      on_page(i + 1);
      pages.push(self.recognizer.recognize(image).await?);
    }
    Ok(pages)
  }
}

/// Process `assignment` strictly in order.
///
/// Per-document failures are written to `out` as `cannot index: ...` and the
/// item is skipped. Only staging I/O failures abort the worker. Stops early,
/// without publishing the in-flight document, when `cancel` fires.
pub async fn run_worker<W>(
  assignment: &Assignment,
  pipeline: &OcrPipeline,
  out: &mut W,
  cancel: &CancellationToken,
) -> Result<WorkerSummary>
where
  W: Write + Send,
{
  let mut writer = StagingWriter::new(&assignment.staging_dir);
  let mut summary = WorkerSummary::default();

  debug!(slot = assignment.slot, items = assignment.items.len(), "Worker starting");

  for item in &assignment.items {
    if cancel.is_cancelled() {
      break;
    }

    let display = item.path.display().to_string();
    let extracted = tokio::select! {
      biased;
      _ = cancel.cancelled() => break,
      result = pipeline.extract(item, |page| {
        let _ = writeln!(out, "indexing: {} page {} ...", display, page);
        let _ = out.flush();
      }) => result,
    };

    match extracted {
      Ok(pages) => {
        writer.publish(&StagedDocument::new(item, pages))?;
        summary.indexed += 1;
      }
      Err(e) => {
        report_failure(out, &display, &e);
        summary.skipped += 1;
      }
    }
  }

  debug!(
    slot = assignment.slot,
    indexed = summary.indexed,
    skipped = summary.skipped,
    "Worker finished"
  );
  Ok(summary)
}

fn report_failure<W: Write>(out: &mut W, path: &str, err: &OcrError) {
  if !matches!(err, OcrError::PasswordProtected) {
    warn!(path, err = %err, "Document could not be indexed");
  }
  let _ = writeln!(out, "cannot index: {} - {}", path, err);
  let _ = out.flush();
}
