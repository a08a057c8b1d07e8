//! Document records and the work items derived from them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Cheap change-detection proxy: modification time (whole seconds) and size.
///
/// Two fingerprints are equal only if both fields match exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
  pub mtime: i64,
  #[serde(rename = "fsize")]
  pub size: u64,
}

impl Fingerprint {
  pub fn new(mtime: i64, size: u64) -> Self {
    Self { mtime, size }
  }

  /// Read the current fingerprint of a file.
  pub fn of(path: &Path) -> std::io::Result<Self> {
    let metadata = std::fs::metadata(path)?;
    Ok(Self::from_metadata(&metadata))
  }

  pub fn from_metadata(metadata: &std::fs::Metadata) -> Self {
    // Pre-epoch mtimes collapse to 0; they still compare consistently.
    let mtime = metadata
      .modified()
      .ok()
      .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
      .map(|d| d.as_secs() as i64)
      .unwrap_or(0);

    Self {
      mtime,
      size: metadata.len(),
    }
  }
}

/// Persisted OCR result for one PDF.
///
/// Presence in the database means every page was recognized when the record
/// was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
  #[serde(flatten)]
  pub fingerprint: Fingerprint,
  /// Recognized text, one entry per page in page order
  pub pages: Vec<String>,
}

impl DocumentRecord {
  pub fn new(fingerprint: Fingerprint, pages: Vec<String>) -> Self {
    Self { fingerprint, pages }
  }
}

/// One outstanding document, captured at partition time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
  #[serde(with = "crate::os_path")]
  pub path: PathBuf,
  #[serde(flatten)]
  pub fingerprint: Fingerprint,
}

impl WorkItem {
  pub fn new(path: impl Into<PathBuf>, fingerprint: Fingerprint) -> Self {
    Self {
      path: path.into(),
      fingerprint,
    }
  }

  /// Database key of this item
  pub fn key(&self) -> String {
    path_key(&self.path)
  }
}

/// A completed document as published by a worker to its staging directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedDocument {
  pub path: String,
  #[serde(flatten)]
  pub record: DocumentRecord,
}

impl StagedDocument {
  pub fn new(item: &WorkItem, pages: Vec<String>) -> Self {
    Self {
      path: item.key(),
      record: DocumentRecord::new(item.fingerprint, pages),
    }
  }
}

/// Database key for a path
pub fn path_key(path: &Path) -> String {
  path.to_string_lossy().into_owned()
}
