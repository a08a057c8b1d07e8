//! Staging protocol between workers and the coordinator.
//!
//! Each slot owns a directory inside a per-run staging area. A worker writes
//! every completed document to `<seq>.tmp`, syncs it, then renames it to
//! `<seq>`. The coordinator only ever reads names that parse as an integer,
//! so it never observes a partial write. Sequence numbers grow per slot,
//! which preserves in-slot order when harvesting.

use std::{
  fs::{self, File},
  io::{BufWriter, ErrorKind, Write},
  path::{Path, PathBuf},
};

use pdfgrep_core::StagedDocument;
use tempfile::TempDir;
use tracing::trace;

use crate::{IndexError, Result};

const TEMP_SUFFIX: &str = "tmp";

/// Per-run staging root, removed when dropped
#[derive(Debug)]
pub struct StagingArea {
  dir: TempDir,
}

impl StagingArea {
  /// Create a fresh staging area under `parent`, or the system temp dir.
  pub fn create(parent: Option<&Path>) -> Result<Self> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("pdfgrep-");
    let dir = match parent {
      Some(parent) => builder.tempdir_in(parent),
      None => builder.tempdir(),
    }
    .map_err(|source| IndexError::Staging {
      path: parent.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir),
      source,
    })?;

    trace!(path = %dir.path().display(), "Created staging area");
    Ok(Self { dir })
  }

  pub fn path(&self) -> &Path {
    self.dir.path()
  }

  pub fn slot_dir(&self, slot: usize) -> PathBuf {
    self.dir.path().join(slot.to_string())
  }

  /// Create the directory for `slot` and return its path.
  pub fn prepare_slot(&self, slot: usize) -> Result<PathBuf> {
    let path = self.slot_dir(slot);
    fs::create_dir_all(&path).map_err(|source| IndexError::Staging {
      path: path.clone(),
      source,
    })?;
    Ok(path)
  }
}

/// Worker-side publisher of staged documents
#[derive(Debug)]
pub struct StagingWriter {
  dir: PathBuf,
  next_seq: u64,
}

impl StagingWriter {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self {
      dir: dir.into(),
      next_seq: 0,
    }
  }

  /// Atomically publish `doc` under the next sequence number.
  pub fn publish(&mut self, doc: &StagedDocument) -> Result<PathBuf> {
    let seq = self.next_seq;
    let final_path = self.dir.join(seq.to_string());
    let temp_path = self.dir.join(format!("{seq}.{TEMP_SUFFIX}"));

    let file = File::create(&temp_path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, doc)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    drop(writer);

    fs::rename(&temp_path, &final_path)?;
    self.next_seq += 1;

    trace!(seq, path = %doc.path, "Published staged document");
    Ok(final_path)
  }
}

/// Published results in `dir`, in ascending sequence order.
///
/// Temporary and foreign names are skipped. A missing directory has nothing
/// pending.
pub fn pending(dir: &Path) -> std::io::Result<Vec<(u64, PathBuf)>> {
  let entries = match fs::read_dir(dir) {
    Ok(entries) => entries,
    Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
    Err(e) => return Err(e),
  };

  let mut results = Vec::new();
  for entry in entries {
    let entry = entry?;
    let Some(seq) = entry.file_name().to_str().and_then(|n| n.parse::<u64>().ok()) else {
      continue;
    };
    results.push((seq, entry.path()));
  }

  results.sort_by_key(|(seq, _)| *seq);
  Ok(results)
}

/// Read one published result.
pub fn read_staged(path: &Path) -> Result<StagedDocument> {
  let bytes = fs::read(path)?;
  Ok(serde_json::from_slice(&bytes)?)
}
