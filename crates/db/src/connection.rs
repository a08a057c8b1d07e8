use std::{
  collections::BTreeMap,
  fs::File,
  io::{BufReader, BufWriter, Write},
  path::{Path, PathBuf},
};

use pdfgrep_core::{DocumentRecord, Fingerprint, StagedDocument};
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Error, Debug)]
pub enum DbError {
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
  #[error("{} - {source}", .path.display())]
  Malformed {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
  #[error("Serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Path -> record mapping, loaded once and held in memory.
///
/// Only the indexing coordinator mutates it. Every `save` rewrites the whole
/// mapping to a sibling temp file and renames it over the database file, so
/// readers see either the previous or the new content, never a torn write.
#[derive(Debug)]
pub struct Database {
  path: PathBuf,
  documents: BTreeMap<String, DocumentRecord>,
}

impl Database {
  /// Load the database at `path`. A missing file is an empty database.
  pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
    let path = path.into();

    let documents = match File::open(&path) {
      Ok(file) => serde_json::from_reader(BufReader::new(file)).map_err(|source| DbError::Malformed {
        path: path.clone(),
        source,
      })?,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        debug!(path = %path.display(), "No database file yet, starting empty");
        BTreeMap::new()
      }
      Err(e) => return Err(e.into()),
    };

    let db = Self { path, documents };
    debug!(path = %db.path.display(), documents = db.len(), "Database loaded");
    Ok(db)
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Sibling file that receives the serialized mapping before the rename
  pub fn temp_path(&self) -> PathBuf {
    let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".new");
    self.path.with_file_name(name)
  }

  pub fn len(&self) -> usize {
    self.documents.len()
  }

  pub fn is_empty(&self) -> bool {
    self.documents.is_empty()
  }

  pub fn get(&self, path: &str) -> Option<&DocumentRecord> {
    self.documents.get(path)
  }

  pub fn contains(&self, path: &str) -> bool {
    self.documents.contains_key(path)
  }

  pub fn fingerprint(&self, path: &str) -> Option<Fingerprint> {
    self.documents.get(path).map(|r| r.fingerprint)
  }

  /// Iterate documents in path-sorted order.
  pub fn iter(&self) -> impl Iterator<Item = (&String, &DocumentRecord)> {
    self.documents.iter()
  }

  pub fn paths(&self) -> impl Iterator<Item = &String> {
    self.documents.keys()
  }

  /// Insert or replace a record. Does not persist.
  pub fn insert(&mut self, path: impl Into<String>, record: DocumentRecord) -> Option<DocumentRecord> {
    self.documents.insert(path.into(), record)
  }

  /// Merge a worker result, unconditionally overwriting any prior record.
  pub fn merge(&mut self, staged: StagedDocument) -> Option<DocumentRecord> {
    trace!(path = %staged.path, pages = staged.record.pages.len(), "Merging document");
    self.documents.insert(staged.path, staged.record)
  }

  /// Remove a record. Does not persist.
  pub fn remove(&mut self, path: &str) -> Option<DocumentRecord> {
    self.documents.remove(path)
  }

  /// Persist the whole mapping atomically (write temp sibling, fsync, rename).
  pub fn save(&self) -> Result<()> {
    let temp_path = self.temp_path();

    {
      let file = File::create(&temp_path)?;
      let mut writer = BufWriter::new(file);
      serde_json::to_writer(&mut writer, &self.documents)?;
      writer.flush()?;
      writer.get_ref().sync_all()?;
    }

    std::fs::rename(&temp_path, &self.path)?;
    trace!(path = %self.path.display(), documents = self.len(), "Database saved");
    Ok(())
  }
}
