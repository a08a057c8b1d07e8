use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
  #[error("Database error: {0}")]
  Db(#[from] db::DbError),
  #[error("OCR unavailable: {0}")]
  Ocr(#[from] ocr::OcrError),
  #[error("Serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
  #[error("Failed to spawn worker for slot {slot}: {source}")]
  Spawn {
    slot: usize,
    #[source]
    source: std::io::Error,
  },
  #[error("Failed to prepare staging directory {}: {source}", .path.display())]
  Staging {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

pub type Result<T> = std::result::Result<T, IndexError>;
