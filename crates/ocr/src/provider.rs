//! Collaborator traits for turning a PDF into page text
//!
//! Rasterization and recognition are separate so each backend can be swapped
//! independently (and faked in tests).

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::OcrError;

/// Result type for OCR operations
pub type Result<T> = std::result::Result<T, OcrError>;

/// Converts one PDF into an ordered sequence of page images.
#[async_trait]
pub trait Rasterizer: Send + Sync {
  /// The name of this backend (for logging/identification)
  fn name(&self) -> &str;

  /// Check if the backend can be used (e.g. its executable is on PATH)
  fn is_available(&self) -> bool;

  /// Render every page of `pdf` into `out_dir`.
  ///
  /// Returns image paths in page order. Password-protected input must be
  /// reported as [`OcrError::PasswordProtected`] and unreadable input as
  /// [`OcrError::Corrupt`].
  async fn rasterize(&self, pdf: &Path, out_dir: &Path) -> Result<Vec<PathBuf>>;
}

/// Converts one page image into text.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
  fn name(&self) -> &str;

  fn is_available(&self) -> bool;

  async fn recognize(&self, image: &Path) -> Result<String>;
}
