//! Rasterization via poppler's `pdftoppm`

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pdfgrep_core::OcrConfig;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::{OcrError, Rasterizer, Result, find_executable, run_tool, stderr_summary};

/// File name prefix for rendered pages; pdftoppm appends `-<n>.png`
const PAGE_PREFIX: &str = "page";

/// Renders PDF pages to PNG with `pdftoppm -r <dpi> -png`.
#[derive(Debug, Clone)]
pub struct PopplerRasterizer {
  /// Configured executable name or path
  program: String,
  dpi: u32,
  timeout_secs: u64,
}

impl PopplerRasterizer {
  pub fn from_config(config: &OcrConfig) -> Self {
    Self {
      program: config.pdftoppm.clone(),
      dpi: config.dpi,
      timeout_secs: config.timeout_secs,
    }
  }
}

#[async_trait]
impl Rasterizer for PopplerRasterizer {
  fn name(&self) -> &str {
    "pdftoppm"
  }

  fn is_available(&self) -> bool {
    find_executable(&self.program).is_some()
  }

  async fn rasterize(&self, pdf: &Path, out_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut cmd = Command::new(&self.program);
    cmd
      .arg("-r")
      .arg(self.dpi.to_string())
      .arg("-png")
      .arg(pdf)
      .arg(out_dir.join(PAGE_PREFIX));

    debug!(pdf = %pdf.display(), dpi = self.dpi, "Rasterizing PDF");
    let output = run_tool(self.name(), cmd, self.timeout_secs).await?;
    let stderr = String::from_utf8_lossy(&output.stderr);

    if stderr.contains("Incorrect password") {
      return Err(OcrError::PasswordProtected);
    }

    if !output.status.success() {
      return Err(OcrError::Corrupt(stderr_summary(&output)));
    }

    if !stderr.trim().is_empty() {
      warn!(pdf = %pdf.display(), diagnostic = %stderr_summary(&output), "pdftoppm reported problems");
    }

    let pages = collect_pages(out_dir)?;
    if pages.is_empty() {
      return Err(OcrError::NoPages);
    }
    Ok(pages)
  }
}

/// Collect `page-<n>.png` files in numeric page order.
///
/// pdftoppm zero-pads the page number to the width of the page count, so
/// lexical order is not reliable across documents; parse it instead.
fn collect_pages(out_dir: &Path) -> std::io::Result<Vec<PathBuf>> {
  let mut pages: Vec<(usize, PathBuf)> = Vec::new();

  for entry in std::fs::read_dir(out_dir)? {
    let path = entry?.path();
    let Some(number) = page_number(&path) else {
      continue;
    };
    pages.push((number, path));
  }

  pages.sort_by_key(|(n, _)| *n);
  Ok(pages.into_iter().map(|(_, p)| p).collect())
}

fn page_number(path: &Path) -> Option<usize> {
  if path.extension()? != "png" {
    return None;
  }
  let stem = path.file_stem()?.to_str()?;
  stem.strip_prefix(PAGE_PREFIX)?.strip_prefix('-')?.parse().ok()
}
