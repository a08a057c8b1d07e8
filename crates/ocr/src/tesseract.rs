//! Text recognition via the `tesseract` CLI

use std::path::Path;

use async_trait::async_trait;
use pdfgrep_core::OcrConfig;
use tokio::process::Command;
use tracing::trace;

use crate::{OcrError, Result, TextRecognizer, find_executable, run_tool, stderr_summary};

/// Recognizes page images with `tesseract <image> stdout -l <lang>`.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
  program: String,
  language: String,
  timeout_secs: u64,
}

impl TesseractRecognizer {
  pub fn from_config(config: &OcrConfig) -> Self {
    Self {
      program: config.tesseract.clone(),
      language: config.language.clone(),
      timeout_secs: config.timeout_secs,
    }
  }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
  fn name(&self) -> &str {
    "tesseract"
  }

  fn is_available(&self) -> bool {
    find_executable(&self.program).is_some()
  }

  async fn recognize(&self, image: &Path) -> Result<String> {
    let mut cmd = Command::new(&self.program);
    cmd.arg(image).arg("stdout").arg("-l").arg(&self.language);

    let output = run_tool(self.name(), cmd, self.timeout_secs).await?;
    if !output.status.success() {
      return Err(OcrError::ProcessFailed {
        tool: self.name().to_string(),
        code: output.status.code().unwrap_or(-1),
        stderr: stderr_summary(&output),
      });
    }

    let text = String::from_utf8_lossy(&output.stdout).into_owned();
    trace!(image = %image.display(), chars = text.len(), "Recognized page");
    Ok(text)
  }
}
