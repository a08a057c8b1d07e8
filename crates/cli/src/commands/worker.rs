//! Worker entrypoint: the coordinator re-runs the binary with `--worker`

use anyhow::{Context, Result};
use index::{Assignment, OcrPipeline, run_worker};
use pdfgrep_core::Config;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

/// Read an assignment from stdin and process it
pub async fn cmd_worker(config: &Config) -> Result<()> {
  let mut input = String::new();
  tokio::io::stdin()
    .read_to_string(&mut input)
    .await
    .context("Failed to read assignment from stdin")?;

  let assignment: Assignment = serde_json::from_str(&input).context("Invalid worker assignment")?;
  let pipeline = OcrPipeline::from_config(&config.ocr)?;

  // Termination comes from the coordinator as a signal
  let never = CancellationToken::new();
  let mut stdout = std::io::stdout();
  run_worker(&assignment, &pipeline, &mut stdout, &never)
    .await
    .with_context(|| format!("Worker for slot {} failed", assignment.slot))?;
  Ok(())
}
