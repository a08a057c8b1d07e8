//! Index command: run a pass, stream progress, report cleanup

use anyhow::{Context, Result};
use db::Database;
use index::{IndexContext, IndexRequest, ProcessSpawner, run_index};
use pdfgrep_core::Config;
use tokio::{signal, sync::mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Exit status after an interrupt, as a shell reports SIGINT
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Index PDFs under the requested roots
pub async fn cmd_index(mut db: Database, request: IndexRequest, config: &Config) -> Result<()> {
  let ctx = IndexContext::from_config(&config.index);
  let spawner = ProcessSpawner::current_exe(config.ocr.clone()).context("Failed to locate the pdfgrep executable")?;

  let cancel = CancellationToken::new();
  let cancel_for_signal = cancel.clone();
  tokio::spawn(async move {
    if let Err(e) = signal::ctrl_c().await {
      warn!("Failed to listen for ctrl-c: {}", e);
      return;
    }
    info!("Received ctrl-c, stopping workers...");
    cancel_for_signal.cancel();
  });

  let (progress_tx, mut progress_rx) = mpsc::channel(64);
  let printer = tokio::spawn(async move {
    while let Some(progress) = progress_rx.recv().await {
      println!("{}", progress);
    }
  });

  let result = run_index(&mut db, &request, &ctx, &spawner, Some(progress_tx), &cancel).await;
  // The sender is gone once the pass returns, so this drains and ends
  let _ = printer.await;
  let report = result.context("Indexing failed")?;

  for removal in &report.removals {
    println!("{}", removal);
  }

  if report.outcome.cancelled {
    println!("interrupted");
    std::process::exit(INTERRUPTED_EXIT_CODE);
  }

  let failed = report.outcome.unindexed.len();
  if failed > 0 {
    println!("{} document(s) could not be indexed", failed);
  }

  info!(
    indexed = report.outcome.completed,
    failed,
    removed = report.removals.len(),
    documents = db.len(),
    "Index complete"
  );
  Ok(())
}
