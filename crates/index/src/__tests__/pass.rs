//! Full indexing pass tests.
//!
//! Drives `run_index` end to end with in-process workers and fake OCR.

#[cfg(test)]
mod tests {
  use std::{
    collections::HashSet,
    time::{Duration, Instant},
  };

  use filetime::FileTime;
  use pdfgrep_core::{Fingerprint, path_key};
  use pretty_assertions::assert_eq;
  use tokio::sync::mpsc;
  use tokio_util::sync::CancellationToken;

  use crate::{
    IndexError, IndexRequest, RemovalReason, Result, run_index,
    __tests__::helpers::{
      IndexTestContext, InlineSpawner, LingeringSpawner, SLOW_MARKER, TaskSpawner, fake_pipeline,
    },
    spawn::{WorkerExit, WorkerHandle, WorkerSpawner},
    worker::Assignment,
  };

  /// Test: every discovered PDF ends up in the database with its pages in order.
  #[tokio::test]
  async fn test_full_pass_indexes_everything() {
    let ctx = IndexTestContext::new();
    let a = ctx.write_pdf("a.pdf", &["alpha one\nalpha two", "alpha page two"]);
    let b = ctx.write_pdf("nested/b.PDF", &["bravo"]);
    let c = ctx.write_pdf("nested/deeper/c.pdf", &["charlie", "", "charlie three"]);
    ctx.write_pdf("notes.txt", &["not a pdf"]);

    let (pipeline, calls) = fake_pipeline();
    let spawner = TaskSpawner::new(pipeline);
    let mut db = ctx.open_db();

    let report = run_index(
      &mut db,
      &ctx.request(false),
      &ctx.index_context(2),
      &spawner,
      None,
      &CancellationToken::new(),
    )
    .await
    .expect("index pass");

    assert_eq!(report.outcome.completed, 3);
    assert_eq!(report.outcome.total, 3);
    assert!(!report.outcome.cancelled);
    assert!(report.outcome.unindexed.is_empty());
    assert_eq!(spawner.spawned(), 2);
    assert_eq!(calls.recognized(), 6);

    let reloaded = ctx.open_db();
    assert_eq!(reloaded.len(), 3);
    assert_eq!(
      reloaded.get(&path_key(&a)).unwrap().pages,
      vec!["alpha one\nalpha two".to_string(), "alpha page two".to_string()]
    );
    assert_eq!(reloaded.get(&path_key(&b)).unwrap().pages, vec!["bravo".to_string()]);
    assert_eq!(
      reloaded.get(&path_key(&c)).unwrap().pages,
      vec!["charlie".to_string(), String::new(), "charlie three".to_string()]
    );
    assert_eq!(
      reloaded.get(&path_key(&a)).unwrap().fingerprint,
      Fingerprint::of(&a).unwrap()
    );

    assert!(ctx.staging_leftovers().is_empty(), "staging area removed after pass");
  }

  /// Test: a second pass over unchanged documents runs no OCR at all.
  #[tokio::test]
  async fn test_second_pass_is_idempotent() {
    let ctx = IndexTestContext::new();
    ctx.write_pdf("a.pdf", &["one"]);
    ctx.write_pdf("b.pdf", &["two", "three"]);

    let mut db = ctx.open_db();
    let (first_pipeline, _) = fake_pipeline();
    run_index(
      &mut db,
      &ctx.request(false),
      &ctx.index_context(2),
      &TaskSpawner::new(first_pipeline),
      None,
      &CancellationToken::new(),
    )
    .await
    .unwrap();

    let (pipeline, calls) = fake_pipeline();
    let spawner = TaskSpawner::new(pipeline);
    let report = run_index(
      &mut db,
      &ctx.request(false),
      &ctx.index_context(2),
      &spawner,
      None,
      &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(calls.recognized(), 0);
    assert_eq!(spawner.spawned(), 0);
    assert_eq!(report.outcome.total, 0);
    assert_eq!(db.len(), 2);
  }

  /// Test: metadata drift alone forces a document to be processed again.
  #[tokio::test]
  async fn test_touched_document_is_reindexed() {
    let ctx = IndexTestContext::new();
    let a = ctx.write_pdf("a.pdf", &["original"]);
    ctx.write_pdf("b.pdf", &["untouched"]);

    let mut db = ctx.open_db();
    let (pipeline, _) = fake_pipeline();
    run_index(
      &mut db,
      &ctx.request(false),
      &ctx.index_context(1),
      &TaskSpawner::new(pipeline),
      None,
      &CancellationToken::new(),
    )
    .await
    .unwrap();

    let old = Fingerprint::of(&a).unwrap();
    filetime::set_file_mtime(&a, FileTime::from_unix_time(old.mtime + 60, 0)).unwrap();

    let (pipeline, calls) = fake_pipeline();
    let report = run_index(
      &mut db,
      &ctx.request(false),
      &ctx.index_context(1),
      &TaskSpawner::new(pipeline),
      None,
      &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.outcome.completed, 1);
    assert_eq!(calls.recognized(), 1);
    assert_eq!(db.fingerprint(&path_key(&a)), Some(Fingerprint::of(&a).unwrap()));
  }

  /// Test: unreadable documents are skipped, reported, and retried next time.
  #[tokio::test]
  async fn test_failed_documents_reported_as_unindexed() {
    let ctx = IndexTestContext::new();
    let good = ctx.write_pdf("good.pdf", &["fine"]);
    let locked = ctx.write_pdf("locked.pdf", &["PASSWORD"]);
    let broken = ctx.write_pdf("broken.pdf", &["CORRUPT"]);

    let mut db = ctx.open_db();
    let (pipeline, _) = fake_pipeline();
    let report = run_index(
      &mut db,
      &ctx.request(false),
      &ctx.index_context(2),
      &TaskSpawner::new(pipeline),
      None,
      &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.outcome.completed, 1);
    assert_eq!(report.outcome.total, 3);
    let unindexed: HashSet<_> = report.outcome.unindexed.iter().map(|i| i.path.clone()).collect();
    assert_eq!(unindexed, HashSet::from([locked.clone(), broken]));
    assert!(db.contains(&path_key(&good)));
    assert!(!db.contains(&path_key(&locked)));

    // Still outstanding on the next pass
    let (pipeline, calls) = fake_pipeline();
    let retry = run_index(
      &mut db,
      &ctx.request(false),
      &ctx.index_context(2),
      &TaskSpawner::new(pipeline),
      None,
      &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(retry.outcome.total, 2);
    assert_eq!(calls.recognized(), 0);
  }

  /// Test: progress snapshots arrive as the completed count advances.
  #[tokio::test]
  async fn test_progress_reported() {
    let ctx = IndexTestContext::new();
    for i in 0..4 {
      ctx.write_pdf(&format!("{i}.pdf"), &["page"]);
    }

    let mut db = ctx.open_db();
    let (pipeline, _) = fake_pipeline();
    let (tx, mut rx) = mpsc::channel(64);

    run_index(
      &mut db,
      &ctx.request(false),
      &ctx.index_context(2),
      &TaskSpawner::new(pipeline),
      Some(tx),
      &CancellationToken::new(),
    )
    .await
    .unwrap();

    let mut snapshots = Vec::new();
    while let Ok(progress) = rx.try_recv() {
      snapshots.push(progress);
    }

    assert!(!snapshots.is_empty());
    let counts: Vec<usize> = snapshots.iter().map(|p| p.completed).collect();
    assert!(counts.windows(2).all(|w| w[0] < w[1]), "strictly increasing: {counts:?}");
    let last = snapshots.last().unwrap();
    assert_eq!((last.completed, last.total), (4, 4));
    assert!(last.is_complete());
  }

  /// Test: results published by a worker that already exited are harvested,
  /// including when it exited abnormally.
  #[tokio::test]
  async fn test_results_harvested_after_worker_exit() {
    let ctx = IndexTestContext::new();
    ctx.write_pdf("a.pdf", &["one"]);
    ctx.write_pdf("b.pdf", &["two"]);
    ctx.write_pdf("c.pdf", &["three"]);

    let mut db = ctx.open_db();
    let (pipeline, _) = fake_pipeline();
    let spawner = InlineSpawner::new(pipeline, WorkerExit::failed("exit status: 1"));

    let report = run_index(
      &mut db,
      &ctx.request(false),
      &ctx.index_context(2),
      &spawner,
      None,
      &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.outcome.completed, 3);
    assert_eq!(ctx.open_db().len(), 3);
  }

  /// Test: cancelling mid-pass stops every worker promptly and keeps only
  /// what was merged before the interrupt.
  #[tokio::test]
  async fn test_cancellation_terminates_workers() {
    let ctx = IndexTestContext::new();
    let fast = ctx.write_pdf("a_fast.pdf", &["quick"]);
    let slow = ctx.write_pdf("b_slow.pdf", &[SLOW_MARKER]);
    let stalled = ctx.write_pdf("c_stalled.pdf", &[SLOW_MARKER]);

    let mut db = ctx.open_db();
    let (pipeline, _) = fake_pipeline();
    let spawner = TaskSpawner::new(pipeline);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(300)).await;
      trigger.cancel();
    });

    // Two slots: [fast, stalled] and [slow]
    let start = Instant::now();
    let report = run_index(&mut db, &ctx.request(true), &ctx.index_context(2), &spawner, None, &cancel)
      .await
      .unwrap();

    assert!(start.elapsed() < Duration::from_secs(10));
    assert!(report.outcome.cancelled);
    assert_eq!(report.outcome.completed, 1);
    assert!(report.outcome.unindexed.is_empty());
    assert!(report.removals.is_empty(), "no cleanup after cancel");
    assert!(spawner.all_terminated());

    let reloaded = ctx.open_db();
    assert!(reloaded.contains(&path_key(&fast)));
    assert!(!reloaded.contains(&path_key(&slow)));
    assert!(!reloaded.contains(&path_key(&stalled)));
    assert!(ctx.staging_leftovers().is_empty());
  }

  /// Test: results published between the last poll and the cancel are still
  /// merged before the pass returns.
  #[tokio::test]
  async fn test_cancellation_keeps_results_published_since_last_poll() {
    let ctx = IndexTestContext::new();
    let a = ctx.write_pdf("a.pdf", &["one"]);
    let b = ctx.write_pdf("b.pdf", &["two"]);

    let mut db = ctx.open_db();
    let (pipeline, _) = fake_pipeline();
    let spawner = LingeringSpawner::new(pipeline, Duration::from_millis(50));
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(500)).await;
      trigger.cancel();
    });

    // The first poll runs before anything is published and the next one
    // would only come after a minute, so only the cancel path can merge.
    let mut index_ctx = ctx.index_context(1);
    index_ctx.poll_interval = Duration::from_secs(60);
    let start = Instant::now();
    let report = run_index(&mut db, &ctx.request(false), &index_ctx, &spawner, None, &cancel)
      .await
      .unwrap();

    assert!(start.elapsed() < Duration::from_secs(10));
    assert!(report.outcome.cancelled);
    assert_eq!(report.outcome.completed, 2);

    let reloaded = ctx.open_db();
    assert!(reloaded.contains(&path_key(&a)));
    assert!(reloaded.contains(&path_key(&b)));
    assert!(ctx.staging_leftovers().is_empty());
  }

  /// Test: cleanup drops deleted and newly ignored documents under the root.
  #[tokio::test]
  async fn test_cleanup_after_pass() {
    let ctx = IndexTestContext::new();
    let keep = ctx.write_pdf("keep.pdf", &["keep"]);
    let doomed = ctx.write_pdf("doomed.pdf", &["doomed"]);
    let private = ctx.write_pdf("private/secret.pdf", &["secret"]);

    let mut db = ctx.open_db();
    // Outside the indexed root; must survive cleanup
    db.insert(
      "/elsewhere/other.pdf",
      pdfgrep_core::DocumentRecord::new(Fingerprint::new(1, 1), vec![]),
    );

    let (pipeline, _) = fake_pipeline();
    run_index(
      &mut db,
      &ctx.request(false),
      &ctx.index_context(2),
      &TaskSpawner::new(pipeline),
      None,
      &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(db.len(), 4);

    std::fs::remove_file(&doomed).unwrap();
    let request = IndexRequest {
      roots: vec![ctx.root()],
      ignores: vec![ctx.root().join("private")],
      cleanup: true,
    };

    let (pipeline, _) = fake_pipeline();
    let report = run_index(
      &mut db,
      &request,
      &ctx.index_context(2),
      &TaskSpawner::new(pipeline),
      None,
      &CancellationToken::new(),
    )
    .await
    .unwrap();

    let removed: Vec<(String, RemovalReason)> = report.removals.iter().map(|r| (r.path.clone(), r.reason)).collect();
    assert_eq!(
      removed,
      vec![
        (path_key(&doomed), RemovalReason::Deleted),
        (path_key(&private), RemovalReason::Ignored),
      ]
    );

    let reloaded = ctx.open_db();
    assert!(reloaded.contains(&path_key(&keep)));
    assert!(reloaded.contains("/elsewhere/other.pdf"));
    assert_eq!(reloaded.len(), 2);
  }

  struct UnavailableSpawner;

  #[async_trait::async_trait]
  impl WorkerSpawner for UnavailableSpawner {
    fn check(&self) -> Result<()> {
      Err(ocr::OcrError::ToolNotFound("tesseract".to_string()).into())
    }

    async fn spawn(&self, _assignment: Assignment) -> Result<Box<dyn WorkerHandle>> {
      unreachable!("spawn after failed check")
    }
  }

  /// Test: missing OCR tools fail the pass before anything is spawned.
  #[tokio::test]
  async fn test_missing_tools_fail_fast() {
    let ctx = IndexTestContext::new();
    ctx.write_pdf("a.pdf", &["one"]);

    let mut db = ctx.open_db();
    let err = run_index(
      &mut db,
      &ctx.request(false),
      &ctx.index_context(1),
      &UnavailableSpawner,
      None,
      &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, IndexError::Ocr(_)), "got {err:?}");
    assert!(db.is_empty());
    assert!(ctx.staging_leftovers().is_empty());
  }
}
