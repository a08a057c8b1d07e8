//! Search command

use anyhow::Result;
use db::{Database, Query};
use std::io::{self, Write};
use tracing::debug;

/// Print every line matching `query`
pub fn cmd_search(db: &Database, query: &Query) -> Result<()> {
  let stdout = io::stdout();
  let mut out = stdout.lock();
  let mut hits = 0usize;

  for hit in db.search(query) {
    // Stop quietly when the reader goes away (e.g. piped into `head`)
    if writeln!(out, "{}", hit).is_err() {
      break;
    }
    hits += 1;
  }
  let _ = out.flush();

  debug!(query = query.as_str(), hits, documents = db.len(), "Search complete");
  Ok(())
}
