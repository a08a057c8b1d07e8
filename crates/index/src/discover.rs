//! Path discovery: find PDFs under the index roots.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use pdfgrep_core::under_any;
use tracing::{debug, trace};

/// Recursively collect PDF paths under `roots`.
///
/// `roots` and `ignores` are expected to be normalized already. Results are
/// canonical absolute paths in walk order, each reported once even when roots
/// overlap. Hidden entries are skipped, as are files that vanish before they
/// can be canonicalized.
pub fn discover(roots: &[PathBuf], ignores: &[PathBuf]) -> Vec<PathBuf> {
  let mut seen = HashSet::new();
  let mut found = Vec::new();

  for root in roots {
    let walker = WalkBuilder::new(root)
      .standard_filters(false)
      .hidden(true) // Skip dotfiles and dot-directories
      .follow_links(false)
      .sort_by_file_name(|a, b| a.cmp(b))
      .build();

    for entry in walker {
      let entry = match entry {
        Ok(entry) => entry,
        Err(e) => {
          debug!(root = %root.display(), err = %e, "Skipping unreadable entry");
          continue;
        }
      };

      if entry.file_type().is_none_or(|ft| ft.is_dir()) {
        continue;
      }

      if !is_pdf(entry.path()) {
        continue;
      }

      let path = match entry.path().canonicalize() {
        Ok(path) => path,
        Err(e) => {
          trace!(path = %entry.path().display(), err = %e, "File vanished during discovery");
          continue;
        }
      };

      if under_any(&path, ignores) {
        trace!(path = %path.display(), "Ignored");
        continue;
      }

      if seen.insert(path.clone()) {
        found.push(path);
      }
    }
  }

  debug!(roots = roots.len(), found = found.len(), "Discovery complete");
  found
}

fn is_pdf(path: &Path) -> bool {
  path
    .extension()
    .and_then(|e| e.to_str())
    .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}
