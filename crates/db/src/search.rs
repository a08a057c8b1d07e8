//! Linear keyword search over persisted page text.
//!
//! The query is a literal, case-insensitive substring. There is no ranking
//! and no deduplication: every matching line is reported, in path order,
//! then page order, then line order.

use std::{fmt, rc::Rc};

use crate::Database;

/// A single matching line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit<'a> {
  pub path: &'a str,
  /// 1-based page number
  pub page: usize,
  /// 0-based line index within the page
  pub line: usize,
  pub text: &'a str,
}

impl fmt::Display for SearchHit<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}:{} - {}", self.path, self.page, self.line, self.text)
  }
}

/// A search query built from command-line words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
  raw: String,
  folded: String,
}

impl Query {
  pub fn new(raw: impl Into<String>) -> Self {
    let raw = raw.into();
    let folded = raw.to_lowercase();
    Self { raw, folded }
  }

  /// Join words with single spaces, as typed on the command line.
  pub fn from_words<S: AsRef<str>>(words: &[S]) -> Self {
    let joined = words.iter().map(|w| w.as_ref()).collect::<Vec<_>>().join(" ");
    Self::new(joined)
  }

  pub fn as_str(&self) -> &str {
    &self.raw
  }

  pub fn matches(&self, line: &str) -> bool {
    line.to_lowercase().contains(&self.folded)
  }
}

impl Database {
  /// Scan every page of every document for lines containing `query`.
  ///
  /// Hits borrow from the database only; the query is copied into the
  /// iterator.
  pub fn search<'a>(&'a self, query: &Query) -> impl Iterator<Item = SearchHit<'a>> + use<'a> {
    let query = Rc::new(query.clone());
    self.iter().flat_map(move |(path, record)| {
      let query = Rc::clone(&query);
      record.pages.iter().enumerate().flat_map(move |(page_index, page)| {
        let query = Rc::clone(&query);
        page
          .split('\n')
          .enumerate()
          .filter(move |(_, line)| query.matches(line))
          .map(move |(line_index, text)| SearchHit {
            path: path.as_str(),
            page: page_index + 1,
            line: line_index,
            text,
          })
      })
    })
  }
}
