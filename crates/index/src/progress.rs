//! Throughput and ETA tracking for an indexing pass.

use std::{
  fmt,
  time::{Duration, Instant},
};

/// Snapshot of pass progress, displayed as the status line
#[derive(Debug, Clone, PartialEq)]
pub struct IndexProgress {
  pub completed: usize,
  pub total: usize,
  pub elapsed: Duration,
}

impl IndexProgress {
  pub fn new(completed: usize, total: usize, elapsed: Duration) -> Self {
    Self {
      completed,
      total,
      elapsed,
    }
  }

  pub fn percent(&self) -> f64 {
    if self.total == 0 {
      return 100.0;
    }
    self.completed as f64 * 100.0 / self.total as f64
  }

  /// Documents completed per minute so far
  pub fn per_minute(&self) -> f64 {
    let secs = self.elapsed.as_secs_f64();
    if secs <= 0.0 {
      return 0.0;
    }
    self.completed as f64 * 60.0 / secs
  }

  /// Remaining time at the current average rate
  pub fn eta(&self) -> Duration {
    if self.completed == 0 {
      return Duration::ZERO;
    }
    let per_item = self.elapsed.as_secs_f64() / self.completed as f64;
    let remaining = self.total.saturating_sub(self.completed) as f64;
    Duration::from_secs_f64(per_item * remaining)
  }

  pub fn is_complete(&self) -> bool {
    self.completed >= self.total
  }
}

impl fmt::Display for IndexProgress {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "processed {}/{} - {:.2}% [{:.2}/min ETA {}]",
      self.completed,
      self.total,
      self.percent(),
      self.per_minute(),
      format_eta(self.eta())
    )
  }
}

/// Produces a progress snapshot whenever the completed count advances
#[derive(Debug)]
pub struct ProgressTracker {
  total: usize,
  start: Instant,
  last_reported: usize,
}

impl ProgressTracker {
  pub fn new(total: usize) -> Self {
    Self {
      total,
      start: Instant::now(),
      last_reported: 0,
    }
  }

  pub fn update(&mut self, completed: usize) -> Option<IndexProgress> {
    if completed <= self.last_reported {
      return None;
    }
    self.last_reported = completed;
    Some(IndexProgress::new(completed, self.total, self.start.elapsed()))
  }
}

/// Format as `HH:MM:SS`, prefixed with `N days, ` past one day.
pub fn format_eta(eta: Duration) -> String {
  let mut secs = eta.as_secs();
  let mut out = String::new();

  let days = secs / 86_400;
  if days > 0 {
    out.push_str(&format!("{days} days, "));
    secs %= 86_400;
  }

  let hours = secs / 3600;
  let mins = (secs % 3600) / 60;
  let secs = secs % 60;
  out.push_str(&format!("{hours:02}:{mins:02}:{secs:02}"));
  out
}
