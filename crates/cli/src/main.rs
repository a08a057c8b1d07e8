//! pdfgrep - OCR-indexed full-text search over PDF collections

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use db::{Database, DbError, Query};
use index::IndexRequest;
use pdfgrep_core::{Config, ConfigError, database_path, default_config_dir, ensure_private_dir};
use std::path::{Path, PathBuf};

mod commands;
mod logging;

use commands::{cmd_index, cmd_search, cmd_worker};
use logging::{init_console_logging, init_logging};

#[derive(Parser, Debug)]
#[command(name = "pdfgrep")]
#[command(about = "Index PDFs with OCR and search their text")]
#[command(override_usage = "\
pdfgrep -i [-c] [--ignore <PATH>]... <PATH>...   index pdfs under each path
       pdfgrep <WORDS>...                               search indexed pdfs")]
#[command(after_help = "\
SEARCH:
  Words are joined with single spaces and matched as a literal,
  case-insensitive substring against every line of every indexed page.
  Hits are printed as '<path>: <page>:<line> - <text>'.

CLEANUP:
  With -c, database entries under the indexed paths are dropped when the
  file is gone from disk or now falls under an --ignore path.")]
struct Cli {
  /// Index PDFs under the given paths
  #[arg(short = 'i', long = "index")]
  index: bool,

  /// After indexing, drop entries for deleted or ignored files
  #[arg(short = 'c', long = "cleanup")]
  cleanup: bool,

  /// Exclude PDFs under this path (repeatable)
  #[arg(long, value_name = "PATH")]
  ignore: Vec<PathBuf>,

  /// Run as an indexing worker, reading an assignment from stdin
  #[arg(long, hide = true)]
  worker: bool,

  /// Paths to index with -i, otherwise words to search for
  #[arg(value_name = "ARGS")]
  args: Vec<String>,
}

/// What a coordinator invocation should do
#[derive(Debug)]
enum Mode {
  Index(IndexRequest),
  Search(Query),
}

impl Cli {
  /// The requested mode, or `None` when only usage should be printed.
  fn mode(&self) -> Option<Mode> {
    if self.index {
      if self.args.is_empty() {
        return None;
      }
      return Some(Mode::Index(IndexRequest {
        roots: self.args.iter().map(PathBuf::from).collect(),
        ignores: self.ignore.clone(),
        cleanup: self.cleanup,
      }));
    }

    let query = Query::from_words(&self.args);
    if query.as_str().is_empty() {
      return None;
    }
    Some(Mode::Search(query))
  }
}

/// Load the config, falling back to the defaults when the file is unusable.
///
/// The error is handed back so it can be logged once logging is configured.
fn load_config(config_dir: &Path) -> (Config, Option<ConfigError>) {
  match Config::load(config_dir) {
    Ok(config) => (config, None),
    Err(e) => (Config::default(), Some(e)),
  }
}

fn warn_config(err: Option<ConfigError>) {
  if let Some(err) = err {
    tracing::warn!(err = %err, "Using default config");
  }
}

fn print_usage() {
  let _ = Cli::command().print_help();
  println!();
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  let config_dir = default_config_dir();
  let (config, config_err) = load_config(&config_dir);

  if cli.worker {
    init_console_logging(&config.logging);
    warn_config(config_err);
    return cmd_worker(&config).await;
  }

  let _guard = init_logging(&config.logging, &config_dir);
  warn_config(config_err);

  let Some(mode) = cli.mode() else {
    print_usage();
    return Ok(());
  };

  if !cli.index && (cli.cleanup || !cli.ignore.is_empty()) {
    tracing::warn!("-c and --ignore only apply with -i");
  }

  ensure_private_dir(&config_dir)
    .with_context(|| format!("Failed to create config directory {}", config_dir.display()))?;

  let db_path = database_path(&config_dir);
  let db = match Database::open(&db_path) {
    Ok(db) => db,
    Err(e) => {
      match e {
        DbError::Malformed { .. } => println!("failed to load database file: {}", e),
        other => println!("failed to load database file: {} - {}", db_path.display(), other),
      }
      std::process::exit(1);
    }
  };

  match mode {
    Mode::Index(request) => cmd_index(db, request, &config).await,
    Mode::Search(query) => cmd_search(&db, &query),
  }
}
