//! Serde support for paths that may not be valid UTF-8.
//!
//! Use with `#[serde(with = "pdfgrep_core::os_path")]`. UTF-8 paths are
//! written as plain strings. Other paths are written as their raw bytes (a
//! JSON array of integers) on unix, and lossily elsewhere. Both forms are
//! accepted on input.

use serde::{Deserialize, Deserializer, Serializer};
use std::path::{Path, PathBuf};

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr {
  Text(String),
  Bytes(Vec<u8>),
}

pub fn serialize<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
  if let Some(text) = path.to_str() {
    return serializer.serialize_str(text);
  }

  #[cfg(unix)]
  {
    use std::os::unix::ffi::OsStrExt;
    serializer.collect_seq(path.as_os_str().as_bytes())
  }

  #[cfg(not(unix))]
  {
    serializer.serialize_str(&path.to_string_lossy())
  }
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PathBuf, D::Error> {
  match Repr::deserialize(deserializer)? {
    Repr::Text(text) => Ok(PathBuf::from(text)),
    Repr::Bytes(bytes) => Ok(from_bytes(bytes)),
  }
}

#[cfg(unix)]
fn from_bytes(bytes: Vec<u8>) -> PathBuf {
  use std::os::unix::ffi::OsStringExt;
  PathBuf::from(std::ffi::OsString::from_vec(bytes))
}

#[cfg(not(unix))]
fn from_bytes(bytes: Vec<u8>) -> PathBuf {
  PathBuf::from(String::from_utf8_lossy(&bytes).into_owned())
}
