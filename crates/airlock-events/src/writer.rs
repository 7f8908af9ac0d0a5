//! Append-only line-delimited JSON writer.

use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Errors raised while writing log lines.
#[derive(Debug, Error)]
pub enum EventError {
    /// Opening or appending to the log file failed.
    #[error("log io error on {path}: {source}")]
    Io {
        /// The log file path.
        path: PathBuf,
        /// The underlying io error.
        source: std::io::Error,
    },

    /// A record could not be serialized.
    #[error("log serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Appends one JSON document per line to a log file.
///
/// Lines are flushed per record; a crashed run keeps every completed line.
#[derive(Debug)]
pub struct JsonlWriter {
    path: PathBuf,
    file: File,
}

impl JsonlWriter {
    /// Open (or create) a log file for appending.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EventError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| EventError::Io {
                path: path.clone(),
                source,
            })?;
        Ok(Self { path, file })
    }

    /// Serialize and append one record as a single line.
    pub fn append<T: Serialize>(&mut self, record: &T) -> Result<(), EventError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        self.file
            .write_all(line.as_bytes())
            .and_then(|()| self.file.flush())
            .map_err(|source| EventError::Io {
                path: self.path.clone(),
                source,
            })
    }

    /// The file this writer appends to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_log(name: &str) -> PathBuf {
        let unique = format!("airlock_test_{}_{name}.jsonl", std::process::id());
        std::env::temp_dir().join(unique)
    }

    #[test]
    fn appends_one_line_per_record() {
        let path = temp_log("append");
        let _ = std::fs::remove_file(&path);

        let mut writer = JsonlWriter::open(&path).unwrap();
        writer.append(&serde_json::json!({"a": 1})).unwrap();
        writer.append(&serde_json::json!({"b": 2})).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines.first().copied(), Some(r#"{"a":1}"#));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn reopening_appends_rather_than_truncates() {
        let path = temp_log("reopen");
        let _ = std::fs::remove_file(&path);

        {
            let mut writer = JsonlWriter::open(&path).unwrap();
            writer.append(&serde_json::json!({"first": true})).unwrap();
        }
        {
            let mut writer = JsonlWriter::open(&path).unwrap();
            writer.append(&serde_json::json!({"second": true})).unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);

        let _ = std::fs::remove_file(&path);
    }
}
