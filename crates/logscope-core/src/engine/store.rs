//! Append-only JSONL log store
//!
//! Owns the on-disk log file. Readers and writers use independent file
//! handles; appends are whole-line flushed writes, so a concurrent
//! line-oriented reader never observes a truncated record. There is no
//! deletion, compaction, or rotation: log growth is unbounded by design.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::error::Result;

/// Handle to the append-only log file
#[derive(Debug, Clone)]
pub struct LogStore {
    path: PathBuf,
}

impl LogStore {
    /// Create a store for the given path. The file is not touched until
    /// the first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the log file exists. Absence is a reported condition,
    /// not an error.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// File size in bytes; 0 when the file is absent
    pub fn size_bytes(&self) -> u64 {
        fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }

    /// Count of non-blank lines; 0 when the file is absent
    pub fn line_count(&self) -> u64 {
        self.read_lines().count() as u64
    }

    /// Iterate over raw non-blank lines in file order.
    ///
    /// Each call re-opens the file, so the iterator is restartable and
    /// independent of concurrent appends. A missing file yields an
    /// empty iterator.
    pub fn read_lines(&self) -> impl Iterator<Item = String> {
        File::open(&self.path)
            .ok()
            .into_iter()
            .flat_map(|file| BufReader::new(file).lines().map_while(|line| line.ok()))
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
    }

    /// Append records as one JSON object per line.
    ///
    /// The whole batch is serialized before the file is opened and
    /// written with a single flushed write: either every line is
    /// committed or none is, and no reader sees a partial line.
    pub fn append(&self, records: &[Value]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut buf = String::new();
        for record in records {
            buf.push_str(&serde_json::to_string(record)?);
            buf.push('\n');
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(buf.as_bytes())?;
        file.flush()?;

        debug!("appended {} record(s) to {}", records.len(), self.path.display());
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> LogStore {
        LogStore::new(dir.path().join("monitoring.jsonl"))
    }

    #[test]
    fn missing_file_reports_absence_without_failing() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(!store.exists());
        assert_eq!(store.size_bytes(), 0);
        assert_eq!(store.line_count(), 0);
        assert_eq!(store.read_lines().count(), 0);
    }

    #[test]
    fn append_writes_one_object_per_line() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let written = store
            .append(&[
                json!({"timestamp": "2024-05-01T12:00:00Z", "path": "/a"}),
                json!({"timestamp": "2024-05-01T12:01:00Z", "path": "/b"}),
            ])
            .unwrap();

        assert_eq!(written, 2);
        assert!(store.exists());
        assert_eq!(store.line_count(), 2);

        let lines: Vec<String> = store.read_lines().collect();
        assert_eq!(lines.len(), 2);
        for line in &lines {
            let value: Value = serde_json::from_str(line).unwrap();
            assert!(value.is_object());
        }
    }

    #[test]
    fn append_preserves_existing_records() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.append(&[json!({"n": 1})]).unwrap();
        store.append(&[json!({"n": 2})]).unwrap();

        let lines: Vec<String> = store.read_lines().collect();
        assert_eq!(lines, vec![r#"{"n":1}"#, r#"{"n":2}"#]);
    }

    #[test]
    fn append_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::new(dir.path().join("nested/dir/monitoring.jsonl"));

        store.append(&[json!({"n": 1})]).unwrap();
        assert!(store.exists());
    }

    #[test]
    fn blank_lines_are_skipped_on_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("monitoring.jsonl");
        fs::write(&path, "{\"n\":1}\n\n   \n{\"n\":2}\n").unwrap();

        let store = LogStore::new(&path);
        assert_eq!(store.line_count(), 2);
    }

    #[test]
    fn read_lines_is_restartable() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.append(&[json!({"n": 1})]).unwrap();

        assert_eq!(store.read_lines().count(), 1);
        assert_eq!(store.read_lines().count(), 1);
    }
}
