//! Append-only JSON-lines log of run outcomes.

use std::path::{Path, PathBuf};

use fleetwake_core::LogRecord;
use tracing::{instrument, warn};

use crate::error::StoreError;
use crate::persistence::append_json_line;

/// One JSON object per line: snapshot, skip or failure.
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    /// Log at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record.
    ///
    /// # Errors
    ///
    /// IO or serialization failures.
    #[instrument(skip(self, record), fields(path = %self.path.display()))]
    pub async fn append(&self, record: &LogRecord) -> Result<(), StoreError> {
        append_json_line(&self.path, record).await
    }

    /// Reads every parseable record. Malformed lines are skipped.
    ///
    /// # Errors
    ///
    /// IO failures other than a missing file.
    pub async fn read_all(&self) -> Result<Vec<LogRecord>, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(line = index + 1, error = %e, "Skipping malformed log line"),
            }
        }
        Ok(records)
    }

    /// The most recent record, if any.
    ///
    /// # Errors
    ///
    /// IO failures other than a missing file.
    pub async fn last(&self) -> Result<Option<LogRecord>, StoreError> {
        Ok(self.read_all().await?.pop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use fleetwake_core::SkipReason;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_append_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("nested").join("log.jsonl"));

        log.append(&LogRecord::failure(ts("2025-03-01T08:00:00Z"), "boom"))
            .await
            .unwrap();
        log.append(&LogRecord::skipped(
            ts("2025-03-01T09:00:00Z"),
            SkipReason::WakeQuota,
            "2/2 wakes used",
        ))
        .await
        .unwrap();

        let content = tokio::fs::read_to_string(log.path()).await.unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.ends_with('\n'));

        let records = log.read_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(matches!(records[0], LogRecord::Failure(_)));
        assert!(matches!(log.last().await.unwrap(), Some(LogRecord::Skipped(_))));
    }

    #[tokio::test]
    async fn test_read_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("log.jsonl"));
        tokio::fs::write(
            log.path(),
            "garbage\n{\"ts\":\"2025-03-01T08:00:00Z\",\"error\":\"x\"}\n\n",
        )
        .await
        .unwrap();

        assert_eq!(log.read_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_log_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("none.jsonl"));
        assert!(log.read_all().await.unwrap().is_empty());
        assert!(log.last().await.unwrap().is_none());
    }
}
