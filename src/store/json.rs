use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::app::{FeedwatchError, Result};
use crate::domain::SeenRecord;
use crate::store::RecordStore;

/// Ledger kept as a pretty-printed JSON array in a single file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn unavailable(&self, action: &str, e: std::io::Error) -> FeedwatchError {
        FeedwatchError::StoreUnavailable(format!(
            "failed to {} {}: {}",
            action,
            self.path.display(),
            e
        ))
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn read_all(&self) -> Result<Vec<SeenRecord>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(
                    "No ledger at {}, starting with an empty one",
                    self.path.display()
                );
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.unavailable("read", e)),
        };

        let records: Vec<SeenRecord> = serde_json::from_str(&content)?;
        Ok(records)
    }

    async fn write_all(&self, records: &[SeenRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.unavailable("create directory for", e))?;
            }
        }

        let body = serde_json::to_string_pretty(records)?;
        let tmp = self.temp_path();

        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| self.unavailable("write", e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.unavailable("replace", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("seen.json"));
        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_then_read_preserves_timestamps() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("seen.json"));
        let ts = Utc.timestamp_millis_opt(1_704_103_200_123).unwrap();
        let records = vec![SeenRecord::new("1001", ts), SeenRecord::new("1002", ts)];

        store.write_all(&records).await.unwrap();

        assert_eq!(store.read_all().await.unwrap(), records);
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn test_write_replaces_contents() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("seen.json"));
        let ts = Utc::now();

        store
            .write_all(&[SeenRecord::new("a", ts), SeenRecord::new("b", ts)])
            .await
            .unwrap();
        store.write_all(&[SeenRecord::new("c", ts)]).await.unwrap();

        let ids: Vec<_> = store
            .read_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["c"]);
    }

    #[tokio::test]
    async fn test_reads_legacy_ledger_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seen.json");
        std::fs::write(
            &path,
            r#"[
  { "id": "8817264", "firstSeen": "2024-01-05T08:30:00.000Z" }
]"#,
        )
        .unwrap();

        let records = JsonFileStore::new(&path).read_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "8817264");
        assert_eq!(
            records[0].first_seen,
            Utc.with_ymd_and_hms(2024, 1, 5, 8, 30, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_malformed_file_is_store_unavailable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seen.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonFileStore::new(&path).read_all().await.unwrap_err();
        assert!(matches!(err, FeedwatchError::StoreUnavailable(_)));
    }
}
