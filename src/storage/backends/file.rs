//! File-based document store, one JSON document per record

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::storage::{
    error::{StorageError, StorageResult},
    traits::{merge_result_data, validate_key, DocumentStore},
    types::{ResultRecord, SessionRecord, SessionUpdate},
};

const SESSIONS_DIR: &str = "sessions";
const RESULTS_DIR: &str = "results";

/// File-based document store
pub struct FileStore {
    base_dir: PathBuf,
    // Serializes read-modify-write updates within this process
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create a store rooted at `base_dir`, creating its directories
    pub async fn new(base_dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(base_dir.join(SESSIONS_DIR)).await?;
        fs::create_dir_all(base_dir.join(RESULTS_DIR)).await?;
        debug!("File store initialized at {}", base_dir.display());
        Ok(Self {
            base_dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn record_path(&self, domain: &str, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.base_dir.join(domain).join(format!("{key}.json")))
    }

    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> StorageResult<Option<T>> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Some(
                serde_json::from_str(&content).map_err(StorageError::serialization)?,
            )),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    /// Write through a temp file so readers never see a partial document
    async fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> StorageResult<()> {
        let content = serde_json::to_string_pretty(data)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn purge_dir<T, F>(&self, domain: &str, expired: F) -> StorageResult<usize>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        let mut removed = 0;
        let mut entries = fs::read_dir(self.base_dir.join(domain)).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.read_json::<T>(&path).await {
                Ok(Some(record)) if expired(&record) => {
                    fs::remove_file(&path).await?;
                    removed += 1;
                }
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable record {}: {}", path.display(), e),
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn put_session(&self, session: &SessionRecord) -> StorageResult<()> {
        let path = self.record_path(SESSIONS_DIR, &session.session_id)?;
        let _guard = self.write_lock.lock().await;
        self.write_json(&path, session).await
    }

    async fn get_session(&self, session_id: &str) -> StorageResult<Option<SessionRecord>> {
        let path = self.record_path(SESSIONS_DIR, session_id)?;
        let record: Option<SessionRecord> = self.read_json(&path).await?;
        Ok(record.filter(|s| !s.is_expired(Utc::now())))
    }

    async fn update_session(
        &self,
        session_id: &str,
        update: &SessionUpdate,
    ) -> StorageResult<SessionRecord> {
        let path = self.record_path(SESSIONS_DIR, session_id)?;
        let _guard = self.write_lock.lock().await;
        let current: SessionRecord = self
            .read_json::<SessionRecord>(&path)
            .await?
            .filter(|s| !s.is_expired(Utc::now()))
            .ok_or_else(|| StorageError::not_found(format!("session {session_id}")))?;
        let updated = current.apply(update)?;
        self.write_json(&path, &updated).await?;
        Ok(updated)
    }

    async fn put_result(&self, result: &ResultRecord) -> StorageResult<()> {
        let path = self.record_path(RESULTS_DIR, &result.result_id)?;
        let _guard = self.write_lock.lock().await;
        self.write_json(&path, result).await
    }

    async fn get_result(&self, result_id: &str) -> StorageResult<Option<ResultRecord>> {
        let path = self.record_path(RESULTS_DIR, result_id)?;
        let record: Option<ResultRecord> = self.read_json(&path).await?;
        Ok(record.filter(|r| !r.is_expired(Utc::now())))
    }

    async fn set_result_data(
        &self,
        result_id: &str,
        key: &str,
        value: Value,
    ) -> StorageResult<()> {
        let path = self.record_path(RESULTS_DIR, result_id)?;
        let _guard = self.write_lock.lock().await;
        let mut record: ResultRecord = self
            .read_json(&path)
            .await?
            .ok_or_else(|| StorageError::not_found(format!("result {result_id}")))?;
        merge_result_data(&mut record, key, value);
        self.write_json(&path, &record).await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StorageResult<usize> {
        let _guard = self.write_lock.lock().await;
        let sessions = self
            .purge_dir::<SessionRecord, _>(SESSIONS_DIR, |s| s.is_expired(now))
            .await?;
        let results = self
            .purge_dir::<ResultRecord, _>(RESULTS_DIR, |r| r.is_expired(now))
            .await?;
        debug!(
            "Purged {} sessions and {} results from {}",
            sessions,
            results,
            self.base_dir.display()
        );
        Ok(sessions + results)
    }
}
