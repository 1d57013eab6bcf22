// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A filesystem-backed [`RunStore`]: one zstd-compressed JSON file per
//! run under `{base_dir}/runs/`, and a single cache ledger file that's
//! rewritten wholesale on each log — the cache ledger is small and
//! append-mostly, so a read-modify-write is simpler than a log format.

use crate::store::{ArtifactRecord, JobView, RunStore, StorageError};
use async_trait::async_trait;
use flowline_cache::CacheEntry;
use flowline_core::{JobId, Run, RunId};
use parking_lot::Mutex;
use std::io::Read;
use std::path::{Path, PathBuf};

const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

pub struct FileRunStore {
    base_dir: PathBuf,
    retry_attempts: u32,
    cache_lock: Mutex<()>,
    artifact_lock: Mutex<()>,
}

impl FileRunStore {
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        Self::open_with_retries(base_dir, DEFAULT_RETRY_ATTEMPTS)
    }

    /// Like [`Self::open`], but retries a write up to `retry_attempts`
    /// times (with a short linear backoff) before surfacing an I/O
    /// error — covers transient failures writing to a network-backed
    /// volume without masking a persistently broken `base_dir`.
    pub fn open_with_retries(base_dir: impl Into<PathBuf>, retry_attempts: u32) -> Result<Self, StorageError> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(base_dir.join("runs")).map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(Self { base_dir, retry_attempts: retry_attempts.max(1), cache_lock: Mutex::new(()), artifact_lock: Mutex::new(()) })
    }

    fn run_path(&self, run_id: &RunId) -> PathBuf {
        self.base_dir.join("runs").join(format!("{run_id}.json.zst"))
    }

    fn cache_path(&self) -> PathBuf {
        self.base_dir.join("cache.json.zst")
    }

    fn artifacts_path(&self) -> PathBuf {
        self.base_dir.join("artifacts.json.zst")
    }

    fn write_compressed<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_vec(value).map_err(|e| StorageError::Serde(e.to_string()))?;
        let compressed = zstd::encode_all(json.as_slice(), 0).map_err(|e| StorageError::Io(e.to_string()))?;
        let tmp = path.with_extension("tmp");

        let mut last_err = None;
        for attempt in 0..self.retry_attempts {
            match std::fs::write(&tmp, &compressed).and_then(|()| std::fs::rename(&tmp, path)) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(path = %path.display(), attempt, error = %e, "retrying write after I/O error");
                    last_err = Some(e);
                    if attempt + 1 < self.retry_attempts {
                        std::thread::sleep(std::time::Duration::from_millis(20 * u64::from(attempt + 1)));
                    }
                }
            }
        }
        Err(StorageError::Io(last_err.map(|e| e.to_string()).unwrap_or_default()))
    }

    fn read_compressed<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
        let mut file = match std::fs::File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(e.to_string())),
        };
        let mut compressed = Vec::new();
        file.read_to_end(&mut compressed).map_err(|e| StorageError::Io(e.to_string()))?;
        let json = zstd::decode_all(compressed.as_slice()).map_err(|e| StorageError::Io(e.to_string()))?;
        let value = serde_json::from_slice(&json).map_err(|e| StorageError::Serde(e.to_string()))?;
        Ok(Some(value))
    }
}

#[async_trait]
impl RunStore for FileRunStore {
    async fn get_job(&self, job_id: &JobId) -> Result<Option<JobView>, StorageError> {
        let runs_dir = self.base_dir.join("runs");
        let entries = std::fs::read_dir(&runs_dir).map_err(|e| StorageError::Io(e.to_string()))?;
        for entry in entries.flatten() {
            if let Some(run) = Self::read_compressed::<Run>(&entry.path())? {
                for step in run.steps.values() {
                    if step.job_id == Some(*job_id) {
                        return Ok(Some(JobView { job_id: *job_id, status: step_status_to_job_status(step.status) }));
                    }
                }
            }
        }
        Ok(None)
    }

    async fn get_run(&self, run_id: &RunId) -> Result<Option<Run>, StorageError> {
        Self::read_compressed(&self.run_path(run_id))
    }

    async fn update_run(&self, run: &Run) -> Result<(), StorageError> {
        self.write_compressed(&self.run_path(&run.id), run)
    }

    async fn log_cache(&self, entry: CacheEntry) -> Result<(), StorageError> {
        let _guard = self.cache_lock.lock();
        let mut entries: Vec<CacheEntry> = Self::read_compressed(&self.cache_path())?.unwrap_or_default();
        entries.push(entry);
        self.write_compressed(&self.cache_path(), &entries)
    }

    async fn list_cache(&self, step_name: &str) -> Result<Vec<CacheEntry>, StorageError> {
        let entries: Vec<CacheEntry> = Self::read_compressed(&self.cache_path())?.unwrap_or_default();
        Ok(entries.into_iter().filter(|e| e.step_name == step_name).collect())
    }

    async fn log_artifact(&self, artifact: ArtifactRecord) -> Result<(), StorageError> {
        let _guard = self.artifact_lock.lock();
        let mut artifacts: Vec<ArtifactRecord> = Self::read_compressed(&self.artifacts_path())?.unwrap_or_default();
        artifacts.push(artifact);
        self.write_compressed(&self.artifacts_path(), &artifacts)
    }

    async fn list_artifacts(&self, step_name: &str) -> Result<Vec<ArtifactRecord>, StorageError> {
        let artifacts: Vec<ArtifactRecord> = Self::read_compressed(&self.artifacts_path())?.unwrap_or_default();
        Ok(artifacts.into_iter().filter(|a| a.step_name == step_name).collect())
    }
}

fn step_status_to_job_status(status: flowline_core::StepStatus) -> flowline_core::JobStatus {
    use flowline_core::{JobStatus, StepStatus};
    match status {
        StepStatus::Init | StepStatus::Pending => JobStatus::Pending,
        StepStatus::Running => JobStatus::Running,
        StepStatus::Succeeded | StepStatus::Skipped => JobStatus::Succeeded,
        StepStatus::Failed => JobStatus::Failed,
        StepStatus::Terminating => JobStatus::Terminating,
        StepStatus::Cancelled | StepStatus::Terminated => JobStatus::Terminated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowline_core::RunId;

    #[tokio::test]
    async fn round_trips_a_run_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRunStore::open(dir.path()).unwrap();
        let run = Run::new(RunId::new(), "demo", ["a".to_string()], 0);
        let id = run.id;
        store.update_run(&run).await.unwrap();
        let fetched = store.get_run(&id).await.unwrap().unwrap();
        assert_eq!(fetched.workflow_name, "demo");
    }

    #[tokio::test]
    async fn missing_run_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRunStore::open(dir.path()).unwrap();
        assert!(store.get_run(&RunId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cache_entries_persist_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRunStore::open(dir.path()).unwrap();
        let entry = CacheEntry {
            id: flowline_core::CacheId::new(),
            step_name: "train".to_string(),
            first_fingerprint: "f1".to_string(),
            second_fingerprint: "f2".to_string(),
            source_run_id: RunId::new(),
            source_job_id: flowline_core::JobId::new(),
            created_at: 0,
            max_expired_time: None,
        };
        store.log_cache(entry).await.unwrap();

        let reopened = FileRunStore::open(dir.path()).unwrap();
        assert_eq!(reopened.list_cache("train").await.unwrap().len(), 1);
    }
}
