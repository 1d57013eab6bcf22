// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! An in-memory [`RunStore`], the default for tests and for deployments
//! that don't need state to survive a process restart.

use crate::store::{ArtifactRecord, JobView, RunStore, StorageError};
use async_trait::async_trait;
use flowline_cache::CacheEntry;
use flowline_core::{JobId, JobStatus, Run, RunId, StepStatus};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
pub struct InMemoryRunStore {
    runs: RwLock<HashMap<RunId, Run>>,
    jobs: RwLock<HashMap<JobId, JobStatus>>,
    cache: RwLock<Vec<CacheEntry>>,
    artifacts: RwLock<Vec<ArtifactRecord>>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_job_status(&self, job_id: JobId, status: JobStatus) {
        self.jobs.write().insert(job_id, status);
    }
}

/// Approximate a job's canonical status from its step's lifecycle state,
/// for the jobs the store only ever learns about indirectly through
/// `update_run`.
fn step_status_to_job_status(status: StepStatus) -> JobStatus {
    match status {
        StepStatus::Init | StepStatus::Pending => JobStatus::Pending,
        StepStatus::Running => JobStatus::Running,
        StepStatus::Succeeded | StepStatus::Skipped => JobStatus::Succeeded,
        StepStatus::Failed => JobStatus::Failed,
        StepStatus::Terminating => JobStatus::Terminating,
        StepStatus::Cancelled | StepStatus::Terminated => JobStatus::Terminated,
    }
}

#[async_trait]
impl RunStore for InMemoryRunStore {
    async fn get_job(&self, job_id: &JobId) -> Result<Option<JobView>, StorageError> {
        Ok(self.jobs.read().get(job_id).map(|status| JobView { job_id: *job_id, status: *status }))
    }

    async fn get_run(&self, run_id: &RunId) -> Result<Option<Run>, StorageError> {
        Ok(self.runs.read().get(run_id).cloned())
    }

    async fn update_run(&self, run: &Run) -> Result<(), StorageError> {
        self.runs.write().insert(run.id, run.clone());
        for step in run.steps.values() {
            if let Some(job_id) = step.job_id {
                self.jobs.write().insert(job_id, step_status_to_job_status(step.status));
            }
        }
        Ok(())
    }

    async fn log_cache(&self, entry: CacheEntry) -> Result<(), StorageError> {
        self.cache.write().push(entry);
        Ok(())
    }

    async fn list_cache(&self, step_name: &str) -> Result<Vec<CacheEntry>, StorageError> {
        Ok(self.cache.read().iter().filter(|e| e.step_name == step_name).cloned().collect())
    }

    async fn log_artifact(&self, artifact: ArtifactRecord) -> Result<(), StorageError> {
        self.artifacts.write().push(artifact);
        Ok(())
    }

    async fn list_artifacts(&self, step_name: &str) -> Result<Vec<ArtifactRecord>, StorageError> {
        Ok(self.artifacts.read().iter().filter(|a| a.step_name == step_name).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_run() {
        let store = InMemoryRunStore::new();
        let run = Run::new(flowline_core::RunId::new(), "demo", ["a".to_string()], 0);
        let id = run.id;
        store.update_run(&run).await.unwrap();
        let fetched = store.get_run(&id).await.unwrap().unwrap();
        assert_eq!(fetched.workflow_name, "demo");
    }

    #[tokio::test]
    async fn missing_run_returns_none() {
        let store = InMemoryRunStore::new();
        assert!(store.get_run(&flowline_core::RunId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cache_entries_filter_by_step() {
        let store = InMemoryRunStore::new();
        let entry = CacheEntry {
            id: flowline_core::CacheId::new(),
            step_name: "train".to_string(),
            first_fingerprint: "f1".to_string(),
            second_fingerprint: "f2".to_string(),
            source_run_id: flowline_core::RunId::new(),
            source_job_id: flowline_core::JobId::new(),
            created_at: 0,
            max_expired_time: None,
        };
        store.log_cache(entry).await.unwrap();
        assert_eq!(store.list_cache("train").await.unwrap().len(), 1);
        assert_eq!(store.list_cache("eval").await.unwrap().len(), 0);
    }
}
