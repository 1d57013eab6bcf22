// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The persistence collaborator: one trait object, five methods, handed
//! to the runtime once at construction rather than threaded through every
//! function that happens to need a lookup.

use async_trait::async_trait;
use flowline_cache::CacheEntry;
use flowline_core::{JobId, Run, RunId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("run[{0}] not found")]
    RunNotFound(RunId),
    #[error("io failure: {0}")]
    Io(String),
    #[error("serialization failure: {0}")]
    Serde(String),
}

/// The last known status of a job, as seen by the store — used on restart
/// to decide whether a step's in-flight job needs reattaching or
/// resubmitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobView {
    pub job_id: JobId,
    pub status: flowline_core::JobStatus,
}

/// A recorded output artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub run_id: RunId,
    pub step_name: String,
    pub name: String,
    pub path: String,
    pub logged_at: u64,
}

#[async_trait]
pub trait RunStore: Send + Sync {
    async fn get_job(&self, job_id: &JobId) -> Result<Option<JobView>, StorageError>;

    async fn get_run(&self, run_id: &RunId) -> Result<Option<Run>, StorageError>;

    async fn update_run(&self, run: &Run) -> Result<(), StorageError>;

    async fn log_cache(&self, entry: CacheEntry) -> Result<(), StorageError>;

    async fn list_cache(&self, step_name: &str) -> Result<Vec<CacheEntry>, StorageError>;

    async fn log_artifact(&self, artifact: ArtifactRecord) -> Result<(), StorageError>;

    async fn list_artifacts(&self, step_name: &str) -> Result<Vec<ArtifactRecord>, StorageError>;
}
