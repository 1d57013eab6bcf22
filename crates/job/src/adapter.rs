// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job adapter seam: every backend that can run a step's container —
//! Kubernetes today, a simulator under tests — implements [`JobAdapter`].

use async_trait::async_trait;
use flowline_core::{JobId, JobStatus};
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum JobAdapterError {
    #[error("job submission rejected: {0}")]
    InvalidSubmission(String),
    #[error("failed to start job: {0}")]
    StartFailed(String),
    #[error("failed to watch job[{0}]")]
    WatchFailed(JobId),
    #[error("failed to stop job[{0}]: {1}")]
    StopFailed(JobId, String),
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
}

/// Everything a backend needs to run one step.
#[derive(Debug, Clone)]
pub struct JobSubmission {
    pub job_id: JobId,
    pub step_name: String,
    pub image: String,
    pub command: String,
    pub env: BTreeMap<String, String>,
}

/// A handle a backend returns from [`JobAdapter::start`], opaque outside
/// the adapter that produced it.
#[derive(Debug, Clone)]
pub struct JobHandle {
    pub job_id: JobId,
    pub backend_ref: String,
}

/// A job execution backend.
///
/// `watch` runs until the job reaches a terminal [`JobStatus`] or the
/// adapter loses the ability to observe it; every status transition along
/// the way is pushed onto `events`. Implementations that can't push
/// incremental updates (a backend with only poll-based status) should
/// poll internally and synthesize the same stream.
#[async_trait]
pub trait JobAdapter: Send + Sync {
    /// Structural checks the runtime can do before submitting anything —
    /// i.e. whether this submission is shaped correctly for this backend.
    fn validate(&self, submission: &JobSubmission) -> Result<(), JobAdapterError>;

    async fn start(&self, submission: JobSubmission) -> Result<JobHandle, JobAdapterError>;

    async fn watch(&self, handle: &JobHandle, events: mpsc::Sender<JobStatus>) -> Result<(), JobAdapterError>;

    async fn stop(&self, handle: &JobHandle) -> Result<(), JobAdapterError>;

    /// Whether a job submitted before a restart can be reattached to via
    /// [`JobAdapter::watch`] using only its [`JobHandle`], without
    /// resubmitting.
    fn supports_reattach(&self) -> bool {
        true
    }

    /// Rebuild the [`JobHandle`] for a job submitted in a previous process
    /// lifetime, from its persisted `job_id` and the name of the step that
    /// submitted it. Only called when [`JobAdapter::supports_reattach`]
    /// returns `true`; the default mirrors [`JobAdapter::start`]'s id-based
    /// `backend_ref` convention.
    fn reattach(&self, job_id: JobId, step_name: &str) -> JobHandle {
        let _ = step_name;
        JobHandle { job_id, backend_ref: job_id.to_string() }
    }
}
