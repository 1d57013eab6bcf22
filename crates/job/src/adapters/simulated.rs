// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! An in-process job backend for tests: every submission is scripted
//! ahead of time with the outcome and delay it should produce, so
//! end-to-end scenarios (linear pipeline, diamond, cache hit, cycle
//! rejection, restart mid-flight, stop during running) run deterministically
//! without a cluster.

use crate::adapter::{JobAdapter, JobAdapterError, JobHandle, JobSubmission};
use async_trait::async_trait;
use flowline_core::{JobId, JobStatus};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// The scripted lifecycle of one simulated job.
#[derive(Debug, Clone)]
pub struct ScriptedOutcome {
    pub final_status: JobStatus,
    pub run_for: Duration,
}

impl ScriptedOutcome {
    pub fn succeeds_after(run_for: Duration) -> Self {
        Self { final_status: JobStatus::Succeeded, run_for }
    }

    pub fn fails_after(run_for: Duration) -> Self {
        Self { final_status: JobStatus::Failed, run_for }
    }

    pub fn hangs_forever() -> Self {
        Self { final_status: JobStatus::Running, run_for: Duration::from_secs(u64::MAX / 2) }
    }
}

#[derive(Default)]
struct State {
    scripts: HashMap<String, ScriptedOutcome>,
    stopped: HashMap<String, bool>,
    reattach_supported: bool,
}

#[derive(Clone, Default)]
pub struct SimulatedJobAdapter {
    state: Arc<Mutex<State>>,
}

impl SimulatedJobAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the outcome for a step, keyed by step name. Every
    /// submission of that step uses this outcome.
    pub fn script(&self, step_name: impl Into<String>, outcome: ScriptedOutcome) {
        self.state.lock().scripts.insert(step_name.into(), outcome);
    }

    pub fn stopped_steps(&self) -> Vec<String> {
        self.state.lock().stopped.keys().cloned().collect()
    }

    /// Opt this instance into reattach-capable behavior, for scenarios
    /// exercising restart-and-reattach against a simulated backend.
    pub fn enable_reattach(&self) {
        self.state.lock().reattach_supported = true;
    }
}

#[async_trait]
impl JobAdapter for SimulatedJobAdapter {
    fn validate(&self, submission: &JobSubmission) -> Result<(), JobAdapterError> {
        if submission.command.trim().is_empty() {
            return Err(JobAdapterError::InvalidSubmission(format!("step[{}] has no command", submission.step_name)));
        }
        Ok(())
    }

    async fn start(&self, submission: JobSubmission) -> Result<JobHandle, JobAdapterError> {
        self.validate(&submission)?;
        Ok(JobHandle { job_id: submission.job_id, backend_ref: submission.step_name })
    }

    async fn watch(&self, handle: &JobHandle, events: mpsc::Sender<JobStatus>) -> Result<(), JobAdapterError> {
        let outcome = {
            let state = self.state.lock();
            state.scripts.get(&handle.backend_ref).cloned().unwrap_or_else(|| ScriptedOutcome::succeeds_after(Duration::from_millis(1)))
        };

        if events.send(JobStatus::Running).await.is_err() {
            return Ok(());
        }

        tokio::time::sleep(outcome.run_for).await;

        if self.state.lock().stopped.contains_key(&handle.backend_ref) {
            let _ = events.send(JobStatus::Terminated).await;
            return Ok(());
        }

        let _ = events.send(outcome.final_status).await;
        Ok(())
    }

    async fn stop(&self, handle: &JobHandle) -> Result<(), JobAdapterError> {
        self.state.lock().stopped.insert(handle.backend_ref.clone(), true);
        Ok(())
    }

    fn supports_reattach(&self) -> bool {
        self.state.lock().reattach_supported
    }

    fn reattach(&self, job_id: JobId, step_name: &str) -> JobHandle {
        JobHandle { job_id, backend_ref: step_name.to_string() }
    }
}
