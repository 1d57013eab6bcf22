// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime state: [`StepStatus`], the per-step runtime record, and the
//! [`Run`] aggregate whose status is derived from its steps rather than
//! stored independently.

use crate::id::{CacheId, JobId, RunId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle state of one step within a run.
///
/// Transitions: `Init -> {Pending, Skipped, Cancelled}`, `Pending ->
/// Running`, `Running -> {Succeeded, Failed, Terminating}`, `Terminating ->
/// Terminated`. There is no transition back out of a terminal variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Init,
    Pending,
    Skipped,
    Cancelled,
    Running,
    Succeeded,
    Failed,
    Terminating,
    Terminated,
}

crate::simple_display!(StepStatus {
    Init => "init",
    Pending => "pending",
    Skipped => "skipped",
    Cancelled => "cancelled",
    Running => "running",
    Succeeded => "succeeded",
    Failed => "failed",
    Terminating => "terminating",
    Terminated => "terminated",
});

impl StepStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StepStatus::Skipped
                | StepStatus::Cancelled
                | StepStatus::Succeeded
                | StepStatus::Failed
                | StepStatus::Terminated
        )
    }

    pub fn is_successful_terminal(self) -> bool {
        matches!(self, StepStatus::Skipped | StepStatus::Succeeded)
    }

    pub fn can_transition_to(self, next: StepStatus) -> bool {
        use StepStatus::*;
        matches!(
            (self, next),
            (Init, Pending)
                | (Init, Skipped)
                | (Init, Cancelled)
                | (Pending, Running)
                | (Pending, Cancelled)
                | (Running, Succeeded)
                | (Running, Failed)
                | (Running, Terminating)
                | (Terminating, Terminated)
                | (Terminating, Failed)
        )
    }
}

/// Why a cache lookup did or didn't short-circuit a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheOutcome {
    Disabled,
    Miss,
    Hit,
    Expired,
}

/// The runtime record for a single step within a run: its status plus the
/// bookkeeping a restart needs to rehydrate without re-submitting work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepState {
    pub name: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    #[serde(default)]
    pub attempt: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_id: Option<CacheId>,
    #[serde(default)]
    pub cache_outcome: CacheOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Default for CacheOutcome {
    fn default() -> Self {
        CacheOutcome::Disabled
    }
}

impl StepState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Init,
            job_id: None,
            attempt: 0,
            started_at: None,
            ended_at: None,
            first_fingerprint: None,
            second_fingerprint: None,
            cache_id: None,
            cache_outcome: CacheOutcome::Disabled,
            message: None,
        }
    }

    /// Whether the job this step submitted is still live — the question a
    /// restart needs answered to decide whether to reattach or resubmit.
    pub fn job_not_ended(&self) -> bool {
        self.job_id.is_some() && matches!(self.status, StepStatus::Pending | StepStatus::Running | StepStatus::Terminating)
    }
}

/// Overall status of a run, always derived from its steps rather than
/// tracked as independent state — see [`Run::derive_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Terminated,
}

crate::simple_display!(RunStatus {
    Pending => "pending",
    Running => "running",
    Succeeded => "succeeded",
    Failed => "failed",
    Terminated => "terminated",
});

/// One execution of a [`crate::model::WorkflowSource`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub workflow_name: String,
    pub steps: BTreeMap<String, StepState>,
    #[serde(default)]
    pub stop_requested: bool,
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<u64>,
}

impl Run {
    pub fn new(id: RunId, workflow_name: impl Into<String>, step_names: impl IntoIterator<Item = String>, created_at: u64) -> Self {
        let steps = step_names.into_iter().map(|n| (n.clone(), StepState::new(n))).collect();
        Self { id, workflow_name: workflow_name.into(), steps, stop_requested: false, created_at, ended_at: None }
    }

    /// Derive the run's overall status from its steps: pending if any step
    /// hasn't started, running if any step is running/terminating, failed
    /// if any non-terminating step failed, terminated if stop was requested
    /// and all steps reached a terminal state, succeeded only once every
    /// step is successfully terminal.
    pub fn derive_status(&self) -> RunStatus {
        let statuses: Vec<StepStatus> = self.steps.values().map(|s| s.status).collect();

        if statuses.iter().any(|s| matches!(s, StepStatus::Failed)) {
            if statuses.iter().all(|s| s.is_terminal()) {
                return RunStatus::Failed;
            }
            return RunStatus::Running;
        }
        if self.stop_requested && statuses.iter().all(|s| s.is_terminal()) {
            return RunStatus::Terminated;
        }
        if statuses.iter().all(|s| s.is_successful_terminal()) {
            return RunStatus::Succeeded;
        }
        if statuses.iter().any(|s| matches!(s, StepStatus::Running | StepStatus::Terminating | StepStatus::Pending)) {
            return RunStatus::Running;
        }
        RunStatus::Pending
    }

    pub fn is_ended(&self) -> bool {
        matches!(self.derive_status(), RunStatus::Succeeded | RunStatus::Failed | RunStatus::Terminated)
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
