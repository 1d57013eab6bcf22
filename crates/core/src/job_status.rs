// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Normalized job status, the canonical form every [`crate`] job adapter
//! maps its backend-specific phase onto before the step controller ever
//! sees it.

use serde::{Deserialize, Serialize};

/// Canonical status of one submitted job, independent of which backend
/// (Kubernetes `batch/v1` Job, a CRD-based operator, a simulator) ran it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Terminating,
    Terminated,
}

crate::simple_display!(JobStatus {
    Pending => "pending",
    Running => "running",
    Succeeded => "succeeded",
    Failed => "failed",
    Terminating => "terminating",
    Terminated => "terminated",
});

impl JobStatus {
    /// Whether the job has reached a state the step controller will never
    /// see it leave on its own.
    pub fn is_ended(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed | JobStatus::Terminated)
    }

    pub fn is_running_like(self) -> bool {
        matches!(self, JobStatus::Running | JobStatus::Terminating)
    }

    /// Map a raw phase string reported by a CRD-based backend onto the
    /// canonical status, grouping the backend's transient sub-phases the
    /// way each operator's own status conversion does (union of the
    /// Spark, VCJob, and PaddleJob phase sets).
    ///
    /// Unknown phases conservatively map to `Pending` rather than panicking
    /// — a backend adding a new sub-phase should degrade gracefully, not
    /// break the controller loop.
    pub fn from_crd_phase(phase: &str) -> Self {
        match phase {
            "Pending" | "New" | "Submitted" | "Starting" => JobStatus::Pending,
            "Running" | "Succeeding" | "Failing" | "Invalidating" | "PendingRerun"
            | "Restarting" | "Completing" | "Scaling" => JobStatus::Running,
            "Completed" | "Succeed" => JobStatus::Succeeded,
            "Failed" | "FailedSubmission" | "Unknown" | "Terminated" => JobStatus::Failed,
            "Terminating" | "Aborting" => JobStatus::Terminating,
            "Aborted" => JobStatus::Terminated,
            _ => JobStatus::Pending,
        }
    }

    /// Map a Kubernetes `batch/v1` Job's own status block (`succeeded`,
    /// `failed`, `active` counters) onto the canonical status.
    pub fn from_batch_job_counts(active: i32, succeeded: i32, failed: i32) -> Self {
        if succeeded > 0 {
            JobStatus::Succeeded
        } else if failed > 0 {
            JobStatus::Failed
        } else if active > 0 {
            JobStatus::Running
        } else {
            JobStatus::Pending
        }
    }
}

#[cfg(test)]
#[path = "job_status_tests.rs"]
mod tests;
