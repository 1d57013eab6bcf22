// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job adapter seam and its concrete backends: a Kubernetes
//! `batch/v1` Job adapter for production use, and a scripted in-process
//! adapter for deterministic tests behind the `test-support` feature.

pub mod adapter;
pub mod adapters;

pub use adapter::{JobAdapter, JobAdapterError, JobHandle, JobSubmission};
pub use adapters::KubernetesJobAdapter;

#[cfg(feature = "test-support")]
pub use adapters::{ScriptedOutcome, SimulatedJobAdapter};
