// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The workflow runtime: admission control, per-step controllers, and
//! the single-writer dispatcher that ties them to a [`flowline_core::Run`].

pub mod controller;
pub mod events;
pub mod gate;
pub mod resolve;
pub mod runtime;

pub use controller::{run_step, StepRunContext};
pub use events::{StepEvent, StepOutcome};
pub use gate::{AdmissionGate, AdmissionPermit};
pub use resolve::{artifact_path, resolve_command};
pub use runtime::WorkflowRuntime;
