// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shared error taxonomy. Each downstream crate defines a narrower
//! `thiserror` enum for its own boundary and converts into [`EngineError`]
//! at the point it crosses into the runtime.

use thiserror::Error;

/// A validation failure against the source document, carrying enough
/// context to report without re-parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("step[{0}] is not sourced from a valid identifier")]
    InvalidIdentifier(String),
    #[error("a cycle is detected in the workflow")]
    CycleDetected,
    #[error("step[{step}] depends on undefined step[{dep}]")]
    UndefinedDependency { step: String, dep: String },
    #[error("step[{step}] references undefined param[{param}]")]
    UndefinedParam { step: String, param: String },
    #[error("max_expired_time[{raw}] of cache not correct")]
    InvalidMaxExpiredTime { raw: String },
    #[error("workflow has no entry_points")]
    EmptyWorkflow,
    #[error("step[{step}] template reference [{reference}] could not be resolved")]
    UnresolvedTemplate { step: String, reference: String },
    #[error("entry[{0}] does not exist in the workflow")]
    UnknownEntry(String),
    #[error("override step[{step}] does not exist in the workflow")]
    UnknownOverrideStep { step: String },
    #[error("no step in the workflow declares param[{param}]")]
    UnknownParameter { param: String },
    #[error("override for step[{step}] param[{param}] is invalid: {reason}")]
    InvalidParamOverride { step: String, param: String, reason: String },
}

/// Top-level error type returned across crate boundaries inside the
/// runtime. Narrower per-crate errors (e.g. cache, job adapter) convert
/// into this via `#[from]`/`.map_err` at their public entry points.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("run[{0}] not found")]
    RunNotFound(String),

    #[error("step[{0}] not found in run")]
    StepNotFound(String),

    #[error("cache engine failure: {0}")]
    Cache(String),

    #[error("job adapter failure: {0}")]
    JobAdapter(String),

    #[error("persistence failure: {0}")]
    Storage(String),

    #[error("run[{0}] cannot be restarted: it has not ended")]
    RestartWhileRunning(String),

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
