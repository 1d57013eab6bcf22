// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `flowline restart` — resume a previously submitted run, resubmitting
//! only the steps that hadn't reached a successful terminal state.

use crate::config::EngineConfig;
use crate::exit_error::ExitError;
use crate::output::{self, OutputFormat};
use crate::stack;
use flowline_core::RunId;
use flowline_validator::BaseWorkflow;
use std::path::Path;
use std::sync::Arc;

pub async fn handle(path: &Path, run_id: RunId, config: EngineConfig, simulate: bool, format: OutputFormat) -> Result<i32, ExitError> {
    let source = super::load_workflow_source(path).map_err(|e| ExitError::validation_failed(e.to_string()))?;
    let base = Arc::new(BaseWorkflow::new(source).map_err(|e| ExitError::validation_failed(e.to_string()))?);

    let (runtime, store) = stack::build_runtime(&config, simulate).await.map_err(|e| ExitError::run_failed(e.to_string()))?;
    runtime.restart(base, run_id).await.map_err(|e| ExitError::run_failed(e.to_string()))?;

    tracing::info!(%run_id, "run restarted");
    super::run::wait_for_completion(&runtime, &*store, run_id, format).await
}
