// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `flowline run` — validate a workflow document, submit it to the
//! runtime, and block until the run ends (or the user interrupts).

use crate::config::EngineConfig;
use crate::exit_error::ExitError;
use crate::output::{self, OutputFormat};
use crate::stack;
use flowline_core::RunId;
use flowline_storage::RunStore;
use flowline_validator::BaseWorkflow;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub async fn handle(path: &Path, config: EngineConfig, simulate: bool, format: OutputFormat) -> Result<i32, ExitError> {
    let source = super::load_workflow_source(path).map_err(|e| ExitError::validation_failed(e.to_string()))?;
    let base = Arc::new(BaseWorkflow::new(source).map_err(|e| ExitError::validation_failed(e.to_string()))?);

    let (runtime, store) = stack::build_runtime(&config, simulate).await.map_err(|e| ExitError::run_failed(e.to_string()))?;
    let run_id = runtime.start(base).await.map_err(|e| ExitError::run_failed(e.to_string()))?;

    tracing::info!(%run_id, "run submitted");
    wait_for_completion(&runtime, &*store, run_id, format).await
}

pub(crate) async fn wait_for_completion(runtime: &Arc<stack::Runtime>, store: &dyn RunStore, run_id: RunId, format: OutputFormat) -> Result<i32, ExitError> {
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!(%run_id, "interrupt received, stopping run");
                runtime.stop(run_id);
            }
            _ = tokio::time::sleep(Duration::from_millis(300)) => {}
        }

        let run = store.get_run(&run_id).await.map_err(|e| ExitError::run_failed(e.to_string()))?.ok_or_else(|| ExitError::run_failed(format!("run[{run_id}] vanished from storage")))?;
        if run.is_ended() {
            output::print_run(&run, format).map_err(|e| ExitError::run_failed(e.to_string()))?;
            return Ok(output::exit_code_for(run.derive_status()));
        }
    }
}
