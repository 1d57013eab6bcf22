// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `flowline stop` — since this binary has no daemon to signal, stopping
//! a run from a separate invocation means directly marking its persisted
//! state terminated rather than reaching into a live process. Steps still
//! actually running under some other `flowline run` process keep running;
//! this command is for declaring an orphaned run over.

use crate::config::EngineConfig;
use crate::exit_error::ExitError;
use crate::output::{self, OutputFormat};
use flowline_core::{Clock, RunId, StepStatus, SystemClock};
use flowline_storage::{FileRunStore, RunStore};

pub async fn handle(run_id: RunId, config: EngineConfig, format: OutputFormat) -> Result<i32, ExitError> {
    let Some(state_dir) = &config.state_dir else {
        return Err(ExitError::run_failed("stop requires --state-dir: runs aren't persisted anywhere else"));
    };
    let store = FileRunStore::open_with_retries(state_dir, config.storage_retry_attempts).map_err(|e| ExitError::run_failed(e.to_string()))?;
    let mut run = store.get_run(&run_id).await.map_err(|e| ExitError::run_failed(e.to_string()))?.ok_or_else(|| ExitError::run_failed(format!("run[{run_id}] not found")))?;

    if !run.is_ended() {
        for step in run.steps.values_mut() {
            step.status = match step.status {
                StepStatus::Init | StepStatus::Pending => StepStatus::Cancelled,
                StepStatus::Running | StepStatus::Terminating => StepStatus::Terminated,
                terminal => terminal,
            };
        }
        run.stop_requested = true;
        run.ended_at = Some(SystemClock.now_epoch_secs());
        store.update_run(&run).await.map_err(|e| ExitError::run_failed(e.to_string()))?;
    }

    output::print_run(&run, format).map_err(|e| ExitError::run_failed(e.to_string()))?;
    Ok(0)
}
