// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `flowline status` — print the persisted state of a run. Since this
//! binary is a thin local driver rather than a long-lived service, this
//! only sees state a prior `run`/`restart` invocation wrote to disk.

use crate::config::EngineConfig;
use crate::exit_error::ExitError;
use crate::output::{self, OutputFormat};
use flowline_core::RunId;
use flowline_storage::{FileRunStore, RunStore};

pub async fn handle(run_id: RunId, config: EngineConfig, format: OutputFormat) -> Result<i32, ExitError> {
    let Some(state_dir) = &config.state_dir else {
        return Err(ExitError::run_failed("status requires --state-dir: runs aren't persisted anywhere else"));
    };
    let store = FileRunStore::open_with_retries(state_dir, config.storage_retry_attempts).map_err(|e| ExitError::run_failed(e.to_string()))?;
    let run = store.get_run(&run_id).await.map_err(|e| ExitError::run_failed(e.to_string()))?.ok_or_else(|| ExitError::run_failed(format!("run[{run_id}] not found")))?;

    output::print_run(&run, format).map_err(|e| ExitError::run_failed(e.to_string()))?;
    Ok(0)
}
