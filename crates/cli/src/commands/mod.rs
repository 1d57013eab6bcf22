// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod restart;
pub mod run;
pub mod status;
pub mod stop;
pub mod validate;

use flowline_core::WorkflowSource;
use std::path::Path;

pub(crate) fn load_workflow_source(path: &Path) -> anyhow::Result<WorkflowSource> {
    let raw = std::fs::read_to_string(path).map_err(|e| anyhow::anyhow!("reading {}: {e}", path.display()))?;
    let source: WorkflowSource = serde_yaml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {}: {e}", path.display()))?;
    Ok(source)
}
