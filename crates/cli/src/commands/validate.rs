// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `flowline validate` — parse a workflow document and run it through
//! the validator without touching any job backend.

use crate::exit_error::ExitError;
use crate::output::OutputFormat;
use flowline_validator::BaseWorkflow;
use std::path::Path;

pub fn handle(path: &Path, format: OutputFormat) -> Result<(), ExitError> {
    let source = super::load_workflow_source(path).map_err(|e| ExitError::validation_failed(e.to_string()))?;

    let base = BaseWorkflow::new(source).map_err(|e| ExitError::validation_failed(e.to_string()))?;

    match format {
        OutputFormat::Json => {
            let doc = serde_json::json!({
                "workflow": base.source.name,
                "topo_order": base.topo_order,
            });
            let rendered = serde_json::to_string_pretty(&doc).map_err(|e| ExitError::validation_failed(e.to_string()))?;
            println!("{rendered}");
        }
        OutputFormat::Text => {
            println!("workflow[{}] is valid", base.source.name);
            println!("execution order: {}", base.topo_order.join(" -> "));
        }
    }
    Ok(())
}
