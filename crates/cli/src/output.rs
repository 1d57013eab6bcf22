// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared output formatting: every subcommand prints either a short
//! human-readable summary or a machine-parseable JSON document.

use clap::ValueEnum;
use flowline_core::{Run, RunStatus, StepStatus};
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Serialize)]
struct RunSummary<'a> {
    run_id: String,
    workflow_name: &'a str,
    status: RunStatus,
    steps: Vec<StepSummary<'a>>,
}

#[derive(Serialize)]
struct StepSummary<'a> {
    name: &'a str,
    status: StepStatus,
    cache_outcome: flowline_core::CacheOutcome,
    job_id: Option<String>,
    message: Option<&'a str>,
}

pub fn print_run(run: &Run, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let summary = RunSummary {
                run_id: run.id.to_string(),
                workflow_name: &run.workflow_name,
                status: run.derive_status(),
                steps: run
                    .steps
                    .iter()
                    .map(|(name, state)| StepSummary {
                        name,
                        status: state.status,
                        cache_outcome: state.cache_outcome,
                        job_id: state.job_id.map(|j| j.to_string()),
                        message: state.message.as_deref(),
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Text => {
            println!("run {} [{}] — {}", run.id, run.workflow_name, run.derive_status());
            for (name, state) in &run.steps {
                let cache_note = match state.cache_outcome {
                    flowline_core::CacheOutcome::Hit => " (cache hit)",
                    flowline_core::CacheOutcome::Expired => " (cache expired)",
                    flowline_core::CacheOutcome::Miss | flowline_core::CacheOutcome::Disabled => "",
                };
                print!("  {name}: {}{cache_note}", state.status);
                if let Some(msg) = &state.message {
                    print!(" — {msg}");
                }
                println!();
            }
        }
    }
    Ok(())
}

/// Exit code conventions: 0 success, 1 run failure, 130 terminated
/// (mirrors the usual SIGINT exit code of 128+2).
pub fn exit_code_for(status: RunStatus) -> i32 {
    match status {
        RunStatus::Succeeded => 0,
        RunStatus::Terminated => 130,
        _ => 1,
    }
}
