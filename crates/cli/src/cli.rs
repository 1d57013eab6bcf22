// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The top-level argument grammar.

use crate::output::OutputFormat;
use clap::{Parser, Subcommand};
use flowline_core::RunId;
use std::path::PathBuf;

fn parse_run_id(raw: &str) -> Result<RunId, std::convert::Infallible> {
    Ok(RunId::from(raw))
}

#[derive(Parser)]
#[command(name = "flowline", version, about = "Validate and run DAG-shaped ML pipelines")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output format shared by every subcommand.
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Directory for persisted run and cache state. Omit to keep
    /// everything in memory for the life of this process.
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    /// Kubernetes namespace to submit step jobs into.
    #[arg(long, global = true, default_value = "default")]
    pub kube_namespace: String,

    /// Run steps through the in-process simulator instead of Kubernetes.
    /// Only available when this binary was built with `test-support`.
    #[arg(long, global = true, hide = true)]
    pub simulate: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Parse and validate a workflow document without running it.
    Validate {
        /// Path to the workflow YAML document.
        workflow: PathBuf,
    },
    /// Submit a workflow document and block until it ends.
    Run {
        /// Path to the workflow YAML document.
        workflow: PathBuf,
    },
    /// Resume a previously submitted run.
    Restart {
        /// Path to the workflow YAML document (must match the original run).
        workflow: PathBuf,
        /// Run id to resume.
        #[arg(value_parser = parse_run_id)]
        run_id: RunId,
    },
    /// Mark a run's persisted state as stopped.
    Stop {
        /// Run id to stop.
        #[arg(value_parser = parse_run_id)]
        run_id: RunId,
    },
    /// Print a run's persisted state.
    Status {
        /// Run id to inspect.
        #[arg(value_parser = parse_run_id)]
        run_id: RunId,
    },
}
