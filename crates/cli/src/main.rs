// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use flowline::config::EngineConfig;
use flowline::{commands, Cli, Command, ExitError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "flowline=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::new(cli.state_dir.clone(), Some(cli.kube_namespace.clone()));

    let outcome = run(cli, config).await;
    match outcome {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

async fn run(cli: Cli, config: EngineConfig) -> Result<i32, ExitError> {
    match cli.command {
        Command::Validate { workflow } => commands::validate::handle(&workflow, cli.format).map(|()| 0),
        Command::Run { workflow } => commands::run::handle(&workflow, config, cli.simulate, cli.format).await,
        Command::Restart { workflow, run_id } => commands::restart::handle(&workflow, run_id, config, cli.simulate, cli.format).await,
        Command::Stop { run_id } => commands::stop::handle(run_id, config, cli.format).await,
        Command::Status { run_id } => commands::status::handle(run_id, config, cli.format).await,
    }
}
