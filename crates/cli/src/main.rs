//! Foreman CLI entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration**: flags and environment variables, plus the
//!    board-source JSON file, validated before anything starts.
//! 2. **Wire observability**: `tracing-subscriber` with a pretty or JSON layer
//!    and, when configured, an OpenTelemetry OTLP exporter. All `tracing`
//!    spans and events emitted by every crate in the workspace flow through it.
//! 3. **Construct infrastructure**: `GitHubClient`, `RepositoryContents` and
//!    `AgentExecutor`, injected into the `Orchestrator` as ports.
//! 4. **Run**: one poll cycle with `--once`, otherwise poll until ctrl-c.

mod config;
mod telemetry;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};

use executor::{AgentExecutor, ExecutorConfig};
use github::{GitHubClient, RepositoryContents};
use orchestrator::{Orchestrator, Ports};
use pipeline::{SystemClock, TestPlanAggregator};

use crate::config::{load_sources, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let telemetry = telemetry::init(cli.log_format)?;

    let result = run(cli).await;
    if let Err(error) = &result {
        tracing::error!("foreman exited with an error: {error:#}");
    }

    telemetry.shutdown();
    result
}

async fn run(cli: Cli) -> Result<()> {
    let sources = load_sources(&cli.sources)?;
    let base_branch = cli.base_branch()?;

    let client = GitHubClient::new(cli.github_token.clone(), cli.github_api_url.clone())
        .context("failed to build GitHub client")?;
    let contents = RepositoryContents::new(client.clone(), base_branch.clone());
    let executor = AgentExecutor::new(
        ExecutorConfig::new(cli.launcher(), cli.agent(), Some(base_branch))
            .with_timeout(cli.delegation_timeout()),
    );
    let client = Arc::new(client);

    let ports = Ports {
        board: client.clone(),
        issues: client.clone(),
        pull_requests: client,
        delegator: Arc::new(executor),
        test_plans: TestPlanAggregator::new(Arc::new(contents), cli.test_plan_path()?),
        clock: Arc::new(SystemClock),
    };
    let mut orchestrator = Orchestrator::new(sources, ports, cli.agent_name.clone());

    info!(
        session = %orchestrator.session().id(),
        sources = orchestrator.sources().len(),
        api_url = %cli.github_api_url,
        "foreman configured"
    );

    if cli.once {
        orchestrator.poll_cycle(1).await;
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(error) = tokio::signal::ctrl_c().await {
            // Dropping the sender would stop the loop.
            warn!(%error, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        info!("shutdown requested; stopping after the current cycle");
        let _ = shutdown_tx.send(true);
    });

    orchestrator.run(cli.poll_interval(), shutdown_rx).await;
    Ok(())
}
