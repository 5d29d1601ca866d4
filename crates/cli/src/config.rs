//! Start-up configuration.
//!
//! Every setting comes from a flag or its environment variable. Board sources
//! are read from a JSON file named by `--sources`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};

use executor::{AgentCommand, Launcher};
use pipeline::{validate_sources, BoardSource, BranchName, DocumentPath};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Foreman - delegates ready project-board issues to a coding agent
#[derive(Debug, Parser)]
#[command(name = "foreman", version, about, long_about = None)]
pub struct Cli {
    /// GitHub token with project, issue and contents access
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: String,

    /// GitHub API base URL (override for GitHub Enterprise)
    #[arg(long, env = "GITHUB_API_URL", default_value = github::DEFAULT_API_URL)]
    pub github_api_url: String,

    /// JSON file listing the watched board sources
    #[arg(long, env = "FOREMAN_SOURCES")]
    pub sources: PathBuf,

    /// Seconds to sleep between poll cycles
    #[arg(
        long,
        env = "POLL_INTERVAL_SECONDS",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_interval_secs: u64,

    /// SSH user on the execution host; run locally when unset
    #[arg(long, env = "HOST_USER", requires = "host_ip")]
    pub host_user: Option<String>,

    /// Address of the execution host
    #[arg(long, env = "HOST_IP", requires = "host_user")]
    pub host_ip: Option<String>,

    /// Coding agent executable on the execution host
    #[arg(long, env = "AGENT_COMMAND", default_value = "claude")]
    pub agent_command: String,

    /// Wall-clock limit for one delegation, in seconds
    #[arg(
        long,
        env = "DELEGATION_TIMEOUT_SECONDS",
        default_value_t = 600,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub delegation_timeout_secs: u64,

    /// Branch synced before each run and receiving test plan commits
    #[arg(long, env = "BASE_BRANCH", default_value = "main")]
    pub base_branch: String,

    /// Repository path of the aggregated test plan
    #[arg(long, env = "TEST_PLAN_PATH", default_value = "TEST_PLAN.md")]
    pub test_plan_path: String,

    /// Name used to sign issue comments
    #[arg(long, env = "AGENT_NAME", default_value = "Foreman")]
    pub agent_name: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "pretty")]
    pub log_format: LogFormat,

    /// Run a single poll cycle and exit
    #[arg(long)]
    pub once: bool,
}

impl Cli {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn delegation_timeout(&self) -> Duration {
        Duration::from_secs(self.delegation_timeout_secs)
    }

    pub fn base_branch(&self) -> Result<BranchName> {
        BranchName::new(self.base_branch.trim()).ok_or_else(|| anyhow!("--base-branch is empty"))
    }

    pub fn test_plan_path(&self) -> Result<DocumentPath> {
        DocumentPath::new(self.test_plan_path.trim())
            .ok_or_else(|| anyhow!("--test-plan-path is empty"))
    }

    /// SSH to `user@ip` when both are configured, otherwise run locally.
    pub fn launcher(&self) -> Launcher {
        match (&self.host_user, &self.host_ip) {
            (Some(user), Some(ip)) => Launcher::ssh(format!("{user}@{ip}")),
            _ => Launcher::Local,
        }
    }

    pub fn agent(&self) -> AgentCommand {
        AgentCommand::claude(self.agent_command.clone())
    }
}

/// Loads and validates the board-source list.
pub fn load_sources(path: &Path) -> Result<Vec<BoardSource>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read board sources from {}", path.display()))?;
    let sources: Vec<BoardSource> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid board sources in {}", path.display()))?;
    validate_sources(&sources).with_context(|| format!("invalid board sources in {}", path.display()))?;
    Ok(sources)
}
