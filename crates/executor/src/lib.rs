//! Foreman delegation adapter.
//!
//! Implements the [`pipeline::Delegator`] trait by running a coding agent (the
//! Claude Code CLI by default) inside the source's checkout, on a remote host
//! over SSH or on the local host.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Process spawning, shell quoting, timeouts and output
//! scraping live here. The [`pipeline`] crate sees only
//! [`pipeline::Delegator`] and [`pipeline::DelegationResult`].
//!
//! ## Behaviour
//!
//! - One attempt per call; no internal retry.
//! - The whole remote command is bounded by a wall-clock timeout. On expiry the
//!   local child (`ssh` or `sh`) is killed and the run is a failure.
//! - Output is only kept as a bounded tail ([`OUTPUT_TAIL_CHARS`]).

pub mod command;
pub mod output;

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, instrument, warn};

use pipeline::{
    task_description, BoardSource, BranchName, DelegationFailure, DelegationResult, Delegator,
    WorkItem,
};

pub use command::{agent_script, shell_quote, AgentCommand, Launcher};
pub use output::{diagnostics, find_pull_request, tail, OUTPUT_TAIL_CHARS};

/// Default wall-clock budget for one delegation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Settings for [`AgentExecutor`].
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Where the agent runs.
    pub launcher: Launcher,
    /// How the agent is invoked.
    pub agent: AgentCommand,
    /// Branch checked out and rebased before each run; `None` skips the sync.
    pub sync_branch: Option<BranchName>,
    /// Wall-clock budget for one run.
    pub timeout: Duration,
    /// Characters of output kept from each stream.
    pub output_tail_chars: usize,
}

impl ExecutorConfig {
    /// Configuration with the default timeout and output bound.
    pub fn new(launcher: Launcher, agent: AgentCommand, sync_branch: Option<BranchName>) -> Self {
        Self {
            launcher,
            agent,
            sync_branch,
            timeout: DEFAULT_TIMEOUT,
            output_tail_chars: OUTPUT_TAIL_CHARS,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// [`Delegator`] that runs the coding agent as a child process.
#[derive(Debug, Clone)]
pub struct AgentExecutor {
    config: ExecutorConfig,
}

impl AgentExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    fn script(&self, item: &WorkItem, source: &BoardSource) -> String {
        agent_script(
            &source.remote_path,
            self.config.sync_branch.as_ref(),
            &self.config.agent,
            &task_description(item, source),
        )
    }
}

#[async_trait]
impl Delegator for AgentExecutor {
    #[instrument(
        skip_all,
        fields(source = %source.name, issue = %item.number, timeout_secs = self.config.timeout.as_secs())
    )]
    async fn delegate(&self, item: &WorkItem, source: &BoardSource) -> DelegationResult {
        let mut cmd = self.config.launcher.command(&self.script(item, source));
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        info!("starting coding agent");
        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!(error = %e, "failed to start coding agent");
                return DelegationResult::failed(
                    DelegationFailure::Launch {
                        message: e.to_string(),
                    },
                    None,
                );
            }
        };

        // Dropping the wait future on timeout drops the child, which kills it.
        let output =
            match tokio::time::timeout(self.config.timeout, child.wait_with_output()).await {
                Ok(Ok(output)) => output,
                Ok(Err(e)) => {
                    error!(error = %e, "lost track of coding agent process");
                    return DelegationResult::failed(
                        DelegationFailure::Wait {
                            message: e.to_string(),
                        },
                        None,
                    );
                }
                Err(_) => {
                    warn!("coding agent timed out; process killed");
                    return DelegationResult::failed(
                        DelegationFailure::TimedOut {
                            after: self.config.timeout,
                        },
                        None,
                    );
                }
            };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let max = self.config.output_tail_chars;

        if !output.status.success() {
            let code = output.status.code();
            let diag = diagnostics(&stdout, &stderr, max);
            error!(
                exit_code = ?code,
                output = diag.as_deref().unwrap_or(""),
                "coding agent failed"
            );
            return DelegationResult::failed(DelegationFailure::NonZeroExit { code }, diag);
        }

        let pull_request = find_pull_request(&stdout);
        let kept = tail(stdout.trim_end(), max);
        info!(
            pull_request = pull_request.as_ref().map(|pr| pr.url()),
            output_tail = kept,
            "coding agent completed"
        );
        let kept = (!kept.is_empty()).then(|| kept.to_string());
        DelegationResult::succeeded(pull_request, kept)
    }
}
