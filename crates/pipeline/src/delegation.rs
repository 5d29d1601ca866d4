//! Delegation of a work item to the external coding agent.
//!
//! The [`Delegator`] port is implemented by the `executor` crate. It never
//! returns an error: every way a run can go wrong is a [`DelegationFailure`]
//! inside the [`DelegationResult`], because the orchestrator reacts to all of
//! them the same way (report once, do not retry).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{BoardSource, IssueNumber, PullRequestRef, WorkItem};

/// Why a delegation did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DelegationFailure {
    /// The command could not be started.
    Launch {
        /// The spawn error.
        message: String,
    },
    /// The command started, but waiting for it or collecting its output
    /// failed.
    Wait {
        /// The I/O error.
        message: String,
    },
    /// The command exited unsuccessfully. `code` is `None` when it was killed
    /// by a signal.
    NonZeroExit { code: Option<i32> },
    /// The command exceeded its wall-clock budget and was killed.
    TimedOut {
        /// The budget that was exceeded.
        after: Duration,
    },
}

impl std::fmt::Display for DelegationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DelegationFailure::Launch { message } => write!(f, "could not start: {message}"),
            DelegationFailure::Wait { message } => {
                write!(f, "lost track of the running agent: {message}")
            }
            DelegationFailure::NonZeroExit { code: Some(code) } => {
                write!(f, "exited with status {code}")
            }
            DelegationFailure::NonZeroExit { code: None } => f.write_str("terminated by signal"),
            DelegationFailure::TimedOut { after } => {
                write!(f, "timed out after {}s", after.as_secs())
            }
        }
    }
}

/// Outcome of one delegation.
///
/// A failed result never carries a pull request reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationResult {
    failure: Option<DelegationFailure>,
    pull_request: Option<PullRequestRef>,
    output: Option<String>,
}

impl DelegationResult {
    /// A successful run, with the pull request it reported (if any).
    pub fn succeeded(pull_request: Option<PullRequestRef>, output: Option<String>) -> Self {
        Self {
            failure: None,
            pull_request,
            output,
        }
    }

    /// A failed run with its (already bounded) diagnostic output.
    pub fn failed(failure: DelegationFailure, output: Option<String>) -> Self {
        Self {
            failure: Some(failure),
            pull_request: None,
            output,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn failure(&self) -> Option<&DelegationFailure> {
        self.failure.as_ref()
    }

    pub fn pull_request(&self) -> Option<&PullRequestRef> {
        self.pull_request.as_ref()
    }

    /// Captured output tail, for logs.
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }
}

/// Runs the coding agent for one work item.
///
/// Implementations must bound the run by a timeout and must not retry.
#[async_trait]
pub trait Delegator: Send + Sync {
    async fn delegate(&self, item: &WorkItem, source: &BoardSource) -> DelegationResult;
}

/// Name of the branch the agent is asked to work on for `issue`.
pub fn branch_for_issue(issue: IssueNumber) -> String {
    format!("fix/issue-{issue}")
}

/// Builds the natural-language task handed to the coding agent.
pub fn task_description(item: &WorkItem, source: &BoardSource) -> String {
    let number = item.number;
    format!(
        "You are working on the {repository} repository.\n\
         Implement the following GitHub issue completely, then create a pull request.\n\
         \n\
         Issue #{number}: {title}\n\
         \n\
         {body}\n\
         \n\
         Instructions:\n\
         - Make all necessary code changes\n\
         - Follow existing code patterns and conventions\n\
         - Create a PR with a clear description referencing issue #{number}\n\
         - Branch name: {branch}\n",
        repository = source.repository,
        title = item.title,
        body = item.body,
        branch = branch_for_issue(number),
    )
}
