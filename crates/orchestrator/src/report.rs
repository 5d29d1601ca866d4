//! Per-item outcomes and per-cycle summaries.

use serde::Serialize;

use pipeline::{DelegationFailure, PullRequestRef};

/// What happened to the test plan of a completed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TestPlanOutcome {
    /// The agent reported no pull request, so there is nothing to read.
    NoPullRequest,
    /// The pull request description has no test-plan entries.
    NoEntries,
    /// A section with `entries` lines was appended to the document.
    Appended { entries: usize },
    /// Reading the description or appending failed. The item's `in_review`
    /// status is unaffected.
    Failed { conflict: bool, error: String },
}

/// Result of handling one ready item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ItemOutcome {
    /// Already picked up earlier in this session.
    Skipped,
    /// Delegation succeeded and the item is now `in_review`.
    Completed {
        pull_request: Option<PullRequestRef>,
        test_plan: TestPlanOutcome,
    },
    /// Delegation failed; the item stays `in_progress` on the board.
    Failed { failure: DelegationFailure },
}

/// Counters for one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// 1-based cycle number within the session.
    pub cycle: u64,
    pub sources_polled: usize,
    /// Sources whose query failed and contributed no items.
    pub sources_failed: usize,
    pub items_seen: usize,
    pub skipped: usize,
    pub completed: usize,
    pub failed: usize,
    /// Items abandoned because a status write failed.
    pub errored: usize,
}

impl CycleReport {
    pub fn new(cycle: u64) -> Self {
        Self {
            cycle,
            ..Self::default()
        }
    }

    pub(crate) fn record(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Skipped => self.skipped += 1,
            ItemOutcome::Completed { .. } => self.completed += 1,
            ItemOutcome::Failed { .. } => self.failed += 1,
        }
    }

    /// Number of items delegated this cycle.
    pub fn delegated(&self) -> usize {
        self.completed + self.failed
    }
}
