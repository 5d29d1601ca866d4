//! The poll-cycle state machine.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, info_span, warn, Instrument};

use pipeline::{
    commit_message, extract_test_plan, section_title, BoardSource, Clock, Delegator, GitHubError,
    IssueTracker, ItemState, ProjectBoard, PullRequestReader, PullRequestRef, SessionState,
    TestPlanAggregator, WorkItem,
};

use crate::notices::Notices;
use crate::report::{CycleReport, ItemOutcome, TestPlanOutcome};

/// Item-level failures that abandon the remaining steps for one item.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The board rejected a status change. The item stays claimed and is not
    /// retried in this session.
    #[error("failed to move item to {state}: {error}")]
    StatusUpdate {
        state: ItemState,
        #[source]
        error: GitHubError,
    },
}

/// The adapters the orchestrator drives.
#[derive(Clone)]
pub struct Ports {
    pub board: Arc<dyn ProjectBoard>,
    pub issues: Arc<dyn IssueTracker>,
    pub pull_requests: Arc<dyn PullRequestReader>,
    pub delegator: Arc<dyn Delegator>,
    pub test_plans: TestPlanAggregator,
    pub clock: Arc<dyn Clock>,
}

/// Polls every board source, delegates each newly ready item once per session
/// and records the outcome on the board, the issue and the test plan.
///
/// Items are processed strictly one at a time, sources in configured order and
/// items in the order their board returns them.
pub struct Orchestrator {
    sources: Arc<[BoardSource]>,
    ports: Ports,
    notices: Notices,
    session: SessionState,
}

impl Orchestrator {
    pub fn new(
        sources: impl Into<Arc<[BoardSource]>>,
        ports: Ports,
        agent_name: impl Into<String>,
    ) -> Self {
        Self {
            sources: sources.into(),
            ports,
            notices: Notices::new(agent_name),
            session: SessionState::new(),
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn sources(&self) -> &[BoardSource] {
        &self.sources
    }

    /// Runs poll cycles until `shutdown` turns `true` (or its sender is
    /// dropped), sleeping `interval` between cycles.
    ///
    /// Shutdown is only observed between cycles; an in-flight delegation is
    /// never interrupted.
    pub async fn run(&mut self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut cycle = 0_u64;
        info!(
            session = %self.session.id(),
            sources = self.sources.len(),
            interval_secs = interval.as_secs(),
            "orchestrator started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            cycle += 1;
            self.poll_cycle(cycle).await;

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }

        info!(
            session = %self.session.id(),
            cycles = cycle,
            picked_up = self.session.claimed_count(),
            "orchestrator stopped"
        );
    }

    /// Runs one poll cycle over every source.
    ///
    /// Never fails: source and item errors are logged and counted in the
    /// returned report.
    pub async fn poll_cycle(&mut self, cycle: u64) -> CycleReport {
        let span = info_span!("poll_cycle", cycle, session = %self.session.id());
        async {
            let mut report = CycleReport::new(cycle);
            let sources = Arc::clone(&self.sources);

            for source in sources.iter() {
                report.sources_polled += 1;
                let items = match self.ports.board.list_ready_items(source).await {
                    Ok(items) => items,
                    Err(error) => {
                        report.sources_failed += 1;
                        error!(source = %source.name, %error, "failed to query board source");
                        continue;
                    }
                };
                debug!(source = %source.name, count = items.len(), "ready items");

                for item in &items {
                    report.items_seen += 1;
                    match self.process_item(source, item).await {
                        Ok(outcome) => report.record(&outcome),
                        Err(error) => {
                            report.errored += 1;
                            error!(
                                source = %source.name,
                                issue = %item.number,
                                item_id = %item.id,
                                %error,
                                "abandoned item"
                            );
                        }
                    }
                }
            }

            info!(
                sources_polled = report.sources_polled,
                sources_failed = report.sources_failed,
                items_seen = report.items_seen,
                skipped = report.skipped,
                delegated = report.delegated(),
                completed = report.completed,
                failed = report.failed,
                errored = report.errored,
                "poll cycle finished"
            );
            report
        }
        .instrument(span)
        .await
    }

    /// Handles one ready item: claim, mark `in_progress`, delegate, then
    /// report the result.
    pub async fn process_item(
        &mut self,
        source: &BoardSource,
        item: &WorkItem,
    ) -> Result<ItemOutcome, OrchestratorError> {
        if !self.session.claim(&item.id) {
            debug!(item_id = %item.id, issue = %item.number, "already picked up this session");
            return Ok(ItemOutcome::Skipped);
        }

        let span = info_span!(
            "item",
            source = %source.name,
            issue = %item.number,
            item_id = %item.id
        );
        async {
            info!(title = %item.title, "picked up item");
            self.transition(source, item, ItemState::Ready, ItemState::InProgress)
                .await?;
            self.notify(source, item, &self.notices.picked_up()).await;

            let result = self.ports.delegator.delegate(item, source).await;

            if let Some(failure) = result.failure() {
                warn!(%failure, "delegation failed; item stays in_progress");
                debug!(
                    from = %ItemState::InProgress,
                    to = %ItemState::Failed,
                    "item state changed"
                );
                self.notify(source, item, &self.notices.failed(failure)).await;
                return Ok(ItemOutcome::Failed {
                    failure: failure.clone(),
                });
            }

            let pull_request = result.pull_request().cloned();
            self.transition(source, item, ItemState::InProgress, ItemState::InReview)
                .await?;
            self.notify(source, item, &self.notices.completed(pull_request.as_ref()))
                .await;

            let test_plan = match &pull_request {
                Some(pr) => self.collect_test_plan(source, item, pr).await,
                None => TestPlanOutcome::NoPullRequest,
            };

            Ok(ItemOutcome::Completed {
                pull_request,
                test_plan,
            })
        }
        .instrument(span)
        .await
    }

    async fn transition(
        &self,
        source: &BoardSource,
        item: &WorkItem,
        from: ItemState,
        to: ItemState,
    ) -> Result<(), OrchestratorError> {
        debug_assert!(from.can_transition_to(to));
        let Some(option) = source.status_options.option_for(to) else {
            return Ok(());
        };

        self.ports
            .board
            .set_status(&item.id, option, source)
            .await
            .map_err(|error| OrchestratorError::StatusUpdate { state: to, error })?;

        info!(%from, %to, "item state changed");
        Ok(())
    }

    /// Comments are best effort; a failed post never changes the outcome.
    async fn notify(&self, source: &BoardSource, item: &WorkItem, body: &str) {
        if let Err(error) = self
            .ports
            .issues
            .add_comment(&source.repository, item.number, body)
            .await
        {
            warn!(%error, "failed to post issue comment");
        }
    }

    /// Appends the pull request's test plan to the aggregated document of
    /// the source's repository.
    ///
    /// The description is read from the repository named in the pull request
    /// URL, falling back to the source's repository. Failures are logged and reported, never propagated: the item is
    /// already `in_review`.
    async fn collect_test_plan(
        &self,
        source: &BoardSource,
        item: &WorkItem,
        pull_request: &PullRequestRef,
    ) -> TestPlanOutcome {
        let repository = pull_request
            .repository()
            .unwrap_or(&source.repository);
        let description = match self
            .ports
            .pull_requests
            .pull_request_description(repository, pull_request.number())
            .await
        {
            Ok(description) => description.unwrap_or_default(),
            Err(error) => {
                warn!(%pull_request, %error, "failed to read pull request description");
                return TestPlanOutcome::Failed {
                    conflict: false,
                    error: error.to_string(),
                };
            }
        };

        let entries = extract_test_plan(&description);
        if entries.is_empty() {
            debug!(%pull_request, "pull request has no test plan");
            return TestPlanOutcome::NoEntries;
        }

        let title = section_title(pull_request, &item.title, self.ports.clock.now());
        match self
            .ports
            .test_plans
            .append_entries(
                &source.repository,
                &title,
                &entries,
                &commit_message(pull_request),
            )
            .await
        {
            Ok(_) => TestPlanOutcome::Appended {
                entries: entries.len(),
            },
            Err(error) => {
                let conflict = error.is_conflict();
                if conflict {
                    warn!(%pull_request, %error, "test plan changed concurrently; append dropped");
                } else {
                    warn!(%pull_request, %error, "failed to append test plan");
                }
                TestPlanOutcome::Failed {
                    conflict,
                    error: error.to_string(),
                }
            }
        }
    }
}
