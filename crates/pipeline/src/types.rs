//! Shared value types for the Foreman orchestration domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! several fields and invariants (a work item always belongs to a source, a pull
//! request reference always carries the number parsed from its URL).

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    BoardId, ConfigError, IssueNumber, ProjectItemId, PullRequestNumber, RepositoryId, SourceName,
    StatusFieldId, StatusOptionId,
};

// ---------------------------------------------------------------------------
// Board sources
// ---------------------------------------------------------------------------

/// The status-field options a board source recognises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusOptions {
    /// Items with this option are picked up.
    pub ready: StatusOptionId,
    /// Set on pickup, before delegation starts.
    pub in_progress: StatusOptionId,
    /// Set once delegation succeeds.
    pub in_review: StatusOptionId,
}

impl StatusOptions {
    /// Returns the board option that represents `state`.
    ///
    /// [`ItemState::Failed`] has no board option: a failed item stays at
    /// `in_progress` on the board.
    pub fn option_for(&self, state: ItemState) -> Option<&StatusOptionId> {
        match state {
            ItemState::Ready => Some(&self.ready),
            ItemState::InProgress => Some(&self.in_progress),
            ItemState::InReview => Some(&self.in_review),
            ItemState::Failed => None,
        }
    }
}

/// One watched project board, its repository, and where the coding agent works
/// on it.
///
/// Loaded once at start-up and never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSource {
    /// Unique name used in logs.
    pub name: SourceName,
    /// Projects V2 board node id.
    pub board_id: BoardId,
    /// Node id of the single-select status field.
    pub status_field_id: StatusFieldId,
    /// Status options driving the item lifecycle.
    pub status_options: StatusOptions,
    /// Repository that owns the board's issues (`owner/repo`).
    pub repository: RepositoryId,
    /// Checkout of `repository` on the execution host.
    pub remote_path: String,
}

/// Checks the invariants of a board-source list loaded from configuration.
///
/// The list must be non-empty, names unique, repositories in `owner/repo` form,
/// and every source must name a remote path.
pub fn validate_sources(sources: &[BoardSource]) -> Result<(), ConfigError> {
    if sources.is_empty() {
        return Err(ConfigError::NoSources);
    }

    let mut seen = HashSet::new();
    for source in sources {
        if !seen.insert(&source.name) {
            return Err(ConfigError::DuplicateSource {
                name: source.name.clone(),
            });
        }
        if source.repository.owner_and_name().is_none() {
            return Err(ConfigError::InvalidRepository {
                source_name: source.name.clone(),
                repository: source.repository.clone(),
            });
        }
        if source.remote_path.trim().is_empty() {
            return Err(ConfigError::MissingRemotePath {
                source_name: source.name.clone(),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Work items
// ---------------------------------------------------------------------------

/// An issue read from a board with its status set to `ready`.
///
/// Created fresh on every poll; never persisted. The durable trace of a work
/// item is its board status and the comments posted on its issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Board item id (the dedup key).
    pub id: ProjectItemId,
    /// Issue number in the source's repository.
    pub number: IssueNumber,
    pub title: String,
    /// Issue body; empty when the issue has none.
    pub body: String,
    /// The board source the item was read from.
    pub source: SourceName,
}

/// Lifecycle of one work item within a session.
///
/// `Ready → InProgress → InReview` on success, `InProgress → Failed` when
/// delegation fails. `InReview` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Ready,
    InProgress,
    InReview,
    Failed,
}

impl ItemState {
    /// Returns `true` if moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: ItemState) -> bool {
        matches!(
            (self, next),
            (ItemState::Ready, ItemState::InProgress)
                | (ItemState::InProgress, ItemState::InReview)
                | (ItemState::InProgress, ItemState::Failed)
        )
    }

    /// Returns `true` for states with no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, ItemState::InReview | ItemState::Failed)
    }
}

impl std::fmt::Display for ItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ItemState::Ready => "ready",
            ItemState::InProgress => "in_progress",
            ItemState::InReview => "in_review",
            ItemState::Failed => "failed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Delegation artefacts
// ---------------------------------------------------------------------------

/// A pull request URL reported by the coding agent, with its parsed number
/// and, when the path names one, the `owner/repo` it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PullRequestRef {
    url: String,
    number: PullRequestNumber,
    repository: Option<RepositoryId>,
}

impl PullRequestRef {
    /// Parses a pull request URL whose last path segment is the number.
    ///
    /// Returns `None` when the URL does not end in `/pull/<digits>` (a single
    /// trailing slash is tolerated).
    pub fn parse(url: &str) -> Option<Self> {
        let trimmed = url.trim_end_matches('/');
        let (prefix, digits) = trimmed.rsplit_once('/')?;
        if !prefix.ends_with("/pull") || digits.is_empty() {
            return None;
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let number = digits.parse().ok()?;
        Some(Self {
            url: trimmed.to_string(),
            number: PullRequestNumber::new(number),
            repository: repository_in(prefix.trim_end_matches("/pull")),
        })
    }

    /// The repository named by the URL path (`https://<host>/<owner>/<repo>/pull/<n>`).
    pub fn repository(&self) -> Option<&RepositoryId> {
        self.repository.as_ref()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn number(&self) -> PullRequestNumber {
        self.number
    }
}

/// Last two path segments of `base`, skipping the scheme and host.
fn repository_in(base: &str) -> Option<RepositoryId> {
    let path = base.split_once("://").map_or(base, |(_, rest)| rest);
    let segments: Vec<&str> = path.split('/').skip(1).filter(|s| !s.is_empty()).collect();
    let mut segments = segments.into_iter().rev();
    let name = segments.next()?;
    let owner = segments.next()?;
    RepositoryId::new(format!("{owner}/{name}"))
}

impl std::fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

/// One checklist line extracted from a pull request's test plan.
///
/// The text excludes the `- [ ]` marker; whether the source box was checked is
/// not retained because aggregated entries are always written unchecked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestPlanEntry(String);

impl TestPlanEntry {
    /// Creates an entry, returning `None` if the text is blank.
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let t = text.into();
        if t.trim().is_empty() {
            None
        } else {
            Some(Self(t))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TestPlanEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly; the underlying representation can change without affecting the
/// domain API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }

    /// Returns the calendar date of this instant in the given fixed offset.
    pub fn date_in(self, offset: FixedOffset) -> NaiveDate {
        self.0.with_timezone(&offset).date_naive()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// Source of the current time.
///
/// The orchestrator dates test-plan sections through this trait so tests can
/// pin the date.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// [`Clock`] backed by the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn item_state_transitions_follow_the_lifecycle() {
        assert!(ItemState::Ready.can_transition_to(ItemState::InProgress));
        assert!(ItemState::InProgress.can_transition_to(ItemState::InReview));
        assert!(ItemState::InProgress.can_transition_to(ItemState::Failed));

        assert!(!ItemState::Ready.can_transition_to(ItemState::InReview));
        assert!(!ItemState::Failed.can_transition_to(ItemState::Ready));
        assert!(!ItemState::InReview.can_transition_to(ItemState::InProgress));

        assert!(ItemState::InReview.is_terminal());
        assert!(ItemState::Failed.is_terminal());
        assert!(!ItemState::InProgress.is_terminal());
    }

    #[test]
    fn failed_has_no_board_option() {
        let options = StatusOptions {
            ready: StatusOptionId::new("r").unwrap(),
            in_progress: StatusOptionId::new("p").unwrap(),
            in_review: StatusOptionId::new("v").unwrap(),
        };
        assert_eq!(options.option_for(ItemState::InProgress).unwrap().as_str(), "p");
        assert!(options.option_for(ItemState::Failed).is_none());
    }

    #[test]
    fn pull_request_ref_parses_trailing_number() {
        let pr = PullRequestRef::parse("https://github.com/acme/web/pull/17").unwrap();
        assert_eq!(pr.number().as_u64(), 17);
        assert_eq!(pr.url(), "https://github.com/acme/web/pull/17");

        let pr = PullRequestRef::parse("https://host/org/repo/pull/17/").unwrap();
        assert_eq!(pr.number().as_u64(), 17);
        assert_eq!(pr.url(), "https://host/org/repo/pull/17");
    }

    #[test]
    fn pull_request_ref_rejects_other_shapes() {
        assert!(PullRequestRef::parse("https://github.com/acme/web/issues/17").is_none());
        assert!(PullRequestRef::parse("https://github.com/acme/web/pull/").is_none());
        assert!(PullRequestRef::parse("https://github.com/acme/web/pull/17a").is_none());
    }

    #[test]
    fn pull_request_ref_records_repository_from_path() {
        let pr = PullRequestRef::parse("https://github.com/other/lib/pull/5").unwrap();
        assert_eq!(pr.repository().map(RepositoryId::as_str), Some("other/lib"));

        let pr = PullRequestRef::parse("https://github.com/lib/pull/5").unwrap();
        assert_eq!(pr.repository(), None);
    }

    fn source(name: &str, repository: &str) -> BoardSource {
        BoardSource {
            name: SourceName::new(name).unwrap(),
            board_id: BoardId::new("PVT_1").unwrap(),
            status_field_id: StatusFieldId::new("PVTSSF_1").unwrap(),
            status_options: StatusOptions {
                ready: StatusOptionId::new("r").unwrap(),
                in_progress: StatusOptionId::new("p").unwrap(),
                in_review: StatusOptionId::new("v").unwrap(),
            },
            repository: RepositoryId::new(repository).unwrap(),
            remote_path: "/srv/repo".to_string(),
        }
    }

    #[test]
    fn validate_sources_accepts_distinct_well_formed_sources() {
        let sources = vec![source("web", "acme/web"), source("api", "acme/api")];
        assert_eq!(validate_sources(&sources), Ok(()));
    }

    #[test]
    fn validate_sources_rejects_bad_lists() {
        assert_eq!(validate_sources(&[]), Err(ConfigError::NoSources));

        let dup = vec![source("web", "acme/web"), source("web", "acme/api")];
        assert!(matches!(
            validate_sources(&dup),
            Err(ConfigError::DuplicateSource { .. })
        ));

        let bad_repo = vec![source("web", "acme")];
        assert!(matches!(
            validate_sources(&bad_repo),
            Err(ConfigError::InvalidRepository { .. })
        ));

        let mut no_path = source("web", "acme/web");
        no_path.remote_path = " ".to_string();
        assert!(matches!(
            validate_sources(&[no_path]),
            Err(ConfigError::MissingRemotePath { .. })
        ));
    }

    #[test]
    fn board_source_deserialises_from_config_record() {
        let json = r#"{
            "name": "web",
            "board_id": "PVT_kwDOC5s1AM4BO9Pf",
            "status_field_id": "PVTSSF_lADOC5s1AM4BO9Pfzg9gcHw",
            "status_options": {"ready": "61e4505c", "in_progress": "47fc9ee4", "in_review": "df73e18b"},
            "repository": "acme/web",
            "remote_path": "/opt/repos/web"
        }"#;
        let source: BoardSource = serde_json::from_str(json).unwrap();
        assert_eq!(source.status_options.in_review.as_str(), "df73e18b");
        assert_eq!(source.repository.owner_and_name(), Some(("acme", "web")));
    }

    #[test]
    fn blank_test_plan_entries_are_rejected() {
        assert!(TestPlanEntry::new("  ").is_none());
        assert_eq!(TestPlanEntry::new("Login works").unwrap().as_str(), "Login works");
    }

    #[test]
    fn timestamp_date_respects_offset() {
        let late = Utc.with_ymd_and_hms(2026, 3, 1, 23, 30, 0).unwrap();
        let cet = FixedOffset::east_opt(3600).unwrap();
        assert_eq!(
            Timestamp::from_utc(late).date_in(cet),
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
        );
    }
}
