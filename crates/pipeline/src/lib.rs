//! Core orchestration domain for Foreman.
//!
//! This crate contains every domain concept, newtype identifier, shared value
//! type, and port trait used throughout the workspace. Infrastructure crates
//! implement the traits defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no network or process
//! I/O. It defines *what* is needed; infrastructure crates define *how* to
//! supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype domain identifiers (`ProjectItemId`, `IssueNumber`, etc.) |
//! | [`types`] | Shared value types (`BoardSource`, `WorkItem`, `ItemState`, etc.) |
//! | [`errors`] | Configuration errors |
//! | [`github`] | Board, issue, pull-request and document-store ports |
//! | [`delegation`] | The `Delegator` port and the task description handed to it |
//! | [`session`] | Per-process pickup dedup set |
//! | [`test_plan`] | Test-plan checklist extraction |
//! | [`documents`] | Optimistic-concurrency test-plan aggregation |

pub mod delegation;
pub mod documents;
pub mod errors;
pub mod github;
pub mod identifiers;
pub mod session;
pub mod test_plan;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use delegation::{
    branch_for_issue, task_description, DelegationFailure, DelegationResult, Delegator,
};
pub use documents::{
    append_section, commit_message, render_section, section_title, TestPlanAggregator,
    DEFAULT_TEST_PLAN_HEADER,
};
pub use errors::ConfigError;
pub use github::{
    DocumentCommit, DocumentStore, GitHubError, IssueTracker, ProjectBoard, PullRequestReader,
    StoredDocument,
};
pub use identifiers::{
    BoardId, BranchName, ContentToken, DocumentPath, IssueNumber, ProjectItemId,
    PullRequestNumber, RepositoryId, SessionId, SourceName, StatusFieldId, StatusOptionId,
};
pub use session::SessionState;
pub use test_plan::extract_test_plan;
pub use types::{
    validate_sources, BoardSource, Clock, ItemState, PullRequestRef, StatusOptions, SystemClock,
    TestPlanEntry, Timestamp, WorkItem,
};
