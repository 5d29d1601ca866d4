//! GitHub-facing port traits.
//!
//! The orchestrator talks to the project board, the issue tracker, pull requests
//! and the aggregated document only through these traits. The `github` crate
//! implements them over the GraphQL and REST APIs; tests implement them in
//! memory.
//!
//! All traits are dyn-compatible (via `async_trait`) so the composition root can
//! hold them as `Arc<dyn …>`.

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    BoardSource, ContentToken, DocumentPath, IssueNumber, ProjectItemId, PullRequestNumber,
    RepositoryId, StatusOptionId, WorkItem,
};

/// Errors produced by any GitHub-facing port.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GitHubError {
    /// The request never produced a response (DNS, TLS, connection reset, …).
    #[error("GitHub transport error: {0}")]
    Transport(String),

    /// The API answered with an unexpected HTTP status.
    #[error("GitHub API returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or summary.
        message: String,
    },

    /// A GraphQL response carried an `errors` array.
    #[error("GraphQL errors: {0}")]
    GraphQl(String),

    /// The response body did not have the expected shape.
    #[error("unexpected GitHub response: {0}")]
    Decode(String),

    /// The requested board does not exist or is not visible to the token.
    #[error("project board '{0}' not found")]
    BoardNotFound(String),

    /// The repository id could not be split into owner and name.
    #[error("invalid repository id '{0}'")]
    InvalidRepository(RepositoryId),

    /// A document write was rejected because its concurrency token is stale.
    ///
    /// Another writer changed the document between fetch and commit. Never
    /// retried; the caller's append fails and the stored content is untouched.
    #[error("document '{path}' in {repository} changed since it was read")]
    Conflict {
        /// Repository holding the document.
        repository: RepositoryId,
        /// The document that was concurrently modified.
        path: DocumentPath,
    },
}

impl GitHubError {
    /// Returns `true` for the stale-token error kind.
    pub fn is_conflict(&self) -> bool {
        matches!(self, GitHubError::Conflict { .. })
    }
}

/// Reads and mutates the state of items on a project board.
#[async_trait]
pub trait ProjectBoard: Send + Sync {
    /// Returns the items of `source` whose status is the source's `ready`
    /// option, in board order.
    ///
    /// Each call issues a fresh query. Items whose content was deleted, or is
    /// not an issue, are skipped rather than failing the call.
    async fn list_ready_items(&self, source: &BoardSource) -> Result<Vec<WorkItem>, GitHubError>;

    /// Sets the status field of one item to `option`.
    async fn set_status(
        &self,
        item: &ProjectItemId,
        option: &StatusOptionId,
        source: &BoardSource,
    ) -> Result<(), GitHubError>;
}

/// Posts notifications on issues.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Adds a comment to issue `issue` of `repository`.
    async fn add_comment(
        &self,
        repository: &RepositoryId,
        issue: IssueNumber,
        body: &str,
    ) -> Result<(), GitHubError>;
}

/// Reads pull request metadata.
#[async_trait]
pub trait PullRequestReader: Send + Sync {
    /// Returns the description of a pull request, or `None` if it has none.
    async fn pull_request_description(
        &self,
        repository: &RepositoryId,
        number: PullRequestNumber,
    ) -> Result<Option<String>, GitHubError>;
}

/// A document as currently stored, with the token needed to replace it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub content: String,
    pub token: ContentToken,
}

/// A full-content replacement of a stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentCommit {
    /// The complete new content.
    pub content: String,
    /// Token from the fetch this content was derived from; `None` when the
    /// document did not exist and is being created.
    pub expected: Option<ContentToken>,
    /// Commit message recorded by the store.
    pub message: String,
}

/// Versioned text storage with optimistic concurrency.
///
/// Implementations must reject a [`DocumentCommit`] whose `expected` token does
/// not match the stored content (or which expects absence while the document
/// exists) with [`GitHubError::Conflict`], leaving the stored content unchanged.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches the document, or `None` if it does not exist yet.
    async fn fetch(
        &self,
        repository: &RepositoryId,
        path: &DocumentPath,
    ) -> Result<Option<StoredDocument>, GitHubError>;

    /// Replaces the document and returns the token of the new content.
    async fn commit(
        &self,
        repository: &RepositoryId,
        path: &DocumentPath,
        commit: DocumentCommit,
    ) -> Result<ContentToken, GitHubError>;
}
