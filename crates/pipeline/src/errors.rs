//! Top-level error types for the Foreman domain.
//!
//! [`ConfigError`] covers configuration conditions that stop the process from
//! starting. Component-level errors (e.g. [`crate::github`] failures) are defined
//! in their respective modules. Delegation failures are not errors at all: they
//! are an outcome carried by [`crate::DelegationResult`].

use thiserror::Error;

use crate::{RepositoryId, SourceName};

/// Errors raised while validating the board-source configuration.
///
/// Produced at load time; the orchestrator never starts with an invalid
/// configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No board sources were configured.
    #[error("at least one board source must be configured")]
    NoSources,

    /// Two sources share the same name.
    #[error("board source name '{name}' is configured more than once")]
    DuplicateSource {
        /// The repeated name.
        name: SourceName,
    },

    /// A repository identifier is not in `owner/repo` form.
    #[error("board source '{source_name}' has invalid repository '{repository}' (expected owner/repo)")]
    InvalidRepository {
        /// The source carrying the bad value.
        source_name: SourceName,
        /// The rejected repository id.
        repository: RepositoryId,
    },

    /// A source has no remote execution path.
    #[error("board source '{source_name}' has an empty remote_path")]
    MissingRemotePath {
        /// The source carrying the bad value.
        source_name: SourceName,
    },
}
