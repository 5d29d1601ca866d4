//! Newtype domain identifiers.
//!
//! Every domain concept that has an identity is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally interchanging, for example,
//! an [`IssueNumber`] with a [`PullRequestNumber`] even though both are `u64` under
//! the hood, or a board item id with a status option id.
//!
//! String identifiers reject the empty string both when constructed in code and
//! when deserialised from the board-source configuration file.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display,
// TryFrom<String> (used by serde so empty values fail to deserialise).
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value).ok_or_else(|| {
                    format!("{} must not be empty", stringify!($name))
                })
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Macro for u64-wrapped newtypes (GitHub-assigned integers).
// Generates: struct (Copy), new(), as_u64(), Display.
// ---------------------------------------------------------------------------
macro_rules! u64_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new identifier from a raw integer.
            pub fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the underlying integer value.
            pub fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: GitHub-integer-backed
// ---------------------------------------------------------------------------

u64_id! {
    /// The human-facing issue number of a work item (`#42`).
    ///
    /// Scoped to the source's repository; used for comments and in the task
    /// description handed to the coding agent.
    IssueNumber
}

u64_id! {
    /// Identifies a pull request opened by the coding agent.
    PullRequestNumber
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies one process lifetime.
///
/// Generated fresh at start-up; recorded on the root span so that every poll
/// cycle of one session can be correlated in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a new random session identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers: String-backed (board configuration / GitHub node ids)
// ---------------------------------------------------------------------------

string_id! {
    /// Human-readable name of a configured board source (e.g. `"web"`).
    ///
    /// Unique within one process; used as a log field and as the back-reference
    /// from a [`crate::WorkItem`] to its source.
    SourceName
}

string_id! {
    /// GraphQL node id of a Projects V2 board (e.g. `"PVT_kwDOC5s1AM4BO9Pf"`).
    BoardId
}

string_id! {
    /// GraphQL node id of the single-select status field on a board.
    StatusFieldId
}

string_id! {
    /// Identifies one option of the status field (e.g. `"61e4505c"`).
    StatusOptionId
}

string_id! {
    /// GraphQL node id of an item on a board.
    ///
    /// Opaque and board-scoped, stable across polls. This is the key of the
    /// session dedup set.
    ProjectItemId
}

string_id! {
    /// A Git branch name (e.g. `"main"`, `"fix/issue-42"`).
    BranchName
}

string_id! {
    /// A file-system path relative to the repository root (e.g. `"TEST_PLAN.md"`).
    DocumentPath
}

string_id! {
    /// Opaque fingerprint of a stored document's content.
    ///
    /// Returned by a fetch and required by the following write; a write whose
    /// token no longer matches the stored content is rejected.
    ContentToken
}

string_id! {
    /// Identifies a GitHub repository in `"owner/repo"` format.
    RepositoryId
}

impl RepositoryId {
    /// Splits the identifier into its owner and repository name.
    ///
    /// Returns `None` unless the value has exactly one `/` with non-empty parts
    /// on either side.
    pub fn owner_and_name(&self) -> Option<(&str, &str)> {
        let (owner, name) = self.0.split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some((owner, name))
    }
}
