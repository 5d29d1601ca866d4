//! Foreman GitHub infrastructure adapter.
//!
//! Implements the GitHub-facing traits defined in the [`pipeline`] crate:
//!
//! | Trait | Implementor | API |
//! |-------|-------------|-----|
//! | [`pipeline::ProjectBoard`] | [`GitHubClient`] | GraphQL (Projects V2) |
//! | [`pipeline::IssueTracker`] | [`GitHubClient`] | REST `issues/{n}/comments` |
//! | [`pipeline::PullRequestReader`] | [`GitHubClient`] | REST `pulls/{n}` |
//! | [`pipeline::DocumentStore`] | [`RepositoryContents`] | REST `contents/{path}` |
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules.
//! All GitHub API details (authentication headers, pagination, status-code
//! mapping, base64 content encoding) are handled here; the [`pipeline`] crate
//! never sees them.

pub mod board;
pub mod client;
pub mod contents;
pub mod issues;

pub use client::{GitHubClient, DEFAULT_API_URL};
pub use contents::RepositoryContents;
