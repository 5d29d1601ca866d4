//! Comment texts posted on issues.

use pipeline::{DelegationFailure, PullRequestRef};

/// Builds the comments the orchestrator posts, signed with the agent's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notices {
    agent: String,
}

impl Notices {
    pub fn new(agent: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
        }
    }

    pub fn picked_up(&self) -> String {
        format!(
            "\u{1F916} **{}** picked up this issue and is working on it...",
            self.agent
        )
    }

    pub fn completed(&self, pull_request: Option<&PullRequestRef>) -> String {
        match pull_request {
            Some(pr) => format!(
                "\u{2705} **{}** completed implementation.\n\u{1F517} PR #{}: {}",
                self.agent,
                pr.number(),
                pr.url()
            ),
            None => format!(
                "\u{2705} **{}** completed implementation. PR opened for review.",
                self.agent
            ),
        }
    }

    /// Failure notice. Names the reason but never includes the agent output.
    pub fn failed(&self, failure: &DelegationFailure) -> String {
        format!(
            "\u{274C} **{}** encountered an error ({failure}). Check the agent logs.",
            self.agent
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_references_pull_request() {
        let notices = Notices::new("Foreman");
        let pr = PullRequestRef::parse("https://host/org/repo/pull/17").unwrap();

        assert_eq!(
            notices.completed(Some(&pr)),
            "✅ **Foreman** completed implementation.\n🔗 PR #17: https://host/org/repo/pull/17"
        );
        assert!(notices.completed(None).ends_with("PR opened for review."));
    }

    #[test]
    fn failure_names_reason() {
        let notices = Notices::new("Foreman");
        let text = notices.failed(&DelegationFailure::NonZeroExit { code: Some(1) });
        assert_eq!(
            text,
            "❌ **Foreman** encountered an error (exited with status 1). Check the agent logs."
        );
        assert!(notices.picked_up().contains("**Foreman** picked up this issue"));
    }
}
