//! Aggregation of test-plan entries into a shared, append-only document.
//!
//! Every append is a full read-modify-write against a [`DocumentStore`]: fetch
//! the content with its token, append one section, commit with the same token.
//! A concurrent writer makes the commit fail with [`GitHubError::Conflict`];
//! the append is then abandoned (no merge, no retry) and the stored document is
//! left as the other writer produced it.

use std::sync::Arc;

use chrono::FixedOffset;
use tracing::{debug, info};

use crate::github::{DocumentCommit, DocumentStore, GitHubError};
use crate::{ContentToken, DocumentPath, PullRequestRef, RepositoryId, TestPlanEntry, Timestamp};

/// Content used as the base when the document does not exist yet.
pub const DEFAULT_TEST_PLAN_HEADER: &str =
    "# TEST_PLAN.md\n\nCollected test plan items from coding agent PRs.\n";

/// Sections are dated in UTC+01:00.
const SECTION_DATE_OFFSET_SECS: i32 = 3600;

/// Title of the section collecting the test plan of `pull_request`, e.g.
/// `PR #17 — Fix typo (2026-10-18)`.
pub fn section_title(pull_request: &PullRequestRef, issue_title: &str, at: Timestamp) -> String {
    let date = FixedOffset::east_opt(SECTION_DATE_OFFSET_SECS)
        .map_or_else(|| at.as_datetime().date_naive(), |offset| at.date_in(offset));
    format!(
        "PR #{} \u{2014} {issue_title} ({})",
        pull_request.number(),
        date.format("%Y-%m-%d")
    )
}

/// Commit message recorded when a test plan section is appended.
pub fn commit_message(pull_request: &PullRequestRef) -> String {
    format!("test-plan: collect items from PR #{}", pull_request.number())
}

/// Renders one dated section: a blank line, a `###` title line, then one
/// unchecked checklist line per entry.
pub fn render_section(title: &str, entries: &[TestPlanEntry]) -> String {
    let mut section = format!("\n### {title}\n");
    for entry in entries {
        section.push_str("- [ ] ");
        section.push_str(entry.as_str());
        section.push('\n');
    }
    section
}

/// Appends `section` after `existing`.
///
/// Trailing newlines of `existing` collapse to exactly one; everything before
/// them is kept byte for byte.
pub fn append_section(existing: &str, section: &str) -> String {
    let base = existing.trim_end_matches('\n');
    let mut updated = String::with_capacity(base.len() + 1 + section.len());
    updated.push_str(base);
    updated.push('\n');
    updated.push_str(section);
    updated
}

/// Appends test-plan sections to one named document per repository.
#[derive(Clone)]
pub struct TestPlanAggregator {
    store: Arc<dyn DocumentStore>,
    path: DocumentPath,
    header: String,
}

impl TestPlanAggregator {
    /// Creates an aggregator writing to `path` in each repository, bootstrapping
    /// missing documents with [`DEFAULT_TEST_PLAN_HEADER`].
    pub fn new(store: Arc<dyn DocumentStore>, path: DocumentPath) -> Self {
        Self {
            store,
            path,
            header: DEFAULT_TEST_PLAN_HEADER.to_string(),
        }
    }

    /// Replaces the bootstrap header used for documents that do not exist yet.
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    pub fn path(&self) -> &DocumentPath {
        &self.path
    }

    /// Appends a section titled `section_title` holding `entries`.
    ///
    /// Returns the token of the new content, or `None` without touching the
    /// store when `entries` is empty.
    ///
    /// # Errors
    ///
    /// [`GitHubError::Conflict`] if the document changed between fetch and
    /// commit; any other [`GitHubError`] from the store.
    pub async fn append_entries(
        &self,
        repository: &RepositoryId,
        section_title: &str,
        entries: &[TestPlanEntry],
        commit_message: &str,
    ) -> Result<Option<ContentToken>, GitHubError> {
        if entries.is_empty() {
            debug!(%repository, "no test plan entries to append");
            return Ok(None);
        }

        let (existing, expected) = match self.store.fetch(repository, &self.path).await? {
            Some(doc) if !doc.content.is_empty() => (doc.content, Some(doc.token)),
            Some(doc) => (self.header.clone(), Some(doc.token)),
            None => (self.header.clone(), None),
        };

        let content = append_section(&existing, &render_section(section_title, entries));
        let token = self
            .store
            .commit(
                repository,
                &self.path,
                DocumentCommit {
                    content,
                    expected,
                    message: commit_message.to_string(),
                },
            )
            .await?;

        info!(
            %repository,
            path = %self.path,
            entries = entries.len(),
            "appended test plan section"
        );
        Ok(Some(token))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::github::StoredDocument;

    /// In-memory store whose token is a revision counter.
    ///
    /// `interloper` content, when set, is committed by a "different writer"
    /// right after the next fetch, simulating a concurrent update.
    #[derive(Default)]
    struct MemoryStore {
        docs: Mutex<HashMap<String, (String, u64)>>,
        interloper: Mutex<Option<String>>,
        commits: Mutex<u32>,
    }

    impl MemoryStore {
        fn with(content: &str) -> Self {
            let store = Self::default();
            store
                .docs
                .lock()
                .unwrap()
                .insert("TEST_PLAN.md".to_string(), (content.to_string(), 1));
            store
        }

        fn content(&self) -> Option<String> {
            self.docs
                .lock()
                .unwrap()
                .get("TEST_PLAN.md")
                .map(|(c, _)| c.clone())
        }
    }

    #[async_trait]
    impl DocumentStore for MemoryStore {
        async fn fetch(
            &self,
            _repository: &RepositoryId,
            path: &DocumentPath,
        ) -> Result<Option<StoredDocument>, GitHubError> {
            let mut docs = self.docs.lock().unwrap();
            let current = docs.get(path.as_str()).map(|(content, rev)| StoredDocument {
                content: content.clone(),
                token: ContentToken::new(format!("rev-{rev}")).unwrap(),
            });
            if let Some(other) = self.interloper.lock().unwrap().take() {
                let rev = docs.get(path.as_str()).map_or(1, |(_, rev)| rev + 1);
                docs.insert(path.to_string(), (other, rev));
            }
            Ok(current)
        }

        async fn commit(
            &self,
            repository: &RepositoryId,
            path: &DocumentPath,
            commit: DocumentCommit,
        ) -> Result<ContentToken, GitHubError> {
            let mut docs = self.docs.lock().unwrap();
            let current = docs
                .get(path.as_str())
                .map(|(_, rev)| ContentToken::new(format!("rev-{rev}")).unwrap());
            if current != commit.expected {
                return Err(GitHubError::Conflict {
                    repository: repository.clone(),
                    path: path.clone(),
                });
            }
            let rev = docs.get(path.as_str()).map_or(1, |(_, rev)| rev + 1);
            docs.insert(path.to_string(), (commit.content, rev));
            *self.commits.lock().unwrap() += 1;
            Ok(ContentToken::new(format!("rev-{rev}")).unwrap())
        }
    }

    fn repo() -> RepositoryId {
        RepositoryId::new("acme/web").unwrap()
    }

    fn entries(items: &[&str]) -> Vec<TestPlanEntry> {
        items.iter().map(|t| TestPlanEntry::new(*t).unwrap()).collect()
    }

    fn aggregator(store: Arc<MemoryStore>) -> TestPlanAggregator {
        TestPlanAggregator::new(store, DocumentPath::new("TEST_PLAN.md").unwrap())
    }

    #[test]
    fn section_title_uses_pull_request_issue_title_and_cet_date() {
        use chrono::TimeZone;

        let pr = PullRequestRef::parse("https://github.com/acme/web/pull/17").unwrap();
        let at = Timestamp::from_utc(chrono::Utc.with_ymd_and_hms(2026, 10, 17, 23, 15, 0).unwrap());

        assert_eq!(section_title(&pr, "Fix typo", at), "PR #17 — Fix typo (2026-10-18)");
        assert_eq!(commit_message(&pr), "test-plan: collect items from PR #17");
    }

    #[test]
    fn render_section_writes_unchecked_items() {
        let section = render_section("PR #17 — Fix typo (2026-10-18)", &entries(&["A", "B"]));
        assert_eq!(
            section,
            "\n### PR #17 — Fix typo (2026-10-18)\n- [ ] A\n- [ ] B\n"
        );
    }

    #[test]
    fn append_section_normalises_trailing_newlines_only() {
        assert_eq!(append_section("# Doc\n\n\n", "\n### S\n"), "# Doc\n\n### S\n");
        assert_eq!(append_section("# Doc", "\n### S\n"), "# Doc\n\n### S\n");
    }

    #[tokio::test]
    async fn first_append_bootstraps_header() {
        let store = Arc::new(MemoryStore::default());
        let token = aggregator(store.clone())
            .append_entries(&repo(), "PR #17 — Fix typo (2026-10-18)", &entries(&["A"]), "msg")
            .await
            .unwrap();

        assert_eq!(token.unwrap().as_str(), "rev-1");
        assert_eq!(
            store.content().unwrap(),
            "# TEST_PLAN.md\n\nCollected test plan items from coding agent PRs.\n\
             \n### PR #17 — Fix typo (2026-10-18)\n- [ ] A\n"
        );
    }

    #[tokio::test]
    async fn append_keeps_prior_sections_verbatim() {
        let existing = "# TEST_PLAN.md\n\n### PR #3 — Old (2026-01-01)\n- [x] Done\n";
        let store = Arc::new(MemoryStore::with(existing));

        aggregator(store.clone())
            .append_entries(&repo(), "PR #17 — New (2026-10-18)", &entries(&["A", "B"]), "msg")
            .await
            .unwrap();

        let updated = store.content().unwrap();
        assert!(updated.starts_with(existing));
        assert!(updated.ends_with("\n### PR #17 — New (2026-10-18)\n- [ ] A\n- [ ] B\n"));
    }

    #[tokio::test]
    async fn empty_entries_do_not_touch_the_store() {
        let store = Arc::new(MemoryStore::default());
        let token = aggregator(store.clone())
            .append_entries(&repo(), "PR #1", &[], "msg")
            .await
            .unwrap();

        assert!(token.is_none());
        assert!(store.content().is_none());
        assert_eq!(*store.commits.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn concurrent_write_fails_the_append_and_preserves_the_other_writer() {
        let existing = "# TEST_PLAN.md\n\n### PR #3 — Old (2026-01-01)\n- [ ] Keep\n";
        let store = Arc::new(MemoryStore::with(existing));
        let other = format!("{existing}\n### PR #9 — Other writer (2026-10-18)\n- [ ] Theirs\n");
        *store.interloper.lock().unwrap() = Some(other.clone());

        let err = aggregator(store.clone())
            .append_entries(&repo(), "PR #17 — Mine (2026-10-18)", &entries(&["Mine"]), "msg")
            .await
            .unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(store.content().unwrap(), other);
        assert!(store.content().unwrap().starts_with(existing));
        assert_eq!(*store.commits.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn concurrent_create_is_a_conflict_too() {
        let store = Arc::new(MemoryStore::default());
        *store.interloper.lock().unwrap() = Some("# Someone else\n".to_string());

        let err = aggregator(store.clone())
            .append_entries(&repo(), "PR #17", &entries(&["A"]), "msg")
            .await
            .unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(store.content().unwrap(), "# Someone else\n");
    }
}
