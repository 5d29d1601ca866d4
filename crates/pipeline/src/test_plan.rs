//! Extraction of test-plan checklist items from pull request descriptions.
//!
//! The coding agent is asked to open pull requests whose description contains a
//! `## Test plan` section of Markdown checkboxes. Those lines are collected into
//! the aggregated test-plan document after the item reaches review.

use std::sync::LazyLock;

use regex::Regex;

use crate::TestPlanEntry;

/// ATX heading: up to three spaces of indent, 1–6 `#`, then optional text.
static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ {0,3}(#{1,6})(?:[ \t]+(.*?))?[ \t#]*$").expect("Invalid heading regex")
});

static TEST_PLAN_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^test\s+plan$").expect("Invalid test-plan title regex"));

/// `- [ ] text`, `- [x] text` or `- [X] text`, optionally indented.
static CHECKLIST_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*-[ \t]+\[[ xX]\][ \t]+(.+)$").expect("Invalid checklist regex")
});

/// Returns the heading level of `line`, with its text, if it is a heading.
fn heading(line: &str) -> Option<(usize, &str)> {
    let caps = HEADING.captures(line)?;
    let level = caps.get(1)?.as_str().len();
    let text = caps.get(2).map_or("", |m| m.as_str().trim());
    Some((level, text))
}

/// Extracts the checklist entries of the first "Test plan" section of `text`.
///
/// The section starts at a heading of any level titled `test plan` (case and
/// inner whitespace insensitive) and ends at the next heading of the same or a
/// higher level, or at the end of the text. Entries keep their source order and
/// are not deduplicated; checked and unchecked boxes are both collected.
///
/// Returns an empty list when there is no such section.
pub fn extract_test_plan(text: &str) -> Vec<TestPlanEntry> {
    let mut lines = text.lines();

    let section_level = loop {
        let Some(line) = lines.next() else {
            return Vec::new();
        };
        if let Some((level, title)) = heading(line) {
            if TEST_PLAN_TITLE.is_match(title) {
                break level;
            }
        }
    };

    let mut entries = Vec::new();
    for line in lines {
        if let Some((level, _)) = heading(line) {
            if level <= section_level {
                break;
            }
            continue;
        }
        if let Some(caps) = CHECKLIST_ITEM.captures(line) {
            if let Some(entry) = caps.get(1).and_then(|m| TestPlanEntry::new(m.as_str().trim_end())) {
                entries.push(entry);
            }
        }
    }
    entries
}
