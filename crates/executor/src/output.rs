//! Interpretation of the agent's captured output.
//!
//! The agent has no structured result contract; its output is free text, and
//! the only thing read from it is the first pull request URL.

use std::sync::LazyLock;

use regex::Regex;

use pipeline::PullRequestRef;

/// Characters of output kept for logs and diagnostics.
pub const OUTPUT_TAIL_CHARS: usize = 2000;

static PULL_REQUEST_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://github\.com/[^\s)]+/pull/\d+").expect("Invalid pull request URL regex")
});

/// Returns the first GitHub pull request URL in `output`.
pub fn find_pull_request(output: &str) -> Option<PullRequestRef> {
    PULL_REQUEST_URL
        .find_iter(output)
        .find_map(|m| PullRequestRef::parse(m.as_str()))
}

/// Returns the last `max_chars` characters of `text`.
pub fn tail(text: &str, max_chars: usize) -> &str {
    match text.char_indices().rev().nth(max_chars.saturating_sub(1)) {
        Some((start, _)) if max_chars > 0 => &text[start..],
        Some(_) => "",
        None => text,
    }
}

/// Joins the tails of stderr and stdout into one diagnostic block, or `None`
/// if both are blank.
pub fn diagnostics(stdout: &str, stderr: &str, max_chars: usize) -> Option<String> {
    let stdout = tail(stdout.trim_end(), max_chars);
    let stderr = tail(stderr.trim_end(), max_chars);
    match (stderr.is_empty(), stdout.is_empty()) {
        (true, true) => None,
        (false, true) => Some(format!("stderr:\n{stderr}")),
        (true, false) => Some(format!("stdout:\n{stdout}")),
        (false, false) => Some(format!("stderr:\n{stderr}\nstdout:\n{stdout}")),
    }
}
