//! Tolerant line parsers for the four workflow artifacts.
//!
//! Each artifact is hand-edited, so every parser is a small state machine over
//! lines that extracts what it recognizes and records an issue for what it
//! cannot, instead of rejecting the whole file. The three status sources share
//! one output shape, [`ParsedStatuses`], so the reconciler never needs to know
//! which notation a status came from.
//!
//! # Submodules
//!
//! - [`progress`]: `## Task Status` table in `PROGRESS.md`
//! - [`documents`]: `---` delimited header block of each task document
//! - [`graph`]: `nodes:` list of the active plan's task graph
//! - [`counters`]: nested strike/security counters with legacy fallback
use std::collections::BTreeMap;

pub mod counters;
pub mod documents;
pub mod graph;
pub mod progress;

pub use counters::{parse_counters, CounterState, StrikeCount};
pub use documents::parse_task_documents;
pub use graph::parse_task_graph;
pub use progress::parse_progress;

/// Identifier-to-status mapping plus the issues met while building it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedStatuses {
    /// Task identifier to lowercased status token, not yet validated.
    pub statuses: BTreeMap<String, String>,
    pub issues: Vec<String>,
}

/// Strip surrounding whitespace and one matching pair of quotes.
pub fn normalize_scalar(raw: &str) -> String {
    let value = raw.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|quote| value.strip_prefix(*quote)?.strip_suffix(*quote));
    match unquoted {
        Some(inner) => inner.trim().to_string(),
        None => value.to_string(),
    }
}

/// Normalize a status value for storage.
pub fn normalize_status(raw: &str) -> String {
    normalize_scalar(raw).to_ascii_lowercase()
}

/// Split a `key: value` line into a trimmed key and the raw remainder.
///
/// Returns `None` for lines without a colon or with an empty key.
pub(crate) fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}
