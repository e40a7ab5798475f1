//! `PROGRESS.md` task table parser.
//!
//! Only rows under the exact `## Task Status` heading count; the table ends at
//! the next heading of any level.
//!
//! ```text
//! ## Task Status
//! | Task   | Title        | Status      |
//! |--------|--------------|-------------|
//! | TASK-A | Bootstrap    | completed   |
//! | TASK-B | Wire parsers | in-progress |
//! ```
use super::{normalize_scalar, normalize_status, ParsedStatuses};
use crate::schema::is_task_id;

const TASK_STATUS_HEADING: &str = "## Task Status";

#[derive(Default)]
struct ParseState {
    in_table: bool,
    parsed: ParsedStatuses,
}

impl ParseState {
    fn finish(mut self) -> ParsedStatuses {
        if self.parsed.statuses.is_empty() {
            self.parsed.issues.push(format!(
                "PROGRESS.md: no task rows found under '{TASK_STATUS_HEADING}'"
            ));
        }
        self.parsed
    }
}

pub fn parse_progress(text: &str) -> ParsedStatuses {
    let mut state = ParseState::default();
    for raw in text.lines() {
        let stripped = raw.trim();

        if handle_heading(stripped, &mut state) {
            continue;
        }

        if !state.in_table || stripped.is_empty() || is_separator_row(stripped) {
            continue;
        }

        if stripped.starts_with('|') {
            handle_row(stripped, &mut state);
        }
    }
    state.finish()
}

fn handle_heading(stripped: &str, state: &mut ParseState) -> bool {
    if !stripped.starts_with('#') {
        return false;
    }
    state.in_table = stripped == TASK_STATUS_HEADING;
    true
}

fn handle_row(stripped: &str, state: &mut ParseState) {
    let inner = stripped.strip_prefix('|').unwrap_or(stripped);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    let cells: Vec<String> = inner.split('|').map(normalize_scalar).collect();
    // Column headers and free-form rows have no task identifier.
    if cells.len() < 3 || !is_task_id(&cells[0]) {
        return;
    }
    state
        .parsed
        .statuses
        .insert(cells[0].clone(), normalize_status(&cells[2]));
}

/// A row made only of pipes, dashes, and alignment colons.
fn is_separator_row(stripped: &str) -> bool {
    stripped.starts_with('|')
        && stripped.contains('-')
        && stripped
            .chars()
            .all(|ch| matches!(ch, '|' | '-' | ':' | ' '))
}
