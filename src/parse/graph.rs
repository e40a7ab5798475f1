//! Task graph parser.
//!
//! The task graph is the only source that decides which tasks are active, so
//! this parser is strict about identifiers and lenient about
//! everything else in the document (edges, metadata, comments).
//!
//! ```text
//! plan_id: PLAN-1
//! nodes:
//!   - task_id: TASK-A
//!     status: completed
//!     depends_on: []
//!   - id: TASK-B
//!     status: pending
//! edges:
//!   - from: TASK-A
//!     to: TASK-B
//! ```
use super::{normalize_scalar, normalize_status, split_key_value, ParsedStatuses};
use crate::schema::is_task_id;
use crate::util::indent_width;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Outside,
    Nodes,
}

#[derive(Debug, Default)]
struct NodeDraft {
    task_id: Option<String>,
    status: Option<String>,
}

impl NodeDraft {
    fn apply_field(&mut self, key: &str, value: &str) {
        match key {
            "task_id" | "id" if self.task_id.is_none() => {
                self.task_id = Some(normalize_scalar(strip_comment(value)));
            }
            "status" => self.status = Some(normalize_status(strip_comment(value))),
            _ => {}
        }
    }
}

struct ParseState {
    section: Section,
    record_indent: Option<usize>,
    current: Option<NodeDraft>,
    nodes_seen: usize,
    parsed: ParsedStatuses,
}

impl ParseState {
    fn new() -> Self {
        Self {
            section: Section::Outside,
            record_indent: None,
            current: None,
            nodes_seen: 0,
            parsed: ParsedStatuses::default(),
        }
    }

    fn flush_node(&mut self) {
        let Some(node) = self.current.take() else {
            return;
        };
        self.nodes_seen += 1;
        let task_id = node.task_id.unwrap_or_default();
        if !is_task_id(&task_id) {
            self.parsed
                .issues
                .push(format!("task graph: invalid task id '{task_id}'"));
            return;
        }
        let Some(status) = node.status.filter(|status| !status.is_empty()) else {
            self.parsed
                .issues
                .push(format!("task graph: missing node status for {task_id}"));
            return;
        };
        if self.parsed.statuses.insert(task_id.clone(), status).is_some() {
            self.parsed
                .issues
                .push(format!("task graph: duplicate task id {task_id}"));
        }
    }

    fn finish(mut self) -> ParsedStatuses {
        self.flush_node();
        tracing::debug!(
            nodes = self.nodes_seen,
            accepted = self.parsed.statuses.len(),
            "parsed task graph"
        );
        if self.parsed.statuses.is_empty() {
            self.parsed
                .issues
                .push("task graph: no task nodes with status found".to_string());
        }
        self.parsed
    }
}

pub fn parse_task_graph(text: &str) -> ParsedStatuses {
    let mut state = ParseState::new();
    for raw in text.lines() {
        let stripped = raw.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }
        let indent = indent_width(raw);

        if handle_top_level(indent, stripped, &mut state) {
            continue;
        }

        if state.section != Section::Nodes {
            continue;
        }

        if handle_list_item(indent, stripped, &mut state) {
            continue;
        }

        handle_field(stripped, &mut state);
    }
    state.finish()
}

fn handle_top_level(indent: usize, stripped: &str, state: &mut ParseState) -> bool {
    if indent != 0 || stripped.starts_with('-') {
        return false;
    }
    if stripped == "nodes:" {
        state.flush_node();
        state.section = Section::Nodes;
        state.record_indent = None;
        return true;
    }
    if state.section == Section::Nodes && split_key_value(stripped).is_some() {
        state.flush_node();
        state.section = Section::Outside;
    }
    true
}

fn handle_list_item(indent: usize, stripped: &str, state: &mut ParseState) -> bool {
    let Some(item) = list_item_body(stripped) else {
        return false;
    };
    let field = split_key_value(item);
    let starts_with_id = matches!(field, Some(("task_id" | "id", _)));
    let record_indent = *state.record_indent.get_or_insert(indent);
    if !starts_with_id && indent != record_indent {
        // Nested list entry inside a record, e.g. `depends_on` items.
        return true;
    }
    state.flush_node();
    let mut node = NodeDraft::default();
    if let Some((key, value)) = field {
        node.apply_field(key, value);
    }
    state.current = Some(node);
    true
}

fn handle_field(stripped: &str, state: &mut ParseState) {
    let Some((key, value)) = split_key_value(stripped) else {
        return;
    };
    // A bare identifier line opens a record when no list item has.
    if state.current.is_none() && matches!(key, "task_id" | "id") {
        state.current = Some(NodeDraft::default());
    }
    if let Some(node) = state.current.as_mut() {
        node.apply_field(key, value);
    }
}

fn list_item_body(stripped: &str) -> Option<&str> {
    if stripped == "-" {
        return Some("");
    }
    stripped.strip_prefix("- ").map(str::trim_start)
}

fn strip_comment(value: &str) -> &str {
    match value.find(" #") {
        Some(index) => &value[..index],
        None => value,
    }
}
