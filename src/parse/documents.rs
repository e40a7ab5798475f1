//! Task document header parser.
//!
//! Every task document opens with a `---` delimited header of `key: value`
//! lines. Only `task_id` and `status` matter here; everything after the
//! closing delimiter is free-form and ignored.
//!
//! ```text
//! ---
//! task_id: TASK-A
//! status: "completed"
//! ---
//! # Bootstrap the repo
//! ```
use super::{normalize_scalar, normalize_status, split_key_value, ParsedStatuses};
use crate::layout::{is_bootstrap_name, is_task_file_name, StateLayout};
use crate::schema::{is_task_id, task_id_prefix};
use crate::util::{error_chain_message, read_text};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

const HEADER_DELIMITER: &str = "---";

/// What one task document declares about itself.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TaskDocument {
    pub task_id: Option<String>,
    pub status: Option<String>,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderState {
    Fields,
    Closed,
}

/// Parse the header block of a single task document.
///
/// The identifier falls back to the `TASK-...` prefix of `file_name` when the
/// header has no `task_id` field.
pub fn parse_task_document(text: &str, file_name: &str) -> TaskDocument {
    let mut doc = TaskDocument::default();
    let mut lines = text.lines();
    let opening = lines
        .next()
        .map(|line| line.trim_start_matches('\u{feff}').trim_end());
    if opening != Some(HEADER_DELIMITER) {
        doc.issues.push("missing header block".to_string());
        return doc;
    }

    let mut state = HeaderState::Fields;
    let mut fields: BTreeMap<String, String> = BTreeMap::new();
    for raw in lines {
        if raw.trim() == HEADER_DELIMITER {
            state = HeaderState::Closed;
            break;
        }
        if let Some((key, value)) = split_key_value(raw) {
            fields.insert(key.to_ascii_lowercase(), normalize_scalar(value));
        }
    }
    if state != HeaderState::Closed {
        doc.issues.push("unterminated header block".to_string());
        return doc;
    }

    let task_id = fields
        .get("task_id")
        .filter(|value| !value.is_empty())
        .cloned()
        .or_else(|| task_id_prefix(file_name).map(str::to_string));
    match task_id {
        Some(id) if is_task_id(&id) => doc.task_id = Some(id),
        Some(id) => doc.issues.push(format!("invalid task_id '{id}'")),
        None => doc.issues.push("missing task_id".to_string()),
    }

    match fields.get("status").filter(|value| !value.is_empty()) {
        Some(status) => doc.status = Some(normalize_status(status)),
        None => doc.issues.push("missing status".to_string()),
    }
    doc
}

/// Parse every `TASK-*.md` document under `.ai/tasks/` into one status map.
///
/// Documents are visited in file-name order so duplicate resolution and issue
/// order are stable. The bootstrap document is skipped entirely.
pub fn parse_task_documents(layout: &StateLayout) -> ParsedStatuses {
    let mut parsed = ParsedStatuses::default();
    let files = match task_document_files(layout) {
        Ok(files) => files,
        Err(err) => {
            parsed.issues.push(format!(
                "{}: unreadable directory: {}",
                layout.rel(&layout.tasks_dir()),
                error_chain_message(&err)
            ));
            return parsed;
        }
    };

    let mut origins: BTreeMap<String, String> = BTreeMap::new();
    for (file_name, path) in files {
        let label = layout.rel(&path);
        let text = match read_text(&path) {
            Ok(text) => text,
            Err(err) => {
                parsed
                    .issues
                    .push(format!("{label}: unreadable: {}", error_chain_message(&err)));
                continue;
            }
        };
        let doc = parse_task_document(&text, &file_name);
        parsed
            .issues
            .extend(doc.issues.iter().map(|issue| format!("{label}: {issue}")));
        let (Some(task_id), Some(status)) = (doc.task_id, doc.status) else {
            continue;
        };
        if let Some(previous) = origins.insert(task_id.clone(), label.clone()) {
            parsed.issues.push(format!(
                "{label}: duplicate task_id {task_id} (also in {previous})"
            ));
        }
        parsed.statuses.insert(task_id, status);
    }
    if parsed.statuses.is_empty() {
        parsed.issues.push(format!(
            "{}: no task header statuses found",
            layout.rel(&layout.tasks_dir())
        ));
    }
    tracing::debug!(
        documents = origins.len(),
        issues = parsed.issues.len(),
        "parsed task documents"
    );
    parsed
}

fn task_document_files(layout: &StateLayout) -> Result<Vec<(String, PathBuf)>> {
    let dir = layout.tasks_dir();
    let mut files = Vec::new();
    for entry in fs::read_dir(&dir).with_context(|| format!("read {}", dir.display()))? {
        let entry = entry.with_context(|| format!("read entry in {}", dir.display()))?;
        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy().to_string();
        if !path.is_file() || !is_task_file_name(&file_name) {
            continue;
        }
        if is_bootstrap_name(&file_name) {
            tracing::debug!(file = %file_name, "skipping bootstrap document");
            continue;
        }
        files.push((file_name, path));
    }
    files.sort();
    Ok(files)
}
