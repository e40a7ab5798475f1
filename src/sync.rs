//! State-sync check driver.
//!
//! Resolves the workspace layout, verifies the structural prerequisites, runs
//! the four parsers, reconciles them, and renders a line-oriented report whose
//! prefixes are stable for machine parsing:
//!
//! ```text
//! STATE_SYNC_WARNING TASK-Z present in PROGRESS but absent from task graph
//! STATE_SYNC_CHECK=FAIL
//! RW_SUBAGENT_STATE_SYNC_INVALID
//! STATE_SYNC_FINDING TASK-B status mismatch: document=pending graph=pending progress=in-progress
//! ```
//!
//! Re-running against unchanged files yields byte-identical output.
use crate::cli::StateSyncArgs;
use crate::layout::StateLayout;
use crate::parse::{
    parse_counters, parse_progress, parse_task_documents, parse_task_graph, CounterState,
    ParsedStatuses,
};
use crate::reconcile::{reconcile, ReconcileInputs};
use crate::schema::Report;
use crate::util::{error_chain_message, read_text};
use anyhow::{Context, Result};
use serde_json::json;
use std::path::Path;

pub const EXIT_OK: i32 = 0;
pub const EXIT_FINDINGS: i32 = 2;
pub const EXIT_INVALID_ROOT: i32 = 3;

/// Result of one state-sync run.
#[derive(Debug, Clone)]
pub enum SyncOutcome {
    /// Structural prerequisites failed; nothing was parsed.
    InvalidRoot { issues: Vec<String> },
    Checked(Report),
}

impl SyncOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            SyncOutcome::InvalidRoot { .. } => EXIT_INVALID_ROOT,
            SyncOutcome::Checked(report) if report.passed => EXIT_OK,
            SyncOutcome::Checked(_) => EXIT_FINDINGS,
        }
    }
}

/// Run the state-sync step and print the report.
pub fn run_state_sync(args: &StateSyncArgs) -> Result<i32> {
    let outcome = check_state_sync(&args.root);
    let rendered = if args.json {
        render_json(&outcome)?
    } else {
        render_text(&outcome)
    };
    print!("{rendered}");
    Ok(outcome.exit_code())
}

/// Check a workspace root without printing anything.
pub fn check_state_sync(root: &Path) -> SyncOutcome {
    let layout = StateLayout::new(root.to_path_buf());
    let plan_id = match structural_checks(&layout) {
        Ok(plan_id) => plan_id,
        Err(issues) => {
            tracing::info!(issues = issues.len(), "workspace root failed structural checks");
            return SyncOutcome::InvalidRoot { issues };
        }
    };
    tracing::debug!(plan_id = %plan_id, root = %root.display(), "structural checks passed");

    let progress = load_statuses(&layout, &layout.progress_path(), parse_progress);
    let documents = parse_task_documents(&layout);
    let graph = load_statuses(&layout, &layout.task_graph_path(&plan_id), parse_task_graph);
    let counters = load_counters(&layout);

    let reconciliation = reconcile(&ReconcileInputs {
        progress: &progress,
        documents: &documents,
        graph: &graph,
        counters: &counters,
    });
    SyncOutcome::Checked(Report::new(
        plan_id,
        reconciliation.task_ids.len(),
        reconciliation.findings,
    ))
}

/// Verify required artifacts and read the active plan identifier.
fn structural_checks(layout: &StateLayout) -> std::result::Result<String, Vec<String>> {
    let root = layout.root();
    if !root.is_dir() {
        return Err(vec![format!(
            "workspace root is not a directory: {}",
            root.display()
        )]);
    }

    let mut issues = Vec::new();
    expect_file(layout, &layout.progress_path(), &mut issues);
    expect_dir(layout, &layout.tasks_dir(), &mut issues);
    let plan_id = if expect_file(layout, &layout.active_plan_path(), &mut issues) {
        match read_plan_id(layout) {
            Ok(plan_id) => Some(plan_id),
            Err(issue) => {
                issues.push(issue);
                None
            }
        }
    } else {
        None
    };
    if let Some(plan_id) = plan_id.as_deref() {
        expect_file(layout, &layout.task_graph_path(plan_id), &mut issues);
    }

    match plan_id {
        Some(plan_id) if issues.is_empty() => Ok(plan_id),
        _ => Err(issues),
    }
}

fn expect_file(layout: &StateLayout, path: &Path, issues: &mut Vec<String>) -> bool {
    if path.is_file() {
        return true;
    }
    if path.is_dir() {
        issues.push(format!(
            "expected file but found directory: {}",
            layout.rel(path)
        ));
    } else {
        issues.push(format!("missing required file: {}", layout.rel(path)));
    }
    false
}

fn expect_dir(layout: &StateLayout, path: &Path, issues: &mut Vec<String>) -> bool {
    if path.is_dir() {
        return true;
    }
    if path.exists() {
        issues.push(format!(
            "expected directory but found file: {}",
            layout.rel(path)
        ));
    } else {
        issues.push(format!("missing required directory: {}", layout.rel(path)));
    }
    false
}

fn read_plan_id(layout: &StateLayout) -> std::result::Result<String, String> {
    let path = layout.active_plan_path();
    let label = layout.rel(&path);
    let text = read_text(&path)
        .map_err(|err| format!("unreadable plan id file {label}: {}", error_chain_message(&err)))?;
    let plan_id = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string();
    if plan_id.is_empty() {
        return Err(format!("empty plan id in {label}"));
    }
    if plan_id == "." || plan_id == ".." || plan_id.contains(['/', '\\']) {
        return Err(format!("invalid plan id '{plan_id}' in {label}"));
    }
    Ok(plan_id)
}

fn load_statuses(
    layout: &StateLayout,
    path: &Path,
    parse: fn(&str) -> ParsedStatuses,
) -> ParsedStatuses {
    match read_text(path) {
        Ok(text) => parse(&text),
        Err(err) => ParsedStatuses {
            issues: vec![format!(
                "{}: unreadable: {}",
                layout.rel(path),
                error_chain_message(&err)
            )],
            ..ParsedStatuses::default()
        },
    }
}

/// Counters are optional; a missing file is an empty, clean state.
fn load_counters(layout: &StateLayout) -> CounterState {
    let path = layout.counters_path();
    let label = layout.rel(&path);
    if !path.exists() {
        tracing::debug!(path = %label, "counters file absent");
        return CounterState::default();
    }
    if path.is_dir() {
        return CounterState {
            issues: vec![format!(
                "counters: expected file but found directory: {label}"
            )],
            ..CounterState::default()
        };
    }
    match read_text(&path) {
        Ok(text) => {
            let counters = parse_counters(&text);
            if counters.legacy_schema_detected {
                tracing::info!(path = %label, "counters use the legacy flat schema");
            }
            counters
        }
        Err(err) => CounterState {
            issues: vec![format!(
                "counters: unreadable {label}: {}",
                error_chain_message(&err)
            )],
            ..CounterState::default()
        },
    }
}

/// Render the line-oriented report, one trailing newline per line.
pub fn render_text(outcome: &SyncOutcome) -> String {
    let mut lines = Vec::new();
    match outcome {
        SyncOutcome::InvalidRoot { issues } => {
            lines.push("STATE_SYNC_CHECK=FAIL".to_string());
            lines.push("TARGET_ROOT_INVALID".to_string());
            lines.extend(issues.iter().map(|issue| format!("STATE_SYNC_FINDING {issue}")));
        }
        SyncOutcome::Checked(report) => {
            lines.extend(
                report
                    .warnings()
                    .map(|warning| format!("STATE_SYNC_WARNING {}", warning.message)),
            );
            if report.passed {
                lines.push("STATE_SYNC_CHECK=PASS".to_string());
                lines.push(format!("PLAN_ID={}", report.plan_id));
                lines.push(format!("SYNC_TASK_COUNT={}", report.task_count));
                lines.push(format!("SYNC_WARNING_COUNT={}", report.warning_count));
            } else {
                lines.push("STATE_SYNC_CHECK=FAIL".to_string());
                lines.push("RW_SUBAGENT_STATE_SYNC_INVALID".to_string());
                lines.extend(
                    report
                        .failures()
                        .map(|finding| format!("STATE_SYNC_FINDING {}", finding.message)),
                );
            }
        }
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

pub fn render_json(outcome: &SyncOutcome) -> Result<String> {
    let payload = match outcome {
        SyncOutcome::InvalidRoot { issues } => json!({
            "result": "invalid_root",
            "exit_code": outcome.exit_code(),
            "issues": issues,
        }),
        SyncOutcome::Checked(report) => {
            let result = if report.passed { "pass" } else { "fail" };
            json!({
                "result": result,
                "exit_code": outcome.exit_code(),
                "report": report,
            })
        }
    };
    let mut text = serde_json::to_string_pretty(&payload).context("serialize state-sync report")?;
    text.push('\n');
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Finding;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, content).expect("write fixture");
    }

    fn minimal_root(root: &Path) {
        write(
            root,
            ".ai/PROGRESS.md",
            "## Task Status\n| TASK-A | Setup | completed |\n",
        );
        write(root, ".ai/tasks/TASK-A.md", "---\nstatus: completed\n---\n");
        write(root, ".ai/runtime/rw-active-plan-id.txt", "PLAN-1\n");
        write(
            root,
            ".ai/plans/PLAN-1/task-graph.yaml",
            "nodes:\n  - task_id: TASK-A\n    status: completed\n",
        );
    }

    #[test]
    fn missing_artifacts_are_collected_together() {
        let temp = tempfile::tempdir().expect("temp dir");
        fs::create_dir_all(temp.path().join(".ai/PROGRESS.md")).expect("create dir");
        let outcome = check_state_sync(temp.path());
        let SyncOutcome::InvalidRoot { issues } = &outcome else {
            panic!("expected invalid root, got {outcome:?}");
        };
        assert_eq!(
            issues,
            &vec![
                "expected file but found directory: .ai/PROGRESS.md".to_string(),
                "missing required directory: .ai/tasks".to_string(),
                "missing required file: .ai/runtime/rw-active-plan-id.txt".to_string(),
            ]
        );
        assert_eq!(outcome.exit_code(), EXIT_INVALID_ROOT);
    }

    #[test]
    fn plan_id_is_first_non_blank_line() {
        let temp = tempfile::tempdir().expect("temp dir");
        minimal_root(temp.path());
        write(temp.path(), ".ai/runtime/rw-active-plan-id.txt", "  \n");
        let SyncOutcome::InvalidRoot { issues } = check_state_sync(temp.path()) else {
            panic!("expected invalid root");
        };
        assert_eq!(
            issues,
            vec!["empty plan id in .ai/runtime/rw-active-plan-id.txt".to_string()]
        );

        write(temp.path(), ".ai/runtime/rw-active-plan-id.txt", "../PLAN-1\n");
        let SyncOutcome::InvalidRoot { issues } = check_state_sync(temp.path()) else {
            panic!("expected invalid root");
        };
        assert_eq!(
            issues,
            vec!["invalid plan id '../PLAN-1' in .ai/runtime/rw-active-plan-id.txt".to_string()]
        );

        write(temp.path(), ".ai/runtime/rw-active-plan-id.txt", "\n  \nPLAN-1  \n");
        let outcome = check_state_sync(temp.path());
        assert_eq!(outcome.exit_code(), EXIT_OK, "{outcome:?}");
        assert!(render_text(&outcome).contains("PLAN_ID=PLAN-1\n"));
    }

    #[test]
    fn missing_task_graph_for_plan_is_structural() {
        let temp = tempfile::tempdir().expect("temp dir");
        minimal_root(temp.path());
        write(temp.path(), ".ai/runtime/rw-active-plan-id.txt", "PLAN-2\n");
        let SyncOutcome::InvalidRoot { issues } = check_state_sync(temp.path()) else {
            panic!("expected invalid root");
        };
        assert_eq!(
            issues,
            vec!["missing required file: .ai/plans/PLAN-2/task-graph.yaml".to_string()]
        );
    }

    #[test]
    fn consistent_root_passes_without_counters() {
        let temp = tempfile::tempdir().expect("temp dir");
        minimal_root(temp.path());
        let outcome = check_state_sync(temp.path());
        assert_eq!(outcome.exit_code(), EXIT_OK);
        assert_eq!(
            render_text(&outcome),
            "STATE_SYNC_CHECK=PASS\nPLAN_ID=PLAN-1\nSYNC_TASK_COUNT=1\nSYNC_WARNING_COUNT=0\n"
        );
    }

    #[test]
    fn counters_directory_degrades_to_a_finding() {
        let temp = tempfile::tempdir().expect("temp dir");
        minimal_root(temp.path());
        fs::create_dir_all(temp.path().join(".ai/runtime/rw-strike-state.yaml"))
            .expect("create dir");
        let outcome = check_state_sync(temp.path());
        assert_eq!(outcome.exit_code(), EXIT_FINDINGS);
        assert!(render_text(&outcome).contains(
            "STATE_SYNC_FINDING counters: expected file but found directory: .ai/runtime/rw-strike-state.yaml\n"
        ));
    }

    #[test]
    fn warnings_print_before_the_verdict() {
        let report = Report::new(
            "PLAN-1".to_string(),
            1,
            vec![
                Finding::warning("TASK-Z present in PROGRESS but absent from task graph"),
                Finding::finding("TASK-A missing task frontmatter entry"),
            ],
        );
        let text = render_text(&SyncOutcome::Checked(report));
        assert_eq!(
            text,
            "STATE_SYNC_WARNING TASK-Z present in PROGRESS but absent from task graph\n\
             STATE_SYNC_CHECK=FAIL\n\
             RW_SUBAGENT_STATE_SYNC_INVALID\n\
             STATE_SYNC_FINDING TASK-A missing task frontmatter entry\n"
        );
    }

    #[test]
    fn json_render_carries_result_and_exit_code() {
        let outcome = SyncOutcome::InvalidRoot {
            issues: vec!["missing required file: .ai/PROGRESS.md".to_string()],
        };
        let value: serde_json::Value =
            serde_json::from_str(&render_json(&outcome).expect("render")).expect("parse");
        assert_eq!(value["result"], "invalid_root");
        assert_eq!(value["exit_code"], 3);
        assert_eq!(value["issues"][0], "missing required file: .ai/PROGRESS.md");
    }
}
