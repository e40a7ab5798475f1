//! Normalized types shared by the parsers, the reconciler, and the report.
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Anchored pattern every task identifier must satisfy.
pub const TASK_ID_PATTERN: &str = r"^TASK-[A-Z0-9_-]+$";

fn task_id_regex() -> &'static Regex {
    static TASK_ID: OnceLock<Regex> = OnceLock::new();
    TASK_ID.get_or_init(|| Regex::new(TASK_ID_PATTERN).expect("regex for task identifiers"))
}

fn task_id_prefix_regex() -> &'static Regex {
    static TASK_ID_PREFIX: OnceLock<Regex> = OnceLock::new();
    TASK_ID_PREFIX
        .get_or_init(|| Regex::new(r"^TASK-[A-Z0-9_-]+").expect("regex for task id prefixes"))
}

pub fn is_task_id(value: &str) -> bool {
    task_id_regex().is_match(value)
}

/// Leading task identifier of a file name (`TASK-A.md` -> `TASK-A`).
pub fn task_id_prefix(file_name: &str) -> Option<&str> {
    task_id_prefix_regex()
        .find(file_name)
        .map(|found| found.as_str())
}

/// The fixed set of valid task statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Blocked,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Blocked => "blocked",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "in-progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "blocked" => Ok(TaskStatus::Blocked),
            other => Err(format!("unknown task status '{other}'")),
        }
    }
}

/// Which artifact reported a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StatusSource {
    Progress,
    Document,
    Graph,
}

impl StatusSource {
    pub fn name(self) -> &'static str {
        match self {
            StatusSource::Progress => "progress",
            StatusSource::Document => "document",
            StatusSource::Graph => "graph",
        }
    }
}

impl fmt::Display for StatusSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Fails the run.
    Finding,
    /// Printed but never affects the exit code.
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
}

impl Finding {
    pub fn finding(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Finding,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

/// Outcome of a single reconciliation run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub passed: bool,
    pub plan_id: String,
    pub task_count: usize,
    pub warning_count: usize,
    pub findings: Vec<Finding>,
}

impl Report {
    pub fn new(plan_id: String, task_count: usize, findings: Vec<Finding>) -> Self {
        let warning_count = findings.iter().filter(|entry| entry.is_warning()).count();
        let passed = warning_count == findings.len();
        Self {
            passed,
            plan_id,
            task_count,
            warning_count,
            findings,
        }
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|entry| entry.is_warning())
    }

    pub fn failures(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|entry| !entry.is_warning())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_ids_follow_the_fixed_pattern() {
        assert!(is_task_id("TASK-A"));
        assert!(is_task_id("TASK-API_2-B"));
        assert!(!is_task_id("TASK-"));
        assert!(!is_task_id("task-a"));
        assert!(!is_task_id("TASK-a"));
        assert!(!is_task_id("XTASK-A"));
    }

    #[test]
    fn task_id_prefix_reads_leading_identifier() {
        assert_eq!(task_id_prefix("TASK-A.md"), Some("TASK-A"));
        assert_eq!(task_id_prefix("TASK-12_setup.md"), Some("TASK-12_"));
        assert_eq!(task_id_prefix("notes.md"), None);
    }

    #[test]
    fn statuses_parse_case_insensitively() {
        assert_eq!("Completed".parse::<TaskStatus>(), Ok(TaskStatus::Completed));
        assert_eq!(
            "IN-PROGRESS".parse::<TaskStatus>(),
            Ok(TaskStatus::InProgress)
        );
        assert!("done".parse::<TaskStatus>().is_err());
        assert!("in_progress".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn canonical_status_names_parse_back() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Blocked,
        ] {
            assert_eq!(status.as_str().parse::<TaskStatus>(), Ok(status));
        }
    }

    #[test]
    fn report_passes_with_only_warnings() {
        let report = Report::new(
            "PLAN-1".to_string(),
            2,
            vec![Finding::warning("TASK-Z present in PROGRESS but absent from task graph")],
        );
        assert!(report.passed);
        assert_eq!(report.warning_count, 1);
        assert_eq!(report.failures().count(), 0);
    }

    #[test]
    fn report_fails_with_any_finding() {
        let report = Report::new(
            "PLAN-1".to_string(),
            1,
            vec![
                Finding::warning("w"),
                Finding::finding("TASK-A missing task in PROGRESS"),
            ],
        );
        assert!(!report.passed);
        assert_eq!(report.warnings().count(), 1);
        assert_eq!(report.failures().count(), 1);
    }
}
