//! Typed paths into a workspace layout.
//!
//! Every workflow artifact lives under `.ai/` in the workspace root:
//!
//! ```text
//! .ai/PROGRESS.md
//! .ai/tasks/TASK-*.md
//! .ai/features/*.md
//! .ai/plans/<PLAN_ID>/task-graph.yaml
//! .ai/runtime/rw-active-plan-id.txt
//! .ai/runtime/rw-strike-state.yaml
//! ```
use crate::util::display_path;
use std::path::{Path, PathBuf};

/// File-name prefix of task documents.
pub const TASK_FILE_PREFIX: &str = "TASK-";

/// File-name prefix (compared upper-cased) of the bootstrap document.
pub const BOOTSTRAP_PREFIX: &str = "TASK-00-READBEFORE";

/// Convenience wrapper for locating the workflow artifacts under a root.
#[derive(Debug, Clone)]
pub struct StateLayout {
    root: PathBuf,
}

impl StateLayout {
    /// Create a new path helper rooted at the workspace root.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Return the workspace root used for path derivation.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the `.ai/` directory that holds every artifact.
    pub fn ai_dir(&self) -> PathBuf {
        self.root.join(".ai")
    }

    /// Return the `.ai/PROGRESS.md` path.
    pub fn progress_path(&self) -> PathBuf {
        self.ai_dir().join("PROGRESS.md")
    }

    /// Return the `.ai/tasks/` directory path.
    pub fn tasks_dir(&self) -> PathBuf {
        self.ai_dir().join("tasks")
    }

    /// Return the `.ai/features/` directory path.
    pub fn features_dir(&self) -> PathBuf {
        self.ai_dir().join("features")
    }

    /// Return the `.ai/runtime/` directory path.
    pub fn runtime_dir(&self) -> PathBuf {
        self.ai_dir().join("runtime")
    }

    /// Return the single-line active plan identifier path.
    pub fn active_plan_path(&self) -> PathBuf {
        self.runtime_dir().join("rw-active-plan-id.txt")
    }

    /// Return the `.ai/plans/<plan_id>/task-graph.yaml` path.
    pub fn task_graph_path(&self, plan_id: &str) -> PathBuf {
        self.ai_dir()
            .join("plans")
            .join(plan_id)
            .join("task-graph.yaml")
    }

    /// Return the strike/security counters path.
    pub fn counters_path(&self) -> PathBuf {
        self.runtime_dir().join("rw-strike-state.yaml")
    }

    /// Render a path relative to the root for messages.
    pub fn rel(&self, path: &Path) -> String {
        display_path(path, Some(&self.root))
    }
}

/// Whether a file name is a `TASK-*.md` document.
pub fn is_task_file_name(file_name: &str) -> bool {
    file_name.starts_with(TASK_FILE_PREFIX) && file_name.ends_with(".md")
}

/// Whether a file name marks the bootstrap document rather than a task record.
pub fn is_bootstrap_name(file_name: &str) -> bool {
    file_name.to_ascii_uppercase().starts_with(BOOTSTRAP_PREFIX)
}
