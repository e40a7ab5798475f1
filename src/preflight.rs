//! Environment preflight check.
//!
//! Scans task and feature documents for declared environment variables and
//! commands, then checks each one against the current process. Output mirrors the state-sync report:
//!
//! ```text
//! ENV_PREFLIGHT=FAIL
//! ENV_PREFLIGHT_FINDING MISSING_ENV GITHUB_TOKEN
//! ENV_PREFLIGHT_FINDING MISSING_COMMAND jq
//! ```
use crate::cli::EnvPreflightArgs;
use crate::layout::{is_task_file_name, StateLayout};
use crate::util::read_text;
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

mod extract;

pub use extract::{extract_requirements, Requirements};

pub const EXIT_PASS: i32 = 0;
pub const EXIT_FAIL: i32 = 1;

/// Shell keywords and builtins that never need to resolve on `PATH`.
const SHELL_BUILTINS: &[&str] = &[
    "cd", "echo", "set", "export", "if", "then", "fi", "for", "do", "done", "while", "case",
    "esac",
];

/// Script extensions that always resolve relative to the workspace root.
const SCRIPT_EXTENSIONS: &[&str] = &[".ps1", ".sh", ".cmd", ".bat", ".py"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RequirementKind {
    Env,
    Command,
}

impl RequirementKind {
    fn label(self) -> &'static str {
        match self {
            RequirementKind::Env => "MISSING_ENV",
            RequirementKind::Command => "MISSING_COMMAND",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightReport {
    pub requirements: Requirements,
    /// Unsatisfied requirements, variables first, each group sorted.
    pub missing: Vec<(RequirementKind, String)>,
}

impl PreflightReport {
    pub fn passed(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn exit_code(&self) -> i32 {
        if self.passed() {
            EXIT_PASS
        } else {
            EXIT_FAIL
        }
    }
}

/// Run the env-preflight step and print the report.
pub fn run_env_preflight(args: &EnvPreflightArgs) -> Result<i32> {
    let layout = StateLayout::new(args.root.clone());
    let requirements = discover_requirements(&layout)?;
    tracing::debug!(
        env_vars = requirements.env_vars.len(),
        commands = requirements.commands.len(),
        "discovered preflight requirements"
    );
    let report = evaluate(&requirements, layout.root(), process_var);
    print!("{}", render_text(&report));
    Ok(report.exit_code())
}

/// Collect requirements from `TASK-*.md` and feature documents.
pub fn discover_requirements(layout: &StateLayout) -> Result<Requirements> {
    let mut requirements = Requirements::default();
    for (dir, task_files_only) in [(layout.tasks_dir(), true), (layout.features_dir(), false)] {
        for path in markdown_files(&dir, task_files_only)? {
            let text = match read_text(&path) {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(
                        path = %layout.rel(&path),
                        error = %err,
                        "skipping unreadable document"
                    );
                    continue;
                }
            };
            extract_requirements(&text, &mut requirements);
        }
    }
    Ok(requirements)
}

/// Markdown files in `dir`, restricted to `TASK-*.md` when `task_files_only`.
fn markdown_files(dir: &Path, task_files_only: bool) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let path = entry
            .with_context(|| format!("read entry in {}", dir.display()))?
            .path();
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let wanted = if task_files_only {
            is_task_file_name(file_name)
        } else {
            file_name.ends_with(".md")
        };
        if wanted && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Check requirements against an environment lookup and the search path.
pub fn evaluate<F>(requirements: &Requirements, root: &Path, lookup_var: F) -> PreflightReport
where
    F: Fn(&str) -> Option<OsString>,
{
    let mut missing = Vec::new();
    for name in &requirements.env_vars {
        let present =
            lookup_var(name).is_some_and(|value| !value.to_string_lossy().trim().is_empty());
        if !present {
            missing.push((RequirementKind::Env, name.clone()));
        }
    }
    for command in &requirements.commands {
        if !command_available(root, command) {
            missing.push((RequirementKind::Command, command.clone()));
        }
    }
    PreflightReport {
        requirements: requirements.clone(),
        missing,
    }
}

fn process_var(name: &str) -> Option<OsString> {
    std::env::var_os(name)
}

fn command_available(root: &Path, command: &str) -> bool {
    if SHELL_BUILTINS.contains(&command) {
        return true;
    }
    let lower = command.to_ascii_lowercase();
    let is_script = SCRIPT_EXTENSIONS.iter().any(|ext| lower.ends_with(ext));
    if is_script || command.contains('/') || command.starts_with(".\\") {
        return root.join(command).exists();
    }
    which::which(command).is_ok()
}

pub fn render_text(report: &PreflightReport) -> String {
    let mut out = String::new();
    if report.passed() {
        out.push_str("ENV_PREFLIGHT=PASS\n");
        let required = &report.requirements;
        if !required.env_vars.is_empty() {
            out.push_str(&format!(
                "ENV_PREFLIGHT_REQUIRED_ENVS={}\n",
                join_sorted(&required.env_vars)
            ));
        }
        if !required.commands.is_empty() {
            out.push_str(&format!(
                "ENV_PREFLIGHT_REQUIRED_COMMANDS={}\n",
                join_sorted(&required.commands)
            ));
        }
    } else {
        out.push_str("ENV_PREFLIGHT=FAIL\n");
        for (kind, name) in &report.missing {
            out.push_str(&format!("ENV_PREFLIGHT_FINDING {} {name}\n", kind.label()));
        }
    }
    out
}

fn join_sorted(names: &BTreeSet<String>) -> String {
    names.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}
