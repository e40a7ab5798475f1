//! Shared test infrastructure for integration tests.

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Temporary workflow workspace that can run the `state-sync` binary.
pub struct Workspace {
    pub dir: TempDir,
}

/// Captured output from one binary invocation.
#[derive(Debug)]
pub struct RunOutput {
    pub stdout: String,
    pub code: i32,
}

impl RunOutput {
    #[allow(dead_code)]
    pub fn lines(&self) -> Vec<&str> {
        self.stdout.lines().collect()
    }

    #[allow(dead_code)]
    pub fn lines_with_prefix(&self, prefix: &str) -> Vec<&str> {
        self.stdout
            .lines()
            .filter(|line| line.starts_with(prefix))
            .collect()
    }
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp workspace");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file relative to the workspace root, creating parents.
    pub fn write(&self, rel: &str, content: &str) -> &Self {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create fixture parent");
        }
        fs::write(&path, content).expect("write fixture file");
        self
    }

    /// Run a subcommand against this workspace with `--root`.
    pub fn run(&self, subcommand: &str, extra: &[&str]) -> RunOutput {
        self.run_with_env(subcommand, extra, &[])
    }

    /// Like [`Workspace::run`], with extra environment variables set.
    #[allow(dead_code)]
    pub fn run_with_env(&self, subcommand: &str, extra: &[&str], vars: &[(&str, &str)]) -> RunOutput {
        let output = Command::new(env!("CARGO_BIN_EXE_state-sync"))
            .arg(subcommand)
            .arg("--root")
            .arg(self.root())
            .args(extra)
            .env_remove("RUST_LOG")
            .envs(vars.iter().copied())
            .output()
            .expect("spawn state-sync");
        RunOutput {
            stdout: String::from_utf8(output.stdout).expect("utf-8 stdout"),
            code: output.status.code().expect("exit code"),
        }
    }
}
