//! CLI argument parsing for the state-sync checks.
//!
//! Each subcommand resolves a workspace root and
//! hands it to a check that owns all file access and reporting.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint for the workflow state checks.
#[derive(Parser, Debug)]
#[command(
    name = "state-sync",
    version,
    about = "Detect status drift across task-execution workflow artifacts",
    after_help = "Commands:\n  state-sync --root <dir>      Reconcile .ai/ progress, tasks, task graph, and counters\n  env-preflight --root <dir>   Check declared environment variables and commands\n\nExit codes (state-sync):\n  0  all sources consistent\n  2  reconciliation findings present\n  3  required artifacts missing or invalid\n\nExamples:\n  state-sync state-sync --root /work/project\n  state-sync state-sync --root /work/project --json\n  state-sync env-preflight --root /work/project",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level check commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    StateSync(StateSyncArgs),
    EnvPreflight(EnvPreflightArgs),
}

/// State-sync command inputs for a single workspace root.
#[derive(Parser, Debug)]
#[command(about = "Reconcile task status across progress, documents, graph, and counters")]
pub struct StateSyncArgs {
    /// Workspace root containing the .ai/ workflow directory
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,

    /// Emit debug logging on stderr
    #[arg(long)]
    pub verbose: bool,
}

/// Env-preflight command inputs.
#[derive(Parser, Debug)]
#[command(about = "Check environment variables and commands declared by task documents")]
pub struct EnvPreflightArgs {
    /// Workspace root containing .ai/tasks/ and .ai/features/
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Emit debug logging on stderr
    #[arg(long)]
    pub verbose: bool,
}

impl Command {
    pub fn verbose(&self) -> bool {
        match self {
            Command::StateSync(args) => args.verbose,
            Command::EnvPreflight(args) => args.verbose,
        }
    }
}
