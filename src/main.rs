//! state-sync: detect status drift across task-execution workflow artifacts.
mod cli;
mod layout;
mod parse;
mod preflight;
mod reconcile;
mod schema;
mod sync;
mod util;

use clap::Parser;
use cli::{Command, RootArgs};
use tracing_subscriber::EnvFilter;
use util::error_chain_message;

fn main() {
    let args = RootArgs::parse();
    init_tracing(args.command.verbose());

    let code = match &args.command {
        Command::StateSync(args) => sync::run_state_sync(args).unwrap_or_else(|err| {
            tracing::error!(error = %err, "state-sync aborted");
            let outcome = sync::SyncOutcome::InvalidRoot {
                issues: vec![error_chain_message(&err)],
            };
            print!("{}", sync::render_text(&outcome));
            sync::EXIT_INVALID_ROOT
        }),
        Command::EnvPreflight(args) => preflight::run_env_preflight(args).unwrap_or_else(|err| {
            tracing::error!(error = %err, "env-preflight aborted");
            println!("ENV_PREFLIGHT=FAIL");
            eprintln!("error: {}", error_chain_message(&err));
            preflight::EXIT_FAIL
        }),
    };
    std::process::exit(code);
}

/// Logs go to stderr so stdout stays a stable, machine-readable report.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
