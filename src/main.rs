//! exprkit CLI entry point.

mod cli;

use clap::Parser;
use cli::{Cli, Command};
use exprkit::pipeline::{
    Stage, eval_diagnostics, evaluated_source, expanded_source, negated_source,
    source_diagnostics,
};
use exprkit::{EvalRequest, ExprkitDatabaseImpl};
use exprkit_core::Diagnostic;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log.as_deref());

    let db = ExprkitDatabaseImpl::default();
    let file = match db.input(cli.command.file().clone()) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.command.file().display());
            std::process::exit(1);
        }
    };

    let diagnostics = match &cli.command {
        Command::Expand { .. } => {
            if let Some(rendered) = expanded_source(&db, file) {
                println!("{}", rendered.after);
            }
            source_diagnostics(&db, file, Stage::Expand)
        }
        Command::Negate { .. } => {
            if let Some(rendered) = negated_source(&db, file) {
                println!("{}", rendered.after);
            }
            source_diagnostics(&db, file, Stage::Negate)
        }
        Command::Check { .. } => {
            let diagnostics = source_diagnostics(&db, file, Stage::Check);
            if !diagnostics.iter().any(Diagnostic::is_error) {
                println!("✓ No errors");
            }
            diagnostics
        }
        Command::Eval { arg, .. } => {
            let request = EvalRequest::new(&db, file, arg.clone());
            if let Some(value) = evaluated_source(&db, request) {
                println!("{value}");
            }
            eval_diagnostics(&db, request)
        }
    };

    for diagnostic in &diagnostics {
        eprintln!("{diagnostic}");
    }
    if diagnostics.iter().any(Diagnostic::is_error) {
        std::process::exit(1);
    }
}

fn init_tracing(filter: Option<&str>) {
    let filter = match filter {
        Some(filter) => EnvFilter::new(filter),
        None => EnvFilter::try_from_env("EXPRKIT_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
