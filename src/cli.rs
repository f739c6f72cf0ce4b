//! Command-line interface for exprkit.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "exprkit")]
#[command(about = "Inline and negate predicate expression trees", long_about = None)]
pub struct Cli {
    /// Log filter, e.g. `debug` or `exprkit_rewrite=trace` (overrides EXPRKIT_LOG)
    #[arg(long, global = true)]
    pub log: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the predicate with every expandable call inlined
    Expand { file: PathBuf },
    /// Print the inverse of the expanded predicate
    Negate { file: PathBuf },
    /// Report diagnostics without printing the result
    Check { file: PathBuf },
    /// Evaluate the expanded predicate on a JSON argument
    Eval {
        file: PathBuf,
        /// Argument value, e.g. '{"object": "Person", "fields": {"age": 20}}'
        #[arg(long)]
        arg: String,
    },
}

impl Command {
    pub fn file(&self) -> &PathBuf {
        match self {
            Command::Expand { file }
            | Command::Negate { file }
            | Command::Check { file }
            | Command::Eval { file, .. } => file,
        }
    }
}
