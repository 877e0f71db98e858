//! Command-line interface for the Ledgerflow workflow engine.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "ledgerflow", version, about = "Accounting workflow engine")]
pub struct Cli {
    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to a configuration file (defaults to ledgerflow.yaml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage workflow definitions
    Workflow(commands::workflow::WorkflowArgs),
    /// Preview or execute a workflow
    Run(commands::run::RunArgs),
}

/// Print an error in the requested format and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        println!("{}", serde_json::json!({ "error": format!("{err:#}") }));
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
