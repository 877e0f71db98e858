//! Ledgerflow CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ledgerflow::cli::{Cli, Commands};
use ledgerflow::infrastructure::Config;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => ledgerflow::cli::handle_error(err.into(), cli.json),
    };

    let result = match cli.command {
        Commands::Workflow(args) => {
            ledgerflow::cli::commands::workflow::execute(args, cli.json, &config).await
        }
        Commands::Run(args) => ledgerflow::cli::commands::run::execute(args, cli.json, &config).await,
    };

    if let Err(err) = result {
        ledgerflow::cli::handle_error(err, cli.json);
    }
}
