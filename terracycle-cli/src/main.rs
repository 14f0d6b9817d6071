use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use terracycle_cli::cli::Cli;
use terracycle_cli::commands;
use terracycle_cli::logging::init_tracing;
use terracycle_cli::output::OutputWriter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = commands::load_config(cli.config.as_deref()).await;

    // An unreadable config still gets logging; the command reports the error.
    let general = loaded
        .as_ref()
        .map(|l| l.config.general.clone())
        .unwrap_or_default();
    if let Err(e) = init_tracing(&general, cli.log_level.as_deref()) {
        eprintln!("{} {e:#}", "warning:".yellow().bold());
    }
    terracycle_core::metrics::describe_all();

    let writer = OutputWriter::new(cli.output);
    match commands::execute(cli.command, cli.config.as_deref(), loaded, &writer).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}
