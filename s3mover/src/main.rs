use std::process::ExitCode;

use clap::Parser;
use s3mover::cli::{run, Cli};
use s3mover::logging::init_logging;

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    if let Err(e) = init_logging(&cli.log_level, cli.log_format) {
        eprintln!("s3mover: {e:#}");
        return ExitCode::FAILURE;
    }
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "s3mover startup: tracing initialised, environment loaded"
    );

    match run(cli).await {
        Ok(()) => {
            tracing::info!("s3mover exited cleanly");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "s3mover exited with error");
            ExitCode::FAILURE
        }
    }
}
