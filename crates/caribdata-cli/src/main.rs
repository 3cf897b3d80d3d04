mod cli;
mod error;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use caribdata_core::{Builder, Catalog, ReqwestHttpClient, RetryConfig, RetryingClient};

use crate::cli::{Cli, Command};
use crate::error::CliError;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(error) = run() {
        eprintln!("error: {error}");
        std::process::exit(error.exit_code());
    }
}

#[tokio::main(flavor = "current_thread")]
async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();

    let catalog = Catalog::load(&cli.config)?;
    let http = RetryingClient::new(
        Arc::new(ReqwestHttpClient::new()),
        RetryConfig::from_env(),
    );
    let builder = Builder::new(catalog, http);

    let mut error_count = 0;
    match cli.command {
        Command::Build => {
            error_count += report(builder.build().await?.sources);
        }
        Command::Messy => {
            error_count += report(builder.build_messy().await?.into_iter().collect());
        }
        Command::All => {
            error_count += report(builder.build().await?.sources);
            error_count += report(builder.build_messy().await?.into_iter().collect());
        }
    }

    if cli.strict && error_count > 0 {
        return Err(CliError::PartialFailure(error_count));
    }
    Ok(())
}

fn report(sources: Vec<caribdata_core::SourceSummary>) -> usize {
    let mut errors = 0;
    for source in &sources {
        tracing::info!(
            source = source.source.as_str(),
            files = source.files,
            rows = source.rows,
            errors = source.errors,
            "source finished"
        );
        errors += source.errors;
    }
    errors
}
