//! MAR CLI entry point.

use clap::Parser;
use color_eyre::eyre::Result;
use miette::Diagnostic;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use mar::cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(EnvFilter::from_default_env().add_directive(cli.log_directive().parse()?))
        .init();

    if let Err(e) = cli.execute().await {
        tracing::error!("{e}");
        if let Some(help) = e.help() {
            tracing::info!("{help}");
        }
        tracing::error!("Aborting...");
        let code = e.exit_code().filter(|c| (1..=255).contains(c)).unwrap_or(1);
        std::process::exit(code);
    }

    Ok(())
}
