use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::sync::Arc;
use trimmer::{cli::Cli, config::Config, pipeline, trello::TrelloClient};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `RUST_LOG` overrides the flag-derived level
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.log_level());
    if args.verbose {
        tracing::debug!("Verbose mode is ON");
    }

    let config = Config::load(&args.config)?;
    tracing::debug!(?config, "configuration loaded");

    let client = TrelloClient::new(&config)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create async runtime")?;

    let output = args.output.clone();
    let now = chrono::Utc::now();
    let (summary, _) = runtime.block_on(pipeline::run_report(
        Arc::new(client),
        &config,
        now,
        || File::create(&output).map(BufWriter::new),
    ))?;

    if summary.skipped > 0 {
        eprintln!(
            "Warning: {} card(s) skipped, see log for details",
            summary.skipped
        );
    }

    Ok(())
}
