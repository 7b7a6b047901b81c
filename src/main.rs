mod cli;
mod client;
mod config;
mod error;
mod pipeline;
mod record;
mod runner;
mod store;
mod ui;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use client::CourtRecordsClient;
use config::DocketrunConfig;
use pipeline::ArtifactLayout;
use runner::Runner;
use store::RecordStore;
use ui::{LogWriter, StageProgress};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let logs = LogWriter::default();
    init_tracing(cli.verbose, logs.clone());

    match run(cli, &logs).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins over `--verbose`. Output goes to stderr, around the spinner.
fn init_tracing(verbose: bool, logs: LogWriter) {
    let default = if verbose { "docketrun=debug" } else { "docketrun=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(logs)
        .init();
}

async fn run(cli: Cli, logs: &LogWriter) -> Result<ExitCode> {
    let mut config = DocketrunConfig::load(cli.config.as_deref())?;
    if let Some(store_path) = cli.store {
        config.store_path = store_path;
    }

    let store = RecordStore::open(&config.store_path)
        .with_context(|| format!("cannot open record store {}", config.store_path.display()))?;

    let Some(stage) = cli.command.stage() else {
        let all = matches!(cli.command, cli::Command::Status { all: true });
        ui::print_status(&store, all);
        return Ok(ExitCode::SUCCESS);
    };

    let client = if config.base_url.is_empty() {
        None
    } else {
        Some(CourtRecordsClient::from_config(&config).context("failed to build HTTP client")?)
    };
    let layout = ArtifactLayout::new(&config.download_dir);
    let mut runner = Runner::new(store, client, layout);

    info!(%stage, store = %config.store_path.display(), "starting stage");
    let progress = StageProgress::start(stage, logs);
    let outcome = runner.run(stage, &progress).await;
    progress.finish();

    let outcome = outcome?;
    ui::print_outcome(&outcome);
    Ok(if outcome.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
