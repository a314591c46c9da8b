use crate::{
    error::CliError,
    output::{RecordWriter, print_json},
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use commands::Commands;
use connectors::{
    bigquery::{BigQueryClient, BigQueryOptions},
    warehouse::Warehouse,
};
use engine_config::settings::{SourceConfig, TableSelection, params::PARAMETERS};
use engine_core::state::{PositionStore, position::PositionCodec, sled_store::SledPositionStore};
use engine_runtime::source::{SourceConnector, WarehouseSource};
use model::pagination::cursor::Cursor;
use serde::Serialize;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;
mod shutdown;
mod sync;

#[derive(Parser)]
#[command(
    name = "bqsync",
    version = "0.1.0",
    about = "Incremental BigQuery table sync"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    // Logs go to stderr; stdout carries records only.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(code) => code.into(),
        Err(e) => {
            error!(error = %e, "bqsync failed");
            ExitCode::GeneralError.into()
        }
    }
}

async fn run(command: Commands) -> Result<ExitCode, CliError> {
    match command {
        Commands::Sync { config, state } => sync_command(&config, state).await,
        Commands::Tables { config } => {
            let config = SourceConfig::from_file(&config)?;
            let tables = match &config.tables {
                TableSelection::Listed(tables) => tables.clone(),
                TableSelection::Discover => {
                    let client = connect(&config).await?;
                    let tables = client.list_tables(&config.dataset_id).await;
                    client.close().await?;
                    tables?
                }
            };
            for table in tables {
                println!("{table}");
            }
            Ok(ExitCode::Success)
        }
        Commands::Params => {
            print_json(PARAMETERS)?;
            Ok(ExitCode::Success)
        }
        Commands::Position { config, state } => {
            let config = SourceConfig::from_file(&config)?;
            let store = open_position_store(state)?;
            let source_id = config.source_id();
            let position = store.load(&source_id).await?;

            let codec = PositionCodec::new(
                config.single_table().map(str::to_string),
                config.increment_column.clone(),
            );
            let report = PositionReport {
                cursors: position
                    .as_ref()
                    .map(|p| codec.decode(p))
                    .unwrap_or_default(),
                position: position.map(|p| p.to_string()),
                source: source_id,
            };
            print_json(&report)?;
            Ok(ExitCode::Success)
        }
    }
}

#[derive(Serialize)]
struct PositionReport {
    source: String,
    position: Option<String>,
    cursors: BTreeMap<String, Cursor>,
}

async fn sync_command(config: &Path, state: Option<PathBuf>) -> Result<ExitCode, CliError> {
    let settings = sync::read_settings(config).await?;
    let store = open_position_store(state)?;

    let mut source = WarehouseSource::new();
    source.configure(&settings).await?;
    let source_id = source
        .config()
        .map(SourceConfig::source_id)
        .ok_or_else(|| CliError::Unexpected("source has no configuration".into()))?;

    let position = store.load(&source_id).await?;
    info!(source = %source_id, resumed = position.is_some(), "Starting sync");
    source.open(position).await?;

    let shutdown = ShutdownCoordinator::new(CancellationToken::new());
    shutdown.register_handlers();

    let mut writer = RecordWriter::new(std::io::stdout());
    sync::run(
        &mut source,
        &store,
        &source_id,
        &mut writer,
        &shutdown.cancel_token(),
    )
    .await?;

    if shutdown.is_shutdown_requested() {
        Ok(ExitCode::ShutdownRequested)
    } else {
        Ok(ExitCode::Success)
    }
}

async fn connect(config: &SourceConfig) -> Result<BigQueryClient, CliError> {
    let options = BigQueryOptions::new(&config.project_id).with_location(config.location.clone());
    Ok(BigQueryClient::from_service_account_file(&config.service_account, options).await?)
}

fn open_position_store(state: Option<PathBuf>) -> Result<SledPositionStore, CliError> {
    let path = match state {
        Some(path) => path,
        None => dirs::home_dir()
            .ok_or_else(|| CliError::Unexpected("Could not determine home directory".into()))?
            .join(".bqsync/state"),
    };
    Ok(SledPositionStore::open(&path)?)
}
