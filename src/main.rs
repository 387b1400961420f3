use clap::Parser;
use miette::{IntoDiagnostic, Result};
use payledger::application::config::LedgerConfig;
use payledger::application::engine::LedgerEngine;
use payledger::domain::ports::LedgerStoreRef;
use payledger::infrastructure::clock::SystemClock;
use payledger::infrastructure::in_memory::InMemoryLedgerStore;
use payledger::interfaces::csv::command_reader::CommandReader;
use payledger::interfaces::csv::request_writer::RequestWriter;
use payledger::interfaces::csv::runner::BatchRunner;
use payledger::telemetry;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input ledger commands CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Attempts per commit before a conflict is reported
    #[arg(long, default_value_t = LedgerConfig::DEFAULT_MAX_COMMIT_ATTEMPTS)]
    max_commit_attempts: usize,

    /// Per-commit timeout in milliseconds
    #[arg(long, default_value_t = 5_000)]
    commit_timeout_ms: u64,
}

fn open_store(db_path: Option<PathBuf>) -> Result<LedgerStoreRef> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = payledger::infrastructure::rocksdb::RocksDbLedgerStore::open(path)
                .into_diagnostic()?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            tracing::warn!(
                "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Arc::new(InMemoryLedgerStore::new()))
        }
        None => Ok(Arc::new(InMemoryLedgerStore::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();
    let cli = Cli::parse();

    let config = LedgerConfig::default()
        .with_max_commit_attempts(cli.max_commit_attempts)
        .with_commit_timeout(Duration::from_millis(cli.commit_timeout_ms));
    let store = open_store(cli.db_path)?;
    let engine = LedgerEngine::new(store, Arc::new(SystemClock), config);
    let mut runner = BatchRunner::new(engine);

    let file = File::open(cli.input).into_diagnostic()?;
    for command in CommandReader::new(file).commands() {
        match command {
            Ok(command) => {
                if let Err(e) = runner.apply(command).await {
                    error!("Error processing command: {}", e);
                }
            }
            Err(e) => {
                error!("Error reading command: {}", e);
            }
        }
    }

    let rows = runner.rows().await.into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = RequestWriter::new(stdout.lock());
    writer.write_rows(rows).into_diagnostic()?;

    Ok(())
}
