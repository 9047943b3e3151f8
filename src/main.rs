use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use supplyledger::application::wallet::WalletLedger;
use supplyledger::config::LedgerConfig;
use supplyledger::domain::money::Money;
use supplyledger::domain::ports::WalletStoreRef;
use supplyledger::error::LedgerError;
use supplyledger::infrastructure::events::BroadcastEventSink;
use supplyledger::infrastructure::in_memory::InMemoryWalletStore;
#[cfg(feature = "storage-rocksdb")]
use supplyledger::infrastructure::rocksdb::RocksDBStore;
use supplyledger::interfaces::csv::balance_writer::{AccountSummary, BalanceWriter};
use supplyledger::interfaces::csv::command_reader::{CommandReader, WalletCommand};
use supplyledger::telemetry::setup_tracing;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input wallet commands CSV file
    input: PathBuf,

    /// JSON ledger configuration (optional)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[cfg(feature = "storage-rocksdb")]
fn open_store(cli: &Cli) -> Result<WalletStoreRef> {
    match &cli.db_path {
        Some(db_path) => {
            let store = RocksDBStore::open(db_path).into_diagnostic()?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(InMemoryWalletStore::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_store(cli: &Cli) -> Result<WalletStoreRef> {
    if cli.db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(Arc::new(InMemoryWalletStore::new()))
}

/// Logs ledger events at debug level until every publisher is dropped.
fn spawn_event_log(events: &BroadcastEventSink) -> JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => debug!(event = %json, "ledger event"),
                    Err(e) => debug!(error = %e, "ledger event not serializable"),
                },
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "event log lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Applies one command, opening the account on first sight.
async fn apply(
    ledger: &WalletLedger,
    config: &LedgerConfig,
    command: WalletCommand,
) -> supplyledger::error::Result<()> {
    let account = match ledger.get_account(&command.account).await {
        Ok(account) => account,
        Err(LedgerError::NotFound { .. }) => {
            ledger
                .open_account(
                    command.account.clone(),
                    config.default_role,
                    config.default_currency,
                )
                .await?
        }
        Err(e) => return Err(e),
    };

    let amount = Money::new(command.amount, account.currency);
    let description = format!("{} via batch import", command.r#type);
    if command.r#type.is_credit() {
        ledger
            .credit(&account.id, amount, command.r#type, description, command.reference)
            .await?;
    } else {
        ledger
            .debit(&account.id, amount, description, command.reference)
            .await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    let config = LedgerConfig::load(cli.config.as_deref()).into_diagnostic()?;
    let store = open_store(&cli)?;
    let events = Arc::new(BroadcastEventSink::new(config.event_buffer));
    let event_log = spawn_event_log(&events);
    let ledger = WalletLedger::new(store, events.clone(), &config);

    // Process commands
    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    for command in reader.commands() {
        match command {
            Ok(command) => {
                if let Err(e) = apply(&ledger, &config, command).await {
                    eprintln!("Error processing command: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading command: {}", e);
            }
        }
    }

    // Collect final state
    let mut summaries = Vec::new();
    for account in ledger.accounts().await.into_diagnostic()? {
        let transactions = ledger
            .list_transactions(&account.id)
            .await
            .into_diagnostic()?
            .len();
        summaries.push(AccountSummary::new(&account, transactions));
    }

    let stdout = io::stdout();
    let mut writer = BalanceWriter::new(stdout.lock());
    writer.write_summaries(summaries).into_diagnostic()?;

    drop(ledger);
    drop(events);
    event_log.await.into_diagnostic()?;

    Ok(())
}
