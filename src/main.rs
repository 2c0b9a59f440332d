//! Shelby Uploader CLI
//!
//! Uploads files to the Shelby storage network and keeps a local history
//! of what was uploaded.
//!
//! ## Commands
//!
//! - `upload <path>`: register the blob on the ledger, transfer its bytes,
//!   record it and test-read it back
//! - `list`: show upload history, optionally filtered with `--search`
//! - `delete <id>`: forget a history entry (the blob itself is untouched)
//! - `check <id|url>`: test-read a stored blob
//! - `explorer <tx>`: print the explorer link of a transaction
//!
//! ## Environment Variables
//!
//! - `SHELBY_SIGNER_URL`: wallet signer service (required by `upload`)
//! - `SHELBY_RPC_ENDPOINT`: storage RPC base (default: shelbynet)
//! - `SHELBY_OWNER`: default owner account
//! - `SHELBY_EXPLORER_URL`, `SHELBY_NETWORK`: explorer links
//! - `SHELBY_SUBMIT_TIMEOUT_SECS`, `SHELBY_TRANSFER_TIMEOUT_SECS`
//! - `DATABASE_URL`: history database (default: sqlite:./shelby_uploads.db)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shelby_uploader::config::Config;
use shelby_uploader::display::{explorer_link, format_file_size};
use shelby_uploader::history::{record_orphaned, HistoryStore, SqliteHistoryStore, UploadRecord, UploadStatus};
use shelby_uploader::retrieval::{RetrievalCheck, RetrievalProbe};
use shelby_uploader::submitter::RemoteSignerSubmitter;
use shelby_uploader::transfer::{BlobTransferClient, HttpBlobTransport};
use shelby_uploader::types::DEFAULT_EXPIRATION_DAYS;
use shelby_uploader::UploadOrchestrator;

#[derive(Parser)]
#[command(name = "shelby-uploader", version, about = "Upload blobs to the Shelby storage network")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register and upload a file
    Upload {
        path: PathBuf,
        /// Blob name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
        /// Days until the blob expires
        #[arg(long, default_value_t = DEFAULT_EXPIRATION_DAYS)]
        days: u32,
        /// Owner account (defaults to SHELBY_OWNER)
        #[arg(long)]
        owner: Option<String>,
        /// Skip the test read after upload
        #[arg(long)]
        no_check: bool,
    },
    /// List upload history
    List {
        #[arg(long)]
        search: Option<String>,
    },
    /// Remove a history entry
    Delete { id: String },
    /// Test-read a blob by history id or storage URL
    Check { target: String },
    /// Print the explorer link of a transaction
    Explorer { transaction: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "shelby_uploader=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env().context("invalid configuration")?;

    let cli = Cli::parse();

    let history = SqliteHistoryStore::connect(&config.database.url)
        .await
        .with_context(|| format!("failed to open history at {}", config.database.url))?;

    run(cli.command, &config, &history).await
}

async fn run(command: Command, config: &Config, history: &dyn HistoryStore) -> Result<()> {
    match command {
        Command::Upload { path, name, days, owner, no_check } => {
            let owner = match owner.or_else(|| config.ledger.default_owner.clone()) {
                Some(owner) => owner,
                None => bail!("no owner account: pass --owner or set SHELBY_OWNER"),
            };
            upload(config, history, path, name, days, owner, !no_check).await
        }
        Command::List { search } => {
            let records = match search {
                Some(fragment) => history.search(&fragment).await?,
                None => history.list().await?,
            };
            if records.is_empty() {
                println!("No blobs found");
            }
            for record in &records {
                print_record(config, record);
            }
            println!("{} blobs", records.len());
            Ok(())
        }
        Command::Delete { id } => {
            if history.delete(&id).await? {
                println!("Removed {}", id);
            } else {
                bail!("no history entry named {}", id);
            }
            Ok(())
        }
        Command::Check { target } => {
            let probe = RetrievalProbe::new(config.storage.transfer_timeout())?;
            let record = history.get(&target).await?;
            let url = match &record {
                Some(record) => record.url.clone(),
                None if target.starts_with("http://") || target.starts_with("https://") => target.clone(),
                None => bail!("{} is neither a history entry nor a URL", target),
            };

            let check = probe.check(&url).await;
            print_check(&check);
            if let Some(record) = record {
                history.set_test_result(&record.id, check).await?;
            }
            Ok(())
        }
        Command::Explorer { transaction } => {
            println!("{}", explorer_link(&config.ledger.explorer_url, &transaction, &config.ledger.network));
            Ok(())
        }
    }
}

async fn upload(
    config: &Config,
    history: &dyn HistoryStore,
    path: PathBuf,
    name: Option<String>,
    days: u32,
    owner: String,
    check_after: bool,
) -> Result<()> {
    let signer_url = config.ledger.signer_url()?;
    let submitter = RemoteSignerSubmitter::new(signer_url, config.ledger.submit_timeout())
        .context("failed to build signer client")?;
    let transport = HttpBlobTransport::new(config.storage.transfer_timeout())
        .context("failed to build storage client")?;
    let orchestrator = UploadOrchestrator::new(
        Arc::new(submitter),
        BlobTransferClient::new(Arc::new(transport)),
        &config.storage.rpc_endpoint,
    )
    .with_submit_timeout(config.ledger.submit_timeout());

    let blob_name = name.clone().or_else(|| {
        path.file_name().map(|n| n.to_string_lossy().into_owned())
    });

    let report = match orchestrator.upload_file(&path, name, days, owner).await {
        Ok(report) => report,
        Err(err) => {
            if let Some(blob_name) = blob_name.as_deref() {
                let size = tokio::fs::metadata(&path).await.map(|m| m.len()).unwrap_or(0);
                if let Some(record) = UploadRecord::orphaned(&err, blob_name, size, days) {
                    record_orphaned(history, &record).await?;
                    eprintln!(
                        "Registration {} has no bytes behind it; see {}",
                        record.transaction_hash,
                        explorer_link(&config.ledger.explorer_url, &record.transaction_hash, &config.ledger.network)
                    );
                }
            }
            return Err(err).context("upload failed");
        }
    };

    let mut record = UploadRecord::from_report(&report, days);
    history.save(&record).await?;

    println!("Uploaded {} ({})", report.result.blob_id, format_file_size(report.file_size));
    println!("  fingerprint: {}", report.fingerprint);
    println!("  url:         {}", report.result.storage_url);
    println!("  transaction: {}", report.result.transaction_id);
    println!(
        "  explorer:    {}",
        explorer_link(&config.ledger.explorer_url, &report.result.transaction_id, &config.ledger.network)
    );

    if check_after {
        let probe = RetrievalProbe::new(config.storage.transfer_timeout())?;
        let check = probe.check(&report.result.storage_url).await;
        print_check(&check);
        record = history.set_test_result(&record.id, check).await?;
    }

    tracing::debug!(id = %record.id, "Upload recorded");
    Ok(())
}

fn print_record(config: &Config, record: &UploadRecord) {
    let status = match (record.status, record.test_result) {
        (UploadStatus::Success, Some(check)) if check.success => "ok, readable",
        (UploadStatus::Success, _) => "ok",
        (UploadStatus::Pending, _) => "pending",
        (UploadStatus::Error, _) => "ORPHANED",
    };
    let uploaded = Utc
        .timestamp_millis_opt(record.timestamp)
        .single()
        .map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_default();

    println!(
        "{}  {}  {}  {}d  [{}]",
        record.name,
        format_file_size(record.size),
        uploaded,
        record.expiration_days,
        status
    );
    println!("    {}", record.url);
    println!(
        "    {}",
        explorer_link(&config.ledger.explorer_url, &record.transaction_hash, &config.ledger.network)
    );
}

fn print_check(check: &RetrievalCheck) {
    if check.success {
        println!("Retrieved in {}ms ({})", check.response_time_ms, format_file_size(check.size));
    } else {
        println!("Retrieval failed");
    }
}
