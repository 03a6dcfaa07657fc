//! Record publisher command line.
//!
//! ```text
//! record-publisher encode-file --content-id <hex> [--description ..] [--category ..]
//! record-publisher encode-vote --target <txid> [--down] [--comment ..]
//! record-publisher decode <script-hex>
//! record-publisher check-config <path>
//! record-publisher watch --config <path> --key <address>:<private-key>
//! ```
//!
//! `watch` runs the publisher against an in-process wallet and store,
//! reading one JSON transaction notification per stdin line.

use alloy::primitives::{hex, Bytes, FixedBytes};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use record_publisher::chain::{Address, FeeRates, LocalWallet, Txid};
use record_publisher::codec::{self, AddFileRecord, Record, VoteRecord};
use record_publisher::config::loader::load_config;
use record_publisher::config::PublisherConfig;
use record_publisher::observability::{logging, metrics};
use record_publisher::payments::ObservedTransaction;
use record_publisher::store::MemoryRecordStore;
use record_publisher::Publisher;

#[derive(Parser)]
#[command(name = "record-publisher")]
#[command(about = "Encode, decode, and publish on-chain records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a file descriptor record as script hex
    EncodeFile {
        #[arg(long)]
        content_id: Bytes,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Encode a vote record as script hex
    EncodeVote {
        #[arg(long)]
        target: Txid,
        /// Cast a down vote
        #[arg(long)]
        down: bool,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Decode script hex and print the record as JSON
    Decode { script: String },
    /// Validate a configuration file
    CheckConfig { path: PathBuf },
    /// Run the publisher on notifications read from stdin
    Watch {
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Wallet key as `<address-hash-hex>:<private-key-hex>`
        #[arg(short, long = "key")]
        keys: Vec<String>,
        /// Fee rate in satoshis per byte for every priority
        #[arg(long, default_value_t = 1)]
        fee_rate: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::EncodeFile {
            content_id,
            description,
            category,
        } => {
            let record = Record::AddFile(AddFileRecord {
                content_id,
                description,
                category,
            });
            println!("{}", hex::encode(record.serialize()?));
        }
        Commands::EncodeVote {
            target,
            down,
            comment,
        } => {
            let record = Record::Vote(VoteRecord {
                target_txid: target,
                comment,
                upvote: !down,
            });
            println!("{}", hex::encode(record.serialize()?));
        }
        Commands::Decode { script } => {
            let bytes = hex::decode(script.trim())?;
            let record = codec::parse(&bytes)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::CheckConfig { path } => {
            let config = load_config(&path)?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Watch {
            config,
            keys,
            fee_rate,
        } => {
            let config = match config {
                Some(path) => load_config(&path)?,
                None => PublisherConfig::default(),
            };
            watch(config, &keys, fee_rate).await?;
        }
    }

    Ok(())
}

async fn watch(
    config: PublisherConfig,
    keys: &[String],
    fee_rate: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging(&config.observability);
    tracing::info!("record-publisher v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let wallet = Arc::new(LocalWallet::new(FeeRates::flat(fee_rate)));
    for key in keys {
        let (address, private_key) = key
            .split_once(':')
            .ok_or("wallet key must be <address>:<private-key>")?;
        let hash: FixedBytes<20> = address.parse()?;
        wallet.insert_key_hex(Address::new(hash.0), private_key)?;
    }

    let store = Arc::new(MemoryRecordStore::new());
    let publisher = Publisher::new(&config, wallet, store.clone());
    let running = publisher.start().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<ObservedTransaction>(&line) {
                    Ok(tx) => {
                        if running.notifications.send(tx).await.is_err() {
                            tracing::warn!("Payment observer stopped, no longer reading input");
                            break;
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "Skipping malformed notification"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupt received");
                break;
            }
        }
    }

    publisher.shutdown();
    let _ = running.observer.await;
    let _ = running.sweeper.await;

    tracing::info!(
        files = store.file_count(),
        votes = store.vote_count(),
        pending = publisher.registry().len(),
        "Shutdown complete"
    );
    Ok(())
}
