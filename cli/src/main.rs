//! carbonsync: mirrors token and report-NFT transfers into the platform ledger.
//!
//! Usage:
//! ```bash
//! RPC_HTTP_URL=http://localhost:8545 \
//! DATABASE_URL=postgresql://localhost/carbon \
//! TOKEN_CONTRACT_ADDRESS=0x... NFT_CONTRACT_ADDRESS=0x... \
//! carbonsync
//! ```
//!
//! The daemon catches up from its checkpoint, then follows the chain one
//! block at a time until SIGINT. A fatal error exits with a non-zero status
//! and the checkpoint at the last fully applied height.

mod config;
mod crypto;
mod logging;

use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use carbonsync_evm::{JsonRpcNode, RetryingNode, SyncStores, Synchronizer};
use carbonsync_rpc::{HttpTransport, RetryConfig, RetryPolicy};
use carbonsync_storage::{PostgresOptions, PostgresStorage};

use config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    if let Some(arg) = env::args().nth(1) {
        match arg.as_str() {
            "help" | "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            "version" | "--version" | "-V" => {
                println!("carbonsync {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            other => {
                print_usage();
                anyhow::bail!("unknown argument: {other}");
            }
        }
    }

    let config = AppConfig::from_env().context("loading configuration")?;
    logging::init_tracing(&config.log);

    if let Err(e) = run(config).await {
        error!(error = %format!("{e:#}"), "synchronizer failed");
        return Err(e);
    }
    Ok(())
}

async fn run(config: AppConfig) -> Result<()> {
    info!(
        token = %config.sync.token_contract,
        nft = %config.sync.nft_contract,
        start_block = config.sync.start_block,
        "starting carbonsync {}",
        env!("CARGO_PKG_VERSION")
    );

    let storage = PostgresStorage::connect_with_options(
        &config.database_url,
        PostgresOptions {
            max_connections: config.db_max_connections,
            ..PostgresOptions::default()
        },
    )
    .await
    .context("connecting to postgres")?;

    let transport = HttpTransport::new(config.rpc_url.clone(), config.rpc_timeout)
        .context("building RPC transport")?;
    let policy = RetryPolicy::new(RetryConfig {
        max_attempts: config.rpc_max_attempts,
        ..RetryConfig::default()
    });
    let node = RetryingNode::new(JsonRpcNode::new(transport), policy);

    let decryptor = crypto::load_decryptor(&config.sm2_private_key_path)?;

    let mut sync = Synchronizer::new(
        config.sync,
        Arc::new(node),
        SyncStores::from_backend(Arc::new(storage)),
        decryptor,
    )
    .context("building synchronizer")?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("SIGINT received, stopping after the current block");
        }
        on_signal.cancel();
    });

    sync.run(cancel).await.context("synchronizer loop")?;
    Ok(())
}

fn print_usage() {
    println!("carbonsync {}", env!("CARGO_PKG_VERSION"));
    println!("Mirror token and report-NFT transfers into the platform ledger\n");
    println!("USAGE:");
    println!("    carbonsync             Run the synchronizer (configured via environment)");
    println!("    carbonsync version     Print version");
    println!("    carbonsync help        Print this help\n");
    println!("REQUIRED ENVIRONMENT:");
    println!("    RPC_HTTP_URL            JSON-RPC endpoint");
    println!("    DATABASE_URL            PostgreSQL connection string");
    println!("    TOKEN_CONTRACT_ADDRESS  Fungible token contract");
    println!("    NFT_CONTRACT_ADDRESS    Report NFT contract\n");
    println!("OPTIONAL ENVIRONMENT:");
    println!("    START_BLOCK             First block without a checkpoint   [default: 1]");
    println!("    CHAIN_CONCURRENCY       Concurrent payload reads           [default: 5]");
    println!("    POLL_INTERVAL_MS        Live-mode wait between polls       [default: 500]");
    println!("    MAX_BLOCK_RANGE         Split getLogs ranges wider than this");
    println!("    CHECKPOINT_KEY          Processed-height key               [default: carbonsync:processed_height]");
    println!("    NFT_PAYLOAD_TYPES       tokenDataMap return tuple          [default: (uint256,string)]");
    println!("    RPC_TIMEOUT_SECS        Per-request timeout                [default: 30]");
    println!("    RPC_MAX_ATTEMPTS        Attempts per RPC call              [default: 3]");
    println!("    DB_MAX_CONNECTIONS      Pool size                          [default: 10]");
    println!("    SM2_PRIVATE_KEY_PATH    Hex SM2 key file                   [default: ./cert/privateKey]");
    println!("    LOG_LEVEL / LOG_JSON    Log filter and JSON output         [default: info / false]");
}
