// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

#![doc = include_str!("../README.md")]

use std::{path::PathBuf, sync::Arc};

use agora_core::exchange::{context::memory::InMemoryContext, Exchange};
use agora_server::{genesis::Genesis, metrics, server};
use alloy::primitives::Address;
use anyhow::Result;
use clap::Parser;
use log::{debug, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on for JSON-RPC requests.
    /// Defaults to 8080.
    #[arg(long, default_value_t = 8080, env = "AGORA_PORT")]
    port: u16,

    /// Chain ID bound into every order signature.
    /// Defaults to 1.
    #[arg(long, default_value_t = 1, env = "AGORA_CHAIN_ID")]
    chain_id: u64,

    /// Address identifying this exchange instance in the EIP-712 domain.
    #[arg(long, env = "AGORA_VERIFYING_CONTRACT")]
    verifying_contract: Address,

    /// Administrative identity, the only caller allowed to increment current nonces.
    #[arg(long, env = "AGORA_OWNER")]
    owner: Address,

    /// JSON file with the initial balances and tokens of the ledger.
    #[arg(long, env = "AGORA_GENESIS")]
    genesis: Option<PathBuf>,

    /// Maximum request body size in bytes.
    /// Defaults to 1MB.
    #[arg(long, default_value_t = 1024 * 1024, env = "AGORA_MAX_REQUEST_BODY_SIZE")]
    max_request_body_size: u32,

    /// Maximum response body size in bytes.
    /// Defaults to 100kB.
    #[arg(long, default_value_t = 100 * 1024, env = "AGORA_MAX_RESPONSE_BODY_SIZE")]
    max_response_body_size: u32,

    /// Maximum number of concurrent connections.
    /// Defaults to 32.
    #[arg(long, default_value_t = 32, env = "AGORA_MAX_CONNECTIONS")]
    max_connections: u32,

    /// Metrics server port.
    /// Defaults to 5000.
    #[arg(long, default_value_t = 5000, env = "AGORA_METRICS_PORT")]
    metrics_port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger.
    // Set the log level by setting the RUST_LOG environment variable.
    // tracing_subscriber also picks up the jsonrpsee spans (client IP, method, ...).
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    debug!("Settings: {:?}", args);

    // Start the metrics server.
    // We just let it gracelessly get killed at the end of main()
    tokio::spawn(metrics::run_server(args.metrics_port));

    let context = InMemoryContext::new(args.chain_id);
    if let Some(path) = &args.genesis {
        let genesis = Genesis::from_file(path)?;
        genesis.apply(&context)?;
        info!(
            "Loaded genesis from {}: {} currency balance(s), {} collection(s)",
            path.display(),
            genesis.currencies.len(),
            genesis.collections.len()
        );
    }

    let exchange = Arc::new(Exchange::new(
        context,
        args.verifying_contract,
        args.owner,
    ));
    info!(
        "Exchange {} on chain {} owned by {}",
        args.verifying_contract, args.chain_id, args.owner
    );

    // Start the JSON-RPC server.
    // This await is non-blocking
    let (handle, _) = server::run_server(
        args.port,
        exchange,
        args.max_request_body_size,
        args.max_response_body_size,
        args.max_connections,
    )
    .await?;
    info!("Server started. Listening on port {}.", args.port);

    let _ = handle.await;

    // If we're here, we've received a signal to exit.
    info!("Shutting down...");
    Ok(())
}
