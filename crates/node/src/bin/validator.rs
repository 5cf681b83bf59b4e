//! Validator node binary.

use clap::Parser;
use palisade_bft::BftConfig;
use palisade_node::{GenesisState, InMemoryLedger, InProcessHub, NodeConfig, NodeState, Runner};
use palisade_sync::SyncConfig;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "validator", about = "Palisade validator node")]
struct Args {
    /// Path to the node configuration file.
    #[arg(long, default_value = "config/node.json")]
    config: PathBuf,

    /// Start the pacemaker in manual mode (overrides the config).
    #[arg(long)]
    manual: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    // Fatal configuration errors abort here, before the event loop starts.
    let config = NodeConfig::load(&args.config)?;
    let genesis = GenesisState::load(&config.genesis)?;
    let validator_set = genesis.validator_set()?;
    let keypair = config.keypair()?;
    let manual = args.manual || config.manual_pacemaker;

    if !validator_set.contains(&keypair.address()) {
        info!(
            address = %keypair.address(),
            "Key is not in the genesis validator set; running as an observer"
        );
    }

    let bft_config = BftConfig {
        base_view_timeout: Duration::from_millis(config.base_view_timeout_ms),
        ..BftConfig::default()
    };

    let ledger = Arc::new(InMemoryLedger::new(validator_set));
    let state = NodeState::new(
        keypair.clone(),
        ledger,
        bft_config,
        SyncConfig::default(),
        Duration::from_millis(config.dkg_deadline_ms),
        manual,
    );

    let hub = InProcessHub::new();
    let inbound = hub.register(keypair.address());
    let transport = Arc::new(hub.endpoint(keypair.address()));

    let (runner, handle) = Runner::new(state, transport, 10_000);
    Runner::spawn_inbound(inbound, runner.event_sender());

    info!(address = %keypair.address(), manual, "Validator configured");

    let node = tokio::spawn(runner.run());

    tokio::signal::ctrl_c().await?;
    handle.shutdown();
    node.await??;
    Ok(())
}
