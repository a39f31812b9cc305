use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use attestor_operator::{OperatorConfig, OperatorNode};

#[derive(Parser)]
#[command(name = "attestor")]
#[command(about = "Attests rollup batch commitments with a hardware-attested BLS key")]
struct Args {
    /// Operator config file (JSON)
    #[arg(long, env = "ATTESTOR_CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// Checkpoint location, overriding the config's offset file
    #[arg(long, env = "ATTESTOR_CHECKPOINT")]
    checkpoint: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,attestor=debug")),
        )
        .init();

    let args = Args::parse();

    let config = OperatorConfig::load(&args.config)?;
    info!(
        config = %args.config.display(),
        simulation = config.simulation,
        operator = %config.operator_address,
        "loaded operator config"
    );

    let node = OperatorNode::from_config(&config, args.checkpoint)?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for shutdown signal");
                return;
            }
            info!("shutdown requested");
            cancel.cancel();
        }
    });

    node.start(cancel).await?;

    info!("operator stopped");
    Ok(())
}
