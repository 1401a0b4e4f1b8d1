//! # Quorum-Relay Node Runtime
//!
//! Spawns an in-process cluster, drives simulated clients through it and
//! checks that every replica derived the same execution order.

use anyhow::{Context, Result};
use relay_node::{Cluster, NodeConfig};
use relay_telemetry::{init_telemetry, TelemetryConfig};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::from_env().context("Failed to load node configuration")?;

    let _telemetry = init_telemetry(TelemetryConfig::from_env().with_node(config.node_id))
        .context("Failed to initialize telemetry")?;

    info!("===========================================");
    info!("  Quorum-Relay Node v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let cluster = Cluster::spawn(config.clone())?;
    let expected = config.expected_batches();

    let run = async {
        let proposed = cluster
            .drive_clients(config.sim_clients, config.sim_txs)
            .await?;
        info!(proposed = proposed.len(), expected_batches = expected, "Simulated clients done");
        cluster.wait_for_batches(expected).await
    };

    tokio::select! {
        result = run => {
            result.context("Cluster stopped before ordering every batch")?;
            let agreed = cluster.agreed_order().context("Replicas disagree")?;
            for (batch_seq, order) in &agreed {
                info!(batch_seq, members = order.len(), "Batch agreed by every replica");
            }
            info!(batches = agreed.len(), "All replicas derived the identical order");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for ctrl-c")?;
            warn!("Interrupted before every batch was ordered");
        }
    }

    cluster.shutdown().await;
    Ok(())
}
