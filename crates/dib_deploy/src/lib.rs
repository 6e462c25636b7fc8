//! Deployment pipeline, hub reconciliation and read-only inspection.

pub mod inspect;
pub mod orchestrator;
pub mod reconciler;
pub mod report;

pub use inspect::{
    GasLimitReading, GatewayReport, NetworkSummary, gas_limits, hub_chains, registry_tokens,
    summarize_store, verify_gateway,
};
pub use orchestrator::{DeploymentReport, Orchestrator, TokenFailure};
pub use reconciler::{ReconcileReport, Reconciler};
pub use report::PassReport;

use dib_chain::ChainClient;
use dib_core::{ChainDescriptor, ConfigError};

/// Refuse to touch anything when the RPC points at a different chain.
pub(crate) async fn ensure_chain_id(
    chain: &dyn ChainClient,
    network: &ChainDescriptor,
) -> anyhow::Result<()> {
    let actual = chain.chain_id().await?;
    if actual != network.chain_id {
        return Err(ConfigError::ChainMismatch {
            network: network.key.clone(),
            expected: network.chain_id,
            actual,
        }
        .into());
    }
    Ok(())
}
