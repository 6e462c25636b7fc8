//! Read-only checks over deployed contracts and the address store.

use alloy::primitives::Address;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use dib_chain::{
    ChainClient, ChainError, ChainRegistration, GatewayInfo, RegistryToken, RpcConfig,
    RpcConfigStore,
};
use dib_core::{ConfigError, NetworkRegistry};
use dib_store::{AddressStore, ContractRole};
use tracing::{debug, warn};

use crate::ensure_chain_id;

#[derive(Debug, Clone)]
pub struct GatewayReport {
    pub network: String,
    pub gateway: Address,
    pub info: GatewayInfo,
    /// What the token registry believes its gateway is.
    pub registry_gateway: Address,
    /// `(network key, chain id, supported)` for every enabled network.
    pub supported_chains: Vec<(String, u64, bool)>,
    pub gateway_code_size: usize,
    pub registry_code_size: usize,
}

impl GatewayReport {
    pub fn registry_points_back(&self) -> bool {
        self.registry_gateway == self.gateway
    }
}

/// Read back the gateway configuration of `network`.
pub async fn verify_gateway(
    registry: &NetworkRegistry,
    store: &AddressStore,
    chain: &dyn ChainClient,
    network: &str,
) -> Result<GatewayReport> {
    let descriptor = registry.describe_network(network)?;
    ensure_chain_id(chain, descriptor).await?;
    let gateway = store.get_contract_address(network, ContractRole::DiGateway)?;

    let info = chain
        .gateway_info(gateway)
        .await
        .context("reading gateway state")?;
    let registry_gateway = chain
        .registry_gateway(info.token_registry)
        .await
        .context("reading registry gateway")?;

    let mut supported_chains = Vec::new();
    for key in registry.enabled_networks() {
        let Some(other) = registry.network(key) else {
            continue;
        };
        let supported = chain
            .gateway_supports_chain(gateway, other.chain_id)
            .await
            .with_context(|| format!("probing supportedChains({})", other.chain_id))?;
        supported_chains.push((key.to_string(), other.chain_id, supported));
    }

    let gateway_code_size = chain.code_size(gateway).await?;
    let registry_code_size = chain.code_size(info.token_registry).await?;

    let report = GatewayReport {
        network: network.to_string(),
        gateway,
        info,
        registry_gateway,
        supported_chains,
        gateway_code_size,
        registry_code_size,
    };
    if !report.registry_points_back() {
        warn!(
            network,
            %gateway,
            registry_gateway = %report.registry_gateway,
            "token registry points at a different gateway"
        );
    }
    Ok(report)
}

/// The supported token list of `network`'s token registry.
pub async fn registry_tokens(
    registry: &NetworkRegistry,
    store: &AddressStore,
    chain: &dyn ChainClient,
    network: &str,
) -> Result<Vec<RegistryToken>> {
    let descriptor = registry.describe_network(network)?;
    ensure_chain_id(chain, descriptor).await?;
    let token_registry = store.get_contract_address(network, ContractRole::TokenRegistry)?;
    let tokens = chain
        .registry_tokens(token_registry)
        .await
        .context("reading supported tokens")?;
    debug!(network, count = tokens.len(), "read registry tokens");
    Ok(tokens)
}

/// Chains registered on the bridge hub. `chain` must be connected to the
/// hub network.
pub async fn hub_chains(
    registry: &NetworkRegistry,
    store: &AddressStore,
    chain: &dyn ChainClient,
) -> Result<Vec<ChainRegistration>> {
    let hub_network = registry.find_bridge_hub().ok_or(ConfigError::NoBridgeHub)?;
    ensure_chain_id(chain, hub_network).await?;
    let hub = store.get_contract_address(&hub_network.key, ContractRole::BridgeHub)?;
    let chains = chain
        .hub_chains(hub)
        .await
        .context("reading hub chain info")?;
    debug!(count = chains.len(), "read hub chains");
    Ok(chains)
}

/// One network's address file at a glance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSummary {
    pub network: String,
    pub present: Vec<ContractRole>,
    pub missing: Vec<ContractRole>,
    pub bridge_hub: Option<Address>,
    pub token_count: usize,
    pub timestamp: Option<DateTime<Utc>>,
    /// Set when the file could not be read; the other fields are then empty.
    pub error: Option<String>,
}

pub fn summarize_store(store: &AddressStore) -> Result<Vec<NetworkSummary>> {
    let mut summaries = Vec::new();
    for network in store.list_networks()? {
        let summary = match store.load(&network) {
            Ok(set) => {
                let set = set.unwrap_or_default();
                let (present, missing) = ContractRole::CORE
                    .iter()
                    .copied()
                    .partition(|role| set.get(*role).is_some());
                NetworkSummary {
                    bridge_hub: set.get(ContractRole::BridgeHub),
                    token_count: set.token_data.as_ref().map_or(0, |data| data.tokens.len()),
                    timestamp: set.token_data.as_ref().map(|data| data.timestamp),
                    network,
                    present,
                    missing,
                    error: None,
                }
            }
            Err(err) => NetworkSummary {
                network,
                present: Vec::new(),
                missing: Vec::new(),
                bridge_hub: None,
                token_count: 0,
                timestamp: None,
                error: Some(err.to_string()),
            },
        };
        summaries.push(summary);
    }
    Ok(summaries)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasLimitReading {
    pub network: String,
    pub chain_id: u64,
    pub gas_limit: Result<u64, String>,
}

/// Latest block gas limit of every enabled network with an endpoint.
///
/// `connect` builds a client for an endpoint. Failures are reported per
/// network.
pub async fn gas_limits<F>(
    registry: &NetworkRegistry,
    rpc: &RpcConfigStore,
    connect: F,
) -> Vec<GasLimitReading>
where
    F: Fn(&RpcConfig) -> Result<Box<dyn ChainClient>, ChainError>,
{
    let mut readings = Vec::new();
    for key in registry.enabled_networks() {
        let (Some(network), Some(endpoint)) = (registry.network(key), rpc.get_rpc(key)) else {
            debug!(network = key, "no RPC endpoint, skipping");
            continue;
        };
        let gas_limit = match connect(endpoint) {
            Ok(client) => client.latest_gas_limit().await.map_err(|e| e.to_string()),
            Err(err) => Err(err.to_string()),
        };
        if let Err(err) = &gas_limit {
            warn!(network = key, error = %err, "gas limit unavailable");
        }
        readings.push(GasLimitReading {
            network: key.to_string(),
            chain_id: network.chain_id,
            gas_limit,
        });
    }
    readings
}
