use std::collections::HashSet;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use dib_chain::{ChainClient, ChainRegistration, TokenContractRegistration, TokenRegistration};
use dib_core::{ConfigError, DibConfig, NetworkRegistry};
use dib_store::{AddressStore, ContractRole, NetworkTokenData};
use tracing::{info, warn};

use crate::ensure_chain_id;
use crate::report::PassReport;

/// Outcome of the three reconciliation passes.
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub chains: PassReport,
    pub tokens: PassReport,
    /// `None` when the current network is not the bridge hub.
    pub whitelist: Option<PassReport>,
}

/// Brings the hub contract in line with every network's address file.
///
/// The store is only read. Every submission is idempotent on the hub side,
/// so a failed item is fixed by running again.
pub struct Reconciler<'a> {
    registry: &'a NetworkRegistry,
    store: &'a AddressStore,
    config: &'a DibConfig,
    chain: &'a dyn ChainClient,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        registry: &'a NetworkRegistry,
        store: &'a AddressStore,
        config: &'a DibConfig,
        chain: &'a dyn ChainClient,
    ) -> Self {
        Self {
            registry,
            store,
            config,
            chain,
        }
    }

    /// Run all passes from `network`, whose `bridgeHub` role is the hub.
    pub async fn run(&self, network: &str) -> Result<ReconcileReport> {
        let hub_network = self.registry.find_bridge_hub().ok_or(ConfigError::NoBridgeHub)?;
        let descriptor = self.registry.require_enabled(network)?;
        ensure_chain_id(self.chain, descriptor).await?;
        let hub = self
            .store
            .get_contract_address(network, ContractRole::BridgeHub)
            .context("bridge hub address")?;

        let networks = self.store.list_all_networks_with_token_data();
        info!(network, %hub, networks = networks.len(), "reconciling hub");

        let chains = self.register_chains(hub, &networks).await;
        info!(pass = "chains", %chains, "pass finished");
        let tokens = self.register_tokens(hub, &networks).await;
        info!(pass = "tokens", %tokens, "pass finished");

        let whitelist = if hub_network.key == network {
            let report = self.whitelist_hub_tokens(network).await?;
            info!(pass = "whitelist", %report, "pass finished");
            Some(report)
        } else {
            info!(network, hub_network = %hub_network.key, "not the hub network, skipping whitelist pass");
            None
        };

        Ok(ReconcileReport {
            chains,
            tokens,
            whitelist,
        })
    }

    /// Submit `addChain` for every network with token data on file.
    pub async fn register_chains(&self, hub: Address, networks: &[NetworkTokenData]) -> PassReport {
        let mut report = PassReport::default();
        for entry in networks {
            let Some(descriptor) = self.registry.network(&entry.network) else {
                warn!(network = %entry.network, "address file for unknown network, skipping");
                report.skip();
                continue;
            };
            let item = format!("addChain {} ({})", descriptor.key, descriptor.chain_id);

            let lookup = |role| {
                self.store
                    .find_contract_address(&entry.network, role)
                    .map(|address| address.unwrap_or(Address::ZERO))
            };
            let addresses = lookup(ContractRole::DiGateway).and_then(|gateway| {
                Ok((
                    gateway,
                    lookup(ContractRole::GasCreditVault)?,
                    lookup(ContractRole::MetaTxGateway)?,
                ))
            });
            let (gateway, gas_credit_vault, meta_tx_gateway) = match addresses {
                Ok(addresses) => addresses,
                Err(err) => {
                    report.fail(&item, &err);
                    continue;
                }
            };

            let registration = ChainRegistration {
                chain_id: descriptor.chain_id,
                name: descriptor.name.clone(),
                rpc_key: descriptor.rpc_key.clone(),
                gateway,
                gas_credit_vault,
                meta_tx_gateway,
            };
            let result = self.chain.hub_add_chain(hub, &registration).await;
            if report.record(&item, result) {
                info!(network = %descriptor.key, chain_id = descriptor.chain_id, "chain registered on hub");
            }
        }
        report
    }

    /// Submit `addToken` once per symbol and `addTokenContract` for every
    /// network's copy of it.
    pub async fn register_tokens(&self, hub: Address, networks: &[NetworkTokenData]) -> PassReport {
        let mut report = PassReport::default();
        let mut submitted: HashSet<String> = HashSet::new();

        for entry in networks {
            let Some(descriptor) = self.registry.network(&entry.network) else {
                warn!(network = %entry.network, "token data for unknown network, skipping");
                report.skipped += entry.tokens.len();
                continue;
            };

            for token in &entry.tokens {
                if submitted.insert(token.symbol.clone()) {
                    let registration = TokenRegistration {
                        symbol: token.symbol.clone(),
                        name: token.name.clone(),
                        decimals: token.decimals,
                    };
                    let result = self.chain.hub_add_token(hub, &registration).await;
                    report.record(&format!("addToken {}", token.symbol), result);
                }

                let contract = TokenContractRegistration {
                    symbol: token.symbol.clone(),
                    chain_id: descriptor.chain_id,
                    token: token.address,
                    origin_chain_id: token.origin_chain_id.unwrap_or(0),
                    origin_symbol: token.origin_symbol.clone(),
                    is_deployed: token.is_deployed,
                };
                let result = self.chain.hub_add_token_contract(hub, &contract).await;
                report.record(
                    &format!("addTokenContract {} on {}", token.symbol, descriptor.key),
                    result,
                );
            }
        }
        report
    }

    /// Whitelist the hub network's own tokens and the relayer in its vault.
    pub async fn whitelist_hub_tokens(&self, network: &str) -> Result<PassReport> {
        let vault = self
            .store
            .get_contract_address(network, ContractRole::GasCreditVault)
            .context("gas credit vault address")?;
        let tokens = self
            .store
            .get_token_data(network)?
            .map(|data| data.tokens)
            .unwrap_or_default();

        let mut report = PassReport::default();
        for token in &tokens {
            let item = format!("whitelistToken {}", token.symbol);
            if token.address.is_zero() {
                report.skip();
                continue;
            }
            match self.chain.is_token_whitelisted(vault, token.address).await {
                Ok(true) => report.already_present(),
                Ok(false) => {
                    let is_stablecoin = self
                        .registry
                        .token(&token.origin_symbol)
                        .is_some_and(|descriptor| descriptor.is_stablecoin);
                    let price_feed = self.config.price_feed(&token.symbol);
                    let result = self
                        .chain
                        .whitelist_token(vault, token.address, price_feed, is_stablecoin)
                        .await;
                    report.record(&item, result);
                }
                Err(err) => report.fail(&item, &err),
            }
        }

        let relayer = self.config.relayer;
        let item = format!("addWhitelistedRelayer {relayer}");
        match self.chain.is_relayer_whitelisted(vault, relayer).await {
            Ok(true) => report.already_present(),
            Ok(false) => {
                let result = self.chain.add_whitelisted_relayer(vault, relayer).await;
                report.record(&item, result);
            }
            Err(err) => report.fail(&item, &err),
        }
        Ok(report)
    }
}
