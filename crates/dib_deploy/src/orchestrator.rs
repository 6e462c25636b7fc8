use alloy::primitives::Address;
use anyhow::{Context, Result, bail};
use dib_chain::{ChainClient, Deployment, TokenAdminTarget, Upgradeable, tolerate_existing};
use dib_core::{DibConfig, NetworkRegistry, ResolvedToken};
use dib_store::{AddressStore, ContractRole, DeployedContractSet, TokenRecord};
use tracing::{info, warn};

use crate::ensure_chain_id;
use crate::report::PassReport;

/// A token that could not be processed. The pipeline carried on without it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFailure {
    pub symbol: String,
    pub error: String,
}

/// What one pipeline run did.
#[derive(Debug, Clone, Default)]
pub struct DeploymentReport {
    pub network: String,
    pub chain_id: u64,
    pub deployed: Vec<(ContractRole, Address)>,
    pub reused: Vec<(ContractRole, Address)>,
    pub tokens: Vec<TokenRecord>,
    pub token_failures: Vec<TokenFailure>,
}

/// Runs the per-network contract pipeline.
///
/// Every address is persisted as soon as its deployment is confirmed, so a
/// failed run leaves the store in a state a later run resumes from.
pub struct Orchestrator<'a> {
    registry: &'a NetworkRegistry,
    store: &'a AddressStore,
    config: &'a DibConfig,
    chain: &'a dyn ChainClient,
}

impl<'a> Orchestrator<'a> {
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

    /// Deploy and wire the full contract set on `network`, then process its
    /// tokens.
    ///
    /// With `fresh`, roles already in the store are redeployed instead of
    /// reused.
    pub async fn deploy_network(&self, network: &str, fresh: bool) -> Result<DeploymentReport> {
        let descriptor = self.registry.require_enabled(network)?;
        let tokens = self.registry.resolve_tokens_for_network(network)?;
        ensure_chain_id(self.chain, descriptor).await?;

        let existing = self
            .store
            .load(network)
            .with_context(|| format!("reading address file for {network}"))?
            .unwrap_or_default();

        let mut report = DeploymentReport {
            network: network.to_string(),
            chain_id: descriptor.chain_id,
            ..DeploymentReport::default()
        };
        info!(network, chain_id = descriptor.chain_id, fresh, "starting deployment");

        let template = match self.reusable(&existing, ContractRole::TokenTemplate, fresh, &mut report) {
            Some(address) => address,
            None => {
                let address = self
                    .chain
                    .deploy(&Deployment::TokenTemplate)
                    .await
                    .context("deploying token template")?;
                self.persist(network, ContractRole::TokenTemplate, address, &mut report)?;
                address
            }
        };

        let token_registry =
            match self.reusable(&existing, ContractRole::TokenRegistry, fresh, &mut report) {
                Some(address) => address,
                None => {
                    let deployment = Deployment::TokenRegistry {
                        template,
                        owner: self.config.deployer,
                    };
                    let address = self
                        .chain
                        .deploy(&deployment)
                        .await
                        .context("deploying token registry")?;
                    self.persist(network, ContractRole::TokenRegistry, address, &mut report)?;
                    address
                }
            };

        let gateway = match self.reusable(&existing, ContractRole::DiGateway, fresh, &mut report) {
            Some(address) => address,
            None => {
                let deployment = Deployment::Gateway {
                    registry: token_registry,
                    owner: self.config.deployer,
                    fee_in_bps: self.config.fee_in_bps,
                    fee_receiver: self.config.deployer,
                };
                let address = self
                    .chain
                    .deploy(&deployment)
                    .await
                    .context("deploying gateway")?;
                self.persist(network, ContractRole::DiGateway, address, &mut report)?;
                address
            }
        };

        let linked = self
            .chain
            .registry_gateway(token_registry)
            .await
            .context("reading registry gateway")?;
        if linked != gateway {
            self.chain
                .set_registry_gateway(token_registry, gateway)
                .await
                .context("linking registry to gateway")?;
            info!(network, %token_registry, %gateway, "registry linked to gateway");
        }

        let meta_tx_gateway = self
            .ensure_upgradeable(network, &existing, ContractRole::MetaTxGateway, fresh, &mut report)
            .await?;
        let vault = self
            .ensure_upgradeable(network, &existing, ContractRole::GasCreditVault, fresh, &mut report)
            .await?;

        self.grant_relayer(gateway, meta_tx_gateway, vault).await?;

        if self.registry.is_bridge_hub_network(network) {
            let hub = match self.reusable(&existing, ContractRole::BridgeHub, fresh, &mut report) {
                Some(address) => address,
                None => {
                    let address = self
                        .chain
                        .deploy(&Deployment::BridgeHub)
                        .await
                        .context("deploying bridge hub")?;
                    self.persist(network, ContractRole::BridgeHub, address, &mut report)?;
                    address
                }
            };
            self.chain
                .hub_set_gas_credit_vault(hub, vault)
                .await
                .context("setting hub gas credit vault")?;
        }

        let target = TokenAdminTarget {
            registry: token_registry,
            gateway,
        };
        for token in &tokens {
            match self
                .process_token(network, descriptor.chain_id, target, vault, token)
                .await
            {
                Ok(record) => report.tokens.push(record),
                Err(err) => {
                    let error = format!("{err:#}");
                    warn!(network, symbol = %token.symbol, %error, "token failed, continuing");
                    report.token_failures.push(TokenFailure {
                        symbol: token.symbol.clone(),
                        error,
                    });
                }
            }
        }

        info!(
            network,
            deployed = report.deployed.len(),
            reused = report.reused.len(),
            tokens = report.tokens.len(),
            token_failures = report.token_failures.len(),
            "deployment finished"
        );
        Ok(report)
    }

    /// Add every other enabled network that has a gateway on file as a
    /// destination of this network's gateway.
    pub async fn link_destinations(&self, network: &str) -> Result<PassReport> {
        let descriptor = self.registry.require_enabled(network)?;
        ensure_chain_id(self.chain, descriptor).await?;
        let gateway = self
            .store
            .get_contract_address(network, ContractRole::DiGateway)?;

        let mut report = PassReport::default();
        for other in self.registry.enabled_networks() {
            if other == network {
                continue;
            }
            let Some(destination) = self.registry.network(other) else {
                continue;
            };
            let item = format!("addChain {other} ({})", destination.chain_id);

            match self.store.find_contract_address(other, ContractRole::DiGateway) {
                Ok(Some(_)) => {}
                Ok(None) => {
                    info!(network, destination = other, "no gateway on file, skipping");
                    report.skip();
                    continue;
                }
                Err(err) => {
                    report.fail(&item, &err);
                    continue;
                }
            }

            match self
                .chain
                .gateway_supports_chain(gateway, destination.chain_id)
                .await
            {
                Ok(true) => report.already_present(),
                Ok(false) => {
                    let result = self
                        .chain
                        .add_gateway_chain(gateway, destination.chain_id)
                        .await;
                    report.record(&item, result);
                }
                Err(err) => report.fail(&item, &err),
            }
        }
        info!(network, %report, "destination linking finished");
        Ok(report)
    }

    fn reusable(
        &self,
        existing: &DeployedContractSet,
        role: ContractRole,
        fresh: bool,
        report: &mut DeploymentReport,
    ) -> Option<Address> {
        let previous = existing.get(role)?;
        if fresh {
            warn!(network = %report.network, %role, %previous, "redeploying; previous address will be replaced");
            return None;
        }
        info!(network = %report.network, %role, address = %previous, "reusing deployed contract");
        report.reused.push((role, previous));
        Some(previous)
    }

    fn persist(
        &self,
        network: &str,
        role: ContractRole,
        address: Address,
        report: &mut DeploymentReport,
    ) -> Result<()> {
        self.store
            .put_contract_address(network, role, address)
            .with_context(|| format!("persisting {role} for {network}"))?;
        report.deployed.push((role, address));
        Ok(())
    }

    async fn ensure_upgradeable(
        &self,
        network: &str,
        existing: &DeployedContractSet,
        role: ContractRole,
        fresh: bool,
        report: &mut DeploymentReport,
    ) -> Result<Address> {
        if let Some(address) = self.reusable(existing, role, fresh, report) {
            return Ok(address);
        }
        let kind = match role {
            ContractRole::MetaTxGateway => Upgradeable::MetaTxGateway,
            ContractRole::GasCreditVault => Upgradeable::GasCreditVault,
            other => bail!("{other} is not an upgradeable role"),
        };
        let implementation_role = role
            .implementation()
            .with_context(|| format!("{role} has no implementation role"))?;

        // A run that failed at the proxy left a confirmed implementation behind.
        let implementation = match self.reusable(existing, implementation_role, fresh, report) {
            Some(address) => address,
            None => {
                let address = self
                    .chain
                    .deploy_implementation(kind)
                    .await
                    .with_context(|| format!("deploying {implementation_role}"))?;
                self.persist(network, implementation_role, address, report)?;
                address
            }
        };

        let proxy = self
            .chain
            .deploy_proxy(kind, implementation)
            .await
            .with_context(|| format!("deploying {role} proxy"))?;
        self.persist(network, role, proxy, report)?;
        Ok(proxy)
    }

    async fn grant_relayer(
        &self,
        gateway: Address,
        meta_tx_gateway: Address,
        vault: Address,
    ) -> Result<()> {
        let relayer = self.config.relayer;

        if !tolerate_existing(self.chain.add_gateway_relayer(gateway, relayer).await)
            .context("adding gateway relayer")?
        {
            info!(%relayer, "relayer already on gateway");
        }

        self.chain
            .authorize_meta_tx_relayer(meta_tx_gateway, relayer)
            .await
            .context("authorizing meta-tx relayer")?;

        let whitelisted = self
            .chain
            .is_relayer_whitelisted(vault, relayer)
            .await
            .context("reading vault relayer whitelist")?;
        if whitelisted {
            info!(%relayer, "relayer already whitelisted on vault");
        } else {
            tolerate_existing(self.chain.add_whitelisted_relayer(vault, relayer).await)
                .context("whitelisting vault relayer")?;
        }
        Ok(())
    }

    /// Create or adopt one token, whitelist it in the vault and record it.
    async fn process_token(
        &self,
        network: &str,
        chain_id: u64,
        target: TokenAdminTarget,
        vault: Address,
        token: &ResolvedToken,
    ) -> Result<TokenRecord> {
        let price_feed = self.config.price_feed(&token.symbol);

        let (address, is_deployed, origin_chain_id) = match token.address {
            Some(address) => {
                let added = tolerate_existing(
                    self.chain
                        .adopt_token(target, token, address, price_feed)
                        .await,
                )
                .with_context(|| format!("adopting {}", token.symbol))?;
                if !added {
                    info!(network, symbol = %token.symbol, "token already registered");
                }
                (address, false, Some(chain_id))
            }
            None => {
                let existing = self
                    .chain
                    .registry_token(target.registry, chain_id, &token.origin_symbol)
                    .await
                    .with_context(|| format!("looking up {}", token.symbol))?;
                let address = if existing.is_zero() {
                    tolerate_existing(
                        self.chain
                            .deploy_bridged_token(target, token, chain_id)
                            .await,
                    )
                    .with_context(|| format!("deploying bridged {}", token.symbol))?;
                    self.chain
                        .registry_token(target.registry, chain_id, &token.origin_symbol)
                        .await
                        .with_context(|| format!("looking up {}", token.symbol))?
                } else {
                    info!(network, symbol = %token.symbol, address = %existing, "bridged token already deployed");
                    existing
                };
                if address.is_zero() {
                    bail!("registry has no address for {} after deployment", token.symbol);
                }
                (address, true, None)
            }
        };

        let whitelisted = self
            .chain
            .is_token_whitelisted(vault, address)
            .await
            .with_context(|| format!("reading whitelist for {}", token.symbol))?;
        if !whitelisted {
            tolerate_existing(
                self.chain
                    .whitelist_token(vault, address, price_feed, token.is_stablecoin)
                    .await,
            )
            .with_context(|| format!("whitelisting {}", token.symbol))?;
        }

        let record = TokenRecord {
            symbol: token.symbol.clone(),
            name: token.name.clone(),
            decimals: token.decimals,
            address,
            is_deployed,
            origin_symbol: token.origin_symbol.clone(),
            origin_chain_id,
        };
        self.store
            .upsert_token_record(network, record.clone())
            .with_context(|| format!("recording {}", token.symbol))?;
        info!(network, symbol = %record.symbol, address = %record.address, is_deployed, "token recorded");
        Ok(record)
    }
}
