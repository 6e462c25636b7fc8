//! In-memory [`ChainClient`] with contract-like duplicate detection.

use std::collections::{BTreeMap, HashMap, HashSet};

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use dib_core::ResolvedToken;
use parking_lot::{Mutex, MutexGuard};

use crate::client::{
    ChainClient, ChainRegistration, Deployment, GatewayInfo, RegistryToken, TokenAdminTarget,
    TokenContractRegistration, TokenRegistration, Upgradeable,
};
use crate::error::ChainError;

const MOCK_GAS_LIMIT: u64 = 30_000_000;

/// Everything the mock chain has recorded.
#[derive(Debug, Default)]
pub struct MockState {
    next_address: u64,
    /// `(contract name, address)` in deployment order.
    pub deployments: Vec<(String, Address)>,
    pub gateways: HashMap<Address, GatewayInfo>,
    pub registry_gateway: HashMap<Address, Address>,
    /// `(registry, chain id, origin symbol)` to bridged token.
    pub bridged_tokens: HashMap<(Address, u64, String), Address>,
    /// `(registry, symbol)` to adopted token.
    pub adopted_tokens: HashMap<(Address, String), Address>,
    /// Supported token list per registry, in registration order.
    pub registry_listing: HashMap<Address, Vec<RegistryToken>>,
    pub gateway_relayers: HashSet<(Address, Address)>,
    pub gateway_chains: HashSet<(Address, u64)>,
    pub meta_tx_relayers: HashSet<(Address, Address)>,
    /// `(vault, token)` to `(price feed, is stablecoin)`.
    pub vault_tokens: HashMap<(Address, Address), (Address, bool)>,
    pub vault_relayers: HashSet<(Address, Address)>,
    pub hub_chains: BTreeMap<u64, ChainRegistration>,
    pub hub_tokens: BTreeMap<String, TokenRegistration>,
    pub hub_token_contracts: BTreeMap<(String, u64), TokenContractRegistration>,
    pub hub_vault: HashMap<Address, Address>,
    /// Every operation name, in call order.
    pub calls: Vec<String>,
}

impl MockState {
    fn allocate(&mut self, name: &str) -> Address {
        self.next_address += 1;
        let address = Address::left_padding_from(&(0xd1b0_0000 + self.next_address).to_be_bytes());
        self.deployments.push((name.to_string(), address));
        address
    }

    pub fn deployed(&self, name: &str) -> Vec<Address> {
        self.deployments
            .iter()
            .filter(|(deployed, _)| deployed == name)
            .map(|(_, address)| *address)
            .collect()
    }
}

/// Chain double for tests: deterministic addresses, duplicate registrations
/// rejected as [`ChainError::AlreadyExists`], and injectable failures.
pub struct MockChain {
    chain_id: u64,
    sender: Address,
    state: Mutex<MockState>,
    failures: Mutex<HashSet<String>>,
}

impl MockChain {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            sender: Address::repeat_byte(0x5e),
            state: Mutex::new(MockState::default()),
            failures: Mutex::new(HashSet::new()),
        }
    }

    /// Make every later call of `operation` fail with an RPC error.
    ///
    /// Operations are named after the trait method, and deployments after
    /// the contract (`deploy:DIGateway`).
    pub fn fail_on(&self, operation: &str) {
        self.failures.lock().insert(operation.to_string());
    }

    pub fn clear_failure(&self, operation: &str) {
        self.failures.lock().remove(operation);
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock()
    }

    pub fn calls_to(&self, operation: &str) -> usize {
        self.state.lock().calls.iter().filter(|c| *c == operation).count()
    }

    /// Record the call and apply failure injection.
    fn enter(&self, operation: &str) -> Result<MutexGuard<'_, MockState>, ChainError> {
        let mut state = self.state.lock();
        state.calls.push(operation.to_string());
        if self.failures.lock().contains(operation) {
            return Err(ChainError::rpc(operation, "injected failure"));
        }
        Ok(state)
    }
}

fn conflict(what: &str) -> ChainError {
    ChainError::from_rejection(what, "already exists")
}

#[async_trait]
impl ChainClient for MockChain {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        self.enter("chain_id")?;
        Ok(self.chain_id)
    }

    fn sender(&self) -> Option<Address> {
        Some(self.sender)
    }

    async fn deploy(&self, deployment: &Deployment) -> Result<Address, ChainError> {
        let name = deployment.contract_name();
        let mut state = self.enter(&format!("deploy:{name}"))?;
        let address = state.allocate(name);
        if let Deployment::Gateway {
            registry,
            owner,
            fee_in_bps,
            fee_receiver,
        } = deployment
        {
            state.gateways.insert(
                address,
                GatewayInfo {
                    owner: *owner,
                    bridge_fee: U256::from(*fee_in_bps),
                    fee_receiver: *fee_receiver,
                    token_registry: *registry,
                },
            );
        }
        Ok(address)
    }

    async fn deploy_implementation(&self, kind: Upgradeable) -> Result<Address, ChainError> {
        let name = kind.contract_name();
        let mut state = self.enter(&format!("deploy:{name}"))?;
        Ok(state.allocate(name))
    }

    async fn deploy_proxy(
        &self,
        _kind: Upgradeable,
        _implementation: Address,
    ) -> Result<Address, ChainError> {
        let name = crate::artifacts::names::PROXY;
        let mut state = self.enter(&format!("deploy:{name}"))?;
        Ok(state.allocate(name))
    }

    async fn set_registry_gateway(
        &self,
        registry: Address,
        gateway: Address,
    ) -> Result<(), ChainError> {
        let mut state = self.enter("set_registry_gateway")?;
        state.registry_gateway.insert(registry, gateway);
        Ok(())
    }

    async fn registry_gateway(&self, registry: Address) -> Result<Address, ChainError> {
        let state = self.enter("registry_gateway")?;
        Ok(state
            .registry_gateway
            .get(&registry)
            .copied()
            .unwrap_or(Address::ZERO))
    }

    async fn registry_token(
        &self,
        registry: Address,
        chain_id: u64,
        origin_symbol: &str,
    ) -> Result<Address, ChainError> {
        let state = self.enter("registry_token")?;
        Ok(state
            .bridged_tokens
            .get(&(registry, chain_id, origin_symbol.to_string()))
            .copied()
            .unwrap_or(Address::ZERO))
    }

    async fn deploy_bridged_token(
        &self,
        target: TokenAdminTarget,
        token: &ResolvedToken,
        chain_id: u64,
    ) -> Result<(), ChainError> {
        let mut state = self.enter("deploy_bridged_token")?;
        let key = (target.registry, chain_id, token.origin_symbol.clone());
        if state.bridged_tokens.contains_key(&key) {
            return Err(conflict("deployToken"));
        }
        let address = state.allocate(&token.symbol);
        state.bridged_tokens.insert(key, address);
        state
            .registry_listing
            .entry(target.registry)
            .or_default()
            .push(RegistryToken {
                token: address,
                symbol: token.symbol.clone(),
                name: token.name.clone(),
                decimals: token.decimals,
                origin_chain_id: chain_id,
                origin_symbol: token.origin_symbol.clone(),
                is_deployed: true,
            });
        Ok(())
    }

    async fn adopt_token(
        &self,
        target: TokenAdminTarget,
        token: &ResolvedToken,
        address: Address,
        _price_feed: Address,
    ) -> Result<(), ChainError> {
        let mut state = self.enter("adopt_token")?;
        let key = (target.registry, token.symbol.clone());
        if state.adopted_tokens.contains_key(&key) {
            return Err(conflict("addToken"));
        }
        state.adopted_tokens.insert(key, address);
        state
            .registry_listing
            .entry(target.registry)
            .or_default()
            .push(RegistryToken {
                token: address,
                symbol: token.symbol.clone(),
                name: token.name.clone(),
                decimals: token.decimals,
                origin_chain_id: self.chain_id,
                origin_symbol: token.origin_symbol.clone(),
                is_deployed: false,
            });
        Ok(())
    }

    async fn registry_tokens(&self, registry: Address) -> Result<Vec<RegistryToken>, ChainError> {
        let state = self.enter("registry_tokens")?;
        Ok(state
            .registry_listing
            .get(&registry)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_gateway_relayer(
        &self,
        gateway: Address,
        relayer: Address,
    ) -> Result<(), ChainError> {
        let mut state = self.enter("add_gateway_relayer")?;
        if !state.gateway_relayers.insert((gateway, relayer)) {
            return Err(conflict("addRelayer"));
        }
        Ok(())
    }

    async fn add_gateway_chain(&self, gateway: Address, chain_id: u64) -> Result<(), ChainError> {
        let mut state = self.enter("add_gateway_chain")?;
        if !state.gateway_chains.insert((gateway, chain_id)) {
            return Err(conflict("addChain"));
        }
        Ok(())
    }

    async fn gateway_supports_chain(
        &self,
        gateway: Address,
        chain_id: u64,
    ) -> Result<bool, ChainError> {
        let state = self.enter("gateway_supports_chain")?;
        Ok(state.gateway_chains.contains(&(gateway, chain_id)))
    }

    async fn gateway_info(&self, gateway: Address) -> Result<GatewayInfo, ChainError> {
        let state = self.enter("gateway_info")?;
        state
            .gateways
            .get(&gateway)
            .cloned()
            .ok_or_else(|| ChainError::from_rejection("owner", "execution reverted"))
    }

    async fn authorize_meta_tx_relayer(
        &self,
        meta_tx_gateway: Address,
        relayer: Address,
    ) -> Result<(), ChainError> {
        // Authorization is a setter: repeating it is not a conflict.
        let mut state = self.enter("authorize_meta_tx_relayer")?;
        state.meta_tx_relayers.insert((meta_tx_gateway, relayer));
        Ok(())
    }

    async fn whitelist_token(
        &self,
        vault: Address,
        token: Address,
        price_feed: Address,
        is_stablecoin: bool,
    ) -> Result<(), ChainError> {
        let mut state = self.enter("whitelist_token")?;
        if state.vault_tokens.contains_key(&(vault, token)) {
            return Err(conflict("whitelistToken"));
        }
        state
            .vault_tokens
            .insert((vault, token), (price_feed, is_stablecoin));
        Ok(())
    }

    async fn is_token_whitelisted(
        &self,
        vault: Address,
        token: Address,
    ) -> Result<bool, ChainError> {
        let state = self.enter("is_token_whitelisted")?;
        Ok(state.vault_tokens.contains_key(&(vault, token)))
    }

    async fn add_whitelisted_relayer(
        &self,
        vault: Address,
        relayer: Address,
    ) -> Result<(), ChainError> {
        let mut state = self.enter("add_whitelisted_relayer")?;
        if !state.vault_relayers.insert((vault, relayer)) {
            return Err(conflict("addWhitelistedRelayer"));
        }
        Ok(())
    }

    async fn is_relayer_whitelisted(
        &self,
        vault: Address,
        relayer: Address,
    ) -> Result<bool, ChainError> {
        let state = self.enter("is_relayer_whitelisted")?;
        Ok(state.vault_relayers.contains(&(vault, relayer)))
    }

    async fn hub_add_chain(
        &self,
        _hub: Address,
        chain: &ChainRegistration,
    ) -> Result<(), ChainError> {
        let mut state = self.enter("hub_add_chain")?;
        if state.hub_chains.contains_key(&chain.chain_id) {
            return Err(conflict("addChain"));
        }
        state.hub_chains.insert(chain.chain_id, chain.clone());
        Ok(())
    }

    async fn hub_add_token(
        &self,
        _hub: Address,
        token: &TokenRegistration,
    ) -> Result<(), ChainError> {
        let mut state = self.enter("hub_add_token")?;
        if state.hub_tokens.contains_key(&token.symbol) {
            return Err(conflict("addToken"));
        }
        state.hub_tokens.insert(token.symbol.clone(), token.clone());
        Ok(())
    }

    async fn hub_add_token_contract(
        &self,
        _hub: Address,
        entry: &TokenContractRegistration,
    ) -> Result<(), ChainError> {
        let mut state = self.enter("hub_add_token_contract")?;
        let key = (entry.symbol.clone(), entry.chain_id);
        if state.hub_token_contracts.contains_key(&key) {
            return Err(conflict("addTokenContract"));
        }
        state.hub_token_contracts.insert(key, entry.clone());
        Ok(())
    }

    async fn hub_set_gas_credit_vault(
        &self,
        hub: Address,
        vault: Address,
    ) -> Result<(), ChainError> {
        let mut state = self.enter("hub_set_gas_credit_vault")?;
        state.hub_vault.insert(hub, vault);
        Ok(())
    }

    async fn hub_chains(&self, _hub: Address) -> Result<Vec<ChainRegistration>, ChainError> {
        let state = self.enter("hub_chains")?;
        Ok(state.hub_chains.values().cloned().collect())
    }

    async fn code_size(&self, address: Address) -> Result<usize, ChainError> {
        let state = self.enter("code_size")?;
        let deployed = state.deployments.iter().any(|(_, a)| *a == address);
        Ok(if deployed { 1024 } else { 0 })
    }

    async fn latest_gas_limit(&self) -> Result<u64, ChainError> {
        self.enter("latest_gas_limit")?;
        Ok(MOCK_GAS_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_hub_chain_is_already_exists() {
        let chain = MockChain::new(999);
        let registration = ChainRegistration {
            chain_id: 4157,
            name: "CrossFi Testnet".into(),
            rpc_key: "CROSSFI_TESTNET_RPC_URL".into(),
            gateway: Address::repeat_byte(1),
            gas_credit_vault: Address::repeat_byte(2),
            meta_tx_gateway: Address::repeat_byte(3),
        };
        chain.hub_add_chain(Address::ZERO, &registration).await.unwrap();
        let err = chain
            .hub_add_chain(Address::ZERO, &registration)
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(chain.state().hub_chains.len(), 1);
    }

    #[tokio::test]
    async fn deployments_get_distinct_addresses() {
        let chain = MockChain::new(1);
        let a = chain.deploy(&Deployment::TokenTemplate).await.unwrap();
        let b = chain.deploy(&Deployment::BridgeHub).await.unwrap();
        let implementation = chain
            .deploy_implementation(Upgradeable::GasCreditVault)
            .await
            .unwrap();
        let proxy = chain
            .deploy_proxy(Upgradeable::GasCreditVault, implementation)
            .await
            .unwrap();
        let all = [a, b, proxy, implementation];
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), 4);
        assert!(all.iter().all(|addr| *addr != Address::ZERO));
        assert_eq!(chain.code_size(a).await.unwrap(), 1024);
        assert_eq!(chain.code_size(Address::ZERO).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn injected_failures_are_recorded_and_clearable() {
        let chain = MockChain::new(1);
        chain.fail_on("deploy:DIBridgedToken");
        assert!(chain.deploy(&Deployment::TokenTemplate).await.is_err());
        assert_eq!(chain.calls_to("deploy:DIBridgedToken"), 1);
        assert!(chain.state().deployments.is_empty());

        chain.clear_failure("deploy:DIBridgedToken");
        assert!(chain.deploy(&Deployment::TokenTemplate).await.is_ok());
    }

    #[tokio::test]
    async fn registry_lists_bridged_and_adopted_tokens() {
        let chain = MockChain::new(4157);
        let target = TokenAdminTarget {
            registry: Address::repeat_byte(0x0e),
            gateway: Address::repeat_byte(0x0f),
        };
        let token = ResolvedToken {
            name: "DI Bridged USDT".into(),
            symbol: "USDT".into(),
            decimals: 6,
            origin_symbol: "USDT".into(),
            address: None,
            is_stablecoin: true,
        };
        chain.deploy_bridged_token(target, &token, 999).await.unwrap();
        let adopted = ResolvedToken {
            name: "XUSD".into(),
            symbol: "XUSD".into(),
            address: Some(Address::repeat_byte(0x77)),
            ..token.clone()
        };
        chain
            .adopt_token(target, &adopted, Address::repeat_byte(0x77), Address::ZERO)
            .await
            .unwrap();

        let listed = chain.registry_tokens(target.registry).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].is_deployed);
        assert_eq!(listed[0].origin_chain_id, 999);
        assert!(!listed[1].is_deployed);
        assert_eq!(listed[1].token, Address::repeat_byte(0x77));
        assert_eq!(listed[1].origin_chain_id, 4157);
        assert!(chain.registry_tokens(Address::ZERO).await.unwrap().is_empty());
    }
}
