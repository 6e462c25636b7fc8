use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use dib_core::ResolvedToken;
use serde::{Deserialize, Serialize};

use crate::error::ChainError;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// A plain (non-proxied) contract deployment with its constructor arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deployment {
    TokenTemplate,
    /// The deploying account is appended where the constructor layout wants it.
    TokenRegistry { template: Address, owner: Address },
    Gateway {
        registry: Address,
        owner: Address,
        fee_in_bps: u16,
        fee_receiver: Address,
    },
    BridgeHub,
}

impl Deployment {
    pub fn contract_name(&self) -> &'static str {
        use crate::artifacts::names;
        match self {
            Deployment::TokenTemplate => names::TOKEN_TEMPLATE,
            Deployment::TokenRegistry { .. } => names::TOKEN_REGISTRY,
            Deployment::Gateway { .. } => names::GATEWAY,
            Deployment::BridgeHub => names::BRIDGE_HUB,
        }
    }
}

/// Contracts deployed as an implementation behind an ERC-1967 proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Upgradeable {
    MetaTxGateway,
    GasCreditVault,
}

impl Upgradeable {
    pub fn contract_name(&self) -> &'static str {
        use crate::artifacts::names;
        match self {
            Upgradeable::MetaTxGateway => names::META_TX_GATEWAY,
            Upgradeable::GasCreditVault => names::GAS_CREDIT_VAULT,
        }
    }
}

/// Where token administration calls go. The contract profile decides which
/// of the two receives `deployToken` / `addToken`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAdminTarget {
    pub registry: Address,
    pub gateway: Address,
}

/// Hub `addChain` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainRegistration {
    pub chain_id: u64,
    pub name: String,
    /// The network's RPC endpoint key, as configured.
    pub rpc_key: String,
    pub gateway: Address,
    pub gas_credit_vault: Address,
    pub meta_tx_gateway: Address,
}

/// Hub `addToken` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRegistration {
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
}

/// Hub `addTokenContract` payload. `origin_chain_id` of `0` means "none".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenContractRegistration {
    pub symbol: String,
    pub chain_id: u64,
    pub token: Address,
    pub origin_chain_id: u64,
    pub origin_symbol: String,
    pub is_deployed: bool,
}

/// One entry of the registry's supported token list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryToken {
    pub token: Address,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub origin_chain_id: u64,
    pub origin_symbol: String,
    pub is_deployed: bool,
}

/// Read-only gateway state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayInfo {
    pub owner: Address,
    pub bridge_fee: U256,
    pub fee_receiver: Address,
    pub token_registry: Address,
}

// ---------------------------------------------------------------------------
// ChainClient trait
// ---------------------------------------------------------------------------

/// The contract operations deployment and reconciliation need, against one
/// connected network.
///
/// A transaction-sending method returns only after the transaction has been
/// confirmed. Duplicate registrations surface as
/// [`ChainError::AlreadyExists`].
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Chain id reported by the node.
    async fn chain_id(&self) -> Result<u64, ChainError>;

    /// Account transactions are sent from, if a signer is attached.
    fn sender(&self) -> Option<Address>;

    // -- deployment --------------------------------------------------------

    async fn deploy(&self, deployment: &Deployment) -> Result<Address, ChainError>;

    /// Deploy the logic contract an upgradeable proxy points at.
    async fn deploy_implementation(&self, kind: Upgradeable) -> Result<Address, ChainError>;

    /// Deploy an ERC-1967 proxy over `implementation` that calls
    /// `initialize()` on construction.
    async fn deploy_proxy(
        &self,
        kind: Upgradeable,
        implementation: Address,
    ) -> Result<Address, ChainError>;

    // -- token registry ----------------------------------------------------

    async fn set_registry_gateway(
        &self,
        registry: Address,
        gateway: Address,
    ) -> Result<(), ChainError>;

    async fn registry_gateway(&self, registry: Address) -> Result<Address, ChainError>;

    /// Bridged token registered for `(chain_id, origin_symbol)`, or zero.
    async fn registry_token(
        &self,
        registry: Address,
        chain_id: u64,
        origin_symbol: &str,
    ) -> Result<Address, ChainError>;

    /// Have the registry mint a new bridged token contract.
    async fn deploy_bridged_token(
        &self,
        target: TokenAdminTarget,
        token: &ResolvedToken,
        chain_id: u64,
    ) -> Result<(), ChainError>;

    /// Register an existing token contract at `address`.
    async fn adopt_token(
        &self,
        target: TokenAdminTarget,
        token: &ResolvedToken,
        address: Address,
        price_feed: Address,
    ) -> Result<(), ChainError>;

    /// Every token the registry knows, bridged or adopted.
    async fn registry_tokens(&self, registry: Address) -> Result<Vec<RegistryToken>, ChainError>;

    // -- gateways ----------------------------------------------------------

    async fn add_gateway_relayer(&self, gateway: Address, relayer: Address)
    -> Result<(), ChainError>;

    async fn add_gateway_chain(&self, gateway: Address, chain_id: u64) -> Result<(), ChainError>;

    async fn gateway_supports_chain(
        &self,
        gateway: Address,
        chain_id: u64,
    ) -> Result<bool, ChainError>;

    async fn gateway_info(&self, gateway: Address) -> Result<GatewayInfo, ChainError>;

    async fn authorize_meta_tx_relayer(
        &self,
        meta_tx_gateway: Address,
        relayer: Address,
    ) -> Result<(), ChainError>;

    // -- gas credit vault --------------------------------------------------

    async fn whitelist_token(
        &self,
        vault: Address,
        token: Address,
        price_feed: Address,
        is_stablecoin: bool,
    ) -> Result<(), ChainError>;

    async fn is_token_whitelisted(&self, vault: Address, token: Address)
    -> Result<bool, ChainError>;

    async fn add_whitelisted_relayer(
        &self,
        vault: Address,
        relayer: Address,
    ) -> Result<(), ChainError>;

    async fn is_relayer_whitelisted(
        &self,
        vault: Address,
        relayer: Address,
    ) -> Result<bool, ChainError>;

    // -- bridge hub --------------------------------------------------------

    async fn hub_add_chain(
        &self,
        hub: Address,
        chain: &ChainRegistration,
    ) -> Result<(), ChainError>;

    async fn hub_add_token(&self, hub: Address, token: &TokenRegistration)
    -> Result<(), ChainError>;

    async fn hub_add_token_contract(
        &self,
        hub: Address,
        entry: &TokenContractRegistration,
    ) -> Result<(), ChainError>;

    async fn hub_set_gas_credit_vault(&self, hub: Address, vault: Address)
    -> Result<(), ChainError>;

    /// Chains registered on the hub.
    async fn hub_chains(&self, hub: Address) -> Result<Vec<ChainRegistration>, ChainError>;

    // -- inspection --------------------------------------------------------

    /// Length of the runtime code at `address`; zero for an EOA or nothing.
    async fn code_size(&self, address: Address) -> Result<usize, ChainError>;

    /// Gas limit of the latest block.
    async fn latest_gas_limit(&self) -> Result<u64, ChainError>;
}

/// Treat a duplicate registration as success.
pub fn tolerate_existing(result: Result<(), ChainError>) -> Result<bool, ChainError> {
    match result {
        Ok(()) => Ok(true),
        Err(err) if err.is_already_exists() => Ok(false),
        Err(err) => Err(err),
    }
}
