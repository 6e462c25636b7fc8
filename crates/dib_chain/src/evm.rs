use std::time::Duration;

use alloy::eips::BlockNumberOrTag;
use alloy::network::{Ethereum, EthereumWallet, ReceiptResponse, TransactionBuilder};
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::{SolCall, SolValue, decode_revert_reason};
use alloy::transports::TransportError;
use async_trait::async_trait;
use dib_core::{
    AdoptTokenArgs, ContractProfile, DibConfig, RegistryConstructor, ResolvedToken, TokenAdmin,
};
use tracing::{debug, info};

use crate::artifacts::{ArtifactStore, names};
use crate::client::{
    ChainClient, ChainRegistration, Deployment, GatewayInfo, RegistryToken, TokenAdminTarget,
    TokenContractRegistration, TokenRegistration, Upgradeable,
};
use crate::contracts::{
    IBridgeHub, IDIBridgedTokenRegistry, IDIGateway, IGasCreditVault, IMetaTxGateway,
    ITokenAdminNameDecimals, ITokenAdminPriceFeed,
};
use crate::error::ChainError;

/// Settings shared by every [`EvmClient`] a run creates.
#[derive(Debug, Clone)]
pub struct EvmClientOptions {
    pub artifacts: ArtifactStore,
    pub profile: ContractProfile,
    pub confirmations: u64,
    pub timeout: Duration,
}

impl EvmClientOptions {
    pub fn from_config(config: &DibConfig) -> Self {
        Self {
            artifacts: ArtifactStore::new(&config.artifacts_dir),
            profile: config.contracts.clone(),
            confirmations: config.confirmations.max(1),
            timeout: config.tx_timeout(),
        }
    }
}

/// [`ChainClient`] over a JSON-RPC node.
pub struct EvmClient {
    provider: DynProvider,
    sender: Option<Address>,
    options: EvmClientOptions,
}

impl EvmClient {
    /// Connect with a signing key (hex, with or without `0x`).
    pub fn connect(
        rpc_url: &str,
        private_key: &str,
        options: EvmClientOptions,
    ) -> Result<Self, ChainError> {
        let url = parse_url(rpc_url)?;
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .map_err(|e| ChainError::Signer(format!("invalid private key: {e}")))?;
        let sender = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::new(signer))
            .connect_http(url)
            .erased();
        debug!(%sender, "connected signing client");
        Ok(Self {
            provider,
            sender: Some(sender),
            options,
        })
    }

    /// Connect without a signer. Every transaction-sending call will fail.
    pub fn read_only(rpc_url: &str, options: EvmClientOptions) -> Result<Self, ChainError> {
        let provider = ProviderBuilder::new()
            .connect_http(parse_url(rpc_url)?)
            .erased();
        Ok(Self {
            provider,
            sender: None,
            options,
        })
    }

    fn require_sender(&self) -> Result<Address, ChainError> {
        self.sender
            .ok_or_else(|| ChainError::Signer("client has no signing key".into()))
    }

    /// Deploy `name`'s creation code followed by ABI-encoded constructor args.
    async fn deploy_code(&self, name: &str, constructor_args: Vec<u8>) -> Result<Address, ChainError> {
        self.require_sender()?;
        let mut code = self.options.artifacts.bytecode(name)?;
        code.extend_from_slice(&constructor_args);

        let tx = TransactionRequest::default().with_deploy_code(Bytes::from(code));
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| classify_transport(name, e))?;
        let receipt = self.confirm(name, pending).await?;
        let address = ReceiptResponse::contract_address(&receipt)
            .ok_or_else(|| ChainError::MissingContractAddress(name.to_string()))?;
        info!(contract = name, %address, tx = %receipt.transaction_hash, "deployed");
        Ok(address)
    }

    /// Await a sent contract call and require a successful receipt.
    async fn submit(
        &self,
        what: &str,
        sent: Result<PendingTransactionBuilder<Ethereum>, alloy::contract::Error>,
    ) -> Result<(), ChainError> {
        let pending = sent.map_err(|e| classify_contract(what, e))?;
        let receipt = self.confirm(what, pending).await?;
        debug!(call = what, tx = %receipt.transaction_hash, "confirmed");
        Ok(())
    }

    async fn confirm(
        &self,
        what: &str,
        pending: PendingTransactionBuilder<Ethereum>,
    ) -> Result<TransactionReceipt, ChainError> {
        let receipt = pending
            .with_required_confirmations(self.options.confirmations)
            .with_timeout(Some(self.options.timeout))
            .get_receipt()
            .await
            .map_err(|e| ChainError::Confirmation {
                what: what.to_string(),
                reason: e.to_string(),
            })?;
        if !ReceiptResponse::status(&receipt) {
            return Err(ChainError::Rejected {
                what: what.to_string(),
                reason: format!("transaction {} reverted", receipt.transaction_hash),
            });
        }
        Ok(receipt)
    }
}

/// ABI-encoded `DIBridgedTokenRegistry` constructor arguments for the
/// profile's layout. `deployer` is the sending account.
fn registry_constructor_args(
    profile: &ContractProfile,
    template: Address,
    owner: Address,
    deployer: Address,
) -> Vec<u8> {
    match profile.registry_constructor {
        RegistryConstructor::TemplateOwnerDeployer => {
            (template, owner, deployer).abi_encode_params()
        }
        RegistryConstructor::OwnerTemplate => (owner, template).abi_encode_params(),
        RegistryConstructor::NameSymbolOwner => (
            profile.registry_name.clone(),
            profile.registry_symbol.clone(),
            owner,
        )
            .abi_encode_params(),
    }
}

/// `ERC1967Proxy(implementation, initialize())` constructor arguments.
fn proxy_constructor_args(kind: Upgradeable, implementation: Address) -> Vec<u8> {
    let init = match kind {
        Upgradeable::MetaTxGateway => IMetaTxGateway::initializeCall {}.abi_encode(),
        Upgradeable::GasCreditVault => IGasCreditVault::initializeCall {}.abi_encode(),
    };
    (implementation, Bytes::from(init)).abi_encode_params()
}

fn to_chain_id(what: &str, value: U256) -> Result<u64, ChainError> {
    u64::try_from(value)
        .map_err(|_| ChainError::rpc(what, format!("chain id {value} overflows u64")))
}

fn parse_url(rpc_url: &str) -> Result<url::Url, ChainError> {
    rpc_url
        .parse()
        .map_err(|e| ChainError::Config(format!("invalid RPC URL {rpc_url}: {e}")))
}

/// The single place node error text is interpreted.
fn classify_transport(what: &str, err: TransportError) -> ChainError {
    match err.as_error_resp() {
        Some(payload) => {
            let reason = payload
                .as_revert_data()
                .and_then(|data| decode_revert_reason(&data))
                .unwrap_or_else(|| payload.message.to_string());
            ChainError::from_rejection(what, reason)
        }
        None => ChainError::rpc(what, err),
    }
}

fn classify_contract(what: &str, err: alloy::contract::Error) -> ChainError {
    match err {
        alloy::contract::Error::TransportError(err) => classify_transport(what, err),
        other => ChainError::rpc(what, other),
    }
}

#[async_trait]
impl ChainClient for EvmClient {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| classify_transport("eth_chainId", e))
    }

    fn sender(&self) -> Option<Address> {
        self.sender
    }

    async fn deploy(&self, deployment: &Deployment) -> Result<Address, ChainError> {
        let args = match deployment {
            Deployment::TokenTemplate | Deployment::BridgeHub => Vec::new(),
            Deployment::TokenRegistry { template, owner } => registry_constructor_args(
                &self.options.profile,
                *template,
                *owner,
                self.require_sender()?,
            ),
            Deployment::Gateway {
                registry,
                owner,
                fee_in_bps,
                fee_receiver,
            } => (*registry, *owner, U256::from(*fee_in_bps), *fee_receiver).abi_encode_params(),
        };
        self.deploy_code(deployment.contract_name(), args).await
    }

    async fn deploy_implementation(&self, kind: Upgradeable) -> Result<Address, ChainError> {
        self.deploy_code(kind.contract_name(), Vec::new()).await
    }

    async fn deploy_proxy(
        &self,
        kind: Upgradeable,
        implementation: Address,
    ) -> Result<Address, ChainError> {
        self.deploy_code(names::PROXY, proxy_constructor_args(kind, implementation))
            .await
    }

    async fn set_registry_gateway(
        &self,
        registry: Address,
        gateway: Address,
    ) -> Result<(), ChainError> {
        let contract = IDIBridgedTokenRegistry::new(registry, &self.provider);
        self.submit("setGateway", contract.setGateway(gateway).send().await)
            .await
    }

    async fn registry_gateway(&self, registry: Address) -> Result<Address, ChainError> {
        IDIBridgedTokenRegistry::new(registry, &self.provider)
            .gateway()
            .call()
            .await
            .map_err(|e| classify_contract("gateway", e))
    }

    async fn registry_token(
        &self,
        registry: Address,
        chain_id: u64,
        origin_symbol: &str,
    ) -> Result<Address, ChainError> {
        IDIBridgedTokenRegistry::new(registry, &self.provider)
            .getToken(U256::from(chain_id), origin_symbol.to_string())
            .call()
            .await
            .map_err(|e| classify_contract("getToken", e))
    }

    async fn registry_tokens(&self, registry: Address) -> Result<Vec<RegistryToken>, ChainError> {
        let tokens = IDIBridgedTokenRegistry::new(registry, &self.provider)
            .getSupportedTokens()
            .call()
            .await
            .map_err(|e| classify_contract("getSupportedTokens", e))?;
        tokens
            .into_iter()
            .map(|info| {
                Ok(RegistryToken {
                    token: info.tokenAddress,
                    symbol: info.symbol,
                    name: info.name,
                    decimals: info.decimals,
                    origin_chain_id: to_chain_id("getSupportedTokens", info.originChainId)?,
                    origin_symbol: info.originSymbol,
                    is_deployed: info.isDeployed,
                })
            })
            .collect()
    }

    async fn deploy_bridged_token(
        &self,
        target: TokenAdminTarget,
        token: &ResolvedToken,
        chain_id: u64,
    ) -> Result<(), ChainError> {
        let admin = match self.options.profile.token_admin {
            TokenAdmin::Registry => target.registry,
            TokenAdmin::Gateway => target.gateway,
        };
        // Both revisions share the deployToken signature.
        let contract = ITokenAdminNameDecimals::new(admin, &self.provider);
        let sent = contract
            .deployToken(
                token.name.clone(),
                token.symbol.clone(),
                token.decimals,
                U256::from(chain_id),
                token.origin_symbol.clone(),
            )
            .send()
            .await;
        self.submit("deployToken", sent).await
    }

    async fn adopt_token(
        &self,
        target: TokenAdminTarget,
        token: &ResolvedToken,
        address: Address,
        price_feed: Address,
    ) -> Result<(), ChainError> {
        let admin = match self.options.profile.token_admin {
            TokenAdmin::Registry => target.registry,
            TokenAdmin::Gateway => target.gateway,
        };
        match self.options.profile.adopt_token_args {
            AdoptTokenArgs::NameDecimals => {
                let contract = ITokenAdminNameDecimals::new(admin, &self.provider);
                let sent = contract
                    .addToken(
                        token.symbol.clone(),
                        address,
                        token.name.clone(),
                        token.decimals,
                        false,
                    )
                    .send()
                    .await;
                self.submit("addToken", sent).await
            }
            AdoptTokenArgs::PriceFeed => {
                let contract = ITokenAdminPriceFeed::new(admin, &self.provider);
                let sent = contract
                    .addToken(
                        token.symbol.clone(),
                        address,
                        String::new(),
                        price_feed,
                        token.symbol.clone(),
                        false,
                    )
                    .send()
                    .await;
                self.submit("addToken", sent).await
            }
        }
    }

    async fn add_gateway_relayer(
        &self,
        gateway: Address,
        relayer: Address,
    ) -> Result<(), ChainError> {
        let contract = IDIGateway::new(gateway, &self.provider);
        self.submit("addRelayer", contract.addRelayer(relayer).send().await)
            .await
    }

    async fn add_gateway_chain(&self, gateway: Address, chain_id: u64) -> Result<(), ChainError> {
        let contract = IDIGateway::new(gateway, &self.provider);
        self.submit(
            "addChain",
            contract.addChain(U256::from(chain_id)).send().await,
        )
        .await
    }

    async fn gateway_supports_chain(
        &self,
        gateway: Address,
        chain_id: u64,
    ) -> Result<bool, ChainError> {
        IDIGateway::new(gateway, &self.provider)
            .supportedChains(U256::from(chain_id))
            .call()
            .await
            .map_err(|e| classify_contract("supportedChains", e))
    }

    async fn gateway_info(&self, gateway: Address) -> Result<GatewayInfo, ChainError> {
        let contract = IDIGateway::new(gateway, &self.provider);
        let owner = contract
            .owner()
            .call()
            .await
            .map_err(|e| classify_contract("owner", e))?;
        let bridge_fee = contract
            .getBridgeFee()
            .call()
            .await
            .map_err(|e| classify_contract("getBridgeFee", e))?;
        let fee_receiver = contract
            .feeReceiver()
            .call()
            .await
            .map_err(|e| classify_contract("feeReceiver", e))?;
        let token_registry = contract
            .getBridgeTokenRegistry()
            .call()
            .await
            .map_err(|e| classify_contract("getBridgeTokenRegistry", e))?;
        Ok(GatewayInfo {
            owner,
            bridge_fee,
            fee_receiver,
            token_registry,
        })
    }

    async fn authorize_meta_tx_relayer(
        &self,
        meta_tx_gateway: Address,
        relayer: Address,
    ) -> Result<(), ChainError> {
        let contract = IMetaTxGateway::new(meta_tx_gateway, &self.provider);
        self.submit(
            "setRelayerAuthorization",
            contract.setRelayerAuthorization(relayer, true).send().await,
        )
        .await
    }

    async fn whitelist_token(
        &self,
        vault: Address,
        token: Address,
        price_feed: Address,
        is_stablecoin: bool,
    ) -> Result<(), ChainError> {
        let contract = IGasCreditVault::new(vault, &self.provider);
        let sent = contract
            .whitelistToken(token, price_feed, is_stablecoin)
            .send()
            .await;
        self.submit("whitelistToken", sent).await
    }

    async fn is_token_whitelisted(
        &self,
        vault: Address,
        token: Address,
    ) -> Result<bool, ChainError> {
        IGasCreditVault::new(vault, &self.provider)
            .isTokenWhitelisted(token)
            .call()
            .await
            .map_err(|e| classify_contract("isTokenWhitelisted", e))
    }

    async fn add_whitelisted_relayer(
        &self,
        vault: Address,
        relayer: Address,
    ) -> Result<(), ChainError> {
        let contract = IGasCreditVault::new(vault, &self.provider);
        self.submit(
            "addWhitelistedRelayer",
            contract.addWhitelistedRelayer(relayer).send().await,
        )
        .await
    }

    async fn is_relayer_whitelisted(
        &self,
        vault: Address,
        relayer: Address,
    ) -> Result<bool, ChainError> {
        IGasCreditVault::new(vault, &self.provider)
            .isRelayerWhitelisted(relayer)
            .call()
            .await
            .map_err(|e| classify_contract("isRelayerWhitelisted", e))
    }

    async fn hub_add_chain(
        &self,
        hub: Address,
        chain: &ChainRegistration,
    ) -> Result<(), ChainError> {
        let contract = IBridgeHub::new(hub, &self.provider);
        let sent = contract
            .addChain(
                U256::from(chain.chain_id),
                chain.name.clone(),
                chain.rpc_key.clone(),
                chain.gateway,
                chain.gas_credit_vault,
                chain.meta_tx_gateway,
            )
            .send()
            .await;
        self.submit("addChain", sent).await
    }

    async fn hub_add_token(
        &self,
        hub: Address,
        token: &TokenRegistration,
    ) -> Result<(), ChainError> {
        let contract = IBridgeHub::new(hub, &self.provider);
        let sent = contract
            .addToken(token.symbol.clone(), token.name.clone(), token.decimals)
            .send()
            .await;
        self.submit("addToken", sent).await
    }

    async fn hub_add_token_contract(
        &self,
        hub: Address,
        entry: &TokenContractRegistration,
    ) -> Result<(), ChainError> {
        let contract = IBridgeHub::new(hub, &self.provider);
        let sent = contract
            .addTokenContract(
                entry.symbol.clone(),
                U256::from(entry.chain_id),
                entry.token,
                U256::from(entry.origin_chain_id),
                entry.origin_symbol.clone(),
                entry.is_deployed,
            )
            .send()
            .await;
        self.submit("addTokenContract", sent).await
    }

    async fn hub_set_gas_credit_vault(
        &self,
        hub: Address,
        vault: Address,
    ) -> Result<(), ChainError> {
        let contract = IBridgeHub::new(hub, &self.provider);
        self.submit(
            "setGasCreditVault",
            contract.setGasCreditVault(vault).send().await,
        )
        .await
    }

    async fn hub_chains(&self, hub: Address) -> Result<Vec<ChainRegistration>, ChainError> {
        let chains = IBridgeHub::new(hub, &self.provider)
            .getDetailedChainsInfo()
            .call()
            .await
            .map_err(|e| classify_contract("getDetailedChainsInfo", e))?;
        chains
            .into_iter()
            .map(|info| {
                Ok(ChainRegistration {
                    chain_id: to_chain_id("getDetailedChainsInfo", info.chainId)?,
                    name: info.name,
                    rpc_key: info.rpcUrl,
                    gateway: info.gateway,
                    gas_credit_vault: info.gasCreditVault,
                    meta_tx_gateway: info.metaTxGateway,
                })
            })
            .collect()
    }

    async fn code_size(&self, address: Address) -> Result<usize, ChainError> {
        let code = self
            .provider
            .get_code_at(address)
            .await
            .map_err(|e| classify_transport("eth_getCode", e))?;
        Ok(code.len())
    }

    async fn latest_gas_limit(&self) -> Result<u64, ChainError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await
            .map_err(|e| classify_transport("eth_getBlockByNumber", e))?
            .ok_or_else(|| ChainError::rpc("eth_getBlockByNumber", "node returned no latest block"))?;
        Ok(block.header.gas_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> EvmClientOptions {
        EvmClientOptions::from_config(&DibConfig::default())
    }

    // Anvil's first well-known development key.
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn connect_derives_sender_from_key() {
        let client = EvmClient::connect("http://localhost:8545", DEV_KEY, options()).unwrap();
        assert_eq!(
            client.sender(),
            Some(alloy::primitives::address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"))
        );
    }

    #[test]
    fn connect_rejects_bad_inputs() {
        assert!(matches!(
            EvmClient::connect("http://localhost:8545", "0x1234", options()),
            Err(ChainError::Signer(_))
        ));
        assert!(matches!(
            EvmClient::read_only("not a url", options()),
            Err(ChainError::Config(_))
        ));
    }

    #[test]
    fn read_only_client_has_no_sender() {
        let client = EvmClient::read_only("http://localhost:8545", options()).unwrap();
        assert!(client.sender().is_none());
        assert!(client.require_sender().is_err());
    }

    fn word(address: Address) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(address.as_slice());
        word
    }

    #[test]
    fn registry_constructor_follows_profile_layout() {
        let template = Address::repeat_byte(0x11);
        let owner = Address::repeat_byte(0x22);
        let deployer = Address::repeat_byte(0x33);
        let mut profile = ContractProfile::default();

        profile.registry_constructor = RegistryConstructor::OwnerTemplate;
        let args = registry_constructor_args(&profile, template, owner, deployer);
        assert_eq!(args.len(), 64);
        assert_eq!(args[..32], word(owner));
        assert_eq!(args[32..], word(template));

        profile.registry_constructor = RegistryConstructor::TemplateOwnerDeployer;
        let args = registry_constructor_args(&profile, template, owner, deployer);
        assert_eq!(args.len(), 96);
        assert_eq!(args[..32], word(template));
        assert_eq!(args[32..64], word(owner));
        assert_eq!(args[64..], word(deployer));
    }

    #[test]
    fn proxy_constructor_carries_initialize_call() {
        let implementation = Address::repeat_byte(0x44);
        let args = proxy_constructor_args(Upgradeable::GasCreditVault, implementation);
        let (decoded, init) = <(Address, Bytes)>::abi_decode_params(&args).unwrap();
        assert_eq!(decoded, implementation);
        assert_eq!(init[..4], IGasCreditVault::initializeCall::SELECTOR);
    }

    #[test]
    fn oversized_chain_id_is_an_error() {
        assert_eq!(to_chain_id("x", U256::from(4157u64)).unwrap(), 4157);
        assert!(to_chain_id("x", U256::MAX).is_err());
    }

    #[test]
    fn options_never_wait_for_zero_confirmations() {
        let config = DibConfig {
            confirmations: 0,
            ..DibConfig::default()
        };
        assert_eq!(EvmClientOptions::from_config(&config).confirmations, 1);
    }
}
