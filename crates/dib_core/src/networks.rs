use std::collections::HashSet;
use std::path::Path;

use alloy::primitives::{Address, address};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;

/// Display-name prefix for tokens that get freshly deployed (bridged) on a chain.
pub const BRIDGED_NAME_PREFIX: &str = "DI Bridged";

/// A chain the bridge can be deployed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDescriptor {
    /// Network key, e.g. `sepolia`. Also the Address Store file name.
    pub key: String,
    pub chain_id: u64,
    pub name: String,
    /// Either a literal http(s) URL or the name of an environment variable.
    pub rpc_key: String,
    pub enabled: bool,
    #[serde(default)]
    pub is_bridge_hub: bool,
}

/// Per-chain token override. An override with an address means the token
/// already exists on that chain and is adopted rather than deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainOverride {
    pub chain_id: u64,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub decimals: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDescriptor {
    /// Canonical symbol, the registry key.
    pub symbol: String,
    pub name: String,
    pub default_decimals: u8,
    #[serde(default)]
    pub is_stablecoin: bool,
    #[serde(default)]
    pub chains: Vec<ChainOverride>,
}

impl TokenDescriptor {
    pub fn override_for(&self, chain_id: u64) -> Option<&ChainOverride> {
        self.chains.iter().find(|c| c.chain_id == chain_id)
    }
}

/// A token as it applies to one network, after override resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedToken {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub origin_symbol: String,
    /// `None` means the token has to be deployed as a bridged token.
    pub address: Option<Address>,
    pub is_stablecoin: bool,
}

impl ResolvedToken {
    pub fn needs_deployment(&self) -> bool {
        self.address.is_none()
    }
}

#[derive(Debug, Default, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    networks: Vec<ChainDescriptor>,
    #[serde(default)]
    tokens: Vec<TokenDescriptor>,
}

/// Immutable table of networks and tokens. Declaration order is preserved.
///
/// Construction validates the table, so every accessor can rely on unique
/// network keys, unique chain ids among enabled networks and at most one
/// enabled bridge hub.
#[derive(Debug, Clone)]
pub struct NetworkRegistry {
    networks: Vec<ChainDescriptor>,
    tokens: Vec<TokenDescriptor>,
}

impl NetworkRegistry {
    pub fn new(
        networks: Vec<ChainDescriptor>,
        tokens: Vec<TokenDescriptor>,
    ) -> Result<Self, ConfigError> {
        validate(&networks, &tokens)?;
        Ok(Self { networks, tokens })
    }

    /// The networks and tokens the bridge ships with.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::new(builtin_networks(), builtin_tokens())
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let file: RegistryFile = toml::from_str(raw)?;
        Self::new(file.networks, file.tokens)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_toml_str(&raw)?;
        info!(
            path = %path.display(),
            networks = registry.networks.len(),
            tokens = registry.tokens.len(),
            "network registry loaded"
        );
        Ok(registry)
    }

    pub fn networks(&self) -> &[ChainDescriptor] {
        &self.networks
    }

    pub fn tokens(&self) -> &[TokenDescriptor] {
        &self.tokens
    }

    /// Keys of enabled networks, in declaration order.
    pub fn enabled_networks(&self) -> Vec<&str> {
        self.networks
            .iter()
            .filter(|n| n.enabled)
            .map(|n| n.key.as_str())
            .collect()
    }

    pub fn network(&self, key: &str) -> Option<&ChainDescriptor> {
        self.networks.iter().find(|n| n.key == key)
    }

    pub fn describe_network(&self, key: &str) -> Result<&ChainDescriptor, ConfigError> {
        self.network(key)
            .ok_or_else(|| ConfigError::NetworkNotFound(key.to_string()))
    }

    /// Like [`describe_network`](Self::describe_network), but also rejects
    /// disabled networks.
    pub fn require_enabled(&self, key: &str) -> Result<&ChainDescriptor, ConfigError> {
        let network = self.describe_network(key)?;
        if !network.enabled {
            return Err(ConfigError::NetworkDisabled(key.to_string()));
        }
        Ok(network)
    }

    pub fn token_symbols(&self) -> Vec<&str> {
        self.tokens.iter().map(|t| t.symbol.as_str()).collect()
    }

    pub fn token(&self, symbol: &str) -> Option<&TokenDescriptor> {
        self.tokens.iter().find(|t| t.symbol == symbol)
    }

    pub fn describe_token(&self, symbol: &str) -> Result<&TokenDescriptor, ConfigError> {
        self.token(symbol)
            .ok_or_else(|| ConfigError::TokenNotFound(symbol.to_string()))
    }

    /// Resolve every token descriptor against the chain id of `key`.
    ///
    /// Decimals come from the chain override when it has them, otherwise from
    /// the token default. Tokens without an override address on this chain are
    /// returned without an address and with a bridged display name.
    pub fn resolve_tokens_for_network(&self, key: &str) -> Result<Vec<ResolvedToken>, ConfigError> {
        let network = self.describe_network(key)?;
        let resolved = self
            .tokens
            .iter()
            .map(|token| {
                let chain = token.override_for(network.chain_id);
                let decimals = chain
                    .and_then(|c| c.decimals)
                    .unwrap_or(token.default_decimals);
                match chain.and_then(|c| c.address) {
                    Some(address) => ResolvedToken {
                        name: token.name.clone(),
                        symbol: token.symbol.clone(),
                        decimals,
                        origin_symbol: token.symbol.clone(),
                        address: Some(address),
                        is_stablecoin: token.is_stablecoin,
                    },
                    None => ResolvedToken {
                        name: format!("{BRIDGED_NAME_PREFIX} {}", token.name),
                        symbol: token.symbol.clone(),
                        decimals,
                        origin_symbol: token.symbol.clone(),
                        address: None,
                        is_stablecoin: token.is_stablecoin,
                    },
                }
            })
            .collect();
        Ok(resolved)
    }

    /// The enabled bridge-hub network, if one is configured.
    pub fn find_bridge_hub(&self) -> Option<&ChainDescriptor> {
        self.networks.iter().find(|n| n.enabled && n.is_bridge_hub)
    }

    pub fn is_bridge_hub_network(&self, key: &str) -> bool {
        self.find_bridge_hub().is_some_and(|hub| hub.key == key)
    }
}

fn validate(networks: &[ChainDescriptor], tokens: &[TokenDescriptor]) -> Result<(), ConfigError> {
    let mut keys = HashSet::new();
    for network in networks {
        if network.key.is_empty() {
            return Err(ConfigError::InvalidRegistry("empty network key".into()));
        }
        if !keys.insert(network.key.as_str()) {
            return Err(ConfigError::InvalidRegistry(format!(
                "duplicate network key {}",
                network.key
            )));
        }
    }

    let mut chain_ids = HashSet::new();
    for network in networks.iter().filter(|n| n.enabled) {
        if !chain_ids.insert(network.chain_id) {
            return Err(ConfigError::InvalidRegistry(format!(
                "chain id {} is used by more than one enabled network",
                network.chain_id
            )));
        }
    }

    let hubs: Vec<&str> = networks
        .iter()
        .filter(|n| n.enabled && n.is_bridge_hub)
        .map(|n| n.key.as_str())
        .collect();
    if hubs.len() > 1 {
        return Err(ConfigError::InvalidRegistry(format!(
            "more than one enabled bridge hub: {}",
            hubs.join(", ")
        )));
    }

    let mut symbols = HashSet::new();
    for token in tokens {
        if !symbols.insert(token.symbol.as_str()) {
            return Err(ConfigError::InvalidRegistry(format!(
                "duplicate token symbol {}",
                token.symbol
            )));
        }
        let mut seen = HashSet::new();
        for chain in &token.chains {
            if !seen.insert(chain.chain_id) {
                return Err(ConfigError::InvalidRegistry(format!(
                    "token {} has more than one override for chain {}",
                    token.symbol, chain.chain_id
                )));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Built-in table
// ---------------------------------------------------------------------------

const ETHERLINK_SHADOWNET: u64 = 127_823;
const SEPOLIA: u64 = 11_155_111;
const BSC: u64 = 56;
const POLYGON: u64 = 137;
const ARBITRUM: u64 = 42_161;
const OPTIMISM: u64 = 10;
const BASE: u64 = 8_453;
const AVALANCHE: u64 = 43_114;

fn chain(key: &str, chain_id: u64, name: &str, rpc_key: &str, enabled: bool) -> ChainDescriptor {
    ChainDescriptor {
        key: key.into(),
        chain_id,
        name: name.into(),
        rpc_key: rpc_key.into(),
        enabled,
        is_bridge_hub: false,
    }
}

fn builtin_networks() -> Vec<ChainDescriptor> {
    let mut hub = chain(
        "etherlinkShadownet",
        ETHERLINK_SHADOWNET,
        "Etherlink Shadownet",
        "https://node.shadownet.etherlink.com",
        true,
    );
    hub.is_bridge_hub = true;

    vec![
        hub,
        chain(
            "sepolia",
            SEPOLIA,
            "Ethereum Sepolia",
            "https://ethereum-sepolia-rpc.publicnode.com",
            true,
        ),
        chain("bsc", BSC, "BNB Smart Chain", "https://bsc-dataseed.binance.org/", true),
        chain("polygon", POLYGON, "Polygon", "POLYGON_RPC_URL", false),
        chain("arbitrum", ARBITRUM, "Arbitrum One", "ARBITRUM_RPC_URL", false),
        chain("optimism", OPTIMISM, "Optimism", "OPTIMISM_RPC_URL", false),
        chain("base", BASE, "Base", "BASE_RPC_URL", false),
        chain("avalanche", AVALANCHE, "Avalanche", "AVALANCHE_RPC_URL", false),
    ]
}

fn at(chain_id: u64, address: Address, decimals: u8) -> ChainOverride {
    ChainOverride {
        chain_id,
        address: Some(address),
        decimals: Some(decimals),
    }
}

fn builtin_tokens() -> Vec<TokenDescriptor> {
    vec![
        TokenDescriptor {
            symbol: "DUSD".into(),
            name: "DUSD".into(),
            default_decimals: 18,
            is_stablecoin: true,
            chains: Vec::new(),
        },
        TokenDescriptor {
            symbol: "USDT".into(),
            name: "Tether USD".into(),
            default_decimals: 6,
            is_stablecoin: true,
            chains: vec![
                at(BSC, address!("55d398326f99059fF775485246999027B3197955"), 18),
                at(SEPOLIA, address!("A1d7f71cbBb361A77820279958BAC38fC3667c1a"), 6),
                at(ETHERLINK_SHADOWNET, address!("05382A914d4e46ddFC8608BbA03cD3D25dBE886E"), 6),
                at(POLYGON, address!("c2132D05D31c914a87C6611C10748AEb04B58e8F"), 6),
                at(ARBITRUM, address!("Fd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9"), 6),
                at(OPTIMISM, address!("94b008aA00579c1307B0EF2c499aD98a8ce58e58"), 6),
                at(AVALANCHE, address!("9702230A8Ea53601f5cD2dc00fDBc13d4dF4A8c7"), 6),
            ],
        },
        TokenDescriptor {
            symbol: "USDC".into(),
            name: "USD Coin".into(),
            default_decimals: 6,
            is_stablecoin: true,
            chains: vec![
                at(ETHERLINK_SHADOWNET, address!("064455f03b93bc1cDb8197F718aa055AE3115400"), 6),
                at(SEPOLIA, address!("51fCe89b9f6D4c530698f181167043e1bB4abf89"), 6),
                at(BSC, address!("8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d"), 18),
                at(POLYGON, address!("2791Bca1f2de4661ED88A30C99A7a9449Aa84174"), 6),
                at(ARBITRUM, address!("af88d065e77c8cC2239327C5EDb3A432268e5831"), 6),
                at(OPTIMISM, address!("0b2C639c533813f4Aa9D7837CAf62653d097Ff85"), 6),
                at(BASE, address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"), 6),
                at(AVALANCHE, address!("B97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E"), 6),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_CHAINS: &str = r#"
        [[networks]]
        key = "hyperevm"
        chain_id = 999
        name = "HyperEVM"
        rpc_key = "HYPEREVM_RPC_URL"
        enabled = true
        is_bridge_hub = true

        [[networks]]
        key = "crossfiTestnet"
        chain_id = 4157
        name = "CrossFi Testnet"
        rpc_key = "https://rpc.testnet.ms"
        enabled = true

        [[networks]]
        key = "polygon"
        chain_id = 137
        name = "Polygon"
        rpc_key = "POLYGON_RPC_URL"
        enabled = false

        [[tokens]]
        symbol = "XUSD"
        name = "XUSD"
        default_decimals = 18
        is_stablecoin = true

        [[tokens.chains]]
        chain_id = 4157
        address = "0x7D55FBbdBc11D3EeaC4a33867c5c79517Be3C703"

        [[tokens]]
        symbol = "USDT"
        name = "Tether USD"
        default_decimals = 6

        [[tokens.chains]]
        chain_id = 999
        address = "0x05382A914d4e46ddFC8608BbA03cD3D25dBE886E"
        decimals = 8
    "#;

    fn registry() -> NetworkRegistry {
        NetworkRegistry::from_toml_str(TWO_CHAINS).unwrap()
    }

    #[test]
    fn builtin_table_is_valid() {
        let registry = NetworkRegistry::builtin().unwrap();
        assert_eq!(
            registry.enabled_networks(),
            vec!["etherlinkShadownet", "sepolia", "bsc"]
        );
        assert_eq!(registry.token_symbols(), vec!["DUSD", "USDT", "USDC"]);
    }

    #[test]
    fn enabled_networks_keep_declaration_order() {
        assert_eq!(registry().enabled_networks(), vec!["hyperevm", "crossfiTestnet"]);
    }

    #[test]
    fn describe_unknown_network_fails() {
        let err = registry().describe_network("nope").unwrap_err();
        assert!(matches!(err, ConfigError::NetworkNotFound(k) if k == "nope"));
    }

    #[test]
    fn require_enabled_rejects_disabled_network() {
        let err = registry().require_enabled("polygon").unwrap_err();
        assert!(matches!(err, ConfigError::NetworkDisabled(_)));
    }

    #[test]
    fn describe_unknown_token_fails() {
        assert!(matches!(
            registry().describe_token("WETH"),
            Err(ConfigError::TokenNotFound(_))
        ));
        assert_eq!(registry().describe_token("XUSD").unwrap().default_decimals, 18);
    }

    #[test]
    fn override_address_is_adopted_with_default_decimals() {
        let tokens = registry().resolve_tokens_for_network("crossfiTestnet").unwrap();
        let xusd = tokens.iter().find(|t| t.symbol == "XUSD").unwrap();
        assert_eq!(
            xusd.address,
            Some(address!("7D55FBbdBc11D3EeaC4a33867c5c79517Be3C703"))
        );
        assert_eq!(xusd.decimals, 18);
        assert_eq!(xusd.name, "XUSD");
        assert!(!xusd.needs_deployment());
    }

    #[test]
    fn override_decimals_take_precedence() {
        let tokens = registry().resolve_tokens_for_network("hyperevm").unwrap();
        let usdt = tokens.iter().find(|t| t.symbol == "USDT").unwrap();
        assert_eq!(usdt.decimals, 8);
        assert!(usdt.address.is_some());
    }

    #[test]
    fn missing_override_yields_bridged_token() {
        let tokens = registry().resolve_tokens_for_network("crossfiTestnet").unwrap();
        let usdt = tokens.iter().find(|t| t.symbol == "USDT").unwrap();
        assert_eq!(usdt.address, None);
        assert_eq!(usdt.name, "DI Bridged Tether USD");
        assert_eq!(usdt.decimals, 6);
        assert_eq!(usdt.origin_symbol, "USDT");
    }

    #[test]
    fn resolve_for_unknown_network_fails() {
        assert!(registry().resolve_tokens_for_network("nope").is_err());
    }

    #[test]
    fn find_bridge_hub_returns_enabled_hub() {
        let registry = registry();
        let hub = registry.find_bridge_hub().unwrap();
        assert_eq!(hub.key, "hyperevm");
        assert!(registry.is_bridge_hub_network("hyperevm"));
        assert!(!registry.is_bridge_hub_network("crossfiTestnet"));
    }

    #[test]
    fn find_bridge_hub_without_hub_is_none() {
        let registry = NetworkRegistry::new(
            vec![chain("a", 1, "A", "A_RPC", true)],
            Vec::new(),
        )
        .unwrap();
        assert!(registry.find_bridge_hub().is_none());
    }

    #[test]
    fn disabled_hub_is_not_the_hub() {
        let mut hub = chain("a", 1, "A", "A_RPC", false);
        hub.is_bridge_hub = true;
        let registry = NetworkRegistry::new(vec![hub], Vec::new()).unwrap();
        assert!(registry.find_bridge_hub().is_none());
    }

    #[test]
    fn two_enabled_hubs_are_rejected() {
        let mut a = chain("a", 1, "A", "A_RPC", true);
        let mut b = chain("b", 2, "B", "B_RPC", true);
        a.is_bridge_hub = true;
        b.is_bridge_hub = true;
        let err = NetworkRegistry::new(vec![a, b], Vec::new()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRegistry(msg) if msg.contains("bridge hub")));
    }

    #[test]
    fn duplicate_enabled_chain_ids_are_rejected() {
        let networks = vec![chain("a", 1, "A", "A_RPC", true), chain("b", 1, "B", "B_RPC", true)];
        assert!(NetworkRegistry::new(networks, Vec::new()).is_err());

        // A disabled twin is tolerated.
        let networks = vec![chain("a", 1, "A", "A_RPC", true), chain("b", 1, "B", "B_RPC", false)];
        assert!(NetworkRegistry::new(networks, Vec::new()).is_ok());
    }

    #[test]
    fn duplicate_network_keys_are_rejected() {
        let networks = vec![chain("a", 1, "A", "A_RPC", true), chain("a", 2, "B", "B_RPC", false)];
        assert!(NetworkRegistry::new(networks, Vec::new()).is_err());
    }

    #[test]
    fn load_from_path_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("networks.toml");
        std::fs::write(&path, TWO_CHAINS).unwrap();

        let registry = NetworkRegistry::load_from_path(&path).unwrap();
        assert_eq!(registry.networks().len(), 3);
    }

    #[test]
    fn load_from_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = NetworkRegistry::load_from_path(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
