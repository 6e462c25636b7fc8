use std::collections::HashMap;

use dib_core::NetworkRegistry;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ChainError;

/// Resolved RPC endpoint for a single network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcConfig {
    pub network: String,
    pub url: String,
    pub is_custom: bool,
}

/// Per-network RPC endpoints with custom override support.
///
/// A network's `rpc_key` is either a literal `http(s)://` URL or the name of
/// an environment variable holding one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RpcConfigStore {
    configs: HashMap<String, RpcConfig>,
}

impl RpcConfigStore {
    /// Resolve every network's endpoint from the process environment.
    pub fn from_registry(registry: &NetworkRegistry) -> Self {
        Self::from_registry_with(registry, |name| std::env::var(name).ok())
    }

    /// Resolve endpoints with a custom variable lookup.
    pub fn from_registry_with(
        registry: &NetworkRegistry,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let mut store = Self::default();
        for network in registry.networks() {
            match resolve_rpc_key(&network.rpc_key, &lookup) {
                Some(url) => {
                    store.configs.insert(
                        network.key.clone(),
                        RpcConfig {
                            network: network.key.clone(),
                            url,
                            is_custom: false,
                        },
                    );
                }
                None => debug!(
                    network = %network.key,
                    rpc_key = %network.rpc_key,
                    "no RPC endpoint resolved"
                ),
            }
        }
        store
    }

    pub fn get_rpc(&self, network: &str) -> Option<&RpcConfig> {
        self.configs.get(network)
    }

    /// Like [`get_rpc`](Self::get_rpc), but a missing endpoint is an error.
    pub fn require_rpc(&self, network: &str) -> Result<&RpcConfig, ChainError> {
        self.get_rpc(network)
            .ok_or_else(|| ChainError::Config(format!("no RPC endpoint configured for {network}")))
    }

    /// Override the RPC URL for a network.
    ///
    /// Returns `Err` if the URL fails validation.
    pub fn set_custom_rpc(&mut self, network: &str, url: String) -> Result<(), ChainError> {
        if !validate_url(&url) {
            return Err(ChainError::Config(format!("invalid RPC URL: {url}")));
        }

        let entry = self
            .configs
            .entry(network.to_string())
            .or_insert_with(|| RpcConfig {
                network: network.to_string(),
                url: String::new(),
                is_custom: false,
            });
        entry.url = url;
        entry.is_custom = true;
        Ok(())
    }
}

/// Resolve an `rpc_key`: literal URLs pass through, anything else is looked
/// up as an environment variable name.
pub fn resolve_rpc_key(rpc_key: &str, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    if validate_url(rpc_key) {
        return Some(rpc_key.to_string());
    }
    lookup(rpc_key)
        .map(|value| value.trim().to_string())
        .filter(|value| validate_url(value))
}

/// Validate that a URL is well-formed and uses HTTP or HTTPS.
pub fn validate_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            (scheme == "http" || scheme == "https") && parsed.host().is_some()
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NETWORKS: &str = r#"
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
    "#;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "HYPEREVM_RPC_URL" => Some(" https://rpc.hyperliquid.xyz/evm ".into()),
            "POLYGON_RPC_URL" => Some("not a url".into()),
            _ => None,
        }
    }

    fn store() -> RpcConfigStore {
        let registry = NetworkRegistry::from_toml_str(NETWORKS).unwrap();
        RpcConfigStore::from_registry_with(&registry, lookup)
    }

    #[test]
    fn resolves_env_and_literal_keys() {
        let store = store();
        assert_eq!(
            store.get_rpc("hyperevm").unwrap().url,
            "https://rpc.hyperliquid.xyz/evm"
        );
        assert_eq!(store.get_rpc("crossfiTestnet").unwrap().url, "https://rpc.testnet.ms");
        assert!(!store.get_rpc("hyperevm").unwrap().is_custom);
    }

    #[test]
    fn invalid_env_value_is_unresolved() {
        let store = store();
        assert!(store.get_rpc("polygon").is_none());
        assert!(matches!(store.require_rpc("polygon"), Err(ChainError::Config(_))));
    }

    #[test]
    fn set_custom_rpc_marks_as_custom() {
        let mut store = store();
        store
            .set_custom_rpc("hyperevm", "http://localhost:8545".into())
            .unwrap();

        let rpc = store.get_rpc("hyperevm").unwrap();
        assert!(rpc.is_custom);
        assert_eq!(rpc.url, "http://localhost:8545");
    }

    #[test]
    fn set_custom_rpc_rejects_invalid_url() {
        let mut store = store();
        assert!(store.set_custom_rpc("hyperevm", "not-a-url".into()).is_err());
        assert!(store.set_custom_rpc("hyperevm", "ftp://files.example.com".into()).is_err());
    }

    #[test]
    fn set_custom_rpc_adds_unresolved_network() {
        let mut store = store();
        store
            .set_custom_rpc("polygon", "https://polygon.example.com".into())
            .unwrap();
        let rpc = store.get_rpc("polygon").unwrap();
        assert_eq!(rpc.network, "polygon");
        assert!(rpc.is_custom);
    }

    #[test]
    fn validate_url_rejects_garbage() {
        assert!(validate_url("http://localhost:8545"));
        assert!(!validate_url(""));
        assert!(!validate_url("not a url"));
        assert!(!validate_url("file:///etc/passwd"));
    }
}
