use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy::primitives::{Address, address};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;
use crate::networks::NetworkRegistry;

/// Default owner, fee receiver and relayer.
const DEFAULT_OPERATOR: Address = address!("9Ee8A60b09B526dD8264E83B1dc92a45E41868a3");

const DEFAULT_FEE_IN_BPS: u16 = 30;
const DEFAULT_TX_TIMEOUT_SECS: u64 = 120;

// ---------------------------------------------------------------------------
// Contract ABI profile
// ---------------------------------------------------------------------------

/// Constructor layout of `DIBridgedTokenRegistry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryConstructor {
    /// `(address template, address owner, address deployer)`
    TemplateOwnerDeployer,
    /// `(address owner, address template)`
    OwnerTemplate,
    /// `(string name, string symbol, address owner)`
    NameSymbolOwner,
}

/// Parameter list of the "adopt existing token" call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdoptTokenArgs {
    /// `addToken(symbol, token, name, decimals, isNative)`
    NameDecimals,
    /// `addToken(symbol, token, logoURI, priceFeed, priceKey, useDIAOracle)`
    PriceFeed,
}

/// Which contract receives `deployToken` / `addToken`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenAdmin {
    Registry,
    Gateway,
}

/// The contract interface revision the deployed bytecode speaks.
///
/// Constructor and `addToken` signatures changed between contract revisions,
/// so the revision is named explicitly instead of guessed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractProfile {
    pub registry_constructor: RegistryConstructor,
    pub adopt_token_args: AdoptTokenArgs,
    pub token_admin: TokenAdmin,
    pub registry_name: String,
    pub registry_symbol: String,
}

impl Default for ContractProfile {
    fn default() -> Self {
        Self {
            registry_constructor: RegistryConstructor::TemplateOwnerDeployer,
            adopt_token_args: AdoptTokenArgs::NameDecimals,
            token_admin: TokenAdmin::Registry,
            registry_name: "DI Bridged Token Registry".into(),
            registry_symbol: "DIBTR".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// DibConfig
// ---------------------------------------------------------------------------

/// Operator settings, stored as TOML (by convention `dib.toml`).
///
/// Secrets are never part of this file: the signing key is read from the
/// environment variable named by `private_key_env`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DibConfig {
    /// Directory holding one `<network>.json` address file per network.
    pub store_dir: PathBuf,
    /// Hardhat or Foundry build output.
    pub artifacts_dir: PathBuf,
    /// Optional TOML network/token table. The built-in table is used when unset.
    pub networks_file: Option<PathBuf>,
    pub logs_dir: Option<PathBuf>,
    pub log_level: String,

    /// Contract owner and fee receiver.
    pub deployer: Address,
    pub relayer: Address,
    pub fee_in_bps: u16,

    pub confirmations: u64,
    pub tx_timeout_secs: u64,
    pub private_key_env: String,

    /// Price feed per token symbol for vault whitelisting.
    pub price_feeds: BTreeMap<String, Address>,

    pub contracts: ContractProfile,
}

impl Default for DibConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("addresses"),
            artifacts_dir: PathBuf::from("artifacts"),
            networks_file: None,
            logs_dir: None,
            log_level: "info".into(),
            deployer: DEFAULT_OPERATOR,
            relayer: DEFAULT_OPERATOR,
            fee_in_bps: DEFAULT_FEE_IN_BPS,
            confirmations: 1,
            tx_timeout_secs: DEFAULT_TX_TIMEOUT_SECS,
            private_key_env: "PRIVATE_KEY".into(),
            price_feeds: BTreeMap::new(),
            contracts: ContractProfile::default(),
        }
    }
}

impl DibConfig {
    /// Returns the base directory: `~/.dib/`
    pub fn base_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".dib"))
    }

    /// Configured logs directory, or `~/.dib/logs/`.
    pub fn logs_dir(&self) -> Result<PathBuf> {
        match &self.logs_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::base_dir()?.join("logs")),
        }
    }

    /// Load config from a TOML file. A missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw)?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// The network registry named by `networks_file`, or the built-in one.
    pub fn load_registry(&self) -> Result<NetworkRegistry, ConfigError> {
        match &self.networks_file {
            Some(path) => NetworkRegistry::load_from_path(path),
            None => NetworkRegistry::builtin(),
        }
    }

    /// Read the signing key from the environment.
    pub fn private_key(&self) -> Result<String, ConfigError> {
        std::env::var(&self.private_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnv(self.private_key_env.clone()))
    }

    /// Price feed for `symbol`, or the zero address.
    pub fn price_feed(&self, symbol: &str) -> Address {
        self.price_feeds.get(symbol).copied().unwrap_or(Address::ZERO)
    }

    pub fn tx_timeout(&self) -> Duration {
        Duration::from_secs(self.tx_timeout_secs)
    }
}
