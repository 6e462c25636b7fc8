use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::role::ContractRole;

/// A token the deployment pipeline registered on one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub address: Address,
    /// `true` for a freshly deployed bridged token, `false` for an adopted one.
    #[serde(default)]
    pub is_deployed: bool,
    #[serde(default)]
    pub origin_symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_chain_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenData {
    pub network: String,
    pub tokens: Vec<TokenRecord>,
    pub timestamp: DateTime<Utc>,
}

/// On-disk content of one network's address file.
///
/// Roles are top-level keys next to the optional `tokenData` object:
///
/// ```json
/// { "diGateway": "0x…", "tokenData": { "network": "bsc", "tokens": [], "timestamp": "…" } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedContractSet {
    #[serde(flatten)]
    pub contracts: BTreeMap<String, Address>,
    #[serde(rename = "tokenData", default, skip_serializing_if = "Option::is_none")]
    pub token_data: Option<TokenData>,
}

impl DeployedContractSet {
    pub fn get(&self, role: ContractRole) -> Option<Address> {
        self.contracts.get(role.as_str()).copied()
    }
}

/// Token data of one network, as returned by the cross-network scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkTokenData {
    pub network: String,
    pub tokens: Vec<TokenRecord>,
    pub timestamp: DateTime<Utc>,
}

/// Directory of `<network>.json` address files.
///
/// Every mutation is a read-modify-write of the whole document followed by an
/// atomic rename, so a crash never leaves a half-written file. Separate
/// processes writing the same network concurrently can still lose updates;
/// there is no file locking.
#[derive(Debug, Clone)]
pub struct AddressStore {
    dir: PathBuf,
}

impl AddressStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_path(&self, network: &str) -> Result<PathBuf, StoreError> {
        let valid = !network.is_empty()
            && network != "."
            && network != ".."
            && !network.contains(['/', '\\']);
        if !valid {
            return Err(StoreError::InvalidNetworkName(network.to_string()));
        }
        Ok(self.dir.join(format!("{network}.json")))
    }

    /// Load a network's document. `None` when the file does not exist.
    pub fn load(&self, network: &str) -> Result<Option<DeployedContractSet>, StoreError> {
        let path = self.file_path(network)?;
        read_document(&path)
    }

    /// Apply `merge` to the current document (or an empty one) and write it
    /// back atomically. Returns the document as written.
    pub fn update<F>(&self, network: &str, merge: F) -> Result<DeployedContractSet, StoreError>
    where
        F: FnOnce(&mut DeployedContractSet),
    {
        let path = self.file_path(network)?;
        let mut document = read_document(&path)?.unwrap_or_default();
        merge(&mut document);
        self.write_atomic(&path, &document)?;
        Ok(document)
    }

    fn write_atomic(&self, path: &Path, document: &DeployedContractSet) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        std::fs::create_dir_all(&self.dir).map_err(io_err)?;

        let json = serde_json::to_string_pretty(document).map_err(|source| StoreError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        tmp.write_all(json.as_bytes()).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;
        debug!(path = %path.display(), "address file written");
        Ok(())
    }

    /// Record `address` for `role`, replacing any earlier address.
    /// Returns the replaced address.
    pub fn put_contract_address(
        &self,
        network: &str,
        role: ContractRole,
        address: Address,
    ) -> Result<Option<Address>, StoreError> {
        let mut previous = None;
        self.update(network, |doc| {
            previous = doc.contracts.insert(role.as_str().to_string(), address);
        })?;
        if let Some(old) = previous.filter(|old| *old != address) {
            warn!(network, %role, %old, new = %address, "replaced recorded contract address");
        }
        info!(network, %role, %address, "contract address saved");
        Ok(previous)
    }

    /// Address recorded for `role`. Errors when the file or the role is missing.
    pub fn get_contract_address(&self, network: &str, role: ContractRole) -> Result<Address, StoreError> {
        let document = self
            .load(network)?
            .ok_or_else(|| StoreError::FileMissing(network.to_string()))?;
        document.get(role).ok_or_else(|| StoreError::RoleMissing {
            network: network.to_string(),
            role: role.to_string(),
        })
    }

    /// Address recorded for `role`, treating a missing file or role as `None`.
    pub fn find_contract_address(
        &self,
        network: &str,
        role: ContractRole,
    ) -> Result<Option<Address>, StoreError> {
        match self.get_contract_address(network, role) {
            Ok(address) => Ok(Some(address)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Replace the record with the same symbol, or append. Stamps a fresh timestamp.
    pub fn upsert_token_record(&self, network: &str, record: TokenRecord) -> Result<(), StoreError> {
        let symbol = record.symbol.clone();
        self.update(network, |doc| {
            let data = doc.token_data.get_or_insert_with(|| TokenData {
                network: network.to_string(),
                tokens: Vec::new(),
                timestamp: Utc::now(),
            });
            match data.tokens.iter_mut().find(|t| t.symbol == record.symbol) {
                Some(existing) => *existing = record,
                None => data.tokens.push(record),
            }
            data.timestamp = Utc::now();
        })?;
        info!(network, symbol = %symbol, "token record saved");
        Ok(())
    }

    pub fn get_token_data(&self, network: &str) -> Result<Option<TokenData>, StoreError> {
        Ok(self.load(network)?.and_then(|doc| doc.token_data))
    }

    /// Network keys that have an address file, sorted.
    pub fn list_networks(&self) -> Result<Vec<String>, StoreError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.dir.clone(),
                    source,
                });
            }
        };

        let mut networks: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        networks.sort();
        Ok(networks)
    }

    /// Token data of every network that has some. Unreadable files are
    /// logged and skipped.
    pub fn list_all_networks_with_token_data(&self) -> Vec<NetworkTokenData> {
        let networks = match self.list_networks() {
            Ok(networks) => networks,
            Err(e) => {
                warn!(dir = %self.dir.display(), "cannot scan address directory: {e}");
                return Vec::new();
            }
        };

        networks
            .into_iter()
            .filter_map(|network| match self.get_token_data(&network) {
                Ok(Some(data)) => Some(NetworkTokenData {
                    network,
                    tokens: data.tokens,
                    timestamp: data.timestamp,
                }),
                Ok(None) => None,
                Err(e) => {
                    warn!(network = %network, "skipping unreadable address file: {e}");
                    None
                }
            })
            .collect()
    }
}

fn read_document(path: &Path) -> Result<Option<DeployedContractSet>, StoreError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let document = serde_json::from_str(&raw).map_err(|source| StoreError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(document))
}
