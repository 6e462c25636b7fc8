use std::path::{Path, PathBuf};

use alloy::primitives::hex;
use serde::{Deserialize, Serialize};

use crate::error::ChainError;

/// Contract names this tool deploys, as they appear in the build output.
pub mod names {
    pub const TOKEN_TEMPLATE: &str = "DIBridgedToken";
    pub const TOKEN_REGISTRY: &str = "DIBridgedTokenRegistry";
    pub const GATEWAY: &str = "DIGateway";
    pub const META_TX_GATEWAY: &str = "MetaTxGateway";
    pub const GAS_CREDIT_VAULT: &str = "GasCreditVault";
    pub const BRIDGE_HUB: &str = "BridgeHub";
    pub const PROXY: &str = "ERC1967Proxy";
}

/// A compiled contract: the ABI as raw JSON plus creation bytecode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractArtifact {
    pub name: String,
    pub abi: serde_json::Value,
    pub bytecode: Vec<u8>,
}

impl ContractArtifact {
    /// Parse a Hardhat (`"bytecode": "0x.."`) or Foundry
    /// (`"bytecode": { "object": "0x.." }`) artifact.
    pub fn from_json(name: &str, raw: &str) -> Result<Self, ChainError> {
        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| ChainError::Artifact(format!("{name}: invalid JSON: {e}")))?;

        let encoded = value
            .get("bytecode")
            .and_then(|b| b.as_str().or_else(|| b.get("object").and_then(|o| o.as_str())))
            .ok_or_else(|| ChainError::Artifact(format!("{name}: no bytecode field")))?;

        let bytecode = hex::decode(encoded.trim())
            .map_err(|e| ChainError::Artifact(format!("{name}: bytecode is not hex: {e}")))?;
        if bytecode.is_empty() {
            return Err(ChainError::Artifact(format!(
                "{name}: empty bytecode (abstract contract or interface?)"
            )));
        }

        Ok(Self {
            name: name.to_string(),
            abi: value.get("abi").cloned().unwrap_or(serde_json::Value::Null),
            bytecode,
        })
    }
}

/// Locates artifacts under a Hardhat `artifacts/` or Foundry `out/` tree.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find `<name>.json`, preferring one that sits in a `<name>.sol/` directory.
    pub fn find(&self, name: &str) -> Result<PathBuf, ChainError> {
        let file_name = format!("{name}.json");
        let source_dir = format!("{name}.sol");

        // Build output is usually gitignored, so the standard filters must be off.
        let mut matches: Vec<PathBuf> = ignore::WalkBuilder::new(&self.root)
            .standard_filters(false)
            .build()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
            .map(|entry| entry.into_path())
            .filter(|path| path.file_name().is_some_and(|f| f == file_name.as_str()))
            .collect();
        matches.sort();

        let preferred = matches.iter().position(|path| {
            path.parent()
                .and_then(|p| p.file_name())
                .is_some_and(|dir| dir == source_dir.as_str())
        });
        match preferred {
            Some(index) => Ok(matches.swap_remove(index)),
            None => matches.into_iter().next().ok_or_else(|| {
                ChainError::Artifact(format!(
                    "{name}: no artifact under {}",
                    self.root.display()
                ))
            }),
        }
    }

    pub fn load(&self, name: &str) -> Result<ContractArtifact, ChainError> {
        let path = self.find(name)?;
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| ChainError::Artifact(format!("{}: {e}", path.display())))?;
        ContractArtifact::from_json(name, &raw)
    }

    pub fn bytecode(&self, name: &str) -> Result<Vec<u8>, ChainError> {
        Ok(self.load(name)?.bytecode)
    }
}
