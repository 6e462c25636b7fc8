//! Contract-level operations against EVM networks.
//!
//! [`ChainClient`] is the seam: [`EvmClient`] talks to a node through alloy,
//! and `MockChain` (feature `mock`) keeps everything in memory.

pub mod artifacts;
pub mod client;
pub mod contracts;
pub mod error;
pub mod evm;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod rpc_config;

pub use artifacts::{ArtifactStore, ContractArtifact};
pub use client::{
    ChainClient, ChainRegistration, Deployment, GatewayInfo, RegistryToken, TokenAdminTarget,
    TokenContractRegistration, TokenRegistration, Upgradeable, tolerate_existing,
};
pub use error::ChainError;
pub use evm::{EvmClient, EvmClientOptions};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockChain, MockState};
pub use rpc_config::{RpcConfig, RpcConfigStore, resolve_rpc_key, validate_url};
