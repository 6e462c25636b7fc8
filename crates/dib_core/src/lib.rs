//! Static configuration for the bridge deployment tooling: the network and
//! token registry, the operator settings file and logging set-up.

pub mod config;
pub mod error;
pub mod logging;
pub mod networks;

pub use config::{AdoptTokenArgs, ContractProfile, DibConfig, RegistryConstructor, TokenAdmin};
pub use error::ConfigError;
pub use networks::{
    BRIDGED_NAME_PREFIX, ChainDescriptor, ChainOverride, NetworkRegistry, ResolvedToken,
    TokenDescriptor,
};
