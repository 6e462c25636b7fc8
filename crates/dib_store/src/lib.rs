//! Per-network persisted deployment state: contract addresses by role plus the
//! token records written by the deployment pipeline.

pub mod address_store;
pub mod error;
pub mod role;

pub use address_store::{
    AddressStore, DeployedContractSet, NetworkTokenData, TokenData, TokenRecord,
};
pub use error::StoreError;
pub use role::ContractRole;
