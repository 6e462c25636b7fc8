#![allow(dead_code)]

use alloy::primitives::{Address, address};
use dib_core::{DibConfig, NetworkRegistry};
use dib_store::AddressStore;
use tempfile::TempDir;

pub const HUB: &str = "hyperevm";
pub const HUB_CHAIN_ID: u64 = 999;
pub const SPOKE: &str = "crossfiTestnet";
pub const SPOKE_CHAIN_ID: u64 = 4157;
pub const DISABLED: &str = "polygon";

pub const XUSD_ON_SPOKE: Address = address!("7D55FBbdBc11D3EeaC4a33867c5c79517Be3C703");
pub const XUSD_PRICE_FEED: Address = address!("41F6dd3bf7a1e50e95D42fC74D840137dB4a891e");

/// Hub 999 and spoke 4157. XUSD exists on the spoke only, USDT nowhere.
pub const NETWORKS: &str = r#"
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
    decimals = 6

    [[tokens]]
    symbol = "USDT"
    name = "Tether USD"
    default_decimals = 6
"#;

pub struct Harness {
    pub dir: TempDir,
    pub registry: NetworkRegistry,
    pub store: AddressStore,
    pub config: DibConfig,
}

pub fn harness() -> Harness {
    harness_with(NETWORKS)
}

pub fn harness_with(networks: &str) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = AddressStore::new(dir.path().join("addresses"));
    let mut config = DibConfig::default();
    config.price_feeds.insert("XUSD".into(), XUSD_PRICE_FEED);
    Harness {
        registry: NetworkRegistry::from_toml_str(networks).unwrap(),
        store,
        config,
        dir,
    }
}
