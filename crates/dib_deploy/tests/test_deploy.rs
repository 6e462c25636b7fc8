mod common;

use alloy::primitives::Address;
use common::*;
use dib_chain::{ChainClient, MockChain};
use dib_core::ConfigError;
use dib_deploy::Orchestrator;
use dib_store::{ContractRole, StoreError};

#[tokio::test]
async fn spoke_with_override_adopts_existing_token() {
    let h = harness();
    let chain = MockChain::new(SPOKE_CHAIN_ID);
    let orchestrator = Orchestrator::new(&h.registry, &h.store, &h.config, &chain);

    let report = orchestrator.deploy_network(SPOKE, false).await.unwrap();
    assert!(report.token_failures.is_empty(), "{:?}", report.token_failures);

    for role in ContractRole::CORE {
        assert!(
            h.store.find_contract_address(SPOKE, role).unwrap().is_some(),
            "{role} missing"
        );
    }
    assert!(
        h.store
            .find_contract_address(SPOKE, ContractRole::GasCreditVaultImplementation)
            .unwrap()
            .is_some()
    );
    assert_eq!(
        h.store.find_contract_address(SPOKE, ContractRole::BridgeHub).unwrap(),
        None
    );

    let data = h.store.get_token_data(SPOKE).unwrap().unwrap();
    let xusd = data.tokens.iter().find(|t| t.symbol == "XUSD").unwrap();
    assert!(!xusd.is_deployed);
    assert_eq!(xusd.address, XUSD_ON_SPOKE);
    assert_eq!(xusd.decimals, 6);
    assert_eq!(xusd.origin_chain_id, Some(SPOKE_CHAIN_ID));

    // Adopted tokens are whitelisted with their configured price feed.
    let vault = h
        .store
        .get_contract_address(SPOKE, ContractRole::GasCreditVault)
        .unwrap();
    assert_eq!(
        chain.state().vault_tokens.get(&(vault, XUSD_ON_SPOKE)),
        Some(&(XUSD_PRICE_FEED, true))
    );
}

#[tokio::test]
async fn spoke_without_override_deploys_bridged_token() {
    let h = harness();
    let chain = MockChain::new(SPOKE_CHAIN_ID);
    let orchestrator = Orchestrator::new(&h.registry, &h.store, &h.config, &chain);
    orchestrator.deploy_network(SPOKE, false).await.unwrap();

    let registry = h
        .store
        .get_contract_address(SPOKE, ContractRole::TokenRegistry)
        .unwrap();
    let looked_up = chain
        .registry_token(registry, SPOKE_CHAIN_ID, "USDT")
        .await
        .unwrap();
    assert_ne!(looked_up, Address::ZERO);

    let data = h.store.get_token_data(SPOKE).unwrap().unwrap();
    let usdt = data.tokens.iter().find(|t| t.symbol == "USDT").unwrap();
    assert!(usdt.is_deployed);
    assert_eq!(usdt.address, looked_up);
    assert_eq!(usdt.name, "DI Bridged Tether USD");
    assert_eq!(usdt.origin_symbol, "USDT");
    assert_eq!(usdt.origin_chain_id, None);
}

#[tokio::test]
async fn disabled_network_is_refused_without_writes() {
    let h = harness();
    let chain = MockChain::new(137);
    let orchestrator = Orchestrator::new(&h.registry, &h.store, &h.config, &chain);

    let err = orchestrator.deploy_network(DISABLED, false).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::NetworkDisabled(_))
    ));
    assert!(!h.store.dir().join("polygon.json").exists());
    assert!(chain.state().calls.is_empty());
}

#[tokio::test]
async fn chain_id_mismatch_is_refused_without_writes() {
    let h = harness();
    let chain = MockChain::new(1);
    let orchestrator = Orchestrator::new(&h.registry, &h.store, &h.config, &chain);

    let err = orchestrator.deploy_network(SPOKE, false).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::ChainMismatch { actual: 1, .. })
    ));
    assert!(h.store.load(SPOKE).unwrap().is_none());
}

#[tokio::test]
async fn template_failure_is_fatal_and_persists_nothing() {
    let h = harness();
    let chain = MockChain::new(SPOKE_CHAIN_ID);
    chain.fail_on("deploy:DIBridgedToken");
    let orchestrator = Orchestrator::new(&h.registry, &h.store, &h.config, &chain);

    assert!(orchestrator.deploy_network(SPOKE, false).await.is_err());
    assert!(h.store.load(SPOKE).unwrap().is_none());
    assert!(matches!(
        h.store.get_contract_address(SPOKE, ContractRole::TokenRegistry),
        Err(StoreError::FileMissing(_))
    ));
}

#[tokio::test]
async fn failed_step_leaves_resumable_state() {
    let h = harness();
    let chain = MockChain::new(SPOKE_CHAIN_ID);
    chain.fail_on("deploy:DIGateway");
    let orchestrator = Orchestrator::new(&h.registry, &h.store, &h.config, &chain);

    assert!(orchestrator.deploy_network(SPOKE, false).await.is_err());
    let set = h.store.load(SPOKE).unwrap().unwrap();
    let template = set.get(ContractRole::TokenTemplate).unwrap();
    assert!(set.get(ContractRole::TokenRegistry).is_some());
    assert!(set.get(ContractRole::DiGateway).is_none());

    chain.clear_failure("deploy:DIGateway");
    let report = orchestrator.deploy_network(SPOKE, false).await.unwrap();
    assert!(report.reused.contains(&(ContractRole::TokenTemplate, template)));
    assert_eq!(chain.calls_to("deploy:DIBridgedToken"), 1);
    assert_eq!(chain.calls_to("deploy:DIBridgedTokenRegistry"), 1);
    assert!(
        h.store
            .find_contract_address(SPOKE, ContractRole::DiGateway)
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn per_token_failure_does_not_stop_the_loop() {
    let h = harness();
    let chain = MockChain::new(SPOKE_CHAIN_ID);
    chain.fail_on("adopt_token");
    let orchestrator = Orchestrator::new(&h.registry, &h.store, &h.config, &chain);

    let report = orchestrator.deploy_network(SPOKE, false).await.unwrap();
    assert_eq!(report.token_failures.len(), 1);
    assert_eq!(report.token_failures[0].symbol, "XUSD");

    let data = h.store.get_token_data(SPOKE).unwrap().unwrap();
    assert_eq!(data.tokens.len(), 1);
    assert_eq!(data.tokens[0].symbol, "USDT");
}

#[tokio::test]
async fn rerun_reuses_contracts_and_replaces_token_records() {
    let h = harness();
    let chain = MockChain::new(SPOKE_CHAIN_ID);
    let orchestrator = Orchestrator::new(&h.registry, &h.store, &h.config, &chain);

    let first = orchestrator.deploy_network(SPOKE, false).await.unwrap();
    let second = orchestrator.deploy_network(SPOKE, false).await.unwrap();

    assert!(second.deployed.is_empty());
    assert_eq!(second.reused.len(), ContractRole::CORE.len());
    assert!(second.token_failures.is_empty(), "{:?}", second.token_failures);
    assert_eq!(first.tokens, second.tokens);

    assert_eq!(chain.calls_to("deploy:DIGateway"), 1);
    assert_eq!(chain.calls_to("deploy_bridged_token"), 1);
    assert_eq!(chain.calls_to("set_registry_gateway"), 1);
    assert_eq!(chain.calls_to("add_whitelisted_relayer"), 1);
    assert_eq!(h.store.get_token_data(SPOKE).unwrap().unwrap().tokens.len(), 2);
}

#[tokio::test]
async fn fresh_run_redeploys_and_overwrites() {
    let h = harness();
    let chain = MockChain::new(SPOKE_CHAIN_ID);
    let orchestrator = Orchestrator::new(&h.registry, &h.store, &h.config, &chain);

    orchestrator.deploy_network(SPOKE, false).await.unwrap();
    let old_gateway = h
        .store
        .get_contract_address(SPOKE, ContractRole::DiGateway)
        .unwrap();

    let report = orchestrator.deploy_network(SPOKE, true).await.unwrap();
    assert!(report.reused.is_empty());
    let new_gateway = h
        .store
        .get_contract_address(SPOKE, ContractRole::DiGateway)
        .unwrap();
    assert_ne!(old_gateway, new_gateway);
    assert_eq!(chain.calls_to("deploy:DIGateway"), 2);
}

#[tokio::test]
async fn hub_network_also_deploys_bridge_hub() {
    let h = harness();
    let chain = MockChain::new(HUB_CHAIN_ID);
    let orchestrator = Orchestrator::new(&h.registry, &h.store, &h.config, &chain);
    orchestrator.deploy_network(HUB, false).await.unwrap();

    let hub = h
        .store
        .get_contract_address(HUB, ContractRole::BridgeHub)
        .unwrap();
    let vault = h
        .store
        .get_contract_address(HUB, ContractRole::GasCreditVault)
        .unwrap();
    assert_eq!(chain.state().hub_vault.get(&hub), Some(&vault));

    // No override on the hub: both tokens are bridged there.
    let data = h.store.get_token_data(HUB).unwrap().unwrap();
    assert!(data.tokens.iter().all(|t| t.is_deployed));
}

#[tokio::test]
async fn link_destinations_adds_each_chain_once() {
    let h = harness();
    let hub_chain = MockChain::new(HUB_CHAIN_ID);
    let spoke_chain = MockChain::new(SPOKE_CHAIN_ID);
    Orchestrator::new(&h.registry, &h.store, &h.config, &hub_chain)
        .deploy_network(HUB, false)
        .await
        .unwrap();
    let spoke = Orchestrator::new(&h.registry, &h.store, &h.config, &spoke_chain);
    spoke.deploy_network(SPOKE, false).await.unwrap();

    let first = spoke.link_destinations(SPOKE).await.unwrap();
    assert_eq!(first.applied, 1);

    let second = spoke.link_destinations(SPOKE).await.unwrap();
    assert_eq!(second.applied, 0);
    assert_eq!(second.already_present, 1);
    assert_eq!(spoke_chain.calls_to("add_gateway_chain"), 1);

    let gateway = h
        .store
        .get_contract_address(SPOKE, ContractRole::DiGateway)
        .unwrap();
    assert!(
        spoke_chain
            .state()
            .gateway_chains
            .contains(&(gateway, HUB_CHAIN_ID))
    );
}

#[tokio::test]
async fn link_destinations_skips_networks_without_gateway() {
    let h = harness();
    let chain = MockChain::new(SPOKE_CHAIN_ID);
    let orchestrator = Orchestrator::new(&h.registry, &h.store, &h.config, &chain);
    orchestrator.deploy_network(SPOKE, false).await.unwrap();

    let report = orchestrator.link_destinations(SPOKE).await.unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(report.applied, 0);
}

#[tokio::test]
async fn failed_proxy_keeps_implementation_for_resume() {
    let h = harness();
    let chain = MockChain::new(SPOKE_CHAIN_ID);
    chain.fail_on("deploy:ERC1967Proxy");
    let orchestrator = Orchestrator::new(&h.registry, &h.store, &h.config, &chain);

    assert!(orchestrator.deploy_network(SPOKE, false).await.is_err());
    let implementation = h
        .store
        .find_contract_address(SPOKE, ContractRole::MetaTxGatewayImplementation)
        .unwrap()
        .expect("implementation persisted before the proxy");
    assert_eq!(
        h.store.find_contract_address(SPOKE, ContractRole::MetaTxGateway).unwrap(),
        None
    );

    chain.clear_failure("deploy:ERC1967Proxy");
    let report = orchestrator.deploy_network(SPOKE, false).await.unwrap();
    assert_eq!(chain.calls_to("deploy:MetaTxGateway"), 1);
    assert!(
        report
            .reused
            .contains(&(ContractRole::MetaTxGatewayImplementation, implementation))
    );
    assert_eq!(
        h.store
            .find_contract_address(SPOKE, ContractRole::MetaTxGatewayImplementation)
            .unwrap(),
        Some(implementation)
    );
    assert!(
        h.store
            .find_contract_address(SPOKE, ContractRole::MetaTxGateway)
            .unwrap()
            .is_some()
    );
}
