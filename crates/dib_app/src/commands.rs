use anyhow::{Context, Result};
use dib_chain::{ChainClient, EvmClient, EvmClientOptions, RpcConfigStore};
use dib_core::{ConfigError, DibConfig, NetworkRegistry};
use dib_deploy::{Orchestrator, PassReport, Reconciler};
use dib_store::AddressStore;
use tracing::info;

use crate::{Command, InspectTarget};

struct Session {
    config: DibConfig,
    registry: NetworkRegistry,
    store: AddressStore,
    rpc: RpcConfigStore,
    rpc_override: Option<String>,
}

impl Session {
    fn new(config: DibConfig, rpc_override: Option<String>) -> Result<Self> {
        let registry = config.load_registry().context("loading network registry")?;
        let store = AddressStore::new(&config.store_dir);
        let rpc = RpcConfigStore::from_registry(&registry);
        Ok(Self {
            config,
            registry,
            store,
            rpc,
            rpc_override,
        })
    }

    /// Endpoint for `network`, honouring `--rpc-url`.
    fn endpoint(&mut self, network: &str) -> Result<String> {
        if let Some(url) = self.rpc_override.take() {
            self.rpc.set_custom_rpc(network, url)?;
        }
        Ok(self.rpc.require_rpc(network)?.url.clone())
    }

    fn signing_client(&mut self, network: &str) -> Result<EvmClient> {
        self.registry.require_enabled(network)?;
        let url = self.endpoint(network)?;
        let key = self.config.private_key()?;
        let client = EvmClient::connect(&url, &key, EvmClientOptions::from_config(&self.config))?;
        info!(network, sender = ?client.sender(), "connected");
        Ok(client)
    }

    fn read_only_client(&mut self, network: &str) -> Result<EvmClient> {
        self.registry.describe_network(network)?;
        let url = self.endpoint(network)?;
        Ok(EvmClient::read_only(
            &url,
            EvmClientOptions::from_config(&self.config),
        )?)
    }
}

pub(crate) async fn run(command: Command, config: DibConfig, rpc_override: Option<String>) -> Result<()> {
    let mut ctx = Session::new(config, rpc_override)?;

    match command {
        Command::Networks => print_networks(&ctx),
        Command::Deploy { network, fresh } => {
            let client = ctx.signing_client(&network)?;
            let report = Orchestrator::new(&ctx.registry, &ctx.store, &ctx.config, &client)
                .deploy_network(&network, fresh)
                .await?;
            println!("{network} (chain {})", report.chain_id);
            for (role, address) in &report.deployed {
                println!("  deployed  {:<30} {address}", role.as_str());
            }
            for (role, address) in &report.reused {
                println!("  reused    {:<30} {address}", role.as_str());
            }
            for token in &report.tokens {
                let kind = if token.is_deployed { "bridged" } else { "adopted" };
                println!("  token     {:<30} {} ({kind})", token.symbol, token.address);
            }
            for failure in &report.token_failures {
                println!("  FAILED    {:<30} {}", failure.symbol, failure.error);
            }
            Ok(())
        }
        Command::Link { network } => {
            let client = ctx.signing_client(&network)?;
            let report = Orchestrator::new(&ctx.registry, &ctx.store, &ctx.config, &client)
                .link_destinations(&network)
                .await?;
            print_pass("destinations", &report);
            Ok(())
        }
        Command::Reconcile { network } => {
            let client = ctx.signing_client(&network)?;
            let report = Reconciler::new(&ctx.registry, &ctx.store, &ctx.config, &client)
                .run(&network)
                .await?;
            print_pass("chains", &report.chains);
            print_pass("tokens", &report.tokens);
            if let Some(whitelist) = &report.whitelist {
                print_pass("whitelist", whitelist);
            }
            Ok(())
        }
        Command::Verify { network } => {
            let client = ctx.read_only_client(&network)?;
            let report =
                dib_deploy::verify_gateway(&ctx.registry, &ctx.store, &client, &network).await?;
            println!("gateway            {}", report.gateway);
            println!("  owner            {}", report.info.owner);
            println!("  bridge fee (bps) {}", report.info.bridge_fee);
            println!("  fee receiver     {}", report.info.fee_receiver);
            println!("  token registry   {}", report.info.token_registry);
            println!(
                "  registry link    {} ({})",
                report.registry_gateway,
                if report.registry_points_back() { "ok" } else { "MISMATCH" }
            );
            println!(
                "  code size        gateway {} bytes, registry {} bytes",
                report.gateway_code_size, report.registry_code_size
            );
            for (key, chain_id, supported) in &report.supported_chains {
                println!("  supports {key:<24} {chain_id:>8} {supported}");
            }
            Ok(())
        }
        Command::Status => {
            for summary in dib_deploy::summarize_store(&ctx.store)? {
                if let Some(err) = &summary.error {
                    println!("{:<24} unreadable: {err}", summary.network);
                    continue;
                }
                let missing: Vec<String> = summary.missing.iter().map(|r| r.to_string()).collect();
                println!(
                    "{:<24} {}/{} core roles, {} tokens{}{}",
                    summary.network,
                    summary.present.len(),
                    summary.present.len() + summary.missing.len(),
                    summary.token_count,
                    summary
                        .timestamp
                        .map(|t| format!(", updated {}", t.to_rfc3339()))
                        .unwrap_or_default(),
                    if missing.is_empty() {
                        String::new()
                    } else {
                        format!(", missing {}", missing.join(", "))
                    },
                );
            }
            Ok(())
        }
        Command::GasLimits => {
            let options = EvmClientOptions::from_config(&ctx.config);
            let readings = dib_deploy::gas_limits(&ctx.registry, &ctx.rpc, |endpoint| {
                EvmClient::read_only(&endpoint.url, options.clone())
                    .map(|client| Box::new(client) as Box<dyn ChainClient>)
            })
            .await;
            for reading in readings {
                match reading.gas_limit {
                    Ok(limit) => println!("{:<24} {:>8} {limit}", reading.network, reading.chain_id),
                    Err(err) => println!("{:<24} {:>8} error: {err}", reading.network, reading.chain_id),
                }
            }
            Ok(())
        }
        Command::Inspect {
            target: InspectTarget::Tokens { network },
        } => {
            let client = ctx.read_only_client(&network)?;
            let tokens =
                dib_deploy::registry_tokens(&ctx.registry, &ctx.store, &client, &network).await?;
            for token in &tokens {
                let kind = if token.is_deployed { "bridged" } else { "adopted" };
                println!(
                    "{:<8} {:>2} decimals  {}  {kind}, origin {}@{}",
                    token.symbol, token.decimals, token.token, token.origin_symbol, token.origin_chain_id
                );
            }
            println!("{} tokens", tokens.len());
            Ok(())
        }
        Command::Inspect {
            target: InspectTarget::Chains,
        } => {
            let hub = ctx
                .registry
                .find_bridge_hub()
                .ok_or(ConfigError::NoBridgeHub)?
                .key
                .clone();
            let client = ctx.read_only_client(&hub)?;
            let chains = dib_deploy::hub_chains(&ctx.registry, &ctx.store, &client).await?;
            for chain in &chains {
                println!("{:>8} {:<24} rpc {}", chain.chain_id, chain.name, chain.rpc_key);
                println!("    gateway          {}", chain.gateway);
                println!("    gas credit vault {}", chain.gas_credit_vault);
                println!("    meta-tx gateway  {}", chain.meta_tx_gateway);
            }
            println!("{} chains", chains.len());
            Ok(())
        }
    }
}

fn print_networks(ctx: &Session) -> Result<()> {
    let hub = ctx.registry.find_bridge_hub().map(|n| n.key.as_str());
    for network in ctx.registry.networks() {
        let status = if network.enabled { "enabled" } else { "disabled" };
        let marker = if hub == Some(network.key.as_str()) { " [hub]" } else { "" };
        let rpc = if ctx.rpc.get_rpc(&network.key).is_some() { "rpc ok" } else { "no rpc" };
        println!(
            "{:<24} {:>8} {status:<8} {rpc}{marker}",
            network.key, network.chain_id
        );
        if !network.enabled {
            continue;
        }
        for token in ctx.registry.resolve_tokens_for_network(&network.key)? {
            match token.address {
                Some(address) => println!(
                    "    {:<8} {:>2} decimals  {address}",
                    token.symbol, token.decimals
                ),
                None => println!(
                    "    {:<8} {:>2} decimals  to be bridged as \"{}\"",
                    token.symbol, token.decimals, token.name
                ),
            }
        }
    }
    Ok(())
}

fn print_pass(name: &str, report: &PassReport) {
    println!("{name:<12} {report}");
    for failure in &report.failures {
        println!("  FAILED {failure}");
    }
}
