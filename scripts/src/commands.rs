//! Implementations of the deploy scripts

use std::{path::Path, str::FromStr};

use alloy_primitives::Address;
use tracing::info;

use crate::{
    artifacts::Artifact,
    bootstrap::{bootstrap_proxy, BootstrapPlan},
    chain::Chain,
    cli::{DeployArgs, InspectArgs},
    config::Network,
    constants::CUSTODIAN_PROXY_CONTRACT_KEY,
    deployments::{read_deployed_address, write_deployment},
    eip1967::{read_proxy_slots, ProxySlots},
    errors::ScriptError,
    types::{InitializerPayload, ProxyDeployment},
};

/// Build the deployment plan for a network from the command arguments.
///
/// Everything that can be checked without reaching the chain is checked here:
/// the artifacts, the initializer payload and the administrator.
pub fn deploy_plan(args: &DeployArgs, network: Network) -> Result<BootstrapPlan, ScriptError> {
    let implementation = Artifact::load(&args.build_dir, &args.implementation)?;
    let proxy = Artifact::load(&args.build_dir, &args.proxy_contract)?;
    proxy.check_proxy_constructor()?;

    let initializer = match &args.init_calldata {
        Some(calldata) => InitializerPayload::from_str(calldata)?,
        None => InitializerPayload::default(),
    };

    let mut plan = BootstrapPlan::new(network, implementation, proxy)
        .with_initializer(initializer);
    if let Some(admin) = &args.admin {
        plan = plan.with_admin(admin.as_str());
    }

    plan.validate_admin()?;
    Ok(plan)
}

/// Deploy the implementation and its proxy, then record both in the
/// deployments file.
///
/// The addresses are printed before the file is written, so they are not lost
/// if writing fails.
pub async fn deploy(
    chain: &impl Chain,
    plan: &BootstrapPlan,
    deployments_path: &Path,
) -> Result<ProxyDeployment, ScriptError> {
    let deployment = bootstrap_proxy(chain, plan).await?;

    println!("Implementation contract deployed at {:#x}", deployment.implementation);
    println!("Proxy contract deployed at {:#x}", deployment.proxy);
    println!("Proxy administered by {:#x}", deployment.admin);

    write_deployment(deployments_path, &deployment)?;
    info!("Recorded deployment in {}", deployments_path.display());

    Ok(deployment)
}

/// The proxy to inspect: the one given, or else the one recorded for the
/// network in the deployments file
pub fn inspect_target(
    args: &InspectArgs,
    network: Network,
    deployments_path: &Path,
) -> Result<Address, ScriptError> {
    match &args.proxy {
        Some(proxy) => Address::from_str(proxy.trim()).map_err(|e| {
            ScriptError::Configuration(format!("invalid proxy address `{proxy}`: {e}"))
        }),
        None => read_deployed_address(deployments_path, network, CUSTODIAN_PROXY_CONTRACT_KEY),
    }
}

/// Print the implementation and admin recorded in a proxy's EIP-1967 slots
pub async fn inspect(chain: &impl Chain, proxy: Address) -> Result<ProxySlots, ScriptError> {
    if chain.code_at(proxy).await?.is_empty() {
        return Err(ScriptError::ContractInteraction(format!("no contract at {proxy:#x}")));
    }

    let slots = read_proxy_slots(chain, proxy).await?;
    println!("Proxy contract at {proxy:#x}");
    println!("Implementation contract at {:#x}", slots.implementation);
    println!("Proxy administered by {:#x}", slots.admin);

    Ok(slots)
}
