//! The proxy bootstrap sequence.
//!
//! Deploying the custodian is a strictly ordered, one-shot protocol:
//! 1. Resolve the proxy administrator for the target network
//! 2. Deploy the implementation contract, without initializing it
//! 3. Deploy the proxy with the implementation, the administrator, and the
//!    initializer payload as constructor arguments
//! 4. The proxy's constructor delegate-calls the implementation with the
//!    payload, initializing the proxy's storage
//! 5. Verify the proxy and report its address
//!
//! Any failure aborts the run. An implementation deployed before a failure is
//! left orphaned; a rerun deploys a fresh one.

use std::str::FromStr;

use alloy_primitives::{Address, Bytes};
use tracing::{debug, info, warn};

use crate::{
    artifacts::Artifact,
    chain::Chain,
    config::{AdminPolicy, CompilerPin, Network},
    constants::{ADMIN_ADDRESS_ENV_VAR, REINIT_PROBE_ADDRESSES},
    eip1967::read_proxy_slots,
    errors::ScriptError,
    solidity::proxy_constructor_args,
    types::{InitializerPayload, ProxyDeployment},
};

/// Everything the bootstrap sequence needs, resolved ahead of the run
#[derive(Clone, Debug)]
pub struct BootstrapPlan {
    /// The target network
    pub network: Network,
    /// The administrator supplied by the operator, if any
    pub operator_admin: Option<String>,
    /// The implementation (logic) contract
    pub implementation: Artifact,
    /// The upgradeable proxy contract
    pub proxy: Artifact,
    /// The calldata the proxy invokes its implementation with at construction
    pub initializer: InitializerPayload,
    /// The compiler settings the artifacts are expected to be built with
    pub compiler: CompilerPin,
}

impl BootstrapPlan {
    /// A plan initializing the proxy with `initialize()` and no operator-supplied admin
    pub fn new(network: Network, implementation: Artifact, proxy: Artifact) -> Self {
        Self {
            network,
            operator_admin: None,
            implementation,
            proxy,
            initializer: InitializerPayload::default(),
            compiler: CompilerPin::default(),
        }
    }

    /// Set the operator-supplied administrator
    pub fn with_admin(mut self, admin: impl Into<String>) -> Self {
        self.operator_admin = Some(admin.into());
        self
    }

    /// Set the initializer payload
    pub fn with_initializer(mut self, initializer: InitializerPayload) -> Self {
        self.initializer = initializer;
        self
    }

    /// Check, without reaching the chain, that an administrator can be
    /// resolved for the plan's network
    pub fn validate_admin(&self) -> Result<(), ScriptError> {
        supplied_admin(self.network, self.operator_admin.as_deref()).map(|_| ())
    }
}

/// Run the bootstrap sequence, returning the record of the deployed proxy
pub async fn bootstrap_proxy(
    chain: &impl Chain,
    plan: &BootstrapPlan,
) -> Result<ProxyDeployment, ScriptError> {
    plan.proxy.check_proxy_constructor()?;

    let admin = resolve_admin(chain, plan.network, plan.operator_admin.as_deref()).await?;
    info!(
        "Deploying to `{}` from {:#x}, proxy administrator: {admin:#x}",
        plan.network,
        chain.sender()
    );

    warn_on_plan_issues(plan);

    let implementation = deploy_implementation(chain, &plan.implementation).await?;

    let proxy = deploy_proxy(chain, &plan.proxy, implementation, admin, &plan.initializer)
        .await
        .inspect_err(|e| {
            warn!("Implementation {implementation:#x} is orphaned, proxy deployment failed: {e}")
        })?;

    verify_proxy(chain, proxy, implementation, admin, &plan.initializer).await?;

    Ok(ProxyDeployment {
        network: plan.network,
        implementation,
        proxy,
        admin,
    })
}

/// Resolve the proxy administrator for a network.
///
/// An operator-supplied address always takes precedence. Without one, the
/// development network falls back to the node's first account, and every other
/// network fails: a production proxy is never deployed with an unset admin.
pub async fn resolve_admin(
    chain: &impl Chain,
    network: Network,
    operator_admin: Option<&str>,
) -> Result<Address, ScriptError> {
    if let Some(admin) = supplied_admin(network, operator_admin)? {
        return Ok(admin);
    }

    let accounts = chain.accounts().await?;
    accounts.first().copied().ok_or_else(|| {
        ScriptError::Configuration(format!(
            "network `{network}` uses the first local account as administrator, \
             but the node manages no accounts"
        ))
    })
}

/// The operator-supplied administrator, or `None` if the network falls back to
/// a local account.
///
/// Fails if the network requires an administrator and none is supplied.
pub fn supplied_admin(
    network: Network,
    operator_admin: Option<&str>,
) -> Result<Option<Address>, ScriptError> {
    let operator_admin = operator_admin.map(str::trim).filter(|admin| !admin.is_empty());

    match (network.admin_policy(), operator_admin) {
        (_, Some(admin)) => parse_admin(network, admin).map(Some),
        (AdminPolicy::FirstLocalAccount, None) => Ok(None),
        (AdminPolicy::OperatorSupplied, None) => Err(ScriptError::Configuration(format!(
            "no administrator address configured for network `{network}`, \
             set `{ADMIN_ADDRESS_ENV_VAR}` or pass --admin"
        ))),
    }
}

/// Parse an operator-supplied administrator, rejecting the zero address
fn parse_admin(network: Network, admin: &str) -> Result<Address, ScriptError> {
    let address = Address::from_str(admin).map_err(|e| {
        ScriptError::Configuration(format!(
            "invalid administrator address `{admin}` for network `{network}`: {e}"
        ))
    })?;

    if address.is_zero() {
        return Err(ScriptError::Configuration(format!(
            "the zero address cannot administer the proxy on network `{network}`"
        )));
    }

    Ok(address)
}

/// Log problems with the plan that do not prevent the deployment
fn warn_on_plan_issues(plan: &BootstrapPlan) {
    if let Some(selector) = plan.initializer.selector() {
        if !plan.implementation.has_function(selector) {
            warn!(
                "`{}` has no function with selector {}, proxy construction will likely revert",
                plan.implementation.contract_name,
                Bytes::copy_from_slice(&selector)
            );
        }
    }

    for artifact in [&plan.implementation, &plan.proxy] {
        for mismatch in artifact.compiler_mismatches(&plan.compiler) {
            warn!("`{}`: {mismatch}", artifact.contract_name);
        }
    }
}

/// Deploy the implementation contract with no constructor arguments
async fn deploy_implementation(
    chain: &impl Chain,
    artifact: &Artifact,
) -> Result<Address, ScriptError> {
    info!("Deploying implementation `{}`", artifact.contract_name);
    let address = chain.deploy(artifact.bytecode.clone()).await?;

    if chain.code_at(address).await?.is_empty() {
        return Err(ScriptError::ContractDeployment(format!(
            "no code at implementation address {address:#x}"
        )));
    }

    info!("Implementation `{}` deployed at {address:#x}", artifact.contract_name);
    Ok(address)
}

/// Deploy the proxy, which initializes itself through the implementation
async fn deploy_proxy(
    chain: &impl Chain,
    artifact: &Artifact,
    implementation: Address,
    admin: Address,
    initializer: &InitializerPayload,
) -> Result<Address, ScriptError> {
    info!(
        "Deploying proxy `{}` for {implementation:#x} with initializer {initializer}",
        artifact.contract_name
    );

    let constructor_args = proxy_constructor_args(implementation, admin, initializer.calldata());
    let creation_code = Bytes::from([&artifact.bytecode[..], &constructor_args[..]].concat());

    let address = chain.deploy(creation_code).await?;
    info!("Proxy `{}` deployed at {address:#x}", artifact.contract_name);

    Ok(address)
}

/// Check that the proxy delegates to the implementation, is administered by
/// the admin, and cannot be initialized a second time
async fn verify_proxy(
    chain: &impl Chain,
    proxy: Address,
    implementation: Address,
    admin: Address,
    initializer: &InitializerPayload,
) -> Result<(), ScriptError> {
    let slots = read_proxy_slots(chain, proxy).await?;

    if slots.implementation != implementation {
        return Err(ScriptError::ContractDeployment(format!(
            "proxy {proxy:#x} delegates to {:#x}, expected {implementation:#x}",
            slots.implementation
        )));
    }

    if slots.admin != admin {
        return Err(ScriptError::ContractDeployment(format!(
            "proxy {proxy:#x} is administered by {:#x}, expected {admin:#x}",
            slots.admin
        )));
    }

    if initializer.is_empty() {
        return Ok(());
    }

    let probe = reinit_probe(admin);
    match chain.simulate_call(probe, proxy, initializer.calldata().clone()).await {
        Ok(_) => Err(ScriptError::ContractDeployment(format!(
            "proxy {proxy:#x} accepts its initializer a second time"
        ))),
        Err(ScriptError::ContractInteraction(reason)) => {
            debug!("Second initialization of {proxy:#x} rejected: {reason}");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// An address other than the admin, from which a second initialization is simulated
fn reinit_probe(admin: Address) -> Address {
    let [first, second] = REINIT_PROBE_ADDRESSES;
    if admin == first {
        second
    } else {
        first
    }
}
