//! End-to-end runs of the bootstrap sequence against an in-memory chain

use std::str::FromStr;

use alloy_primitives::{address, bytes, Address, Bytes};
use custodian_scripts::{
    bootstrap::{bootstrap_proxy, BootstrapPlan},
    chain::Chain,
    config::{Network, RunConfig},
    constants::REINIT_PROBE_ADDRESSES,
    eip1967::read_proxy_slots,
    errors::{ErrorKind, ScriptError},
    mock::{implementation_artifact, proxy_artifact, MockChain},
    types::InitializerPayload,
};
use eyre::Result;

const DEPLOYER: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
const ACCOUNT_A: Address = address!("70997970c51812dc3a010c7d01b50e0d17dc79c8");
const ACCOUNT_B: Address = address!("3c44cdddb6a900fa2b585dd299e03d12fa4293bc");
const OPERATOR_ADMIN: Address = address!("90f79bf6eb2c4f870365e785982e1f101e93b906");
const STRANGER: Address = address!("15d34aaf54267db7d7c367839aaf71a00a2c6a65");

const IMPLEMENTATION_BYTECODE: &str = "0x600a600c600039600a6000f3";
const PROXY_BYTECODE: &str = "0x6080604052";

/// The `initialize()` selector
const INITIALIZE: [u8; 4] = [0x81, 0x29, 0xfc, 0x1c];

/// A node managing two accounts, whose implementations expose `initialize()`
fn chain() -> MockChain {
    MockChain::new(DEPLOYER, Bytes::from_str(PROXY_BYTECODE).unwrap())
        .with_accounts(vec![ACCOUNT_A, ACCOUNT_B])
        .with_implementation_function(INITIALIZE)
}

fn plan(network: Network) -> BootstrapPlan {
    BootstrapPlan::new(
        network,
        implementation_artifact(IMPLEMENTATION_BYTECODE),
        proxy_artifact(PROXY_BYTECODE),
    )
}

#[tokio::test]
async fn test_development_bootstrap() -> Result<()> {
    let chain = chain();
    assert_eq!(chain.sender(), DEPLOYER);
    let expected_implementation = chain.sender().create(0);
    let expected_proxy = chain.sender().create(1);

    let deployment = bootstrap_proxy(&chain, &plan(Network::Development)).await?;

    assert_eq!(deployment.network, Network::Development);
    assert_eq!(deployment.implementation, expected_implementation);
    assert_eq!(deployment.proxy, expected_proxy);
    assert_eq!(deployment.admin, ACCOUNT_A);
    assert_eq!(chain.submitted_transactions(), 2);

    let (implementation, admin, data) =
        chain.proxy_constructor_args(deployment.proxy).expect("proxy was constructed");
    assert_eq!(implementation, expected_implementation);
    assert_eq!(admin, ACCOUNT_A);
    assert_eq!(data, bytes!("8129fc1c"));

    let slots = read_proxy_slots(&chain, deployment.proxy).await?;
    assert_eq!(slots.implementation, deployment.implementation);
    assert_eq!(slots.admin, ACCOUNT_A);

    Ok(())
}

#[tokio::test]
async fn test_operator_admin_on_mainnet() -> Result<()> {
    let chain = chain();
    let plan = plan(Network::Mainnet).with_admin(format!("{OPERATOR_ADMIN:#x}"));

    let deployment = bootstrap_proxy(&chain, &plan).await?;
    assert_eq!(deployment.admin, OPERATOR_ADMIN);

    let slots = read_proxy_slots(&chain, deployment.proxy).await?;
    assert_eq!(slots.admin, OPERATOR_ADMIN);

    Ok(())
}

#[tokio::test]
async fn test_missing_admin_sends_nothing() {
    for admin in [None, Some(""), Some("  ")] {
        let chain = chain();
        let mut plan = plan(Network::Kovan);
        if let Some(admin) = admin {
            plan = plan.with_admin(admin);
        }

        let err = bootstrap_proxy(&chain, &plan).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration, "{err}");
        assert_eq!(chain.submitted_transactions(), 0);
    }
}

#[test]
fn test_unknown_network_is_rejected() {
    let err = Network::from_str("ropsten").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let err = RunConfig::resolve("ropsten", None, None).unwrap_err();
    assert!(matches!(err, ScriptError::Configuration(_)));
}

#[tokio::test]
async fn test_malformed_initializer_orphans_implementation() {
    let chain = chain();
    let initializer = InitializerPayload::new(bytes!("deadbeef"));
    let plan = plan(Network::Development).with_initializer(initializer);

    let implementation = chain.next_contract_address();
    let err = bootstrap_proxy(&chain, &plan).await.unwrap_err();
    assert!(matches!(err, ScriptError::ContractDeployment(_)), "{err}");
    assert_eq!(err.kind(), ErrorKind::Deployment);

    // The implementation stays on chain, the proxy was never constructed
    assert!(chain.has_code(implementation));
    assert!(!chain.is_proxy(DEPLOYER.create(1)));
    assert_eq!(chain.submitted_transactions(), 2);
}

#[tokio::test]
async fn test_rerun_deploys_a_fresh_implementation() -> Result<()> {
    let chain = chain();
    let malformed = plan(Network::Development)
        .with_initializer(InitializerPayload::new(bytes!("deadbeef")));
    bootstrap_proxy(&chain, &malformed).await.unwrap_err();

    let deployment = bootstrap_proxy(&chain, &plan(Network::Development)).await?;
    assert_eq!(deployment.implementation, DEPLOYER.create(2));
    assert_eq!(deployment.proxy, DEPLOYER.create(3));

    Ok(())
}

#[tokio::test]
async fn test_second_initialization_is_rejected() -> Result<()> {
    let chain = chain();
    let deployment = bootstrap_proxy(&chain, &plan(Network::Development)).await?;

    let initializer = InitializerPayload::default();
    let err = chain
        .simulate_call(STRANGER, deployment.proxy, initializer.calldata().clone())
        .await
        .unwrap_err();
    assert!(matches!(err, ScriptError::ContractInteraction(_)));

    Ok(())
}

#[tokio::test]
async fn test_reinitializable_proxy_fails_verification() {
    let chain = chain().with_unguarded_initializer();

    let err = bootstrap_proxy(&chain, &plan(Network::Development)).await.unwrap_err();
    assert!(matches!(err, ScriptError::ContractDeployment(_)), "{err}");
}

#[tokio::test]
async fn test_reinitializable_proxy_fails_verification_for_any_admin() {
    let chain = chain().with_unguarded_initializer();
    let probe = REINIT_PROBE_ADDRESSES[0];
    let plan = plan(Network::Development).with_admin(format!("{probe:#x}"));

    let err = bootstrap_proxy(&chain, &plan).await.unwrap_err();
    assert!(matches!(err, ScriptError::ContractDeployment(_)), "{err}");
}

#[tokio::test]
async fn test_wrong_admin_fails_verification() {
    let chain = chain().with_admin_override(ACCOUNT_B);

    let err = bootstrap_proxy(&chain, &plan(Network::Development)).await.unwrap_err();
    assert!(matches!(err, ScriptError::ContractDeployment(_)), "{err}");
}

#[tokio::test]
async fn test_uninitialized_proxy() -> Result<()> {
    let chain = chain();
    let plan = plan(Network::Development).with_initializer(InitializerPayload::empty());

    let deployment = bootstrap_proxy(&chain, &plan).await?;
    assert!(chain.is_proxy(deployment.proxy));

    Ok(())
}

#[tokio::test]
async fn test_proxy_without_constructor_is_rejected() {
    let chain = chain();
    let plan = BootstrapPlan::new(
        Network::Development,
        implementation_artifact(IMPLEMENTATION_BYTECODE),
        implementation_artifact(PROXY_BYTECODE),
    );

    let err = bootstrap_proxy(&chain, &plan).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(chain.submitted_transactions(), 0);
}
