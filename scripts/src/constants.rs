//! Constants used in the deploy scripts

use std::time::Duration;

use alloy_primitives::{address, b256, Address, B256};

/// The default number of confirmations to wait for a deployment transaction,
/// i.e. inclusion in a block
pub const NUM_DEPLOY_CONFIRMATIONS: u64 = 1;

/// The default time to wait for a deployment transaction to be mined
pub const DEFAULT_DEPLOY_TIMEOUT: Duration = Duration::from_secs(120);

/// The storage slot containing the implementation address in the upgradeable proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#logic-contract-address
pub const PROXY_IMPLEMENTATION_STORAGE_SLOT: B256 =
    b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// The storage slot containing the admin address in the upgradeable proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#admin-address
pub const PROXY_ADMIN_STORAGE_SLOT: B256 =
    b256!("b53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103");

/// The number of bytes stored in a single storage slot
pub const NUM_BYTES_STORAGE_SLOT: usize = 32;

/// The number of bytes in an Ethereum address
pub const NUM_BYTES_ADDRESS: usize = 20;

/// The number of bytes in a Solidity function selector
pub const NUM_BYTES_SELECTOR: usize = 4;

/// Addresses from which a second initialization of the proxy is simulated.
///
/// The first one that is not the proxy's admin is used, since a transparent
/// proxy does not forward calls made by its admin.
pub const REINIT_PROBE_ADDRESSES: [Address; 2] = [
    address!("000000000000000000000000000000000000dead"),
    address!("000000000000000000000000000000000000beef"),
];

/// The default directory holding Truffle build artifacts
pub const DEFAULT_BUILD_DIR: &str = "build/contracts";

/// The extension of a Truffle build artifact
pub const ARTIFACT_EXTENSION: &str = "json";

/// The default name of the implementation contract
pub const DEFAULT_IMPLEMENTATION_CONTRACT: &str = "Custodian";

/// The default name of the proxy contract
pub const DEFAULT_PROXY_CONTRACT: &str = "TransparentUpgradeableProxy";

/// The Solidity types of the proxy constructor's parameters,
/// i.e. `(address _logic, address admin_, bytes _data)`
pub const PROXY_CONSTRUCTOR_PARAM_TYPES: [&str; 3] = ["address", "address", "bytes"];

/// The placeholder prefix solc leaves in bytecode for unlinked libraries
pub const UNLINKED_LIBRARY_MARKER: &str = "__";

/// The pinned Solidity compiler major version
pub const SOLC_VERSION_MAJOR: u64 = 0;

/// The pinned Solidity compiler minor version, i.e. `^0.6.0`
pub const SOLC_VERSION_MINOR: u64 = 6;

/// The pinned number of optimizer runs
pub const SOLC_OPTIMIZER_RUNS: u64 = 200;

/// The default gas limit for deployment transactions
pub const DEFAULT_GAS_LIMIT: u64 = 5_000_000;

/// One gwei, in wei
pub const GWEI: u128 = 1_000_000_000;

/// The host on which local and forked nodes listen
pub const LOCAL_HOST: &str = "localhost";

/// The port on which local and forked nodes listen
pub const LOCAL_PORT: u16 = 8545;

/// The chain ID of the Kovan testnet
pub const KOVAN_CHAIN_ID: u64 = 42;

/// The chain ID of Ethereum mainnet
pub const MAINNET_CHAIN_ID: u64 = 1;

/// The environment variable holding the deployer's private key
pub const PRIVATE_KEY_ENV_VAR: &str = "PRIVATE_KEY";

/// The environment variable holding the RPC endpoint of remote networks
pub const RPC_URL_ENV_VAR: &str = "RPC_URL";

/// The environment variable holding the operator-supplied administrator address
pub const ADMIN_ADDRESS_ENV_VAR: &str = "ADMIN_ADDRESS";

/// The deployments key in the `deployments.json` file
pub const DEPLOYMENTS_KEY: &str = "deployments";

/// The custodian implementation contract key in the `deployments.json` file
pub const CUSTODIAN_CONTRACT_KEY: &str = "custodian_contract";

/// The custodian proxy contract key in the `deployments.json` file
pub const CUSTODIAN_PROXY_CONTRACT_KEY: &str = "custodian_proxy_contract";

/// The custodian proxy administrator key in the `deployments.json` file
pub const CUSTODIAN_PROXY_ADMIN_KEY: &str = "custodian_proxy_admin";
