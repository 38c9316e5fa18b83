//! An in-memory [`Chain`] for exercising the bootstrap sequence without a node.
//!
//! The mock follows the on-chain behavior the sequence depends on: contracts
//! are created at `CREATE` addresses derived from the deployer's nonce, a proxy
//! constructor reverts unless its implementation has code and its initializer
//! names a function of the implementation, the proxy records its implementation
//! and admin in the EIP-1967 slots, calls from the admin are not forwarded, and
//! an initializer can run only once per proxy.

use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, MutexGuard},
};

use alloy_primitives::{Address, Bytes, B256};
use serde_json::json;

use crate::{
    artifacts::Artifact,
    chain::Chain,
    constants::{NUM_BYTES_SELECTOR, PROXY_ADMIN_STORAGE_SLOT, PROXY_IMPLEMENTATION_STORAGE_SLOT},
    errors::ScriptError,
    solidity::decode_proxy_constructor_args,
};

/// A function selector
type Selector = [u8; NUM_BYTES_SELECTOR];

/// The `(implementation, admin, data)` a proxy is constructed with
pub type ProxyConstructorArgs = (Address, Address, Bytes);

/// The mutable state of a [`MockChain`]
#[derive(Default)]
struct MockState {
    /// The deployer's next nonce
    nonce: u64,
    /// The number of transactions submitted, including reverted ones
    submitted: usize,
    /// Code by address
    code: HashMap<Address, Bytes>,
    /// Storage by address and slot
    storage: HashMap<(Address, B256), B256>,
    /// The admin of each proxy
    proxy_admins: HashMap<Address, Address>,
    /// The initializer each proxy was constructed with
    initializers: HashMap<Address, Selector>,
    /// The constructor arguments each proxy was created with
    constructor_args: HashMap<Address, ProxyConstructorArgs>,
}

/// An in-memory chain holding a single kind of proxy contract
pub struct MockChain {
    /// The account deployments are sent from
    deployer: Address,
    /// The accounts the "node" manages
    accounts: Vec<Address>,
    /// Creation code recognized as the proxy's
    proxy_bytecode: Bytes,
    /// Functions exposed by any implementation
    implementation_functions: HashSet<Selector>,
    /// When set, proxies record this admin instead of the requested one
    admin_override: Option<Address>,
    /// When set, initializers may run again
    unguarded_initializer: bool,
    /// The chain state
    state: Mutex<MockState>,
}

impl MockChain {
    /// A chain on which `deployer` sends deployments and proxies are
    /// recognized by their creation code
    pub fn new(deployer: Address, proxy_bytecode: Bytes) -> Self {
        Self {
            deployer,
            accounts: Vec::new(),
            proxy_bytecode,
            implementation_functions: HashSet::new(),
            admin_override: None,
            unguarded_initializer: false,
            state: Mutex::new(MockState::default()),
        }
    }

    /// Set the accounts managed by the node
    pub fn with_accounts(mut self, accounts: Vec<Address>) -> Self {
        self.accounts = accounts;
        self
    }

    /// Expose a function with the given selector on implementations
    pub fn with_implementation_function(mut self, selector: Selector) -> Self {
        self.implementation_functions.insert(selector);
        self
    }

    /// Make proxies record `admin` regardless of their constructor arguments
    pub fn with_admin_override(mut self, admin: Address) -> Self {
        self.admin_override = Some(admin);
        self
    }

    /// Allow initializers to run more than once
    pub fn with_unguarded_initializer(mut self) -> Self {
        self.unguarded_initializer = true;
        self
    }

    /// The number of transactions submitted so far, including reverted ones
    pub fn submitted_transactions(&self) -> usize {
        self.state().submitted
    }

    /// Whether an address holds code
    pub fn has_code(&self, address: Address) -> bool {
        self.state().code.contains_key(&address)
    }

    /// Whether an address is a successfully constructed proxy
    pub fn is_proxy(&self, address: Address) -> bool {
        self.state().proxy_admins.contains_key(&address)
    }

    /// The arguments a successfully constructed proxy was created with
    pub fn proxy_constructor_args(&self, proxy: Address) -> Option<ProxyConstructorArgs> {
        self.state().constructor_args.get(&proxy).cloned()
    }

    /// The address the deployer's next contract will be created at
    pub fn next_contract_address(&self) -> Address {
        self.deployer.create(self.state().nonce)
    }

    /// Lock the chain state
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run a proxy constructor, reverting as the on-chain constructor would
    fn construct_proxy(
        &self,
        state: &mut MockState,
        proxy: Address,
        constructor_args: &[u8],
    ) -> Result<(), ScriptError> {
        let (implementation, admin, data) = decode_proxy_constructor_args(constructor_args)
            .map_err(|e| ScriptError::ContractDeployment(format!("execution reverted: {e}")))?;

        if !state.code.contains_key(&implementation) {
            return Err(ScriptError::ContractDeployment(
                "execution reverted: ERC1967: new implementation is not a contract".to_string(),
            ));
        }

        let initializer = if data.is_empty() {
            None
        } else {
            match selector_of(&data) {
                Some(selector) if self.implementation_functions.contains(&selector) => {
                    Some(selector)
                }
                _ => {
                    return Err(ScriptError::ContractDeployment(
                        "execution reverted: Address: low-level delegate call failed".to_string(),
                    ));
                }
            }
        };

        state.constructor_args.insert(proxy, (implementation, admin, data));

        let admin = self.admin_override.unwrap_or(admin);
        state.code.insert(proxy, self.proxy_bytecode.clone());
        let slots = [
            (PROXY_IMPLEMENTATION_STORAGE_SLOT, implementation.into_word()),
            (PROXY_ADMIN_STORAGE_SLOT, admin.into_word()),
        ];
        for (slot, word) in slots {
            state.storage.insert((proxy, slot), word);
        }
        state.proxy_admins.insert(proxy, admin);
        if let Some(selector) = initializer {
            state.initializers.insert(proxy, selector);
        }

        Ok(())
    }
}

impl Chain for MockChain {
    fn sender(&self) -> Address {
        self.deployer
    }

    async fn accounts(&self) -> Result<Vec<Address>, ScriptError> {
        Ok(self.accounts.clone())
    }

    async fn deploy(&self, creation_code: Bytes) -> Result<Address, ScriptError> {
        let mut state = self.state();
        state.submitted += 1;

        // A reverted creation still consumes the nonce
        let address = self.deployer.create(state.nonce);
        state.nonce += 1;

        match creation_code.strip_prefix(&self.proxy_bytecode[..]) {
            Some(constructor_args) => self.construct_proxy(&mut state, address, constructor_args)?,
            None => {
                state.code.insert(address, creation_code);
            }
        }

        Ok(address)
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, ScriptError> {
        Ok(self.state().code.get(&address).cloned().unwrap_or_default())
    }

    async fn storage_at(&self, address: Address, slot: B256) -> Result<B256, ScriptError> {
        Ok(self.state().storage.get(&(address, slot)).copied().unwrap_or_default())
    }

    async fn simulate_call(
        &self,
        from: Address,
        to: Address,
        calldata: Bytes,
    ) -> Result<Bytes, ScriptError> {
        let state = self.state();
        let Some(admin) = state.proxy_admins.get(&to) else {
            return Ok(Bytes::new());
        };

        if *admin == from {
            return Err(ScriptError::ContractInteraction(
                "execution reverted: admin cannot fallback to proxy target".to_string(),
            ));
        }

        let selector = selector_of(&calldata);
        match selector {
            Some(selector) if !self.implementation_functions.contains(&selector) => {
                Err(ScriptError::ContractInteraction("execution reverted".to_string()))
            }
            Some(selector)
                if !self.unguarded_initializer
                    && state.initializers.get(&to) == Some(&selector) =>
            {
                Err(ScriptError::ContractInteraction(
                    "execution reverted: Initializable: contract is already initialized"
                        .to_string(),
                ))
            }
            _ => Ok(Bytes::new()),
        }
    }
}

/// The selector at the head of some calldata
fn selector_of(calldata: &[u8]) -> Option<Selector> {
    calldata.get(..NUM_BYTES_SELECTOR)?.try_into().ok()
}

// ------------
// | Fixtures |
// ------------

/// An implementation artifact with the given creation code exposing `initialize()`,
/// built with the pinned compiler settings
pub fn implementation_artifact(bytecode: &str) -> Artifact {
    parse_fixture(&implementation_artifact_json(bytecode))
}

/// A transparent upgradeable proxy artifact with the given creation code
pub fn proxy_artifact(bytecode: &str) -> Artifact {
    parse_fixture(&proxy_artifact_json(bytecode))
}

/// The Truffle JSON of [`implementation_artifact`]
pub fn implementation_artifact_json(bytecode: &str) -> String {
    let metadata = json!({ "settings": { "optimizer": { "enabled": true, "runs": 200 } } });
    json!({
        "contractName": "Custodian",
        "abi": [
            {
                "type": "function",
                "name": "initialize",
                "inputs": [],
                "outputs": [],
                "stateMutability": "nonpayable",
            },
        ],
        "bytecode": bytecode,
        "compiler": { "name": "solc", "version": "0.6.12+commit.27d51765.Emscripten.clang" },
        "metadata": metadata.to_string(),
    })
    .to_string()
}

/// The Truffle JSON of [`proxy_artifact`]
pub fn proxy_artifact_json(bytecode: &str) -> String {
    json!({
        "contractName": "TransparentUpgradeableProxy",
        "abi": [
            {
                "type": "constructor",
                "inputs": [
                    { "name": "_logic", "type": "address", "internalType": "address" },
                    { "name": "admin_", "type": "address", "internalType": "address" },
                    { "name": "_data", "type": "bytes", "internalType": "bytes" },
                ],
                "stateMutability": "payable",
            },
            {
                "type": "fallback",
                "stateMutability": "payable",
            },
        ],
        "bytecode": bytecode,
        "compiler": { "name": "solc", "version": "0.6.12+commit.27d51765.Emscripten.clang" },
    })
    .to_string()
}

/// Parse a fixture artifact, which is well-formed by construction
fn parse_fixture(json: &str) -> Artifact {
    match Artifact::from_json(json) {
        Ok(artifact) => artifact,
        Err(e) => panic!("invalid fixture artifact: {e}"),
    }
}
