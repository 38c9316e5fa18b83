//! Access to the target chain.
//!
//! The bootstrap sequence only talks to the chain through [`Chain`], so it can
//! be exercised against an in-memory chain in tests.

use std::{str::FromStr, time::Duration};

use alloy::{
    network::{Ethereum, EthereumWallet, TransactionBuilder},
    providers::{
        fillers::{ChainIdFiller, GasFiller},
        DynProvider, Provider, ProviderBuilder,
    },
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    transports::{http::reqwest::Url, RpcError, TransportErrorKind},
};
use alloy_primitives::{Address, Bytes, B256, U256};
use tracing::{debug, info};

use crate::{
    config::{Credentials, GasSettings, Network, RunConfig},
    errors::ScriptError,
};

/// The chain operations needed to deploy and inspect a proxy
#[allow(async_fn_in_trait)]
pub trait Chain {
    /// The account deployment transactions are sent from
    fn sender(&self) -> Address;

    /// The accounts managed by the node
    async fn accounts(&self) -> Result<Vec<Address>, ScriptError>;

    /// Send a contract creation transaction with the given creation code,
    /// returning the address of the created contract once the transaction is mined.
    ///
    /// A reverted creation is a [`ScriptError::ContractDeployment`].
    async fn deploy(&self, creation_code: Bytes) -> Result<Address, ScriptError>;

    /// The runtime code at an address
    async fn code_at(&self, address: Address) -> Result<Bytes, ScriptError>;

    /// The word stored at a storage slot of an address
    async fn storage_at(&self, address: Address, slot: B256) -> Result<B256, ScriptError>;

    /// Execute a call against the latest state without submitting a transaction.
    ///
    /// A reverted call is a [`ScriptError::ContractInteraction`].
    async fn simulate_call(
        &self,
        from: Address,
        to: Address,
        calldata: Bytes,
    ) -> Result<Bytes, ScriptError>;
}

/// A [`Chain`] reached over JSON-RPC
pub struct RpcChain {
    /// The provider, with nonce, gas, and signing fillers layered in
    provider: DynProvider,
    /// The deployer account
    sender: Address,
    /// Gas parameters for deployments
    gas: GasSettings,
    /// The number of confirmations to wait for on each deployment
    confirmations: u64,
    /// How long to wait for each deployment to be mined
    timeout: Duration,
}

impl RpcChain {
    /// Connect to the node described by the run configuration.
    ///
    /// Checks that the node reports the network's chain ID, and determines the
    /// sender: the private key's account, or else the node's first managed account.
    pub async fn connect(config: &RunConfig) -> Result<Self, ScriptError> {
        let url = Url::parse(&config.rpc_url).map_err(|e| {
            ScriptError::Configuration(format!("invalid RPC URL `{}`: {e}", config.rpc_url))
        })?;

        let chain_id = ProviderBuilder::<_, _, Ethereum>::default()
            .on_http(url.clone())
            .get_chain_id()
            .await
            .map_err(|e| network_error(&config.rpc_url, e))?;
        check_chain_id(config.network, config.chain_id, chain_id)?;

        // Nonces are tracked locally so that consecutive deployments from the
        // same account are submitted in order
        let (provider, sender) = match &config.credentials {
            Credentials::PrivateKey(key) => {
                let signer = PrivateKeySigner::from_str(key.trim())
                    .map_err(|e| ScriptError::Configuration(format!("invalid private key: {e}")))?;
                let sender = signer.address();

                let provider = ProviderBuilder::default()
                    .with_cached_nonce_management()
                    .filler(GasFiller)
                    .filler(ChainIdFiller::new(Some(chain_id)))
                    .wallet(EthereumWallet::from(signer))
                    .on_http(url);

                (DynProvider::new(provider), sender)
            }
            Credentials::NodeManaged => {
                let provider = ProviderBuilder::default()
                    .with_cached_nonce_management()
                    .filler(GasFiller)
                    .filler(ChainIdFiller::new(Some(chain_id)))
                    .on_http(url);

                let accounts = provider
                    .get_accounts()
                    .await
                    .map_err(|e| network_error(&config.rpc_url, e))?;
                let sender = accounts.first().copied().ok_or_else(|| {
                    ScriptError::Configuration(format!(
                        "no private key given and the node at {} manages no accounts",
                        config.rpc_url
                    ))
                })?;

                (DynProvider::new(provider), sender)
            }
        };

        info!("Connected to `{}` (chain {chain_id}) as {sender:#x}", config.network);

        Ok(Self {
            provider,
            sender,
            gas: config.gas,
            confirmations: config.confirmations,
            timeout: config.timeout,
        })
    }
}

impl Chain for RpcChain {
    fn sender(&self) -> Address {
        self.sender
    }

    async fn accounts(&self) -> Result<Vec<Address>, ScriptError> {
        self.provider
            .get_accounts()
            .await
            .map_err(|e| classify_rpc_error(e, ScriptError::ContractInteraction))
    }

    async fn deploy(&self, creation_code: Bytes) -> Result<Address, ScriptError> {
        let mut tx = TransactionRequest::default()
            .with_from(self.sender)
            .with_deploy_code(creation_code)
            .with_gas_limit(self.gas.gas_limit);
        if let Some(gas_price) = self.gas.gas_price {
            tx.set_gas_price(gas_price);
        }

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| classify_rpc_error(e, ScriptError::ContractDeployment))?;
        let tx_hash = *pending.tx_hash();
        debug!("Submitted deployment transaction {tx_hash:#x}");

        let receipt = pending
            .with_required_confirmations(self.confirmations)
            .with_timeout(Some(self.timeout))
            .get_receipt()
            .await
            .map_err(|e| {
                ScriptError::ContractDeployment(format!("transaction {tx_hash:#x} not mined: {e}"))
            })?;

        if !receipt.status() {
            return Err(ScriptError::ContractDeployment(format!(
                "transaction {tx_hash:#x} reverted"
            )));
        }

        receipt.contract_address.ok_or_else(|| {
            ScriptError::ContractDeployment(format!(
                "transaction {tx_hash:#x} did not create a contract"
            ))
        })
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, ScriptError> {
        self.provider
            .get_code_at(address)
            .await
            .map_err(|e| classify_rpc_error(e, ScriptError::ContractInteraction))
    }

    async fn storage_at(&self, address: Address, slot: B256) -> Result<B256, ScriptError> {
        let word = self
            .provider
            .get_storage_at(address, U256::from_be_bytes(slot.0))
            .await
            .map_err(|e| classify_rpc_error(e, ScriptError::ContractInteraction))?;

        Ok(B256::from(word.to_be_bytes::<32>()))
    }

    async fn simulate_call(
        &self,
        from: Address,
        to: Address,
        calldata: Bytes,
    ) -> Result<Bytes, ScriptError> {
        let tx = TransactionRequest::default().with_from(from).with_to(to).with_input(calldata);

        self.provider
            .call(&tx)
            .await
            .map_err(|e| classify_rpc_error(e, ScriptError::ContractInteraction))
    }
}

/// Ensure the node is on the chain the network expects, if it expects one
fn check_chain_id(network: Network, expected: Option<u64>, actual: u64) -> Result<(), ScriptError> {
    match expected {
        Some(expected) if expected != actual => Err(ScriptError::Configuration(format!(
            "network `{network}` expects chain {expected}, but the node reports chain {actual}"
        ))),
        _ => Ok(()),
    }
}

/// Map a failure to reach the node
fn network_error(rpc_url: &str, err: RpcError<TransportErrorKind>) -> ScriptError {
    ScriptError::Network(format!("{rpc_url}: {err}"))
}

/// Map an RPC error, separating transport failures from errors returned by the node
fn classify_rpc_error(
    err: RpcError<TransportErrorKind>,
    node_error: fn(String) -> ScriptError,
) -> ScriptError {
    match err {
        RpcError::Transport(kind) => ScriptError::Network(kind.to_string()),
        other => node_error(other.to_string()),
    }
}
