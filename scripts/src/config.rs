//! Network table and run configuration for the deploy scripts.
//!
//! All process-wide settings (network parameters, credentials read from the
//! environment) are resolved here into a [`RunConfig`] which is passed
//! explicitly to the chain client and the bootstrap sequence.

use std::{
    fmt::{self, Display},
    str::FromStr,
    time::Duration,
};

use crate::{
    constants::{
        DEFAULT_DEPLOY_TIMEOUT, DEFAULT_GAS_LIMIT, GWEI, KOVAN_CHAIN_ID, LOCAL_HOST, LOCAL_PORT,
        MAINNET_CHAIN_ID, NUM_DEPLOY_CONFIRMATIONS, PRIVATE_KEY_ENV_VAR, RPC_URL_ENV_VAR,
        SOLC_OPTIMIZER_RUNS, SOLC_VERSION_MAJOR, SOLC_VERSION_MINOR,
    },
    errors::ScriptError,
};

// ------------
// | Networks |
// ------------

/// The networks the custodian may be deployed to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Network {
    /// A local development node, e.g. ganache
    Development,
    /// The Kovan testnet
    Kovan,
    /// A local fork of the Kovan testnet
    KovanFork,
    /// Ethereum mainnet
    Mainnet,
    /// A local fork of Ethereum mainnet
    MainnetFork,
}

impl Network {
    /// Every known network
    pub const ALL: [Network; 5] = [
        Network::Development,
        Network::Kovan,
        Network::KovanFork,
        Network::Mainnet,
        Network::MainnetFork,
    ];

    /// The name by which the network is selected
    pub fn name(&self) -> &'static str {
        match self {
            Network::Development => "development",
            Network::Kovan => "kovan",
            Network::KovanFork => "kovan-fork",
            Network::Mainnet => "mainnet",
            Network::MainnetFork => "mainnet-fork",
        }
    }

    /// Whether this is the local development network
    pub fn is_development(&self) -> bool {
        matches!(self, Network::Development)
    }

    /// The connection and gas parameters of the network
    pub fn config(&self) -> NetworkConfig {
        let local = Endpoint::Local {
            host: LOCAL_HOST.to_string(),
            port: LOCAL_PORT,
        };
        match self {
            Network::Development => NetworkConfig {
                endpoint: local,
                chain_id: None,
                gas_limit: DEFAULT_GAS_LIMIT,
                gas_price: None,
            },
            Network::Kovan => NetworkConfig {
                endpoint: Endpoint::Remote,
                chain_id: Some(KOVAN_CHAIN_ID),
                gas_limit: DEFAULT_GAS_LIMIT,
                gas_price: Some(GWEI),
            },
            Network::KovanFork => NetworkConfig {
                endpoint: local,
                chain_id: Some(KOVAN_CHAIN_ID),
                gas_limit: DEFAULT_GAS_LIMIT,
                gas_price: Some(GWEI),
            },
            Network::Mainnet => NetworkConfig {
                endpoint: Endpoint::Remote,
                chain_id: Some(MAINNET_CHAIN_ID),
                gas_limit: DEFAULT_GAS_LIMIT,
                gas_price: Some(20 * GWEI),
            },
            Network::MainnetFork => NetworkConfig {
                endpoint: local,
                chain_id: Some(MAINNET_CHAIN_ID),
                gas_limit: DEFAULT_GAS_LIMIT,
                gas_price: Some(20 * GWEI),
            },
        }
    }

    /// How the proxy administrator is chosen on this network
    pub fn admin_policy(&self) -> AdminPolicy {
        match self {
            Network::Development => AdminPolicy::FirstLocalAccount,
            Network::Kovan | Network::KovanFork | Network::Mainnet | Network::MainnetFork => {
                AdminPolicy::OperatorSupplied
            }
        }
    }
}

impl FromStr for Network {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Network::ALL.into_iter().find(|network| network.name() == s).ok_or_else(|| {
            let known: Vec<&str> = Network::ALL.iter().map(Network::name).collect();
            ScriptError::Configuration(format!(
                "unrecognized network `{s}`, expected one of: {}",
                known.join(", ")
            ))
        })
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Where a network's node is reached
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Endpoint {
    /// A node listening locally
    Local {
        /// The node's host
        host: String,
        /// The node's port
        port: u16,
    },
    /// A remote node whose URL is supplied through the environment
    Remote,
}

/// Connection and gas parameters of a network
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Where the node is reached
    pub endpoint: Endpoint,
    /// The chain ID the node must report, if any
    pub chain_id: Option<u64>,
    /// The gas limit attached to deployment transactions
    pub gas_limit: u64,
    /// The legacy gas price attached to deployment transactions, in wei.
    /// When unset, the node's estimate is used.
    pub gas_price: Option<u128>,
}

/// How the proxy administrator is chosen
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdminPolicy {
    /// Use the first account managed by the local node
    FirstLocalAccount,
    /// The operator must supply a non-empty address
    OperatorSupplied,
}

// --------------
// | Run Config |
// --------------

/// How deployment transactions are signed
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Sign locally with the given hex-encoded private key
    PrivateKey(String),
    /// Let the node sign with its first managed account
    NodeManaged,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::PrivateKey(_) => write!(f, "PrivateKey(<redacted>)"),
            Credentials::NodeManaged => write!(f, "NodeManaged"),
        }
    }
}

/// Gas parameters attached to each deployment transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasSettings {
    /// The gas limit
    pub gas_limit: u64,
    /// The legacy gas price, in wei
    pub gas_price: Option<u128>,
}

/// Everything needed to connect to a network and submit transactions
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// The target network
    pub network: Network,
    /// The RPC URL of the node
    pub rpc_url: String,
    /// How transactions are signed
    pub credentials: Credentials,
    /// The chain ID the node must report, if any
    pub chain_id: Option<u64>,
    /// Gas parameters for deployments
    pub gas: GasSettings,
    /// The number of confirmations to wait for on each deployment
    pub confirmations: u64,
    /// How long to wait for each deployment to be mined
    pub timeout: Duration,
}

impl RunConfig {
    /// Resolve the run configuration for the named network.
    ///
    /// `rpc_url` overrides the endpoint of local networks and is required for
    /// remote ones, as is `priv_key`. Empty values are treated as unset.
    pub fn resolve(
        network: &str,
        rpc_url: Option<String>,
        priv_key: Option<String>,
    ) -> Result<Self, ScriptError> {
        let network = Network::from_str(network.trim())?;
        let NetworkConfig {
            endpoint,
            chain_id,
            gas_limit,
            gas_price,
        } = network.config();

        let rpc_url = rpc_url.filter(|url| !url.trim().is_empty());
        let priv_key = priv_key.filter(|key| !key.trim().is_empty());

        let is_remote = matches!(endpoint, Endpoint::Remote);
        let rpc_url = match (endpoint, rpc_url) {
            (_, Some(url)) => url,
            (Endpoint::Local { host, port }, None) => format!("http://{host}:{port}"),
            (Endpoint::Remote, None) => {
                return Err(ScriptError::Configuration(format!(
                    "network `{network}` requires an RPC URL, \
                     set `{RPC_URL_ENV_VAR}` or pass --rpc-url"
                )));
            }
        };

        let credentials = match (priv_key, is_remote) {
            (Some(key), _) => Credentials::PrivateKey(key),
            (None, false) => Credentials::NodeManaged,
            (None, true) => {
                return Err(ScriptError::Configuration(format!(
                    "network `{network}` requires a private key, \
                     set `{PRIVATE_KEY_ENV_VAR}` or pass --priv-key"
                )));
            }
        };

        Ok(Self {
            network,
            rpc_url,
            credentials,
            chain_id,
            gas: GasSettings {
                gas_limit,
                gas_price,
            },
            confirmations: NUM_DEPLOY_CONFIRMATIONS,
            timeout: DEFAULT_DEPLOY_TIMEOUT,
        })
    }

    /// Set the number of confirmations to wait for on each deployment
    pub fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations;
        self
    }

    /// Set how long to wait for each deployment to be mined
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ------------
// | Compiler |
// ------------

/// The pinned Solidity compiler settings artifacts are expected to be built with
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompilerPin {
    /// The required major version
    pub major: u64,
    /// The required minor version, any patch version is accepted
    pub minor: u64,
    /// The expected number of optimizer runs
    pub optimizer_runs: u64,
}

impl Default for CompilerPin {
    fn default() -> Self {
        Self {
            major: SOLC_VERSION_MAJOR,
            minor: SOLC_VERSION_MINOR,
            optimizer_runs: SOLC_OPTIMIZER_RUNS,
        }
    }
}

impl CompilerPin {
    /// Whether a solc version string, e.g. `0.6.12+commit.27d51765.Emscripten.clang`,
    /// satisfies the pin
    pub fn accepts_version(&self, version: &str) -> bool {
        let release = version.trim_start_matches('v').split(['+', '-']).next().unwrap_or_default();
        let mut parts = release.split('.').map(str::parse::<u64>);

        matches!(
            (parts.next(), parts.next()),
            (Some(Ok(major)), Some(Ok(minor))) if major == self.major && minor == self.minor
        )
    }
}

impl Display for CompilerPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "^{}.{}.0 (optimizer runs: {})", self.major, self.minor, self.optimizer_runs)
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::ScriptError;

    use super::{AdminPolicy, CompilerPin, Credentials, Endpoint, Network, RunConfig};

    #[test]
    fn test_network_names_round_trip() {
        for network in Network::ALL {
            assert_eq!(network.name().parse::<Network>().unwrap(), network);
        }
    }

    #[test]
    fn test_unknown_network_fails_closed() {
        let err = "ropsten".parse::<Network>().unwrap_err();
        assert!(matches!(err, ScriptError::Configuration(_)));
        assert!(err.to_string().contains("ropsten"));
    }

    #[test]
    fn test_only_development_uses_local_accounts() {
        for network in Network::ALL {
            let expected = if network.is_development() {
                AdminPolicy::FirstLocalAccount
            } else {
                AdminPolicy::OperatorSupplied
            };
            assert_eq!(network.admin_policy(), expected);
        }
    }

    #[test]
    fn test_development_defaults() {
        let config = RunConfig::resolve("development", None, None).unwrap();
        assert_eq!(config.rpc_url, "http://localhost:8545");
        assert_eq!(config.credentials, Credentials::NodeManaged);
        assert_eq!(config.chain_id, None);
        assert_eq!(config.gas.gas_limit, 5_000_000);
        assert_eq!(config.gas.gas_price, None);
    }

    #[test]
    fn test_fork_uses_local_endpoint_with_remote_chain_id() {
        let config = RunConfig::resolve("mainnet-fork", None, None).unwrap();
        assert_eq!(config.rpc_url, "http://localhost:8545");
        assert_eq!(config.chain_id, Some(1));
        assert!(matches!(Network::MainnetFork.config().endpoint, Endpoint::Local { .. }));
    }

    #[test]
    fn test_remote_network_requires_rpc_url() {
        let err = RunConfig::resolve("kovan", None, Some("0xabc".to_string())).unwrap_err();
        assert!(matches!(err, ScriptError::Configuration(_)));

        let err =
            RunConfig::resolve("kovan", Some("  ".to_string()), Some("0xabc".to_string()))
                .unwrap_err();
        assert!(matches!(err, ScriptError::Configuration(_)));
    }

    #[test]
    fn test_remote_network_requires_private_key() {
        let err = RunConfig::resolve("mainnet", Some("https://rpc.example".to_string()), None)
            .unwrap_err();
        assert!(matches!(err, ScriptError::Configuration(_)));

        let config = RunConfig::resolve(
            "mainnet",
            Some("https://rpc.example".to_string()),
            Some("0xabc".to_string()),
        )
        .unwrap();
        assert_eq!(config.rpc_url, "https://rpc.example");
        assert_eq!(config.credentials, Credentials::PrivateKey("0xabc".to_string()));
        assert_eq!(config.gas.gas_price, Some(20_000_000_000));
    }

    #[test]
    fn test_private_key_is_redacted() {
        let creds = Credentials::PrivateKey("0xsecret".to_string());
        assert!(!format!("{creds:?}").contains("secret"));
    }

    #[test]
    fn test_compiler_pin() {
        let pin = CompilerPin::default();
        assert!(pin.accepts_version("0.6.12+commit.27d51765.Emscripten.clang"));
        assert!(pin.accepts_version("0.6.0"));
        assert!(!pin.accepts_version("0.7.6+commit.7338295f"));
        assert!(!pin.accepts_version("0.8.20"));
        assert!(!pin.accepts_version("native"));
    }
}
