//! Definitions of errors that can occur during the execution of the deploy scripts

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// Errors that can occur during the execution of the deploy scripts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// The run configuration is incomplete or inconsistent, e.g. a missing
    /// administrator address or missing credentials
    Configuration(String),
    /// Error parsing a Solidity compilation artifact
    ArtifactParsing(String),
    /// Error constructing calldata for a contract method or constructor
    CalldataConstruction(String),
    /// The RPC endpoint could not be reached
    Network(String),
    /// A deployment transaction reverted, was not mined, or produced a proxy
    /// that does not match what was requested
    ContractDeployment(String),
    /// Error calling or reading from a deployed contract
    ContractInteraction(String),
    /// Error reading the `deployments.json` file
    ReadDeployments(String),
    /// Error writing the `deployments.json` file
    WriteDeployments(String),
}

/// The coarse classification of a [`ScriptError`], as surfaced to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid configuration, detected before any transaction
    Configuration,
    /// A transaction reverted, timed out, or produced unexpected state
    Deployment,
    /// The endpoint could not be reached
    Network,
}

impl ScriptError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScriptError::Configuration(_)
            | ScriptError::ArtifactParsing(_)
            | ScriptError::CalldataConstruction(_) => ErrorKind::Configuration,
            ScriptError::Network(_) => ErrorKind::Network,
            ScriptError::ContractDeployment(_)
            | ScriptError::ContractInteraction(_)
            | ScriptError::ReadDeployments(_)
            | ScriptError::WriteDeployments(_) => ErrorKind::Deployment,
        }
    }
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::Configuration(s) => write!(f, "configuration error: {}", s),
            ScriptError::ArtifactParsing(s) => write!(f, "error parsing artifact: {}", s),
            ScriptError::CalldataConstruction(s) => write!(f, "error constructing calldata: {}", s),
            ScriptError::Network(s) => write!(f, "network error: {}", s),
            ScriptError::ContractDeployment(s) => write!(f, "error deploying contract: {}", s),
            ScriptError::ContractInteraction(s) => {
                write!(f, "error interacting with contract: {}", s)
            }
            ScriptError::ReadDeployments(s) => write!(f, "error reading deployments: {}", s),
            ScriptError::WriteDeployments(s) => write!(f, "error writing deployments: {}", s),
        }
    }
}

impl Error for ScriptError {}
