//! Type definitions used throughout the scripts

use std::{
    fmt::{self, Display},
    str::FromStr,
};

use alloy_primitives::{hex, Address, Bytes};
use alloy_sol_types::SolCall;

use crate::{
    config::Network, constants::NUM_BYTES_SELECTOR, errors::ScriptError,
    solidity::initializeCall,
};

/// The calldata with which the proxy invokes its implementation at construction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitializerPayload(Bytes);

impl InitializerPayload {
    /// Wrap raw calldata
    pub fn new(calldata: Bytes) -> Self {
        Self(calldata)
    }

    /// A payload which performs no initialization
    pub fn empty() -> Self {
        Self(Bytes::new())
    }

    /// The function selector targeted by the payload, if the payload is long enough to carry one
    pub fn selector(&self) -> Option<[u8; NUM_BYTES_SELECTOR]> {
        self.0.get(..NUM_BYTES_SELECTOR)?.try_into().ok()
    }

    /// Whether the payload performs no initialization
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw calldata
    pub fn calldata(&self) -> &Bytes {
        &self.0
    }
}

/// Defaults to `initialize()`, i.e. `0x8129fc1c`
impl Default for InitializerPayload {
    fn default() -> Self {
        Self(initializeCall {}.abi_encode().into())
    }
}

impl FromStr for InitializerPayload {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let calldata =
            hex::decode(s.trim()).map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?;

        if !calldata.is_empty() && calldata.len() < NUM_BYTES_SELECTOR {
            return Err(ScriptError::CalldataConstruction(format!(
                "initializer calldata `{s}` is shorter than a function selector"
            )));
        }

        Ok(Self(calldata.into()))
    }
}

impl Display for InitializerPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The record of a successful proxy bootstrap.
///
/// The proxy address is the only externally usable entry point; the
/// implementation is a logic template and is never called directly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyDeployment {
    /// The network the proxy was deployed to
    pub network: Network,
    /// The address of the implementation (logic) contract
    pub implementation: Address,
    /// The address of the proxy contract
    pub proxy: Address,
    /// The administrator recorded in the proxy
    pub admin: Address,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::errors::ScriptError;

    use super::InitializerPayload;

    #[test]
    fn test_default_payload_is_initialize() {
        let payload = InitializerPayload::default();
        assert_eq!(payload.selector(), Some([0x81, 0x29, 0xfc, 0x1c]));
        assert_eq!(payload.to_string(), "0x8129fc1c");
    }

    #[test]
    fn test_parse_payload() {
        let payload = InitializerPayload::from_str("0xc4d66de8").unwrap();
        assert_eq!(payload.selector(), Some([0xc4, 0xd6, 0x6d, 0xe8]));

        let empty = InitializerPayload::from_str("0x").unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.selector(), None);
    }

    #[test]
    fn test_parse_payload_rejects_truncated_selector() {
        assert!(matches!(
            InitializerPayload::from_str("0x8129"),
            Err(ScriptError::CalldataConstruction(_))
        ));
        assert!(matches!(
            InitializerPayload::from_str("0xnothex"),
            Err(ScriptError::CalldataConstruction(_))
        ));
    }
}
