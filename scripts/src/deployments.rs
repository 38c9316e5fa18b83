//! Reading and writing of the `deployments.json` address ledger.
//!
//! Addresses are kept per network:
//! `{ "deployments": { "<network>": { "<contract key>": "0x..." } } }`

use std::{fs, path::Path, str::FromStr};

use alloy_primitives::Address;
use serde_json::{Map, Value};

use crate::{
    config::Network,
    constants::{
        CUSTODIAN_CONTRACT_KEY, CUSTODIAN_PROXY_ADMIN_KEY, CUSTODIAN_PROXY_CONTRACT_KEY,
        DEPLOYMENTS_KEY,
    },
    errors::ScriptError,
    types::ProxyDeployment,
};

/// Parse the deployments file, treating a missing file as empty
fn read_ledger(file_path: &Path) -> Result<Value, ScriptError> {
    if !file_path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents =
        fs::read_to_string(file_path).map_err(|e| ScriptError::ReadDeployments(e.to_string()))?;
    serde_json::from_str(&contents).map_err(|e| ScriptError::ReadDeployments(e.to_string()))
}

/// Read a contract address recorded for a network
pub fn read_deployed_address(
    file_path: &Path,
    network: Network,
    contract_key: &str,
) -> Result<Address, ScriptError> {
    let ledger = read_ledger(file_path)?;
    let address = ledger[DEPLOYMENTS_KEY][network.name()][contract_key].as_str().ok_or_else(|| {
        ScriptError::ReadDeployments(format!(
            "no `{contract_key}` recorded for network `{network}` in {}",
            file_path.display()
        ))
    })?;

    Address::from_str(address).map_err(|e| ScriptError::ReadDeployments(e.to_string()))
}

/// Record the addresses of a proxy deployment, preserving all other entries
pub fn write_deployment(file_path: &Path, deployment: &ProxyDeployment) -> Result<(), ScriptError> {
    let mut ledger = read_ledger(file_path)?;
    if !ledger.is_object() {
        return Err(ScriptError::WriteDeployments(format!(
            "{} does not hold a JSON object",
            file_path.display()
        )));
    }

    let entries = [
        (CUSTODIAN_CONTRACT_KEY, deployment.implementation),
        (CUSTODIAN_PROXY_CONTRACT_KEY, deployment.proxy),
        (CUSTODIAN_PROXY_ADMIN_KEY, deployment.admin),
    ];
    for (key, address) in entries {
        ledger[DEPLOYMENTS_KEY][deployment.network.name()][key] =
            Value::String(format!("{address:#x}"));
    }

    let contents = serde_json::to_string_pretty(&ledger)
        .map_err(|e| ScriptError::WriteDeployments(e.to_string()))?;
    fs::write(file_path, contents).map_err(|e| ScriptError::WriteDeployments(e.to_string()))
}
