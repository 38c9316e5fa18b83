//! Loading of Truffle compilation artifacts.
//!
//! An artifact is the JSON file Truffle writes to `build/contracts/<Name>.json`.
//! Only the fields needed to deploy a contract and sanity-check its build are read.

use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy::json_abi::JsonAbi;
use alloy_primitives::{hex, Bytes};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    config::CompilerPin,
    constants::{
        ARTIFACT_EXTENSION, NUM_BYTES_SELECTOR, PROXY_CONSTRUCTOR_PARAM_TYPES,
        UNLINKED_LIBRARY_MARKER,
    },
    errors::ScriptError,
};

/// The subset of a Truffle artifact read by the scripts
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TruffleArtifact {
    /// The name of the contract
    contract_name: String,
    /// The contract's ABI
    abi: JsonAbi,
    /// The hex-encoded creation bytecode
    bytecode: String,
    /// The compiler Truffle invoked
    #[serde(default)]
    compiler: Option<CompilerInfo>,
    /// The solc metadata, itself a JSON string
    #[serde(default)]
    metadata: Option<String>,
}

/// The `compiler` entry of a Truffle artifact
#[derive(Deserialize)]
struct CompilerInfo {
    /// The full solc version string
    version: String,
}

/// A compiled contract, ready to be deployed
#[derive(Clone, Debug)]
pub struct Artifact {
    /// The name of the contract
    pub contract_name: String,
    /// The contract's ABI
    pub abi: JsonAbi,
    /// The contract's creation bytecode, without constructor arguments
    pub bytecode: Bytes,
    /// The solc version the contract was compiled with, if recorded
    pub compiler_version: Option<String>,
    /// The number of optimizer runs the contract was compiled with, if recorded
    pub optimizer_runs: Option<u64>,
}

impl Artifact {
    /// Path of the named contract's artifact within a Truffle build directory
    pub fn path_in(build_dir: &Path, contract_name: &str) -> PathBuf {
        build_dir.join(contract_name).with_extension(ARTIFACT_EXTENSION)
    }

    /// Load the named contract's artifact from a Truffle build directory
    pub fn load(build_dir: &Path, contract_name: &str) -> Result<Self, ScriptError> {
        Self::from_file(&Self::path_in(build_dir, contract_name))
    }

    /// Load an artifact from a file
    pub fn from_file(path: &Path) -> Result<Self, ScriptError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            ScriptError::ArtifactParsing(format!("could not read {}: {e}", path.display()))
        })?;

        Self::from_json(&contents)
    }

    /// Parse an artifact from its JSON contents
    pub fn from_json(json: &str) -> Result<Self, ScriptError> {
        let TruffleArtifact {
            contract_name,
            abi,
            bytecode,
            compiler,
            metadata,
        } = serde_json::from_str(json).map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;

        let bytecode = parse_bytecode(&contract_name, &bytecode)?;
        let optimizer_runs = metadata.as_deref().and_then(optimizer_runs_from_metadata);

        Ok(Self {
            contract_name,
            abi,
            bytecode,
            compiler_version: compiler.map(|c| c.version),
            optimizer_runs,
        })
    }

    /// Whether the contract exposes a function with the given selector
    pub fn has_function(&self, selector: [u8; NUM_BYTES_SELECTOR]) -> bool {
        self.abi.functions().any(|function| function.selector().0 == selector)
    }

    /// Ensure the contract's constructor has the shape of an upgradeable proxy's,
    /// `(address _logic, address admin_, bytes _data)`
    pub fn check_proxy_constructor(&self) -> Result<(), ScriptError> {
        let param_types: Vec<&str> = self
            .abi
            .constructor
            .as_ref()
            .map(|ctor| ctor.inputs.iter().map(|param| param.ty.as_str()).collect())
            .unwrap_or_default();

        if param_types != PROXY_CONSTRUCTOR_PARAM_TYPES {
            return Err(ScriptError::ArtifactParsing(format!(
                "`{}` is not an upgradeable proxy: expected constructor({}), found constructor({})",
                self.contract_name,
                PROXY_CONSTRUCTOR_PARAM_TYPES.join(","),
                param_types.join(",")
            )));
        }

        Ok(())
    }

    /// Describe every way in which the artifact's build deviates from the pinned compiler settings
    pub fn compiler_mismatches(&self, pin: &CompilerPin) -> Vec<String> {
        let mut mismatches = Vec::new();

        match &self.compiler_version {
            Some(version) if !pin.accepts_version(version) => {
                mismatches.push(format!("compiled with solc {version}, expected {pin}"))
            }
            None => mismatches.push("compiler version not recorded".to_string()),
            _ => {}
        }

        if let Some(runs) = self.optimizer_runs {
            if runs != pin.optimizer_runs {
                mismatches.push(format!(
                    "optimized for {runs} runs, expected {}",
                    pin.optimizer_runs
                ));
            }
        }

        mismatches
    }
}

/// Decode creation bytecode, rejecting empty or unlinked code
fn parse_bytecode(contract_name: &str, bytecode: &str) -> Result<Bytes, ScriptError> {
    let stripped = bytecode.trim().trim_start_matches("0x");
    if stripped.is_empty() {
        return Err(ScriptError::ArtifactParsing(format!(
            "`{contract_name}` has no bytecode, is it abstract or an interface?"
        )));
    }

    if stripped.contains(UNLINKED_LIBRARY_MARKER) {
        return Err(ScriptError::ArtifactParsing(format!(
            "`{contract_name}` has unlinked library references"
        )));
    }

    hex::decode(stripped)
        .map(Bytes::from)
        .map_err(|e| ScriptError::ArtifactParsing(format!("`{contract_name}` bytecode: {e}")))
}

/// Read `settings.optimizer.runs` from the solc metadata string embedded in the artifact
fn optimizer_runs_from_metadata(metadata: &str) -> Option<u64> {
    let metadata: Value = serde_json::from_str(metadata).ok()?;
    metadata["settings"]["optimizer"]["runs"].as_u64()
}
