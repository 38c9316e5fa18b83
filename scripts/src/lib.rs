//! Scripts for deploying and initializing the custodian contract behind an
//! upgradeable proxy.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod artifacts;
pub mod bootstrap;
pub mod chain;
pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod deployments;
pub mod eip1967;
pub mod errors;
#[cfg(any(test, feature = "test-helpers"))]
pub mod mock;
pub mod solidity;
pub mod types;
