//! Definitions of Solidity functions and constructors called during deployment

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::{sol, SolValue};

sol! {
    function initialize() external;
}

/// ABI-encode the proxy constructor arguments `(address _logic, address admin_, bytes _data)`.
///
/// The result is appended to the proxy's creation bytecode.
pub fn proxy_constructor_args(implementation: Address, admin: Address, data: &Bytes) -> Vec<u8> {
    (implementation, admin, data.clone()).abi_encode_params()
}

/// Decode proxy constructor arguments, as encoded by [`proxy_constructor_args`]
pub fn decode_proxy_constructor_args(
    encoded: &[u8],
) -> Result<(Address, Address, Bytes), alloy_sol_types::Error> {
    <(Address, Address, Bytes)>::abi_decode_params(encoded, true /* validate */)
}
