//! Reading of the standard proxy storage slots defined in
//! [EIP-1967](https://eips.ethereum.org/EIPS/eip-1967)

use alloy_primitives::{Address, B256};

use crate::{
    chain::Chain,
    constants::{
        NUM_BYTES_ADDRESS, NUM_BYTES_STORAGE_SLOT, PROXY_ADMIN_STORAGE_SLOT,
        PROXY_IMPLEMENTATION_STORAGE_SLOT,
    },
    errors::ScriptError,
};

/// The addresses a proxy records in its EIP-1967 slots
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProxySlots {
    /// The implementation calls are delegated to
    pub implementation: Address,
    /// The administrator allowed to manage the proxy
    pub admin: Address,
}

/// Interpret a storage word as a left-padded address.
///
/// Returns `None` if any of the padding bytes are set.
pub fn address_from_word(word: B256) -> Option<Address> {
    let (padding, address) = word.split_at(NUM_BYTES_STORAGE_SLOT - NUM_BYTES_ADDRESS);
    padding.iter().all(|byte| *byte == 0).then(|| Address::from_slice(address))
}

/// Read the implementation and admin slots of a proxy
pub async fn read_proxy_slots(
    chain: &impl Chain,
    proxy: Address,
) -> Result<ProxySlots, ScriptError> {
    let implementation =
        read_address_slot(chain, proxy, PROXY_IMPLEMENTATION_STORAGE_SLOT).await?;
    let admin = read_address_slot(chain, proxy, PROXY_ADMIN_STORAGE_SLOT).await?;

    Ok(ProxySlots {
        implementation,
        admin,
    })
}

/// Read an address-valued storage slot
async fn read_address_slot(
    chain: &impl Chain,
    address: Address,
    slot: B256,
) -> Result<Address, ScriptError> {
    let word = chain.storage_at(address, slot).await?;
    address_from_word(word).ok_or_else(|| {
        ScriptError::ContractInteraction(format!(
            "slot {slot} of {address:#x} holds {word}, which is not an address"
        ))
    })
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{address, keccak256, B256, U256};

    use crate::constants::{PROXY_ADMIN_STORAGE_SLOT, PROXY_IMPLEMENTATION_STORAGE_SLOT};

    use super::address_from_word;

    /// EIP-1967 slots are `keccak256(label) - 1`
    fn eip1967_slot(label: &str) -> B256 {
        let hash = U256::from_be_bytes(keccak256(label).0);
        B256::from((hash - U256::from(1)).to_be_bytes::<32>())
    }

    #[test]
    fn test_slot_constants() {
        assert_eq!(PROXY_IMPLEMENTATION_STORAGE_SLOT, eip1967_slot("eip1967.proxy.implementation"));
        assert_eq!(PROXY_ADMIN_STORAGE_SLOT, eip1967_slot("eip1967.proxy.admin"));
    }

    #[test]
    fn test_address_from_word() {
        let admin = address!("90f79bf6eb2c4f870365e785982e1f101e93b906");
        assert_eq!(address_from_word(admin.into_word()), Some(admin));
        assert_eq!(address_from_word(B256::ZERO), Some(Default::default()));
        assert_eq!(address_from_word(B256::repeat_byte(0xff)), None);
    }
}
