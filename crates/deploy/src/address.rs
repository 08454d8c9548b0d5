//! Deterministic address derivation for counterfactual deployments.
//!
//! Addresses are valid before any code exists at them: the same factory,
//! salt and init code always land on the same address, which is what makes
//! deploy-or-skip decisions possible without deployment history.

use alloy_core::primitives::{Address, B256, keccak256};

/// Hash a human-readable salt label into the fixed-width deployment salt.
///
/// Same label, same salt, same target address for a fixed factory.
pub fn derive_salt(label: &str) -> B256 {
    keccak256(label.as_bytes())
}

/// Compute the CREATE2 address for `factory` + `salt` + `init_code_hash`.
///
/// This must mirror the factory contract's own rule exactly:
/// `keccak256(0xff ++ factory ++ salt ++ keccak256(init_code))[12..]`.
/// Any divergence makes the existence check and the deploy disagree about
/// where the artifact lives.
pub fn create2_address(factory: Address, salt: B256, init_code_hash: B256) -> Address {
    let mut preimage = [0u8; 85];
    preimage[0] = 0xff;
    preimage[1..21].copy_from_slice(factory.as_slice());
    preimage[21..53].copy_from_slice(salt.as_slice());
    preimage[53..85].copy_from_slice(init_code_hash.as_slice());
    Address::from_slice(&keccak256(preimage)[12..])
}
