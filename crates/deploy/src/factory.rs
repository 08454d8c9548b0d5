//! The shared CREATE2 factory: existence checks and deploy submissions.
//!
//! Exactly one transaction is submitted per missing artifact, always through
//! the factory contract. The factory itself is never deployed by this tool.

use alloy_core::primitives::{Address, B256, Bytes, U256};

use crate::abi;
use crate::error::{DeployError, Result};
use crate::ledger::{GasFees, Ledger, TxRequest};

/// Handle on the pre-deployed factory contract.
pub struct SaltFactory<'a> {
    ledger: &'a dyn Ledger,
    address: Address,
    signer: Address,
    fees: GasFees,
}

impl<'a> SaltFactory<'a> {
    pub fn new(ledger: &'a dyn Ledger, address: Address, signer: Address, fees: GasFees) -> Self {
        Self {
            ledger,
            address,
            signer,
            fees,
        }
    }

    /// True when the ledger reports non-empty code at `address`.
    ///
    /// Transport failures propagate as network errors; an outage must never
    /// read as "not deployed".
    pub async fn exists(&self, address: Address) -> Result<bool> {
        let code = self.ledger.get_code(address).await?;
        Ok(!code.is_empty())
    }

    /// Submit a deploy through the factory and confirm the derived address.
    ///
    /// Callers only invoke this after [`Self::exists`] returned false.
    pub async fn deploy(
        &self,
        name: &str,
        expected: Address,
        derived_salt: B256,
        init_code: &Bytes,
    ) -> Result<Address> {
        let tx = TxRequest {
            from: self.signer,
            to: self.address,
            value: U256::ZERO,
            data: encode_deploy_call(derived_salt, init_code),
            fees: Some(self.fees),
        };

        let hash = self
            .ledger
            .send_transaction(&tx)
            .await
            .map_err(|e| DeployError::Submission {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        tracing::info!(artifact = name, tx_hash = %hash, "Deploy transaction sent");

        let receipt = self
            .ledger
            .wait_for_receipt(hash)
            .await
            .map_err(|e| DeployError::Submission {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        if !receipt.success {
            return Err(DeployError::Submission {
                name: name.to_string(),
                reason: format!("deploy transaction {hash} reverted"),
            });
        }

        // The factory must have landed the code exactly where the local
        // derivation said it would; disagreement means the salt or bytecode
        // diverged from the on-chain rule.
        let code = self.ledger.get_code(expected).await?;
        if code.is_empty() {
            return Err(DeployError::Integrity {
                name: name.to_string(),
                address: expected,
                detail: "no code at derived address after deploy".to_string(),
            });
        }

        tracing::info!(
            artifact = name,
            address = %expected,
            block = receipt.block_number,
            "Deployed"
        );
        Ok(expected)
    }
}

/// Calldata for `deploy(bytes32,bytes)`: salt word, offset to the dynamic
/// init code, then the length-prefixed code itself.
fn encode_deploy_call(salt: B256, init_code: &Bytes) -> Bytes {
    let mut data = Vec::with_capacity(4 + 3 * abi::WORD + init_code.len());
    data.extend_from_slice(&abi::selector("deploy(bytes32,bytes)"));
    data.extend_from_slice(salt.as_slice());
    data.extend_from_slice(&abi::encode_uint(U256::from(2 * abi::WORD)));
    data.extend_from_slice(&abi::encode_bytes(init_code));
    Bytes::from(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_core::primitives::keccak256;

    #[test]
    fn deploy_calldata_layout() {
        let salt = keccak256(b"DEVELOPMENT_ACCOUNT_IMPL_V1");
        let init_code = Bytes::from(vec![0x60, 0x80, 0x60, 0x40, 0x52]);
        let data = encode_deploy_call(salt, &init_code);

        assert_eq!(&data[..4], &abi::selector("deploy(bytes32,bytes)"));
        // Head word 1: the salt.
        assert_eq!(&data[4..36], salt.as_slice());
        // Head word 2: offset to the bytes tail (two head words = 0x40).
        assert_eq!(
            abi::decode_uint(&data[36..68]),
            Some(U256::from(2 * abi::WORD))
        );
        // Tail: length word then the right-padded code.
        assert_eq!(abi::decode_uint(&data[68..100]), Some(U256::from(5u64)));
        assert_eq!(&data[100..105], init_code.as_ref());
        assert_eq!(data.len(), 4 + 3 * abi::WORD + abi::WORD);
    }
}
