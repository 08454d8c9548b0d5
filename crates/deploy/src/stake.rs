//! Post-deployment lifecycle: stake registration and ownership hand-off.
//!
//! Registry-participant artifacts must hold a stake with the entry point and
//! end up owned by their configured target owner. The manager re-reads
//! ledger truth at every decision point instead of caching state across
//! steps, which makes repeated runs no-ops.

use alloy_core::primitives::{Address, Bytes, U256};
use serde::Serialize;

use crate::abi;
use crate::catalog::StakeRole;
use crate::config::StakeParams;
use crate::error::{DeployError, Result};
use crate::ledger::{GasFees, Ledger, TxRequest};
use crate::rpc::RpcError;

/// Deposit info reported by the staking registry for one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakeStatus {
    pub deposit: U256,
    pub staked: bool,
    pub stake: U256,
    pub unstake_delay_secs: u32,
    pub withdraw_time: u64,
}

/// Lifecycle states for a registry-participant artifact.
///
/// There is no persisted "not yet checked" state; each run recomputes the
/// position from ledger truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum LifecycleState {
    Unstaked,
    Staked,
    OwnershipPending,
    OwnershipTransferred,
}

/// Decision for the staking step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakeAction {
    /// Registry already reports a stake; nothing to submit.
    AlreadyStaked,
    /// The signer does not own the artifact, so it has no authority to
    /// stake on the owner's behalf. A skip, not an error.
    SkipNotOwner,
    /// Submit a stake with the configured parameters.
    Stake,
}

/// Decision for the ownership step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipAction {
    /// Current owner already matches the configured target.
    AlreadyTarget,
    /// Submit a transfer to the configured target.
    Transfer,
}

/// What the staking step should do, given ledger truth.
pub fn stake_action(status: &StakeStatus, owner: Address, signer: Address) -> StakeAction {
    if status.staked {
        StakeAction::AlreadyStaked
    } else if owner != signer {
        StakeAction::SkipNotOwner
    } else {
        StakeAction::Stake
    }
}

/// What the ownership step should do, given ledger truth.
pub fn ownership_action(owner: Address, target: Address) -> OwnershipAction {
    if owner == target {
        OwnershipAction::AlreadyTarget
    } else {
        OwnershipAction::Transfer
    }
}

/// Drives one artifact's stake and ownership toward the configured targets.
pub struct LifecycleManager<'a> {
    ledger: &'a dyn Ledger,
    entry_point: Address,
    signer: Address,
    fees: GasFees,
}

impl<'a> LifecycleManager<'a> {
    pub fn new(ledger: &'a dyn Ledger, entry_point: Address, signer: Address, fees: GasFees) -> Self {
        Self {
            ledger,
            entry_point,
            signer,
            fees,
        }
    }

    /// Run the full lifecycle for `artifact`, idempotently.
    ///
    /// Stake and transfer transaction failures are fatal; a skip because the
    /// signer lacks authority is not.
    pub async fn run(
        &self,
        name: &str,
        artifact: Address,
        role: StakeRole,
        params: &StakeParams,
        target_owner: Address,
    ) -> Result<LifecycleState> {
        let status = self.deposit_info(artifact).await?;
        tracing::info!(
            artifact = name,
            staked = status.staked,
            deposit = %status.deposit,
            stake = %status.stake,
            "Current stake status"
        );

        let action = if status.staked {
            StakeAction::AlreadyStaked
        } else {
            let owner = self.owner_of(artifact).await?;
            stake_action(&status, owner, self.signer)
        };

        match action {
            StakeAction::AlreadyStaked => {
                tracing::info!(artifact = name, "Already staked");
            }
            StakeAction::SkipNotOwner => {
                tracing::info!(
                    artifact = name,
                    "Not owned by the signer, skipping staking"
                );
                return Ok(LifecycleState::Unstaked);
            }
            StakeAction::Stake => {
                self.add_stake(name, artifact, role, params).await?;
                // Re-read for observability; inclusion alone is not treated
                // as proof the registry recorded the stake.
                let confirmed = self.deposit_info(artifact).await?;
                tracing::info!(
                    artifact = name,
                    staked = confirmed.staked,
                    stake = %confirmed.stake,
                    withdraw_time = confirmed.withdraw_time,
                    "Updated stake status"
                );
            }
        }

        // Ownership is re-read rather than reusing the pre-stake value.
        let owner = self.owner_of(artifact).await?;
        match ownership_action(owner, target_owner) {
            OwnershipAction::AlreadyTarget => Ok(LifecycleState::OwnershipTransferred),
            OwnershipAction::Transfer if owner == self.signer => {
                tracing::info!(
                    artifact = name,
                    target = %target_owner,
                    "Transferring ownership..."
                );
                self.transfer_ownership(name, artifact, target_owner).await?;
                Ok(LifecycleState::OwnershipTransferred)
            }
            OwnershipAction::Transfer => {
                // Owned by a third party; the signer cannot hand it over.
                tracing::warn!(
                    artifact = name,
                    owner = %owner,
                    target = %target_owner,
                    "Owner differs from target but signer has no authority to transfer"
                );
                Ok(LifecycleState::Staked)
            }
        }
    }

    /// Read the registry's deposit info for `account`.
    async fn deposit_info(&self, account: Address) -> Result<StakeStatus> {
        let data = abi::build_call("getDepositInfo(address)", &[abi::encode_address(account)]);
        let raw = self.ledger.call(self.entry_point, data).await?;
        decode_deposit_info(&raw).ok_or_else(|| {
            DeployError::Network(RpcError::Malformed {
                method: "getDepositInfo".to_string(),
                detail: format!("unexpected return data ({} bytes)", raw.len()),
            })
        })
    }

    /// Read the current owner of an ownable artifact.
    async fn owner_of(&self, artifact: Address) -> Result<Address> {
        let raw = self
            .ledger
            .call(artifact, abi::build_call("owner()", &[]))
            .await?;
        abi::decode_address(&raw).ok_or_else(|| {
            DeployError::Network(RpcError::Malformed {
                method: "owner".to_string(),
                detail: format!("unexpected return data ({} bytes)", raw.len()),
            })
        })
    }

    async fn add_stake(
        &self,
        name: &str,
        artifact: Address,
        role: StakeRole,
        params: &StakeParams,
    ) -> Result<()> {
        tracing::info!(
            artifact = name,
            stake = %params.stake_wei,
            unstake_delay_secs = params.unstake_delay_secs,
            "Staking..."
        );
        let tx = TxRequest {
            from: self.signer,
            to: artifact,
            value: params.stake_wei,
            data: encode_add_stake(role, self.entry_point, params.unstake_delay_secs),
            fees: Some(self.fees),
        };
        self.submit(name, tx, "stake").await
    }

    async fn transfer_ownership(&self, name: &str, artifact: Address, target: Address) -> Result<()> {
        let tx = TxRequest {
            from: self.signer,
            to: artifact,
            value: U256::ZERO,
            data: abi::build_call("transferOwnership(address)", &[abi::encode_address(target)]),
            fees: Some(self.fees),
        };
        self.submit(name, tx, "ownership transfer").await
    }

    /// Submit a lifecycle transaction and wait for successful inclusion.
    async fn submit(&self, name: &str, tx: TxRequest, what: &str) -> Result<()> {
        let hash = self
            .ledger
            .send_transaction(&tx)
            .await
            .map_err(|e| DeployError::Lifecycle {
                name: name.to_string(),
                reason: format!("{what} submission failed: {e}"),
            })?;
        tracing::info!(artifact = name, tx_hash = %hash, "{what} transaction sent");

        let receipt = self
            .ledger
            .wait_for_receipt(hash)
            .await
            .map_err(|e| DeployError::Lifecycle {
                name: name.to_string(),
                reason: format!("{what} inclusion failed: {e}"),
            })?;
        if !receipt.success {
            return Err(DeployError::Lifecycle {
                name: name.to_string(),
                reason: format!("{what} transaction {hash} reverted"),
            });
        }
        Ok(())
    }
}

/// The two roles stake through differently shaped registry calls: the
/// factory names the entry point explicitly, the paymaster already knows it.
fn encode_add_stake(role: StakeRole, entry_point: Address, unstake_delay_secs: u32) -> Bytes {
    let delay = abi::encode_uint(U256::from(unstake_delay_secs));
    match role {
        StakeRole::Factory => abi::build_call(
            "addStake(address,uint32)",
            &[abi::encode_address(entry_point), delay],
        ),
        StakeRole::Paymaster => abi::build_call("addStake(uint32)", &[delay]),
    }
}

/// Decode the registry's five-word deposit-info tuple.
fn decode_deposit_info(data: &[u8]) -> Option<StakeStatus> {
    if data.len() < 5 * abi::WORD {
        return None;
    }
    Some(StakeStatus {
        deposit: abi::decode_uint(&data[..abi::WORD])?,
        staked: abi::decode_bool(&data[abi::WORD..])?,
        stake: abi::decode_uint(&data[2 * abi::WORD..])?,
        unstake_delay_secs: u32::try_from(abi::decode_uint(&data[3 * abi::WORD..])?).ok()?,
        withdraw_time: u64::try_from(abi::decode_uint(&data[4 * abi::WORD..])?).ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn addr(n: u8) -> Address {
        Address::from_slice(&[n; 20])
    }

    fn unstaked() -> StakeStatus {
        StakeStatus {
            deposit: U256::ZERO,
            staked: false,
            stake: U256::ZERO,
            unstake_delay_secs: 0,
            withdraw_time: 0,
        }
    }

    #[test]
    fn staked_artifacts_are_never_restaked() {
        let status = StakeStatus {
            staked: true,
            ..unstaked()
        };
        // Staked wins regardless of who owns the artifact.
        assert_eq!(
            stake_action(&status, addr(1), addr(1)),
            StakeAction::AlreadyStaked
        );
        assert_eq!(
            stake_action(&status, addr(1), addr(2)),
            StakeAction::AlreadyStaked
        );
    }

    #[test]
    fn foreign_ownership_skips_staking_without_error() {
        assert_eq!(
            stake_action(&unstaked(), addr(1), addr(2)),
            StakeAction::SkipNotOwner
        );
    }

    #[test]
    fn unstaked_owned_artifacts_get_staked() {
        assert_eq!(
            stake_action(&unstaked(), addr(1), addr(1)),
            StakeAction::Stake
        );
    }

    #[test]
    fn ownership_transfer_is_a_noop_at_target() {
        assert_eq!(
            ownership_action(addr(5), addr(5)),
            OwnershipAction::AlreadyTarget
        );
        assert_eq!(ownership_action(addr(5), addr(6)), OwnershipAction::Transfer);
    }

    #[test]
    fn add_stake_shapes_differ_by_role() {
        let entry_point = addr(9);
        let factory_call = encode_add_stake(StakeRole::Factory, entry_point, 86_400);
        let paymaster_call = encode_add_stake(StakeRole::Paymaster, entry_point, 86_400);

        assert_eq!(&factory_call[..4], &abi::selector("addStake(address,uint32)"));
        assert_eq!(factory_call.len(), 4 + 2 * abi::WORD);
        assert_eq!(abi::decode_address(&factory_call[4..36]), Some(entry_point));
        assert_eq!(
            abi::decode_uint(&factory_call[36..68]),
            Some(U256::from(86_400u64))
        );

        assert_eq!(&paymaster_call[..4], &abi::selector("addStake(uint32)"));
        assert_eq!(paymaster_call.len(), 4 + abi::WORD);
    }

    #[test]
    fn deposit_info_decodes_the_registry_tuple() {
        let mut data = Vec::new();
        data.extend_from_slice(&abi::encode_uint(U256::from(7u64)));
        data.extend_from_slice(&abi::encode_uint(U256::from(1u64)));
        data.extend_from_slice(&abi::encode_uint(
            U256::from_str("1000000000000000000").unwrap(),
        ));
        data.extend_from_slice(&abi::encode_uint(U256::from(86_400u64)));
        data.extend_from_slice(&abi::encode_uint(U256::from(1_737_316_800u64)));

        let status = decode_deposit_info(&data).unwrap();
        assert_eq!(status.deposit, U256::from(7u64));
        assert!(status.staked);
        assert_eq!(status.stake, U256::from_str("1000000000000000000").unwrap());
        assert_eq!(status.unstake_delay_secs, 86_400);
        assert_eq!(status.withdraw_time, 1_737_316_800);
    }

    #[test]
    fn truncated_deposit_info_is_rejected() {
        assert!(decode_deposit_info(&[0u8; 64]).is_none());
        assert!(decode_deposit_info(&[]).is_none());
    }
}
