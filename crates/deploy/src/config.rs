//! Run configuration: identities, endpoints, per-chain network profiles.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use alloy_core::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DeployError, Result};
use crate::ledger::GasFees;

/// The default name for the saltbox configuration file.
pub const SALTCONF_FILENAME: &str = "Saltbox.toml";

/// Chain id of the local development node.
pub const LOCAL_CHAIN_ID: u64 = 31337;

/// Canonical entry-point (staking registry) address on live chains.
pub const DEFAULT_ENTRY_POINT: &str = "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789";

/// Which salt set a run provisions against.
///
/// Dev and prod use disjoint salt labels, so the two modes land the same
/// artifacts on different deterministic addresses.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentMode {
    Dev,
    Prod,
}

impl DeploymentMode {
    /// Prefix applied to every salt label in this mode.
    pub fn salt_prefix(&self) -> &'static str {
        match self {
            DeploymentMode::Dev => "DEVELOPMENT",
            DeploymentMode::Prod => "PRODUCTION",
        }
    }

    /// Build the full salt label for an artifact suffix.
    pub fn salt(&self, suffix: &str) -> String {
        format!("{}_{}", self.salt_prefix(), suffix)
    }
}

/// Stake parameters for one registry-participant role on one chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeParams {
    /// Stake to deposit, in wei.
    pub stake_wei: U256,
    /// Unstake delay registered with the deposit.
    pub unstake_delay_secs: u32,
}

/// Per-chain overrides: gas pricing plus stake parameters for the two
/// registry-participant roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProfile {
    pub gas: GasFees,
    pub factory_stake: StakeParams,
    pub paymaster_stake: StakeParams,
}

fn gwei(n: u64) -> u64 {
    n * 1_000_000_000
}

fn ether_tenths(n: u64) -> U256 {
    U256::from(n) * U256::from(100_000_000_000_000_000u128)
}

fn profile(max_fee_gwei: u64, priority_gwei: u64, stake_tenths: u64) -> NetworkProfile {
    let stake = StakeParams {
        stake_wei: ether_tenths(stake_tenths),
        unstake_delay_secs: 86_400,
    };
    NetworkProfile {
        gas: GasFees {
            max_fee_per_gas: gwei(max_fee_gwei),
            max_priority_fee_per_gas: gwei(priority_gwei),
        },
        factory_stake: stake,
        paymaster_stake: stake,
    }
}

/// Built-in per-chain profiles, keyed by decimal chain id.
///
/// A chain without an entry here (and without a config-file override) fails
/// pre-flight; there is deliberately no runtime fallback.
pub fn builtin_profiles() -> BTreeMap<String, NetworkProfile> {
    let mut profiles = BTreeMap::new();
    profiles.insert("1".to_string(), profile(40, 2, 1));
    profiles.insert("10".to_string(), profile(1, 1, 1));
    profiles.insert("56".to_string(), profile(5, 3, 10));
    profiles.insert("137".to_string(), profile(200, 35, 10));
    profiles.insert("8453".to_string(), profile(1, 1, 1));
    profiles.insert("42161".to_string(), profile(1, 1, 1));
    profiles.insert("11155111".to_string(), profile(10, 1, 10));
    profiles.insert(LOCAL_CHAIN_ID.to_string(), profile(10, 1, 10));
    profiles
}

/// Parse `value` as a hex address, reporting the offending setting on failure.
pub fn parse_address(label: &str, value: &str) -> Result<Address> {
    Address::from_str(value.trim())
        .map_err(|_| DeployError::Config(format!("invalid {label} address: '{value}'")))
}

/// Fully validated run configuration.
///
/// Serializes to TOML so a run can be repeated from a saved file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployConfig {
    pub mode: DeploymentMode,
    pub rpc_url: Url,
    /// Target owner for the account factory after provisioning.
    pub factory_owner: Address,
    /// Target owner for the paymaster after provisioning.
    pub paymaster_owner: Address,
    /// Signer address baked into the paymaster's constructor.
    pub verifying_signer: Address,
    /// The shared CREATE2 factory. Must already exist on the target chain.
    pub factory_address: Address,
    /// Staking registry address used on non-local chains.
    pub entry_point: Address,
    /// Transaction signer override; defaults to the node's first account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer: Option<Address>,
    /// Path to the bytecode manifest produced by the contract build.
    pub bytecode_manifest: PathBuf,
    /// Source-verification endpoint; verification is skipped when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifier_url: Option<Url>,
    /// Keep going past a failed artifact deploy instead of aborting.
    #[serde(default)]
    pub continue_on_deploy_error: bool,
    /// Per-chain profiles, keyed by decimal chain id.
    pub profiles: BTreeMap<String, NetworkProfile>,
}

impl DeployConfig {
    /// Look up the profile for the active chain.
    pub fn profile(&self, chain_id: u64) -> Result<&NetworkProfile> {
        self.profiles.get(&chain_id.to_string()).ok_or_else(|| {
            DeployError::Config(format!(
                "no network profile configured for chain id {chain_id}"
            ))
        })
    }

    /// Reject configurations that cannot possibly provision anything.
    pub fn validate(&self) -> Result<()> {
        for (label, address) in [
            ("factory owner", self.factory_owner),
            ("paymaster owner", self.paymaster_owner),
            ("verifying signer", self.verifying_signer),
            ("factory contract", self.factory_address),
            ("entry point", self.entry_point),
        ] {
            if address.is_zero() {
                return Err(DeployError::Config(format!(
                    "{label} address must not be the zero address"
                )));
            }
        }
        if self.profiles.is_empty() {
            return Err(DeployError::Config(
                "no network profiles configured".to_string(),
            ));
        }
        Ok(())
    }

    /// Save the configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DeployError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, content).map_err(|e| {
            DeployError::Config(format!("failed to write config to {}: {e}", path.display()))
        })?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Load the configuration from a TOML file (or a directory containing
    /// the default file name).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DeployError::Config(format!(
                "configuration file or directory not found: {}",
                path.display()
            )));
        }

        let config_path = if path.is_dir() {
            path.join(SALTCONF_FILENAME)
        } else {
            path.to_path_buf()
        };

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            DeployError::Config(format!(
                "failed to read config from {}: {e}",
                config_path.display()
            ))
        })?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| DeployError::Config(format!("failed to parse config file: {e}")))?;
        tracing::info!(path = %config_path.display(), "Configuration loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn sample_config() -> DeployConfig {
        DeployConfig {
            mode: DeploymentMode::Dev,
            rpc_url: Url::parse("http://127.0.0.1:8545").unwrap(),
            factory_owner: parse_address("t", "0x70997970C51812dc3A010C7d01b50e0d17dc79C8")
                .unwrap(),
            paymaster_owner: parse_address("t", "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC")
                .unwrap(),
            verifying_signer: parse_address("t", "0x90F79bf6EB2c4f870365E785982E1f101E93b906")
                .unwrap(),
            factory_address: parse_address("t", "0x988C135a1049Ce61730724afD342fb7C56CD2776")
                .unwrap(),
            entry_point: parse_address("t", DEFAULT_ENTRY_POINT).unwrap(),
            signer: None,
            bytecode_manifest: PathBuf::from("artifacts/bytecode.json"),
            verifier_url: None,
            continue_on_deploy_error: false,
            profiles: builtin_profiles(),
        }
    }

    #[test]
    fn parse_address_accepts_hex_and_rejects_garbage() {
        assert!(parse_address("owner", "0x70997970C51812dc3A010C7d01b50e0d17dc79C8").is_ok());
        assert!(parse_address("owner", "0x1234").is_err());
        assert!(parse_address("owner", "not-an-address").is_err());
        assert!(parse_address("owner", "").is_err());
    }

    #[test]
    fn missing_profile_is_a_config_error() {
        let config = sample_config();
        assert!(config.profile(31337).is_ok());
        let err = config.profile(424242).unwrap_err();
        assert!(matches!(err, DeployError::Config(_)));
        assert!(err.to_string().contains("424242"));
    }

    #[test]
    fn modes_produce_disjoint_salt_labels() {
        assert_eq!(
            DeploymentMode::Dev.salt("ACCOUNT_IMPL_V1"),
            "DEVELOPMENT_ACCOUNT_IMPL_V1"
        );
        assert_eq!(
            DeploymentMode::Prod.salt("ACCOUNT_IMPL_V1"),
            "PRODUCTION_ACCOUNT_IMPL_V1"
        );
    }

    #[test]
    fn zero_addresses_fail_validation() {
        let mut config = sample_config();
        assert!(config.validate().is_ok());
        config.factory_address = Address::ZERO;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("factory contract"));
    }

    #[test]
    fn config_round_trips_through_toml() {
        let dir = TempDir::new("saltbox-test").expect("temp dir");
        let path = dir.path().join(SALTCONF_FILENAME);

        let config = sample_config();
        config.save_to_file(&path).expect("save");
        let loaded = DeployConfig::load_from_file(&path).expect("load");
        assert_eq!(config, loaded);

        // A directory path resolves to the default file name inside it.
        let from_dir = DeployConfig::load_from_file(dir.path()).expect("load from dir");
        assert_eq!(config, from_dir);
    }

    #[test]
    fn load_missing_config_fails() {
        let dir = TempDir::new("saltbox-test").expect("temp dir");
        let result = DeployConfig::load_from_file(&dir.path().join("nope.toml"));
        assert!(result.is_err());
    }
}
