//! The fixed artifact catalog: names, salts, constructor shapes, stake roles.
//!
//! Bytecode templates are opaque to this tool; they come out of the contract
//! build pipeline as a JSON manifest keyed by artifact name.

use std::collections::BTreeMap;
use std::path::Path;

use alloy_core::primitives::Bytes;
use serde::Deserialize;

use crate::config::DeploymentMode;
use crate::error::{DeployError, Result};

pub const ENTRY_POINT: &str = "EntryPoint";
pub const ACCOUNT_IMPL: &str = "SmartAccount";
pub const ACCOUNT_FACTORY: &str = "SmartAccountFactory";
pub const VERIFYING_PAYMASTER: &str = "VerifyingPaymaster";
pub const ECDSA_OWNERSHIP_MODULE: &str = "EcdsaOwnershipModule";
pub const MULTICHAIN_VALIDATOR: &str = "MultichainValidator";
pub const PASSKEY_MODULE: &str = "PasskeyModule";
pub const SESSION_KEY_MANAGER: &str = "SessionKeyManager";
pub const BATCHED_SESSION_ROUTER: &str = "BatchedSessionRouter";
pub const ERC20_SESSION_VALIDATOR: &str = "Erc20SessionValidator";
pub const ERC721_SESSION_VALIDATOR: &str = "Erc721SessionValidator";
pub const CONTRACT_OWNERSHIP_MODULE: &str = "ContractOwnershipModule";

/// Where a constructor argument comes from at resolution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgSource {
    /// Address of an artifact deployed earlier in the same run.
    Deployed(&'static str),
    /// The staking registry (entry point) address.
    EntryPoint,
    /// The transaction-signing identity.
    Signer,
    /// The configured paymaster signature-checking signer.
    VerifyingSigner,
}

/// Post-deployment lifecycle role. The two roles stake through differently
/// shaped registry calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakeRole {
    Factory,
    Paymaster,
}

/// A deployable artifact: identity, salt label, constructor shape, role.
#[derive(Debug, Clone)]
pub struct ArtifactSpec {
    pub name: &'static str,
    /// Mode-scoped salt label; hashing it yields the deployment salt.
    pub salt: String,
    pub constructor: Vec<ArgSource>,
    pub stake_role: Option<StakeRole>,
    /// Deployed through the factory only on the local development chain;
    /// live chains use the canonical pre-deployed instance.
    pub local_only: bool,
}

impl ArtifactSpec {
    fn new(name: &'static str, salt: String, constructor: Vec<ArgSource>) -> Self {
        Self {
            name,
            salt,
            constructor,
            stake_role: None,
            local_only: false,
        }
    }

    fn with_stake_role(mut self, role: StakeRole) -> Self {
        self.stake_role = Some(role);
        self
    }

    fn local_only(mut self) -> Self {
        self.local_only = true;
        self
    }
}

/// Build the full artifact catalog in dependency order.
///
/// Order matters: the entry point precedes everything that takes its
/// address, and the account implementation precedes the factory that
/// clones it.
pub fn catalog(mode: DeploymentMode) -> Vec<ArtifactSpec> {
    vec![
        ArtifactSpec::new(ENTRY_POINT, mode.salt("ENTRY_POINT_V1"), vec![]).local_only(),
        ArtifactSpec::new(
            ACCOUNT_IMPL,
            mode.salt("ACCOUNT_IMPL_V1"),
            vec![ArgSource::EntryPoint],
        ),
        ArtifactSpec::new(
            ACCOUNT_FACTORY,
            mode.salt("ACCOUNT_FACTORY_V1"),
            vec![ArgSource::Deployed(ACCOUNT_IMPL), ArgSource::Signer],
        )
        .with_stake_role(StakeRole::Factory),
        ArtifactSpec::new(
            VERIFYING_PAYMASTER,
            mode.salt("VERIFYING_PAYMASTER_V1"),
            vec![
                ArgSource::Signer,
                ArgSource::EntryPoint,
                ArgSource::VerifyingSigner,
            ],
        )
        .with_stake_role(StakeRole::Paymaster),
        ArtifactSpec::new(
            ECDSA_OWNERSHIP_MODULE,
            mode.salt("ECDSA_OWNERSHIP_MODULE_V1"),
            vec![],
        ),
        ArtifactSpec::new(
            MULTICHAIN_VALIDATOR,
            mode.salt("MULTICHAIN_VALIDATOR_V1"),
            vec![],
        ),
        ArtifactSpec::new(PASSKEY_MODULE, mode.salt("PASSKEY_MODULE_V1"), vec![]),
        ArtifactSpec::new(
            SESSION_KEY_MANAGER,
            mode.salt("SESSION_KEY_MANAGER_V2"),
            vec![],
        ),
        ArtifactSpec::new(
            BATCHED_SESSION_ROUTER,
            mode.salt("BATCHED_SESSION_ROUTER_V1"),
            vec![],
        ),
        ArtifactSpec::new(
            ERC20_SESSION_VALIDATOR,
            mode.salt("ERC20_SESSION_VALIDATOR_V1"),
            vec![],
        ),
        ArtifactSpec::new(
            ERC721_SESSION_VALIDATOR,
            mode.salt("ERC721_SESSION_VALIDATOR_V1"),
            vec![],
        ),
        ArtifactSpec::new(
            CONTRACT_OWNERSHIP_MODULE,
            mode.salt("CONTRACT_OWNERSHIP_MODULE_V1"),
            vec![],
        ),
    ]
}

/// Opaque bytecode templates keyed by artifact name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BytecodeManifest(BTreeMap<String, Bytes>);

impl BytecodeManifest {
    /// Load the manifest from a JSON file of `{ "<name>": "0x..." }` entries.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DeployError::Config(format!(
                "failed to read bytecode manifest {}: {e}",
                path.display()
            ))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            DeployError::Config(format!(
                "failed to parse bytecode manifest {}: {e}",
                path.display()
            ))
        })
    }

    /// Bytecode template for `name`; a cataloged artifact missing from the
    /// manifest is a configuration error.
    pub fn bytecode(&self, name: &str) -> Result<&Bytes> {
        self.0.get(name).ok_or_else(|| {
            DeployError::Config(format!("bytecode manifest has no entry for '{name}'"))
        })
    }
}

impl FromIterator<(String, Bytes)> for BytecodeManifest {
    fn from_iter<I: IntoIterator<Item = (String, Bytes)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_dependency_ordered() {
        for mode in [DeploymentMode::Dev, DeploymentMode::Prod] {
            let specs = catalog(mode);
            for (i, spec) in specs.iter().enumerate() {
                for arg in &spec.constructor {
                    if let ArgSource::Deployed(dep) = arg {
                        let dep_index = specs
                            .iter()
                            .position(|s| s.name == *dep)
                            .unwrap_or_else(|| panic!("{dep} missing from catalog"));
                        assert!(
                            dep_index < i,
                            "{} depends on {dep} which is cataloged later",
                            spec.name
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn names_and_salts_are_unique() {
        let specs = catalog(DeploymentMode::Prod);
        for (i, a) in specs.iter().enumerate() {
            for b in specs.iter().skip(i + 1) {
                assert_ne!(a.name, b.name);
                assert_ne!(a.salt, b.salt);
            }
        }
    }

    #[test]
    fn salts_differ_across_modes() {
        let dev = catalog(DeploymentMode::Dev);
        let prod = catalog(DeploymentMode::Prod);
        for (d, p) in dev.iter().zip(prod.iter()) {
            assert_eq!(d.name, p.name);
            assert_ne!(d.salt, p.salt);
        }
    }

    #[test]
    fn stake_roles_cover_factory_and_paymaster_only() {
        let specs = catalog(DeploymentMode::Dev);
        let staked: Vec<_> = specs.iter().filter(|s| s.stake_role.is_some()).collect();
        assert_eq!(staked.len(), 2);
        assert_eq!(staked[0].name, ACCOUNT_FACTORY);
        assert_eq!(staked[1].name, VERIFYING_PAYMASTER);
    }

    #[test]
    fn manifest_reports_missing_entries() {
        let manifest: BytecodeManifest = [(
            ACCOUNT_IMPL.to_string(),
            Bytes::from(vec![0x60, 0x80, 0x60, 0x40]),
        )]
        .into_iter()
        .collect();

        assert!(manifest.bytecode(ACCOUNT_IMPL).is_ok());
        let err = manifest.bytecode(VERIFYING_PAYMASTER).unwrap_err();
        assert!(err.to_string().contains(VERIFYING_PAYMASTER));
    }
}
