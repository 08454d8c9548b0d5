//! Top-level provisioning sequencer.
//!
//! One artifact is fully resolved (address derivation, deploy-or-skip,
//! lifecycle) before the next begins; later artifacts read the addresses of
//! earlier ones out of the threaded [`DeploymentRecord`].

use std::path::Path;

use alloy_core::primitives::{Address, U256, keccak256};
use indexmap::IndexMap;
use serde::Serialize;

use crate::abi;
use crate::address::{create2_address, derive_salt};
use crate::catalog::{self, ArtifactSpec, BytecodeManifest, StakeRole, catalog};
use crate::config::{DeployConfig, LOCAL_CHAIN_ID, NetworkProfile};
use crate::error::{DeployError, Result};
use crate::factory::SaltFactory;
use crate::ledger::Ledger;
use crate::stake::{LifecycleManager, LifecycleState};
use crate::verify::VerificationNotifier;

/// Write-once mapping from artifact name to resolved address.
///
/// Keeps insertion (dependency) order; entries are never overwritten within
/// a run.
#[derive(Debug, Clone, Default, Serialize, derive_more::Deref)]
pub struct DeploymentRecord(IndexMap<String, Address>);

impl DeploymentRecord {
    /// Record `name` at `address`. Re-recording a name is an orchestration
    /// bug, surfaced rather than silently overwritten.
    pub fn insert(&mut self, name: &str, address: Address) -> Result<()> {
        if self.0.contains_key(name) {
            return Err(DeployError::Config(format!(
                "artifact '{name}' resolved twice in one run"
            )));
        }
        self.0.insert(name.to_string(), address);
        Ok(())
    }

    /// Address of a previously resolved artifact; absence is fatal for the
    /// dependent artifact.
    pub fn address_of(&self, name: &str) -> Result<Address> {
        self.0.get(name).copied().ok_or_else(|| {
            DeployError::Config(format!(
                "dependency address for '{name}' is not available"
            ))
        })
    }
}

/// How an artifact's address got resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Resolution {
    /// Freshly deployed in this run.
    Deployed,
    /// Code was already present at the derived address.
    AlreadyPresent,
    /// A canonical pre-deployed instance outside this run's control.
    External,
    /// Deploy failed and the continue policy kept the run going.
    Failed,
}

/// Per-artifact line of the final report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub name: String,
    pub address: Option<Address>,
    pub resolution: Resolution,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle: Option<LifecycleState>,
}

/// Result surface of one provisioning run.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentReport {
    pub chain_id: u64,
    pub signer: Address,
    pub record: DeploymentRecord,
    pub entries: Vec<ReportEntry>,
    pub balance_before: U256,
    pub balance_after: U256,
    /// Unix timestamp of run completion.
    pub completed_at: u64,
}

impl DeploymentReport {
    /// Wei spent by the signer over the run.
    pub fn funds_used(&self) -> U256 {
        self.balance_before
            .checked_sub(self.balance_after)
            .unwrap_or_default()
    }

    /// Persist the report as formatted JSON.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| DeployError::Config(format!("failed to serialize report: {e}")))?;
        std::fs::write(path, json).map_err(|e| {
            DeployError::Config(format!("failed to write report to {}: {e}", path.display()))
        })?;
        tracing::info!(path = %path.display(), "Report saved");
        Ok(())
    }
}

/// Outcome of one deploy-or-skip step.
struct ProvisionOutcome {
    address: Address,
    resolution: Resolution,
}

/// Sequences the whole provisioning run.
pub struct Orchestrator<'a> {
    config: &'a DeployConfig,
    ledger: &'a dyn Ledger,
    manifest: &'a BytecodeManifest,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a DeployConfig,
        ledger: &'a dyn Ledger,
        manifest: &'a BytecodeManifest,
    ) -> Self {
        Self {
            config,
            ledger,
            manifest,
        }
    }

    /// Run the full pipeline: pre-flight, then one provisioning step per
    /// artifact in catalog order.
    pub async fn run(&self) -> Result<DeploymentReport> {
        self.config.validate()?;

        let chain_id = self.ledger.chain_id().await?;
        let profile = *self.config.profile(chain_id)?;
        let signer = self.resolve_signer().await?;

        // The shared factory is a hard precondition: this tool never
        // deploys its own entry point into the ledger.
        let factory_code = self.ledger.get_code(self.config.factory_address).await?;
        if factory_code.is_empty() {
            return Err(DeployError::Config(format!(
                "factory contract {} has no code on chain {chain_id}; deploy it before provisioning",
                self.config.factory_address
            )));
        }

        let balance_before = self.ledger.get_balance(signer).await?;
        tracing::info!(
            chain_id,
            mode = %self.config.mode,
            signer = %signer,
            factory = %self.config.factory_address,
            factory_owner = %self.config.factory_owner,
            paymaster_owner = %self.config.paymaster_owner,
            verifying_signer = %self.config.verifying_signer,
            balance = %format_ether(balance_before),
            "Starting provisioning run"
        );

        let factory =
            SaltFactory::new(self.ledger, self.config.factory_address, signer, profile.gas);
        let notifier = VerificationNotifier::new(self.config.verifier_url.clone(), chain_id);

        let mut record = DeploymentRecord::default();
        let mut entries = Vec::new();
        let mut entry_point = self.config.entry_point;

        for spec in catalog(self.config.mode) {
            if spec.local_only && chain_id != LOCAL_CHAIN_ID {
                tracing::info!(
                    artifact = spec.name,
                    address = %entry_point,
                    "Using canonical pre-deployed instance"
                );
                record.insert(spec.name, entry_point)?;
                entries.push(ReportEntry {
                    name: spec.name.to_string(),
                    address: Some(entry_point),
                    resolution: Resolution::External,
                    lifecycle: None,
                });
                continue;
            }

            match self
                .provision(&spec, signer, entry_point, &mut record, &factory, &notifier)
                .await
            {
                Ok(outcome) => {
                    if spec.name == catalog::ENTRY_POINT {
                        entry_point = outcome.address;
                    }
                    let lifecycle = match spec.stake_role {
                        Some(role) => Some(
                            self.lifecycle(&spec, outcome.address, role, entry_point, signer, &profile)
                                .await?,
                        ),
                        None => None,
                    };
                    entries.push(ReportEntry {
                        name: spec.name.to_string(),
                        address: Some(outcome.address),
                        resolution: outcome.resolution,
                        lifecycle,
                    });
                }
                Err(err) if !err.is_fatal() && self.config.continue_on_deploy_error => {
                    // Explicitly opted-in: the artifact is reported as
                    // failed and nothing is recorded for it, so dependents
                    // still fail loudly at argument resolution.
                    tracing::error!(
                        artifact = spec.name,
                        error = %err,
                        "Artifact deploy failed, continuing"
                    );
                    entries.push(ReportEntry {
                        name: spec.name.to_string(),
                        address: None,
                        resolution: Resolution::Failed,
                        lifecycle: None,
                    });
                }
                Err(err) => return Err(err),
            }
        }

        let balance_after = self.ledger.get_balance(signer).await?;
        let report = DeploymentReport {
            chain_id,
            signer,
            record,
            entries,
            balance_before,
            balance_after,
            completed_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("System time should be after Unix epoch")
                .as_secs(),
        };
        tracing::info!(
            balance = %format_ether(balance_after),
            funds_used = %format_ether(report.funds_used()),
            "Provisioning run complete"
        );
        Ok(report)
    }

    /// The signing identity: configured override or the node's first account.
    async fn resolve_signer(&self) -> Result<Address> {
        if let Some(signer) = self.config.signer {
            return Ok(signer);
        }
        self.ledger
            .accounts()
            .await?
            .first()
            .copied()
            .ok_or_else(|| {
                DeployError::Config(
                    "node exposes no signing accounts and no signer override is configured"
                        .to_string(),
                )
            })
    }

    /// Deploy-or-skip one artifact and record its address.
    async fn provision(
        &self,
        spec: &ArtifactSpec,
        signer: Address,
        entry_point: Address,
        record: &mut DeploymentRecord,
        factory: &SaltFactory<'_>,
        notifier: &VerificationNotifier,
    ) -> Result<ProvisionOutcome> {
        let args = self.resolve_args(spec, signer, entry_point, record)?;

        let mut init_code = self.manifest.bytecode(spec.name)?.to_vec();
        for arg in &args {
            init_code.extend_from_slice(&abi::encode_address(*arg));
        }

        let derived_salt = derive_salt(&spec.salt);
        let expected = create2_address(
            self.config.factory_address,
            derived_salt,
            keccak256(&init_code),
        );
        tracing::info!(
            artifact = spec.name,
            address = %expected,
            "Computed deterministic address"
        );

        let resolution = if factory.exists(expected).await? {
            tracing::info!(
                artifact = spec.name,
                address = %expected,
                "Already deployed, skipping"
            );
            Resolution::AlreadyPresent
        } else {
            factory
                .deploy(spec.name, expected, derived_salt, &init_code.into())
                .await?;
            Resolution::Deployed
        };

        notifier.notify(spec.name, expected, &args);
        record.insert(spec.name, expected)?;

        Ok(ProvisionOutcome {
            address: expected,
            resolution,
        })
    }

    /// Resolve constructor argument sources into concrete addresses.
    fn resolve_args(
        &self,
        spec: &ArtifactSpec,
        signer: Address,
        entry_point: Address,
        record: &DeploymentRecord,
    ) -> Result<Vec<Address>> {
        spec.constructor
            .iter()
            .map(|source| {
                let address = match source {
                    catalog::ArgSource::Deployed(name) => record.address_of(name)?,
                    catalog::ArgSource::EntryPoint => entry_point,
                    catalog::ArgSource::Signer => signer,
                    catalog::ArgSource::VerifyingSigner => self.config.verifying_signer,
                };
                if address.is_zero() {
                    return Err(DeployError::Config(format!(
                        "constructor argument for {} resolved to the zero address",
                        spec.name
                    )));
                }
                Ok(address)
            })
            .collect()
    }

    /// Run the stake/ownership lifecycle for a registry participant.
    async fn lifecycle(
        &self,
        spec: &ArtifactSpec,
        address: Address,
        role: StakeRole,
        entry_point: Address,
        signer: Address,
        profile: &NetworkProfile,
    ) -> Result<LifecycleState> {
        let (params, target_owner) = match role {
            StakeRole::Factory => (profile.factory_stake, self.config.factory_owner),
            StakeRole::Paymaster => (profile.paymaster_stake, self.config.paymaster_owner),
        };
        let manager = LifecycleManager::new(self.ledger, entry_point, signer, profile.gas);
        manager
            .run(spec.name, address, role, &params, target_owner)
            .await
    }
}

/// Render a wei amount as a decimal ether string with six fractional digits.
pub fn format_ether(wei: U256) -> String {
    let one_ether = U256::from(1_000_000_000_000_000_000u128);
    let micro = U256::from(1_000_000_000_000u128);
    let whole = wei / one_ether;
    let frac: u64 = ((wei % one_ether) / micro).to::<u64>();
    format!("{whole}.{frac:06}")
}
