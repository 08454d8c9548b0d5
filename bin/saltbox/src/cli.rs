use std::path::PathBuf;

use clap::Parser;
use saltbox_deploy::config::{self, DEFAULT_ENTRY_POINT};
use saltbox_deploy::{DeployConfig, DeployError, DeploymentMode, builtin_profiles};
use tracing::level_filters::LevelFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "saltbox")]
#[command(
    author,
    version,
    about = "Provision a deterministic contract deployment in one idempotent run"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "SALTBOX_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Deployment mode selecting the salt set.
    ///
    /// Dev and prod salts land the same artifacts on different
    /// deterministic addresses.
    #[arg(short, long, env = "SALTBOX_MODE", default_value_t = DeploymentMode::Dev)]
    pub mode: DeploymentMode,

    /// JSON-RPC endpoint of the target network.
    #[arg(
        long,
        alias = "rpc",
        env = "SALTBOX_RPC_URL",
        default_value = "http://127.0.0.1:8545"
    )]
    pub rpc_url: Url,

    /// Target owner address for the account factory.
    #[arg(long, env = "SALTBOX_FACTORY_OWNER_ADDRESS")]
    pub factory_owner: Option<String>,

    /// Target owner address for the paymaster.
    #[arg(long, env = "SALTBOX_PAYMASTER_OWNER_ADDRESS")]
    pub paymaster_owner: Option<String>,

    /// Signer address baked into the paymaster's constructor.
    #[arg(long, env = "SALTBOX_PAYMASTER_SIGNER_ADDRESS")]
    pub verifying_signer: Option<String>,

    /// Address of the pre-deployed CREATE2 factory contract.
    ///
    /// The factory is never deployed by this tool; provisioning aborts if
    /// it has no code on the target chain.
    #[arg(long, env = "SALTBOX_FACTORY_CONTRACT_ADDRESS")]
    pub factory_contract: Option<String>,

    /// Staking registry (entry point) address used on live chains.
    #[arg(long, env = "SALTBOX_ENTRY_POINT_ADDRESS", default_value = DEFAULT_ENTRY_POINT)]
    pub entry_point: String,

    /// Transaction signer override; defaults to the node's first account.
    #[arg(long, env = "SALTBOX_SIGNER_ADDRESS")]
    pub signer: Option<String>,

    /// Path to the bytecode manifest produced by the contract build.
    #[arg(
        long,
        alias = "artifacts",
        env = "SALTBOX_BYTECODE_MANIFEST",
        default_value = "artifacts/bytecode.json"
    )]
    pub bytecode_manifest: PathBuf,

    /// Source-verification endpoint. Verification is skipped when absent.
    #[arg(long, env = "SALTBOX_VERIFIER_URL")]
    pub verifier_url: Option<Url>,

    /// Keep going past a failed artifact deploy instead of aborting.
    ///
    /// Failed artifacts are reported as such and recorded nowhere, so
    /// anything depending on them still fails loudly.
    #[arg(long, env = "SALTBOX_CONTINUE_ON_DEPLOY_ERROR")]
    pub continue_on_deploy_error: bool,

    /// Path to an existing Saltbox.toml configuration file to load.
    ///
    /// When provided, the run uses the configuration from this file
    /// instead of the address flags above.
    #[arg(long, alias = "conf", env = "SALTBOX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write the resolved configuration to this path before running.
    #[arg(long, env = "SALTBOX_SAVE_CONFIG")]
    pub save_config: Option<PathBuf>,

    /// Write the final deployment report to this path as JSON.
    #[arg(long, env = "SALTBOX_REPORT")]
    pub report: Option<PathBuf>,
}

impl Cli {
    /// Build a validated configuration from the CLI arguments.
    pub fn to_config(&self) -> Result<DeployConfig, DeployError> {
        let required = |label: &str, value: &Option<String>| {
            let value = value
                .as_deref()
                .ok_or_else(|| DeployError::Config(format!("missing {label} address")))?;
            config::parse_address(label, value)
        };

        let signer = self
            .signer
            .as_deref()
            .map(|value| config::parse_address("signer", value))
            .transpose()?;

        Ok(DeployConfig {
            mode: self.mode,
            rpc_url: self.rpc_url.clone(),
            factory_owner: required("factory owner", &self.factory_owner)?,
            paymaster_owner: required("paymaster owner", &self.paymaster_owner)?,
            verifying_signer: required("verifying signer", &self.verifying_signer)?,
            factory_address: required("factory contract", &self.factory_contract)?,
            entry_point: config::parse_address("entry point", &self.entry_point)?,
            signer,
            bytecode_manifest: self.bytecode_manifest.clone(),
            verifier_url: self.verifier_url.clone(),
            continue_on_deploy_error: self.continue_on_deploy_error,
            profiles: builtin_profiles(),
        })
    }
}
