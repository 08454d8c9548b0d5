//! saltbox is a CLI tool that provisions a fixed catalog of contract
//! artifacts onto deterministic addresses in one idempotent run.

mod cli;

use anyhow::Result;
use clap::Parser;
use comfy_table::{Table, presets};

use cli::Cli;
use saltbox_deploy::{
    BytecodeManifest, DeployConfig, DeploymentReport, HttpLedger, Orchestrator, format_ether,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    // If a config file is provided, it wins over the address flags.
    let config = match &cli.config {
        Some(path) => DeployConfig::load_from_file(path)?,
        None => cli.to_config()?,
    };

    if let Some(path) = &cli.save_config {
        config.save_to_file(path)?;
    }

    let manifest = BytecodeManifest::load_from_file(&config.bytecode_manifest)?;
    let ledger = HttpLedger::new(config.rpc_url.clone())?;

    let report = Orchestrator::new(&config, &ledger, &manifest).run().await?;

    println!("{}", render_report(&report));

    if let Some(path) = &cli.report {
        report.save_to_file(path)?;
    }

    Ok(())
}

/// Render the run result as a summary table.
fn render_report(report: &DeploymentReport) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_header(vec!["Artifact", "Address", "Resolution", "Lifecycle"]);

    for entry in &report.entries {
        table.add_row(vec![
            entry.name.clone(),
            entry
                .address
                .map(|a| a.to_string())
                .unwrap_or_else(|| "-".to_string()),
            entry.resolution.to_string(),
            entry
                .lifecycle
                .map(|l| l.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }

    table.add_row(vec![
        "funds used".to_string(),
        format!("{} ETH", format_ether(report.funds_used())),
        String::new(),
        String::new(),
    ]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_core::primitives::{Address, U256};
    use saltbox_deploy::orchestrator::{DeploymentRecord, ReportEntry, Resolution};
    use saltbox_deploy::stake::LifecycleState;

    #[test]
    fn report_table_lists_every_entry() {
        let address = Address::from_slice(&[0xAA; 20]);
        let mut record = DeploymentRecord::default();
        record.insert("SmartAccountFactory", address).unwrap();

        let report = DeploymentReport {
            chain_id: 31337,
            signer: Address::from_slice(&[0x01; 20]),
            record,
            entries: vec![
                ReportEntry {
                    name: "SmartAccountFactory".to_string(),
                    address: Some(address),
                    resolution: Resolution::Deployed,
                    lifecycle: Some(LifecycleState::OwnershipTransferred),
                },
                ReportEntry {
                    name: "PasskeyModule".to_string(),
                    address: None,
                    resolution: Resolution::Failed,
                    lifecycle: None,
                },
            ],
            balance_before: U256::from(3_000_000_000_000_000_000u128),
            balance_after: U256::from(1_000_000_000_000_000_000u128),
            completed_at: 1_737_316_800,
        };

        let rendered = render_report(&report).to_string();
        assert!(rendered.contains("SmartAccountFactory"));
        assert!(rendered.contains("ownership-transferred"));
        assert!(rendered.contains("failed"));
        assert!(rendered.contains("2.000000 ETH"));
    }
}
