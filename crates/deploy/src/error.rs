//! Error taxonomy for the provisioning pipeline.
//!
//! Verification failures are deliberately absent: the notifier logs and
//! swallows them inside its own task and can never fail a run.

use alloy_core::primitives::Address;

use crate::rpc::RpcError;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DeployError>;

/// Fatal and per-artifact failure modes of a provisioning run.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Invalid or incomplete configuration. Raised pre-flight, before any
    /// transaction is submitted.
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport or node failure during a ledger read. Distinct from "no
    /// code at address" so an outage is never reported as "not deployed".
    #[error("network error: {0}")]
    Network(#[from] RpcError),

    /// A deploy transaction could not be submitted, or reverted.
    #[error("deployment of {name} failed: {reason}")]
    Submission { name: String, reason: String },

    /// The ledger disagrees with the locally derived address after a deploy.
    /// Signals a salt/bytecode mismatch with the factory's address rule.
    #[error("integrity error for {name} at {address}: {detail}")]
    Integrity {
        name: String,
        address: Address,
        detail: String,
    },

    /// A stake or ownership-transfer transaction failed. Lifecycle state is
    /// security-relevant, so these are never swallowed.
    #[error("lifecycle transaction failed for {name}: {reason}")]
    Lifecycle { name: String, reason: String },
}

impl DeployError {
    /// True for errors that abort the whole run even under the
    /// continue-on-deploy-error policy.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DeployError::Submission { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_errors_are_the_only_continuable_ones() {
        let submission = DeployError::Submission {
            name: "SmartAccount".to_string(),
            reason: "reverted".to_string(),
        };
        assert!(!submission.is_fatal());

        let config = DeployError::Config("missing profile".to_string());
        assert!(config.is_fatal());

        let lifecycle = DeployError::Lifecycle {
            name: "VerifyingPaymaster".to_string(),
            reason: "stake transaction reverted".to_string(),
        };
        assert!(lifecycle.is_fatal());
    }

    #[test]
    fn display_includes_artifact_name() {
        let err = DeployError::Integrity {
            name: "SmartAccountFactory".to_string(),
            address: Address::ZERO,
            detail: "no code at derived address".to_string(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("SmartAccountFactory"));
        assert!(rendered.contains("no code at derived address"));
    }
}
