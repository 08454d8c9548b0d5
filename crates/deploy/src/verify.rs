//! Best-effort source-verification notifications.
//!
//! Verification runs as a detached task with its own logging error channel.
//! Nothing here can fail a run or change a deployment result.

use alloy_core::primitives::Address;
use url::Url;

use crate::rpc;

/// Client for an HTTP source-verification service.
pub struct VerificationNotifier {
    client: Option<reqwest::Client>,
    endpoint: Option<Url>,
    chain_id: u64,
}

impl VerificationNotifier {
    pub fn new(endpoint: Option<Url>, chain_id: u64) -> Self {
        // A client that cannot be built just disables verification.
        let client = match rpc::create_client() {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "Verification disabled: HTTP client unavailable");
                None
            }
        };
        Self {
            client,
            endpoint,
            chain_id,
        }
    }

    /// Fire-and-forget verification request for a resolved artifact.
    ///
    /// Invoked once per artifact, whether it was freshly deployed or already
    /// present. Failures (service down, already verified, rate limits) are
    /// logged inside the spawned task and never reach the caller.
    pub fn notify(&self, name: &str, address: Address, constructor_args: &[Address]) {
        let (Some(client), Some(endpoint)) = (self.client.clone(), self.endpoint.clone()) else {
            tracing::debug!(artifact = name, "No verifier endpoint configured, skipping");
            return;
        };

        let payload = serde_json::json!({
            "name": name,
            "address": address,
            "chainId": self.chain_id,
            "constructorArguments": constructor_args,
        });
        let name = name.to_string();

        tokio::spawn(async move {
            tracing::info!(artifact = %name, "Submitting for verification...");
            match client.post(endpoint).json(&payload).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::info!(artifact = %name, "Verification submitted");
                }
                Ok(response) => {
                    tracing::warn!(
                        artifact = %name,
                        status = %response.status(),
                        "Verifier rejected submission"
                    );
                }
                Err(e) => {
                    tracing::warn!(artifact = %name, error = %e, "Verification request failed");
                }
            }
        });
    }
}
