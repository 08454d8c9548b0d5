//! Ledger access: typed reads and transaction submission over JSON-RPC.
//!
//! The [`Ledger`] trait is the seam between the orchestration logic and the
//! network. Production runs use [`HttpLedger`]; the integration tests drive
//! the orchestrator against an in-process implementation instead.

use std::time::Duration;

use alloy_core::primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use backon::{ConstantBuilder, Retryable};
use serde::Deserialize;
use url::Url;

use crate::rpc::{self, RpcError};

/// Interval between inclusion polls.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Maximum number of inclusion polls before giving up (~3 minutes).
const RECEIPT_MAX_POLLS: usize = 90;

/// Gas fee overrides applied to every transaction on a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, Deserialize)]
pub struct GasFees {
    /// EIP-1559 max fee per gas, in wei.
    pub max_fee_per_gas: u64,
    /// EIP-1559 max priority fee per gas, in wei.
    pub max_priority_fee_per_gas: u64,
}

/// A transaction request executed through the node-managed signer.
#[derive(Debug, Clone)]
pub struct TxRequest {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    /// Per-chain fee overrides; `None` lets the node price the transaction.
    pub fees: Option<GasFees>,
}

/// Minimal receipt view: inclusion block and execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: B256,
    pub block_number: u64,
    pub success: bool,
}

/// Read and write operations against an append-only ledger.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn chain_id(&self) -> Result<u64, RpcError>;

    /// Accounts managed by the node's signer, in node order.
    async fn accounts(&self) -> Result<Vec<Address>, RpcError>;

    async fn get_code(&self, address: Address) -> Result<Bytes, RpcError>;

    async fn get_balance(&self, address: Address) -> Result<U256, RpcError>;

    /// Execute a read-only call against the latest state.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, RpcError>;

    /// Submit a transaction; returns its hash without waiting for inclusion.
    async fn send_transaction(&self, tx: &TxRequest) -> Result<B256, RpcError>;

    /// Block until the transaction is included and return its receipt.
    async fn wait_for_receipt(&self, hash: B256) -> Result<TxReceipt, RpcError>;
}

/// JSON-RPC implementation of [`Ledger`].
pub struct HttpLedger {
    client: reqwest::Client,
    url: Url,
}

impl HttpLedger {
    pub fn new(url: Url) -> Result<Self, RpcError> {
        Ok(Self {
            client: rpc::create_client()?,
            url,
        })
    }
}

/// Receipt shape as returned by `eth_getTransactionReceipt`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    status: Option<String>,
    block_number: Option<String>,
}

/// Inclusion polling outcome: pending blocks are retried, everything else
/// surfaces immediately.
enum PollError {
    Pending,
    Rpc(RpcError),
}

#[async_trait]
impl Ledger for HttpLedger {
    async fn chain_id(&self) -> Result<u64, RpcError> {
        let raw: String =
            rpc::json_rpc_call(&self.client, self.url.as_str(), "eth_chainId", vec![]).await?;
        rpc::parse_hex_u64("eth_chainId", &raw)
    }

    async fn accounts(&self) -> Result<Vec<Address>, RpcError> {
        rpc::json_rpc_call(&self.client, self.url.as_str(), "eth_accounts", vec![]).await
    }

    async fn get_code(&self, address: Address) -> Result<Bytes, RpcError> {
        rpc::json_rpc_call(
            &self.client,
            self.url.as_str(),
            "eth_getCode",
            vec![
                serde_json::json!(address),
                serde_json::json!("latest"),
            ],
        )
        .await
    }

    async fn get_balance(&self, address: Address) -> Result<U256, RpcError> {
        rpc::json_rpc_call(
            &self.client,
            self.url.as_str(),
            "eth_getBalance",
            vec![
                serde_json::json!(address),
                serde_json::json!("latest"),
            ],
        )
        .await
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, RpcError> {
        rpc::json_rpc_call(
            &self.client,
            self.url.as_str(),
            "eth_call",
            vec![
                serde_json::json!({ "to": to, "data": data }),
                serde_json::json!("latest"),
            ],
        )
        .await
    }

    async fn send_transaction(&self, tx: &TxRequest) -> Result<B256, RpcError> {
        let mut request = serde_json::json!({
            "from": tx.from,
            "to": tx.to,
            "value": tx.value,
            "data": tx.data,
        });
        if let Some(fees) = tx.fees {
            request["maxFeePerGas"] = serde_json::json!(format!("0x{:x}", fees.max_fee_per_gas));
            request["maxPriorityFeePerGas"] =
                serde_json::json!(format!("0x{:x}", fees.max_priority_fee_per_gas));
        }

        rpc::json_rpc_call(
            &self.client,
            self.url.as_str(),
            "eth_sendTransaction",
            vec![request],
        )
        .await
    }

    async fn wait_for_receipt(&self, hash: B256) -> Result<TxReceipt, RpcError> {
        let fetch = || async {
            let raw: Option<RawReceipt> = rpc::json_rpc_call(
                &self.client,
                self.url.as_str(),
                "eth_getTransactionReceipt",
                vec![serde_json::json!(hash)],
            )
            .await
            .map_err(PollError::Rpc)?;

            match raw {
                Some(receipt) if receipt.block_number.is_some() => Ok(receipt),
                _ => Err(PollError::Pending),
            }
        };

        let raw = fetch
            .retry(
                ConstantBuilder::default()
                    .with_delay(RECEIPT_POLL_INTERVAL)
                    .with_max_times(RECEIPT_MAX_POLLS),
            )
            .when(|e| matches!(e, PollError::Pending))
            .await
            .map_err(|e| match e {
                PollError::Rpc(err) => err,
                PollError::Pending => RpcError::Node {
                    method: "eth_getTransactionReceipt".to_string(),
                    message: format!("transaction {hash} not included after {RECEIPT_MAX_POLLS} polls"),
                },
            })?;

        let block_number = match raw.block_number.as_deref() {
            Some(value) => rpc::parse_hex_u64("eth_getTransactionReceipt", value)?,
            None => 0,
        };
        // Pre-Byzantium nodes omit status; absence is treated as success.
        let success = raw.status.as_deref().map(|s| s != "0x0").unwrap_or(true);

        Ok(TxReceipt {
            transaction_hash: hash,
            block_number,
            success,
        })
    }
}
