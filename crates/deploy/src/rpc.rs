//! JSON-RPC transport for talking to an Ethereum-style ledger endpoint.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Default timeout for RPC requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport-level failures, kept separate from the domain error taxonomy so
/// callers can tell an outage apart from an empty read result.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// The HTTP client itself could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request never produced a well-formed HTTP response.
    #[error("transport error calling {method}: {source}")]
    Transport {
        method: String,
        #[source]
        source: reqwest::Error,
    },

    /// The node answered with a JSON-RPC error object.
    #[error("node error from {method}: {message}")]
    Node { method: String, message: String },

    /// The response arrived but did not have the expected shape.
    #[error("malformed response for {method}: {detail}")]
    Malformed { method: String, detail: String },
}

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client() -> Result<reqwest::Client, RpcError> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .map_err(RpcError::Client)
}

/// Make a JSON-RPC call and deserialize the result field.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
) -> Result<T, RpcError> {
    let response = client
        .post(url)
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .map_err(|source| RpcError::Transport {
            method: method.to_string(),
            source,
        })?;

    let body: Value = response.json().await.map_err(|source| RpcError::Transport {
        method: method.to_string(),
        source,
    })?;

    if let Some(error) = body.get("error") {
        return Err(RpcError::Node {
            method: method.to_string(),
            message: error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown")
                .to_string(),
        });
    }

    let result = body
        .get("result")
        .ok_or_else(|| RpcError::Malformed {
            method: method.to_string(),
            detail: "missing result field".to_string(),
        })?
        .clone();

    serde_json::from_value(result).map_err(|e| RpcError::Malformed {
        method: method.to_string(),
        detail: e.to_string(),
    })
}

/// Parse a 0x-prefixed hex quantity as returned by `eth_chainId` and friends.
pub fn parse_hex_u64(method: &str, value: &str) -> Result<u64, RpcError> {
    u64::from_str_radix(value.trim_start_matches("0x"), 16).map_err(|e| RpcError::Malformed {
        method: method.to_string(),
        detail: format!("'{value}' is not a hex quantity: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_u64_accepts_prefixed_quantities() {
        assert_eq!(parse_hex_u64("eth_chainId", "0x1").unwrap(), 1);
        assert_eq!(parse_hex_u64("eth_chainId", "0x7a69").unwrap(), 31337);
        assert_eq!(
            parse_hex_u64("eth_blockNumber", "0xaa36a7").unwrap(),
            11155111
        );
    }

    #[test]
    fn parse_hex_u64_rejects_garbage() {
        assert!(parse_hex_u64("eth_chainId", "0xzz").is_err());
        assert!(parse_hex_u64("eth_chainId", "").is_err());
    }
}
