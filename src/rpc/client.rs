//! HTTP client for communicating with an Arbitrum Nitro node RPC endpoint.

use super::types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RawTraceData};
use crate::utils::config::DEFAULT_TRACER;
use crate::utils::error::CaptureError;
use log::{debug, info};
use reqwest::blocking::Client;
use std::time::Duration;

/// RPC client for fetching trace data from a Nitro node
pub struct RpcClient {
    client: Client,
    rpc_url: String,
    timeout: Duration,
}

impl RpcClient {
    /// Create a new RPC client whose requests give up after `timeout`
    pub fn new(rpc_url: impl Into<String>, timeout: Duration) -> Result<Self, CaptureError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            rpc_url: rpc_url.into(),
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.rpc_url
    }

    /// Fetch a transaction trace with an optional tracer
    ///
    /// **Public** - the only network call the tool makes
    ///
    /// # Arguments
    /// * `tx_hash` - Transaction hash, with or without `0x`
    /// * `tracer` - Tracer name, `stylusTracer` when `None`
    ///
    /// # Errors
    /// * `CaptureError::NodeUnreachable` - connection refused or DNS failure
    /// * `CaptureError::Timeout` - no answer within the client timeout
    /// * `CaptureError::TransactionNotFound` / `TracerNotSupported` - node-side errors
    /// * `CaptureError::InvalidResponse` - non-2xx status or malformed JSON-RPC
    pub fn debug_trace_transaction(
        &self,
        tx_hash: &str,
        tracer: Option<&str>,
    ) -> Result<RawTraceData, CaptureError> {
        let tx_hash = normalize_tx_hash(tx_hash);
        info!("Fetching trace for transaction: {}", tx_hash);

        let request =
            JsonRpcRequest::debug_trace_transaction(&tx_hash, tracer.unwrap_or(DEFAULT_TRACER), 1);
        debug!("RPC request: {:?}", request);

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CaptureError::InvalidResponse(format!(
                "HTTP {}: {}",
                status,
                response.text().unwrap_or_default()
            )));
        }

        let rpc_response: JsonRpcResponse<RawTraceData> =
            response.json().map_err(|e| self.classify(e))?;

        if let Some(error) = rpc_response.error {
            return Err(map_rpc_error(error, &tx_hash));
        }

        rpc_response
            .result
            .ok_or_else(|| CaptureError::InvalidResponse("Missing result field".to_string()))
    }

    fn classify(&self, error: reqwest::Error) -> CaptureError {
        if error.is_timeout() {
            CaptureError::Timeout {
                url: self.rpc_url.clone(),
                seconds: self.timeout.as_secs(),
            }
        } else if error.is_connect() {
            CaptureError::NodeUnreachable {
                url: self.rpc_url.clone(),
                source: error,
            }
        } else if error.is_decode() {
            CaptureError::InvalidResponse(error.to_string())
        } else {
            CaptureError::Http(error)
        }
    }
}

/// Normalize transaction hash to include 0x prefix
pub fn normalize_tx_hash(tx_hash: &str) -> String {
    if tx_hash.starts_with("0x") {
        tx_hash.to_string()
    } else {
        format!("0x{}", tx_hash)
    }
}

/// Map JSON-RPC error to our error type
fn map_rpc_error(error: JsonRpcError, tx_hash: &str) -> CaptureError {
    let message = error.message.to_lowercase();
    match error.code {
        -32000 if message.contains("not found") => CaptureError::TransactionNotFound(tx_hash.to_string()),
        -32000 if message.contains("tracer") => CaptureError::TracerNotSupported,
        -32601 => CaptureError::TracerNotSupported,
        _ => CaptureError::InvalidResponse(format!("{}: {}", error.code, error.message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rpc_error(code: i64, message: &str) -> JsonRpcError {
        JsonRpcError {
            code,
            message: message.to_string(),
            data: None,
        }
    }

    #[test]
    fn test_normalize_tx_hash() {
        assert_eq!(normalize_tx_hash("abc123"), "0xabc123");
        assert_eq!(normalize_tx_hash("0xdef456"), "0xdef456");
    }

    #[test]
    fn test_map_rpc_error() {
        assert!(matches!(
            map_rpc_error(rpc_error(-32000, "transaction not found"), "0x1"),
            CaptureError::TransactionNotFound(tx) if tx == "0x1"
        ));
        assert!(matches!(
            map_rpc_error(rpc_error(-32000, "tracer stylusTracer unknown"), "0x1"),
            CaptureError::TracerNotSupported
        ));
        assert!(matches!(
            map_rpc_error(rpc_error(-32601, "method not found"), "0x1"),
            CaptureError::TracerNotSupported
        ));
        assert!(matches!(
            map_rpc_error(rpc_error(-32602, "invalid params"), "0x1"),
            CaptureError::InvalidResponse(_)
        ));
    }
}

