//! Types for JSON-RPC communication with an Arbitrum Nitro node.
//!
//! Ethereum JSON-RPC envelopes plus Arbitrum's debug_traceTransaction extension.

use serde::{Deserialize, Serialize};

/// JSON-RPC 2.0 request structure
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: serde_json::Value,
    pub id: u64,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC request for debug_traceTransaction
    ///
    /// # Arguments
    /// * `tx_hash` - Transaction hash (with 0x prefix)
    /// * `tracer` - Tracer the node should run
    /// * `id` - Request ID (for response correlation)
    pub fn debug_trace_transaction(tx_hash: &str, tracer: &str, id: u64) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: "debug_traceTransaction".to_string(),
            params: serde_json::json!([tx_hash, { "tracer": tracer }]),
            id,
        }
    }
}

/// JSON-RPC 2.0 response structure
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse<T> {
    #[serde(default)]
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error object
#[derive(Debug, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Raw trace payload, validated later by the parser
///
/// Kept as `serde_json::Value` because the schema varies between Nitro
/// versions and tracers.
pub type RawTraceData = serde_json::Value;
