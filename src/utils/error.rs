//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.
//!
//! Regression violations are not errors; they travel as a
//! [`Verdict`](crate::gate::Verdict).

use std::path::PathBuf;
use thiserror::Error;

/// Errors reported while talking to the node's trace RPC
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Cannot reach RPC node at {url}: {source}")]
    NodeUnreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("RPC request to {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Tracer not supported by this RPC endpoint")]
    TracerNotSupported,
}

/// Raw trace input that cannot form a valid call tree
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedTrace {
    #[error("Invalid trace format: {0}")]
    InvalidFormat(String),

    #[error("Trace contains no frames")]
    Empty,

    #[error("Trace has no root frame")]
    MissingRoot,

    #[error("Trace has more than one root frame (nodes {first} and {second})")]
    MultipleRoots { first: usize, second: usize },

    #[error("Node {index} references missing parent {parent}")]
    InvalidParent { index: usize, parent: usize },

    #[error("Node {index} ('{label}') is part of a parent cycle")]
    Cycle { index: usize, label: String },

    #[error("Node {index} has invalid label '{label}': {reason}")]
    InvalidLabel {
        index: usize,
        label: String,
        reason: &'static str,
    },

    #[error("Duplicate call site '{call_site}' under the same parent")]
    DuplicateCallSite { call_site: String },

    #[error("Negative {field} ({value}) at node {index} ('{label}')")]
    NegativeCost {
        index: usize,
        label: String,
        field: String,
        value: i64,
    },

    #[error("Accumulated {field} overflows u64 at '{call_site}'")]
    CostOverflow { call_site: String, field: String },
}

/// Errors from encoding or decoding a persisted profile
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Profile artifact is truncated: {0}")]
    Truncated(#[source] serde_json::Error),

    #[error("Profile artifact is not valid JSON: {0}")]
    Syntax(#[source] serde_json::Error),

    #[error("Profile artifact does not match the schema: {0}")]
    SchemaMismatch(#[source] serde_json::Error),

    #[error("Unsupported profile schema version {found} (expected {expected})")]
    UnsupportedVersion { found: String, expected: String },

    #[error("Stored {field} ({stored}) disagrees with call tree ({computed})")]
    InconsistentTotals {
        field: String,
        stored: u64,
        computed: u64,
    },

    #[error("Profile artifact holds an invalid call tree: {0}")]
    Malformed(#[from] MalformedTrace),

    #[error("Failed to serialize profile: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Cannot read profile {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt profile {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: Box<CodecError>,
    },
}

/// Invalid threshold configuration. Always fatal: gating fails closed.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read threshold file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Threshold TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Unknown metric family '{0}' (expected one of: gas, hostio)")]
    UnknownFamily(String),

    #[error("Unknown field '{field}' for metric family '{family}'")]
    UnknownField { family: String, field: String },

    #[error("Limit for {family}.{field} must be a number, found {found}")]
    InvalidLimit {
        family: String,
        field: String,
        found: String,
    },

    #[error("Limit for {family}.{field} is negative ({limit})")]
    NegativeLimit {
        family: String,
        field: String,
        limit: f64,
    },

    #[error("Invalid scope '{0}' (expected 'aggregate' or 'per_call_site')")]
    InvalidScope(String),

    #[error("Invalid [[rule]] entry #{index}: {reason}")]
    InvalidRuleEntry { index: usize, reason: String },

    #[error("Duplicate rule {family}.{field} ({scope})")]
    DuplicateRule {
        family: String,
        field: String,
        scope: String,
    },
}

/// Errors that can occur during flamegraph generation
#[derive(Error, Debug)]
pub enum FlamegraphError {
    #[error("Empty stack data")]
    EmptyStacks,

    #[error("Flamegraph output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Flamegraph render failed: {0}")]
    Render(String),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Failed to encode profile: {0}")]
    Codec(#[from] CodecError),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
