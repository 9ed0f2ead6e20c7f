//! Configuration and constants for the CLI.

use std::time::Duration;

/// Default timeout for RPC requests
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Default Nitro dev-node endpoint
pub const DEFAULT_RPC_URL: &str = "http://localhost:8547";

/// Tracer requested when the caller does not name one
pub const DEFAULT_TRACER: &str = "stylusTracer";

/// Current profile artifact schema version
pub const SCHEMA_VERSION: &str = "2.0.0";

/// Current diff report schema version
pub const DIFF_REPORT_VERSION: &str = "1.0.0";

// Stylus meters execution in "ink"; 1 gas = 10,000 ink.
pub const GAS_TO_INK_MULTIPLIER: u64 = 10_000;

/// Label given to the synthetic entry frame of every parsed trace
pub const ROOT_LABEL: &str = "root";

/// Separator between labels in a call-site path (folded-stack compatible)
pub const CALL_SITE_SEPARATOR: char = ';';

/// Process exit status: gate passed, or nothing to gate
pub const EXIT_PASS: u8 = 0;

/// Process exit status: at least one threshold rule was violated
pub const EXIT_REGRESSION: u8 = 1;

/// Process exit status: capture, codec, config or I/O failure
pub const EXIT_OPERATIONAL_ERROR: u8 = 2;

/// Directory that bare output filenames are placed under
pub const ARTIFACTS_DIR: &str = "artifacts";

// Field names for trace parsing (different RPC implementations use different names)
pub const GAS_FIELD_NAMES: &[&str] = &["gas", "gasUsed", "gas_used", "totalGas", "total_gas"];
pub const STEP_FIELD_NAMES: &[&str] = &[
    "structLogs",
    "struct_logs",
    "steps",
    "trace",
    "result",
    "logs",
];
