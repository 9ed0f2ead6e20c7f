use crate::gate::Verdict;
use crate::output::read_profile;
use crate::utils::config::{ARTIFACTS_DIR, EXIT_OPERATIONAL_ERROR, SCHEMA_VERSION};
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// Validate a profile artifact and print its headline numbers
pub fn validate_profile_file(file_path: &Path) -> Result<()> {
    println!("Validating profile: {}", file_path.display());

    let profile = read_profile(file_path)
        .with_context(|| format!("Profile {} is not valid", file_path.display()))?;

    println!("✓ Valid profile (schema v{})", SCHEMA_VERSION);
    println!("  Transaction:  {}", profile.transaction_hash());
    println!("  Captured at:  {}", profile.metadata().captured_at.to_rfc3339());
    println!("  Total Gas:    {}", profile.total_gas());
    println!("  HostIO Calls: {}", profile.total_hostio_calls());
    println!("  Call Sites:   {}", profile.frame_count());

    Ok(())
}

/// Display schema information
pub fn display_schema(show_details: bool) {
    println!("Stylus Trace Gate Profile Schema");
    println!("Current Version: {}", SCHEMA_VERSION);
    println!();

    if show_details {
        println!("Schema Structure:");
        println!("  version: string            - Schema version (e.g., '{}')", SCHEMA_VERSION);
        println!("  transaction_hash: string   - Transaction hash");
        println!("  captured_at: string        - ISO 8601 capture timestamp");
        println!("  ink: bool                  - Display costs in ink (x10,000)");
        println!("  total_gas: number          - Sum of self gas over all frames");
        println!("  hostio_totals: object      - Calls per hostio name over all frames");
        println!("  root: object               - Call tree");
        println!("    name: string             - Frame label (no ';')");
        println!("    gas: number              - Self gas");
        println!("    hostio: object           - Self hostio calls by name");
        println!("    children: array          - Child frames, unique names");
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
pub fn display_version() {
    println!("Stylus Trace Gate v{}", env!("CARGO_PKG_VERSION"));
    println!("Profile Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Profile diffing and regression gating for Arbitrum Stylus transactions.");
}

/// Place bare filenames under `artifacts/<category>/`
///
/// Paths that already name a directory are returned unchanged.
pub fn resolve_artifact_path(path: PathBuf, category: &str) -> PathBuf {
    let bare = path.parent().map_or(true, |p| p.as_os_str().is_empty());
    if bare {
        Path::new(ARTIFACTS_DIR).join(category).join(path)
    } else {
        path
    }
}

/// Process exit status for the outcome of a command
///
/// **Public** - main.rs maps every run through this
///
/// # Returns
/// The verdict's own code (0 pass, 1 regression), or 2 when the command
/// failed before a verdict was reached
pub fn exit_status(outcome: &Result<Verdict>) -> u8 {
    match outcome {
        Ok(verdict) => verdict.exit_code(),
        Err(_) => EXIT_OPERATIONAL_ERROR,
    }
}

/// Require an http(s) RPC endpoint
pub fn validate_rpc_url(rpc_url: &str) -> Result<()> {
    if rpc_url.is_empty() {
        bail!("RPC URL cannot be empty");
    }
    if !rpc_url.starts_with("http://") && !rpc_url.starts_with("https://") {
        bail!("RPC URL must start with http:// or https://");
    }
    Ok(())
}

/// Require a 32-byte hex transaction hash, `0x` prefix optional
pub fn validate_tx_hash(transaction_hash: &str) -> Result<()> {
    if transaction_hash.is_empty() {
        bail!("Transaction hash cannot be empty");
    }

    let hex = transaction_hash.strip_prefix("0x").unwrap_or(transaction_hash);
    if hex.len() != 64 {
        bail!("Transaction hash must be 32 bytes (64 hex characters)");
    }
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("Transaction hash contains invalid characters");
    }
    Ok(())
}

/// Summary row count must be in 1..=1000
pub fn validate_top_n(top_n: usize) -> Result<()> {
    if top_n == 0 {
        bail!("--top must be greater than 0");
    }
    if top_n > 1000 {
        bail!("--top is too large (max 1000)");
    }
    Ok(())
}
