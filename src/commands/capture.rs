//! Capture command implementation.
//!
//! The capture command:
//! 1. Loads threshold rules (so bad config fails before any work)
//! 2. Fetches trace data from RPC
//! 3. Parses the trace and builds a profile
//! 4. Loads the baseline, if one was given
//! 5. Writes the profile and optional flamegraph
//! 6. Diffs against the baseline and gates

use super::diff::{compare_and_gate, CompareOutputs};
use super::models::CaptureArgs;
use super::utils::{validate_rpc_url, validate_top_n, validate_tx_hash};
use crate::gate::{load_threshold_config, Verdict};
use crate::output::{load_baseline, write_profile, write_svg};
use crate::parser::parse_trace;
use crate::profile::{CaptureMetadata, Profile};
use crate::report::{generate_flamegraph, render_profile_summary, render_verdict, DisplayUnit};
use crate::rpc::{normalize_tx_hash, RawTraceData, RpcClient};
use crate::utils::error::FlamegraphError;
use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use std::time::Instant;

/// Execute the capture command
///
/// **Public** - main entry point called from main.rs
///
/// # Returns
/// The gate verdict (a vacuous pass without a baseline)
///
/// # Errors
/// * RPC connection failures
/// * Trace parsing errors
/// * Invalid threshold config or corrupt baseline
/// * File write errors
///
/// # Example
/// ```ignore
/// let args = CaptureArgs {
///     transaction_hash: "0xabc123...".to_string(),
///     baseline: Some(PathBuf::from("artifacts/baseline.json")),
///     ..Default::default()
/// };
///
/// let verdict = execute_capture(args)?;
/// ```
pub fn execute_capture(args: CaptureArgs) -> Result<Verdict> {
    info!("Starting capture for transaction: {}", args.transaction_hash);
    info!("RPC endpoint: {}", args.rpc_url);

    let raw_trace = fetch_trace(&args)?;
    capture_from_trace(&args, &raw_trace)
}

/// Run everything after the RPC call on an already fetched trace
///
/// **Public** - lets a saved `debug_traceTransaction` result be replayed offline
pub fn capture_from_trace(args: &CaptureArgs, raw_trace: &RawTraceData) -> Result<Verdict> {
    let start_time = Instant::now();

    info!("Step 1/5: Loading threshold rules...");
    let config = load_threshold_config(args.threshold_file.as_deref(), &args.overrides)
        .context("Invalid threshold configuration")?;

    info!("Step 2/5: Parsing trace data...");
    let tx_hash = normalize_tx_hash(&args.transaction_hash);
    let raw = parse_trace(&tx_hash, raw_trace).context("Failed to parse trace data")?;
    let metadata = CaptureMetadata::new(tx_hash).with_ink(args.unit == DisplayUnit::Ink);
    let profile = Profile::from_raw(&raw, metadata).context("Trace does not form a valid call tree")?;
    debug!(
        "Profile built: {} gas, {} hostio calls, {} frames",
        profile.total_gas(),
        profile.total_hostio_calls(),
        profile.frame_count()
    );

    // Read the baseline before writing, in case both paths are the same file
    info!("Step 3/5: Loading baseline...");
    let baseline = match &args.baseline {
        Some(path) => load_baseline(path).context("Failed to read baseline profile")?,
        None => None,
    };

    info!("Step 4/5: Writing output files...");
    write_profile(&profile, &args.output_json).context("Failed to write profile JSON")?;
    info!("✓ Profile written to: {}", args.output_json.display());

    if let Some(svg_path) = &args.output_svg {
        match generate_flamegraph(&profile, &args.flamegraph_config) {
            Ok(svg) => {
                write_svg(&svg, svg_path).context("Failed to write flamegraph SVG")?;
                info!("✓ Flamegraph written to: {}", svg_path.display());
            }
            Err(FlamegraphError::EmptyStacks) => warn!("Profile has no gas; skipping flamegraph"),
            Err(e) => return Err(e).context("Failed to generate flamegraph"),
        }
    }

    if args.print_summary {
        println!("{}", render_profile_summary(&profile, args.unit, args.top_n));
    }

    info!("Step 5/5: Gating against baseline...");
    let verdict = match baseline {
        Some(baseline) => {
            let outputs = CompareOutputs {
                report: args.report_output.as_deref(),
                svg: None,
                flamegraph_config: &args.flamegraph_config,
                unit: args.unit,
                top_n: args.top_n,
                summary: true,
            };
            compare_and_gate(&baseline, &profile, &config, &outputs)?
        }
        None => {
            let verdict = Verdict::no_baseline();
            println!("{}", render_verdict(&verdict));
            verdict
        }
    };

    info!("Capture completed in {:.2}s", start_time.elapsed().as_secs_f64());
    Ok(verdict)
}

/// Fetch trace from RPC endpoint
///
/// **Private** - internal helper for execute_capture
fn fetch_trace(args: &CaptureArgs) -> Result<RawTraceData> {
    let client = RpcClient::new(&args.rpc_url, args.timeout).context("Failed to create RPC client")?;

    let trace = client
        .debug_trace_transaction(&args.transaction_hash, args.tracer.as_deref())
        .with_context(|| format!("Failed to fetch trace for transaction {}", args.transaction_hash))?;

    Ok(trace)
}

/// Validate capture arguments
///
/// **Public** - can be called before execute_capture for early validation
///
/// # Returns
/// Ok if arguments are valid, Err with message if not
pub fn validate_args(args: &CaptureArgs) -> Result<()> {
    validate_rpc_url(&args.rpc_url)?;
    validate_tx_hash(&args.transaction_hash)?;
    validate_top_n(args.top_n)?;

    if args.timeout.is_zero() {
        bail!("--timeout must be greater than 0");
    }

    let overrides = [
        ("--threshold-percent", args.overrides.percent),
        ("--gas-threshold", args.overrides.gas_percent),
        ("--hostio-threshold", args.overrides.hostio_percent),
    ];
    for (flag, value) in overrides {
        if let Some(percent) = value {
            if !(percent.is_finite() && percent >= 0.0) {
                bail!("{} must be a non-negative number", flag);
            }
        }
    }

    Ok(())
}
