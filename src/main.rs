//! Stylus Trace Gate CLI
//!
//! Captures Stylus transaction profiles and gates them against a baseline.
//! Exit status: 0 pass, 1 regression, 2 operational error.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use stylus_trace_gate::commands::{
    display_schema, display_version, execute_capture, execute_diff, exit_status, validate_args,
    validate_profile_file, validate_top_n, CaptureArgs, DiffArgs,
};
use stylus_trace_gate::gate::{ThresholdOverrides, Verdict};
use stylus_trace_gate::report::{DisplayUnit, FlamegraphConfig};
use stylus_trace_gate::utils::config::DEFAULT_RPC_URL;

/// Stylus Trace Gate - regression gating for Arbitrum Stylus
#[derive(Parser, Debug)]
#[command(name = "stylus-trace-gate")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Capture and profile a transaction, optionally gating against a baseline
    Capture {
        /// RPC endpoint URL
        #[arg(short, long, env = "STYLUS_TRACE_RPC", default_value = DEFAULT_RPC_URL)]
        rpc: String,

        /// Transaction hash to profile
        #[arg(short, long)]
        tx: String,

        /// Output path for the profile (bare names go under artifacts/capture/)
        #[arg(short, long, default_value = "artifacts/profile.json")]
        output: PathBuf,

        /// Output path for SVG flamegraph
        #[arg(short, long, default_missing_value = "flamegraph.svg", num_args = 0..=1)]
        flamegraph: Option<PathBuf>,

        /// Baseline profile to compare against (missing file = capture only;
        /// bare names are read from artifacts/capture/)
        #[arg(short, long)]
        baseline: Option<PathBuf>,

        /// Threshold TOML file
        #[arg(long)]
        threshold: Option<PathBuf>,

        /// Increase limit in percent for total gas, total hostio calls and
        /// gas per call site (overrides the file)
        #[arg(short = 'p', long)]
        threshold_percent: Option<f64>,

        /// Total gas increase limit in percent. Gates on gas alone.
        #[arg(long)]
        gas_threshold: Option<f64>,

        /// Total hostio call increase limit in percent. Gates on hostio alone.
        #[arg(long)]
        hostio_threshold: Option<f64>,

        /// Where to write the diff report when a baseline is compared
        #[arg(long, default_value = "diff_report.json")]
        report: PathBuf,

        /// Number of call sites shown in summaries
        #[arg(long, default_value = "20")]
        top: usize,

        /// Flamegraph title
        #[arg(long)]
        title: Option<String>,

        /// Flamegraph width in pixels
        #[arg(long, default_value = "1200")]
        width: usize,

        /// Print text summary to stdout
        #[arg(long)]
        summary: bool,

        /// Use Stylus Ink units (scaled by 10,000)
        #[arg(long)]
        ink: bool,

        /// Optional tracer name (defaults to "stylusTracer" if omitted)
        #[arg(long)]
        tracer: Option<String>,

        /// RPC timeout in seconds
        #[arg(long, default_value = "30")]
        timeout: u64,
    },

    /// Compare two profiles and gate on the result
    Diff {
        /// Baseline profile (bare names are read from artifacts/capture/)
        baseline: PathBuf,

        /// Current profile (bare names are read from artifacts/capture/)
        current: PathBuf,

        /// Threshold TOML file
        #[arg(long)]
        threshold: Option<PathBuf>,

        /// Increase limit in percent for total gas, total hostio calls and
        /// gas per call site (overrides the file)
        #[arg(short = 'p', long)]
        threshold_percent: Option<f64>,

        /// Total gas increase limit in percent. Gates on gas alone.
        #[arg(long)]
        gas_threshold: Option<f64>,

        /// Total hostio call increase limit in percent. Gates on hostio alone.
        #[arg(long)]
        hostio_threshold: Option<f64>,

        /// Output path for the diff report (bare names go under artifacts/diff/)
        #[arg(short, long, default_value = "diff_report.json")]
        output: PathBuf,

        /// Output path for a differential SVG flamegraph
        #[arg(short, long, default_missing_value = "diff_flamegraph.svg", num_args = 0..=1)]
        flamegraph: Option<PathBuf>,

        /// Use Stylus Ink units (scaled by 10,000)
        #[arg(long)]
        ink: bool,

        /// Number of entries shown in the summary
        #[arg(long, default_value = "20")]
        top: usize,

        /// Skip the per call site summary
        #[arg(long)]
        quiet: bool,
    },

    /// Validate a profile JSON file
    Validate {
        /// Path to profile JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let outcome = run(cli.command);
    if let Err(e) = &outcome {
        error!("{:#}", e);
        eprintln!("Error: {:?}", e);
    }
    ExitCode::from(exit_status(&outcome))
}

/// Dispatch one subcommand; informational commands count as a pass
fn run(command: Commands) -> Result<Verdict> {
    match command {
        Commands::Capture {
            rpc,
            tx,
            output,
            flamegraph,
            baseline,
            threshold,
            threshold_percent,
            gas_threshold,
            hostio_threshold,
            report,
            top,
            title,
            width,
            summary,
            ink,
            tracer,
            timeout,
        } => {
            let unit = DisplayUnit::from_ink_flag(ink);
            let mut flamegraph_config = FlamegraphConfig::new().with_width(width).with_unit(unit);
            if let Some(title) = title {
                flamegraph_config = flamegraph_config.with_title(title);
            }

            let args = CaptureArgs {
                rpc_url: rpc,
                transaction_hash: tx,
                output_json: output,
                output_svg: flamegraph,
                top_n: top,
                flamegraph_config,
                print_summary: summary,
                tracer,
                unit,
                timeout: Duration::from_secs(timeout),
                baseline,
                threshold_file: threshold,
                overrides: ThresholdOverrides {
                    percent: threshold_percent,
                    gas_percent: gas_threshold,
                    hostio_percent: hostio_threshold,
                },
                report_output: Some(report),
            }
            .in_artifacts();

            // Validate args first
            validate_args(&args)?;

            execute_capture(args)
        }

        Commands::Diff {
            baseline,
            current,
            threshold,
            threshold_percent,
            gas_threshold,
            hostio_threshold,
            output,
            flamegraph,
            ink,
            top,
            quiet,
        } => {
            validate_top_n(top)?;
            let unit = DisplayUnit::from_ink_flag(ink);

            let args = DiffArgs {
                baseline,
                current,
                threshold_file: threshold,
                overrides: ThresholdOverrides {
                    percent: threshold_percent,
                    gas_percent: gas_threshold,
                    hostio_percent: hostio_threshold,
                },
                summary: !quiet,
                output: Some(output),
                output_svg: flamegraph,
                flamegraph_config: FlamegraphConfig::new()
                    .with_title("Stylus Profile Diff")
                    .with_unit(unit),
                unit,
                top_n: top,
            }
            .in_artifacts();

            execute_diff(args)
        }

        Commands::Validate { file } => {
            validate_profile_file(&file)?;
            Ok(Verdict::no_baseline())
        }

        Commands::Schema { show } => {
            display_schema(show);
            Ok(Verdict::no_baseline())
        }

        Commands::Version => {
            display_version();
            Ok(Verdict::no_baseline())
        }
    }
}
