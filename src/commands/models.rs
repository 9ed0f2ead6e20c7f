use super::utils::resolve_artifact_path;
use crate::gate::ThresholdOverrides;
use crate::report::{DisplayUnit, FlamegraphConfig};
use crate::utils::config::{DEFAULT_RPC_TIMEOUT, DEFAULT_RPC_URL};
use std::path::PathBuf;
use std::time::Duration;

/// Arguments for the capture command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct CaptureArgs {
    /// RPC endpoint URL
    pub rpc_url: String,

    /// Transaction hash to profile
    pub transaction_hash: String,

    /// Output path for the profile artifact
    pub output_json: PathBuf,

    /// Output path for SVG flamegraph (optional)
    pub output_svg: Option<PathBuf>,

    /// Number of call sites listed in summaries
    pub top_n: usize,

    /// Flamegraph configuration
    pub flamegraph_config: FlamegraphConfig,

    /// Print text summary to stdout
    pub print_summary: bool,

    /// Optional tracer name (None = stylusTracer)
    pub tracer: Option<String>,

    /// Unit for summaries and flamegraphs
    pub unit: DisplayUnit,

    /// RPC request timeout
    pub timeout: Duration,

    /// Baseline profile to gate against (missing file = capture only)
    pub baseline: Option<PathBuf>,

    /// Threshold TOML file
    pub threshold_file: Option<PathBuf>,

    /// Command-line threshold overrides
    pub overrides: ThresholdOverrides,

    /// Where the diff report goes when a baseline is compared
    pub report_output: Option<PathBuf>,
}

impl Default for CaptureArgs {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            transaction_hash: String::new(),
            output_json: PathBuf::from("artifacts/profile.json"),
            output_svg: None,
            top_n: 20,
            flamegraph_config: FlamegraphConfig::default(),
            print_summary: false,
            tracer: None,
            unit: DisplayUnit::Gas,
            timeout: DEFAULT_RPC_TIMEOUT,
            baseline: None,
            threshold_file: None,
            overrides: ThresholdOverrides::default(),
            report_output: None,
        }
    }
}

impl CaptureArgs {
    /// Move bare filenames under `artifacts/`
    ///
    /// The baseline resolves like the output, so `--output profile.json`
    /// and a later `--baseline profile.json` name the same file.
    pub fn in_artifacts(mut self) -> Self {
        self.output_json = resolve_artifact_path(self.output_json, "capture");
        self.output_svg = self.output_svg.map(|p| resolve_artifact_path(p, "capture"));
        self.baseline = self.baseline.map(|p| resolve_artifact_path(p, "capture"));
        self.report_output = self.report_output.map(|p| resolve_artifact_path(p, "diff"));
        self
    }
}

/// Arguments for the diff command
#[derive(Debug, Clone)]
pub struct DiffArgs {
    /// Path to the baseline profile
    pub baseline: PathBuf,

    /// Path to the current profile
    pub current: PathBuf,

    /// Optional threshold configuration file (TOML)
    pub threshold_file: Option<PathBuf>,

    /// Command-line threshold overrides
    pub overrides: ThresholdOverrides,

    /// Print a human-readable summary to the terminal
    pub summary: bool,

    /// Path to write the diff report JSON
    pub output: Option<PathBuf>,

    /// Path to write the differential flamegraph SVG
    pub output_svg: Option<PathBuf>,

    /// Flamegraph configuration
    pub flamegraph_config: FlamegraphConfig,

    /// Unit for summaries and flamegraphs
    pub unit: DisplayUnit,

    /// Number of entries listed in the summary
    pub top_n: usize,
}

impl Default for DiffArgs {
    fn default() -> Self {
        Self {
            baseline: PathBuf::new(),
            current: PathBuf::new(),
            threshold_file: None,
            overrides: ThresholdOverrides::default(),
            summary: true,
            output: None,
            output_svg: None,
            flamegraph_config: FlamegraphConfig::default().with_title("Stylus Profile Diff"),
            unit: DisplayUnit::Gas,
            top_n: 20,
        }
    }
}

impl DiffArgs {
    /// Move bare filenames under `artifacts/`: inputs are read from the
    /// capture directory, outputs go to the diff directory
    pub fn in_artifacts(mut self) -> Self {
        self.baseline = resolve_artifact_path(self.baseline, "capture");
        self.current = resolve_artifact_path(self.current, "capture");
        self.output = self.output.map(|p| resolve_artifact_path(p, "diff"));
        self.output_svg = self.output_svg.map(|p| resolve_artifact_path(p, "diff"));
        self
    }
}
