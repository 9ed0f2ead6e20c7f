//! Diff command implementation.
//! Orchestrates the comparison of two profiles and gates on the result.

use super::models::DiffArgs;
use crate::diff::generate_diff;
use crate::gate::{evaluate, load_threshold_config, ThresholdConfig, Verdict};
use crate::output::{load_baseline, read_profile, write_json, write_svg};
use crate::profile::Profile;
use crate::report::{
    generate_diff_flamegraph, render_diff_summary, render_profile_summary, render_verdict,
    DiffReport, DisplayUnit, FlamegraphConfig,
};
use crate::utils::error::FlamegraphError;
use anyhow::{Context, Result};
use colored::*;
use log::{info, warn};
use std::path::Path;

/// Where a comparison writes its artifacts and how it prints
pub(crate) struct CompareOutputs<'a> {
    pub report: Option<&'a Path>,
    pub svg: Option<&'a Path>,
    pub flamegraph_config: &'a FlamegraphConfig,
    pub unit: DisplayUnit,
    pub top_n: usize,
    pub summary: bool,
}

/// Execute the diff command
///
/// **Public** - main entry point called from main.rs
///
/// # Returns
/// The gate verdict; operational failures come back as `Err`
pub fn execute_diff(args: DiffArgs) -> Result<Verdict> {
    // Config problems fail closed before anything is compared
    let config = load_threshold_config(args.threshold_file.as_deref(), &args.overrides)
        .context("Invalid threshold configuration")?;

    let current = read_profile(&args.current).context("Failed to read current profile")?;
    let baseline = load_baseline(&args.baseline).context("Failed to read baseline profile")?;

    let outputs = CompareOutputs {
        report: args.output.as_deref(),
        svg: args.output_svg.as_deref(),
        flamegraph_config: &args.flamegraph_config,
        unit: args.unit,
        top_n: args.top_n,
        summary: args.summary,
    };

    match baseline {
        Some(baseline) => compare_and_gate(&baseline, &current, &config, &outputs),
        None => {
            warn!(
                "Baseline {} not found; nothing to compare",
                args.baseline.display()
            );
            if args.summary {
                println!("{}", render_profile_summary(&current, args.unit, args.top_n));
            }
            let verdict = Verdict::no_baseline();
            println!("{}", render_verdict(&verdict));
            Ok(verdict)
        }
    }
}

/// Diff, gate, print and write artifacts for one baseline/current pair
pub(crate) fn compare_and_gate(
    baseline: &Profile,
    current: &Profile,
    config: &ThresholdConfig,
    outputs: &CompareOutputs<'_>,
) -> Result<Verdict> {
    let diff = generate_diff(baseline, current);
    if diff.is_identical() {
        warn!("Baseline and current profiles are identical");
    }

    let verdict = evaluate(&diff, config);
    info!(
        "Gate {}: {} rules, {} violations",
        verdict.status(),
        verdict.rules_evaluated,
        verdict.violations.len()
    );

    if outputs.summary {
        println!("{}", render_diff_summary(&diff, outputs.unit, outputs.top_n));
    }
    println!("{}", render_verdict(&verdict));

    if let Some(path) = outputs.report {
        let report = DiffReport::new(diff, verdict.clone());
        write_json(&report, path).context("Failed to write diff report JSON")?;
        println!("Diff report written to {}", path.display().to_string().cyan());
    }

    // Must stay after the verdict and report
    if let Some(path) = outputs.svg {
        match generate_diff_flamegraph(baseline, current, outputs.flamegraph_config) {
            Ok(svg) => {
                write_svg(&svg, path).context("Failed to write diff flamegraph SVG")?;
                println!("Diff flamegraph written to {}", path.display().to_string().cyan());
            }
            Err(FlamegraphError::EmptyStacks) => {
                warn!("Both profiles are empty; skipping diff flamegraph");
            }
            Err(e) => return Err(e).context("Failed to generate diff flamegraph"),
        }
    }

    Ok(verdict)
}
