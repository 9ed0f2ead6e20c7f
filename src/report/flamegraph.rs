//! Flamegraph generation using the inferno library.
//!
//! A profile's call sites already use the folded-stack path format
//! (`root;a;b`), so each frame becomes one `path weight` line with its self
//! cost as the weight. Diffs use inferno's differential format
//! (`path before after`): red frames grew, blue frames shrank.

use super::DisplayUnit;
use crate::profile::{CallSite, Profile};
use crate::utils::error::FlamegraphError;
use inferno::flamegraph::{self, Options};
use log::info;
use std::collections::BTreeMap;

/// Flamegraph configuration
#[derive(Debug, Clone)]
pub struct FlamegraphConfig {
    pub title: String,
    pub width: usize,
    pub unit: DisplayUnit,
}

impl Default for FlamegraphConfig {
    fn default() -> Self {
        Self {
            title: "Stylus Transaction Profile".to_string(),
            width: 1200,
            unit: DisplayUnit::Gas,
        }
    }
}

impl FlamegraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn with_unit(mut self, unit: DisplayUnit) -> Self {
        self.unit = unit;
        self
    }
}

/// Folded stack lines for a profile, one per frame with nonzero self gas
///
/// # Example
/// ```ignore
/// let lines = folded_stacks(&profile, DisplayUnit::Gas);
/// // ["root 21000", "root;transfer;storage_load 2100", ...]
/// ```
pub fn folded_stacks(profile: &Profile, unit: DisplayUnit) -> Vec<String> {
    profile
        .frames()
        .filter(|frame| frame.self_gas() > 0)
        .map(|frame| format!("{} {}", frame.call_site(), unit.scale(frame.self_gas())))
        .collect()
}

/// Differential folded lines (`path before after`) covering both profiles
///
/// Call sites missing on one side count as zero there; sites that are zero
/// on both sides are skipped. Lines are ordered by call site.
pub fn diff_folded_stacks(baseline: &Profile, current: &Profile, unit: DisplayUnit) -> Vec<String> {
    let mut weights: BTreeMap<&CallSite, (u64, u64)> = BTreeMap::new();
    for frame in baseline.frames() {
        weights.entry(frame.call_site()).or_default().0 = frame.self_gas();
    }
    for frame in current.frames() {
        weights.entry(frame.call_site()).or_default().1 = frame.self_gas();
    }

    weights
        .into_iter()
        .filter(|(_, (before, after))| *before > 0 || *after > 0)
        .map(|(call_site, (before, after))| {
            format!("{} {} {}", call_site, unit.scale(before), unit.scale(after))
        })
        .collect()
}

/// Generate an SVG flamegraph for one profile
///
/// **Public** - main entry point for flamegraph generation
///
/// # Errors
/// * `FlamegraphError::EmptyStacks` - the profile has no gas anywhere
/// * `FlamegraphError::Render` - inferno failed to render
pub fn generate_flamegraph(profile: &Profile, config: &FlamegraphConfig) -> Result<String, FlamegraphError> {
    let lines = folded_stacks(profile, config.unit);
    info!("Generating flamegraph with {} stacks", lines.len());
    render(&lines, config, None)
}

/// Generate a differential SVG flamegraph of `current` against `baseline`
///
/// Frame widths follow the current profile; colour shows the change.
pub fn generate_diff_flamegraph(
    baseline: &Profile,
    current: &Profile,
    config: &FlamegraphConfig,
) -> Result<String, FlamegraphError> {
    let lines = diff_folded_stacks(baseline, current, config.unit);
    info!("Generating diff flamegraph with {} stacks", lines.len());

    let subtitle = format!(
        "{} vs baseline {}",
        current.transaction_hash(),
        baseline.transaction_hash()
    );
    render(&lines, config, Some(subtitle))
}

fn render(
    lines: &[String],
    config: &FlamegraphConfig,
    subtitle: Option<String>,
) -> Result<String, FlamegraphError> {
    if lines.is_empty() {
        return Err(FlamegraphError::EmptyStacks);
    }

    let mut options = Options::default();
    options.title = config.title.clone();
    options.subtitle = subtitle;
    options.count_name = config.unit.label().to_string();
    options.image_width = Some(config.width);

    let mut svg = Vec::new();
    flamegraph::from_lines(&mut options, lines.iter().map(String::as_str), &mut svg)
        .map_err(|e| FlamegraphError::Render(e.to_string()))?;

    let svg = String::from_utf8(svg)?;
    info!("Flamegraph generated successfully ({} bytes)", svg.len());
    Ok(svg)
}
