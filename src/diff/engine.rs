//! Core diff engine implementation.
//! Generates a complete diff by comparing two profiles call site by call site.

use crate::profile::{Frame, Profile};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

use super::normalizer::{aggregate_delta, index_frames, percent_change, rank_entries, signed_delta};
use super::schema::{Diff, DiffEntry, EntryStatus, Metric, ProfileMetadata};

/// Generate a complete diff comparing two profiles
///
/// Pure: no I/O, and the same two profiles always give the same diff.
///
/// # Arguments
/// * `baseline` - The baseline profile to compare against
/// * `current` - The current profile
///
/// # Returns
/// Diff with aggregate deltas and one entry per (call site, metric),
/// ordered by significance
///
/// # Example
/// ```ignore
/// use stylus_trace_gate::diff::generate_diff;
/// use stylus_trace_gate::output::read_profile;
///
/// let baseline = read_profile("baseline.json")?;
/// let current = read_profile("current.json")?;
/// let diff = generate_diff(&baseline, &current);
/// ```
pub fn generate_diff(baseline: &Profile, current: &Profile) -> Diff {
    let baseline_frames = index_frames(baseline);
    let current_frames = index_frames(current);

    let call_sites: BTreeSet<_> = baseline_frames
        .keys()
        .chain(current_frames.keys())
        .copied()
        .collect();

    let mut entries = Vec::new();
    for call_site in call_sites {
        let before = baseline_frames.get(call_site).copied();
        let after = current_frames.get(call_site).copied();

        let status = match (before, after) {
            (Some(_), Some(_)) => EntryStatus::Matched,
            (None, Some(_)) => EntryStatus::Added,
            (Some(_), None) => EntryStatus::Removed,
            (None, None) => continue,
        };

        let entry = |metric: Metric, b: u64, c: u64| DiffEntry {
            call_site: call_site.clone(),
            metric,
            status,
            baseline: b,
            current: c,
            delta: signed_delta(b, c),
            percent: percent_change(b, c),
        };

        entries.push(entry(
            Metric::Gas,
            before.map_or(0, Frame::self_gas),
            after.map_or(0, Frame::self_gas),
        ));

        let names: BTreeSet<&String> = before
            .into_iter()
            .chain(after)
            .flat_map(|frame| frame.self_hostio().keys())
            .collect();

        for name in names {
            entries.push(entry(
                Metric::Hostio(name.clone()),
                hostio_count(before, name),
                hostio_count(after, name),
            ));
        }
    }

    entries.sort_by(rank_entries);

    let hostio_names: BTreeSet<&String> = baseline
        .hostio_totals()
        .keys()
        .chain(current.hostio_totals().keys())
        .collect();

    let hostio_by_name: BTreeMap<String, _> = hostio_names
        .into_iter()
        .map(|name| {
            let b = baseline.hostio_totals().get(name).copied().unwrap_or(0);
            let c = current.hostio_totals().get(name).copied().unwrap_or(0);
            (name.clone(), aggregate_delta(b, c))
        })
        .collect();

    let diff = Diff {
        baseline: ProfileMetadata::from_profile(baseline),
        current: ProfileMetadata::from_profile(current),
        gas: aggregate_delta(baseline.total_gas(), current.total_gas()),
        hostio_calls: aggregate_delta(baseline.total_hostio_calls(), current.total_hostio_calls()),
        hostio_by_name,
        entries,
    };

    debug!(
        "Diff generated: {} entries, gas delta {} ({})",
        diff.entries.len(),
        diff.gas.delta,
        diff.gas.percent
    );

    diff
}

fn hostio_count(frame: Option<&Frame>, name: &str) -> u64 {
    frame
        .and_then(|f| f.self_hostio().get(name).copied())
        .unwrap_or(0)
}
