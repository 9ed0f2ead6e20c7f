//! Delta arithmetic and entry ranking.
//!
//! Handles the math for computing differences between profiles,
//! including the zero-baseline case.

use super::schema::{AggregateDelta, DiffEntry, PercentDelta};
use crate::profile::{CallSite, Frame, Profile};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Signed change from `baseline` to `current`
pub fn signed_delta(baseline: u64, current: u64) -> i64 {
    let delta = current as i128 - baseline as i128;
    delta.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Percentage change, `New` when growing from zero
///
/// # Returns
/// `(current - baseline) * 100 / baseline` for a nonzero baseline,
/// `Finite(0.0)` when both are zero
pub fn percent_change(baseline: u64, current: u64) -> PercentDelta {
    if baseline == 0 {
        if current == 0 {
            PercentDelta::Finite(0.0)
        } else {
            PercentDelta::New
        }
    } else {
        PercentDelta::Finite(signed_delta(baseline, current) as f64 * 100.0 / baseline as f64)
    }
}

/// Build an aggregate delta from two totals
pub fn aggregate_delta(baseline: u64, current: u64) -> AggregateDelta {
    AggregateDelta {
        baseline,
        current,
        delta: signed_delta(baseline, current),
        percent: percent_change(baseline, current),
    }
}

/// Flatten a profile's tree into a call-site lookup (one pass)
pub fn index_frames(profile: &Profile) -> HashMap<&CallSite, &Frame> {
    profile
        .frames()
        .map(|frame| (frame.call_site(), frame))
        .collect()
}

/// Total order for diff entries
///
/// Largest relative change first, then largest absolute change, then
/// call site and metric so repeated runs agree.
pub fn rank_entries(a: &DiffEntry, b: &DiffEntry) -> Ordering {
    b.percent
        .magnitude()
        .total_cmp(&a.percent.magnitude())
        .then_with(|| b.delta.unsigned_abs().cmp(&a.delta.unsigned_abs()))
        .then_with(|| a.call_site.cmp(&b.call_site))
        .then_with(|| a.metric.cmp(&b.metric))
}
