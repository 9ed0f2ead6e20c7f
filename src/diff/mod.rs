//! Profile diff generation.
//!
//! This module compares two profiles (baseline vs current) and produces a
//! structured diff: aggregate deltas plus per call site deltas for gas and
//! for every hostio kind.
//!
//! # Example
//! ```ignore
//! use stylus_trace_gate::diff::generate_diff;
//! use stylus_trace_gate::output::read_profile;
//!
//! let baseline = read_profile("baseline.json")?;
//! let current = read_profile("current.json")?;
//! let diff = generate_diff(&baseline, &current);
//! for entry in diff.regressions().take(5) {
//!     println!("{} {} {}", entry.call_site, entry.metric, entry.percent);
//! }
//! ```

mod engine;
mod normalizer;
mod schema;

pub use engine::generate_diff;
pub use normalizer::{aggregate_delta, percent_change, signed_delta};
pub use schema::{
    AggregateDelta, Diff, DiffEntry, EntryStatus, Metric, MetricFamily, PercentDelta,
    ProfileMetadata,
};
