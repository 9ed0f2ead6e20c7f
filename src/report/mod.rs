//! Human and machine readable output.
//!
//! Text summaries for the terminal, flamegraphs for profiles and diffs,
//! and the JSON diff report artifact. Rendering only reads its input;
//! pass/fail is decided by [`gate`](crate::gate).

pub mod flamegraph;
pub mod table;

pub use flamegraph::{
    diff_folded_stacks, folded_stacks, generate_diff_flamegraph, generate_flamegraph,
    FlamegraphConfig,
};
pub use table::{render_diff_summary, render_profile_summary, render_verdict};

use crate::diff::Diff;
use crate::gate::Verdict;
use crate::utils::config::{DIFF_REPORT_VERSION, GAS_TO_INK_MULTIPLIER};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unit costs are displayed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayUnit {
    #[default]
    Gas,
    /// Stylus ink, 10,000 per gas
    Ink,
}

impl DisplayUnit {
    pub fn from_ink_flag(ink: bool) -> Self {
        if ink {
            DisplayUnit::Ink
        } else {
            DisplayUnit::Gas
        }
    }

    /// Convert a gas amount into this unit
    pub fn scale(self, gas: u64) -> u64 {
        match self {
            DisplayUnit::Gas => gas,
            DisplayUnit::Ink => gas.saturating_mul(GAS_TO_INK_MULTIPLIER),
        }
    }

    /// Signed variant of [`scale`](Self::scale) for deltas
    pub fn scale_delta(self, delta: i64) -> i64 {
        match self {
            DisplayUnit::Gas => delta,
            DisplayUnit::Ink => delta.saturating_mul(GAS_TO_INK_MULTIPLIER as i64),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DisplayUnit::Gas => "gas",
            DisplayUnit::Ink => "ink",
        }
    }
}

/// JSON artifact written by `diff` and by `capture --baseline`
#[derive(Debug, Clone, Serialize)]
pub struct DiffReport {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub diff: Diff,
    pub verdict: Verdict,
}

impl DiffReport {
    pub fn new(diff: Diff, verdict: Verdict) -> Self {
        Self {
            version: DIFF_REPORT_VERSION.to_string(),
            generated_at: Utc::now(),
            diff,
            verdict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_unit_scaling() {
        assert_eq!(DisplayUnit::Gas.scale(42), 42);
        assert_eq!(DisplayUnit::Ink.scale(42), 420_000);
        assert_eq!(DisplayUnit::Ink.scale_delta(-3), -30_000);
        assert_eq!(DisplayUnit::Ink.scale(u64::MAX), u64::MAX);
    }

    #[test]
    fn test_display_unit_from_flag() {
        assert_eq!(DisplayUnit::from_ink_flag(true).label(), "ink");
        assert_eq!(DisplayUnit::from_ink_flag(false).label(), "gas");
    }
}
