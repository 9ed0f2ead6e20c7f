//! Schema definitions for profile diffs.
//!
//! Defines the structures that represent differences between two profiles.

use crate::profile::{CallSite, Profile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Percentage change relative to a baseline value
///
/// A zero baseline with a nonzero current value has no meaningful ratio;
/// it is reported as `New` rather than as a number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PercentDelta {
    Finite(f64),
    New,
}

impl PercentDelta {
    /// Absolute size used for ranking; `New` outranks every finite change
    pub fn magnitude(&self) -> f64 {
        match self {
            PercentDelta::Finite(value) => value.abs(),
            PercentDelta::New => f64::INFINITY,
        }
    }

    /// Whether this change breaks a percentage limit
    pub fn exceeds(&self, limit: f64) -> bool {
        match self {
            PercentDelta::Finite(value) => *value > limit,
            PercentDelta::New => true,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, PercentDelta::New)
    }

    pub fn as_finite(&self) -> Option<f64> {
        match self {
            PercentDelta::Finite(value) => Some(*value),
            PercentDelta::New => None,
        }
    }
}

impl fmt::Display for PercentDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PercentDelta::Finite(value) => write!(f, "{:+.2}%", value),
            PercentDelta::New => f.write_str("new"),
        }
    }
}

/// Family a metric (and a threshold rule) belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricFamily {
    Gas,
    Hostio,
}

impl MetricFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricFamily::Gas => "gas",
            MetricFamily::Hostio => "hostio",
        }
    }
}

impl FromStr for MetricFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gas" => Ok(MetricFamily::Gas),
            "hostio" => Ok(MetricFamily::Hostio),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for MetricFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a single diff entry measures
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "family", content = "name", rename_all = "snake_case")]
pub enum Metric {
    /// Self gas at the call site
    Gas,
    /// Calls of one hostio issued at the call site
    Hostio(String),
}

impl Metric {
    pub fn family(&self) -> MetricFamily {
        match self {
            Metric::Gas => MetricFamily::Gas,
            Metric::Hostio(_) => MetricFamily::Hostio,
        }
    }

    pub fn hostio_name(&self) -> Option<&str> {
        match self {
            Metric::Gas => None,
            Metric::Hostio(name) => Some(name),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Gas => f.write_str("gas"),
            Metric::Hostio(name) => write!(f, "hostio:{}", name),
        }
    }
}

/// How a call site relates across the two profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Present in both profiles
    Matched,
    /// Only in the current profile
    Added,
    /// Only in the baseline profile
    Removed,
}

/// Change of one metric at one call site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub call_site: CallSite,
    pub metric: Metric,
    pub status: EntryStatus,
    pub baseline: u64,
    pub current: u64,
    /// current - baseline
    pub delta: i64,
    pub percent: PercentDelta,
}

impl DiffEntry {
    /// Zero on both sides; never considered for gating
    pub fn is_zero(&self) -> bool {
        self.baseline == 0 && self.current == 0
    }
}

/// Change of a profile-level total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateDelta {
    pub baseline: u64,
    pub current: u64,
    pub delta: i64,
    pub percent: PercentDelta,
}

impl AggregateDelta {
    pub fn is_zero(&self) -> bool {
        self.baseline == 0 && self.current == 0
    }
}

/// Metadata extracted from a profile for comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileMetadata {
    pub transaction_hash: String,
    pub captured_at: DateTime<Utc>,
    pub total_gas: u64,
    pub total_hostio_calls: u64,
    pub frame_count: usize,
}

impl ProfileMetadata {
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            transaction_hash: profile.transaction_hash().to_string(),
            captured_at: profile.metadata().captured_at,
            total_gas: profile.total_gas(),
            total_hostio_calls: profile.total_hostio_calls(),
            frame_count: profile.frame_count(),
        }
    }
}

/// Structured comparison of a current profile against a baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diff {
    pub baseline: ProfileMetadata,
    pub current: ProfileMetadata,

    /// Total gas change
    pub gas: AggregateDelta,

    /// Total hostio call change
    pub hostio_calls: AggregateDelta,

    /// Total call change per hostio name
    pub hostio_by_name: BTreeMap<String, AggregateDelta>,

    /// Per call site changes, largest relative change first
    pub entries: Vec<DiffEntry>,
}

impl Diff {
    /// No metric moved anywhere
    pub fn is_identical(&self) -> bool {
        self.gas.delta == 0
            && self.hostio_calls.delta == 0
            && self.entries.iter().all(|e| e.delta == 0)
    }

    /// Entries whose value went up
    pub fn regressions(&self) -> impl Iterator<Item = &DiffEntry> {
        self.entries.iter().filter(|e| e.delta > 0)
    }

    pub fn entries_for<'a>(&'a self, metric: &'a Metric) -> impl Iterator<Item = &'a DiffEntry> {
        self.entries.iter().filter(move |e| &e.metric == metric)
    }
}
