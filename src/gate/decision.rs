//! Gate decision: apply threshold rules to a diff.

use super::config::{RuleScope, RuleTarget, ThresholdConfig, ThresholdRule};
use crate::diff::{AggregateDelta, Diff, DiffEntry, Metric, PercentDelta};
use crate::profile::CallSite;
use crate::utils::config::{EXIT_PASS, EXIT_REGRESSION};
use log::debug;
use serde::Serialize;
use std::fmt;

/// How a verdict was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateMode {
    /// Rules were evaluated against a diff
    Gated,
    /// A diff exists but no rules are configured
    DiffOnly,
    /// Nothing to compare against (capture-only run)
    NoBaseline,
}

/// One broken rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub rule: ThresholdRule,
    /// Set for per call site rules
    pub call_site: Option<CallSite>,
    /// Set for per call site rules
    pub metric: Option<Metric>,
    pub actual: PercentDelta,
    pub limit: f64,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rule)?;
        if let Some(call_site) = &self.call_site {
            write!(f, " at {}", call_site)?;
        }
        if let Some(Metric::Hostio(name)) = &self.metric {
            write!(f, " [{}]", name)?;
        }
        match self.actual {
            PercentDelta::Finite(actual) => {
                write!(f, ": {:+.2}% (limit {:.2}%)", actual, self.limit)
            }
            PercentDelta::New => write!(f, ": new cost (limit {:.2}%)", self.limit),
        }
    }
}

/// Outcome of gating one diff
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub mode: GateMode,
    pub rules_evaluated: usize,
    pub violations: Vec<Violation>,
}

impl Verdict {
    /// Vacuous pass for a run without a baseline
    pub fn no_baseline() -> Self {
        Self {
            mode: GateMode::NoBaseline,
            rules_evaluated: 0,
            violations: Vec::new(),
        }
    }

    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Process exit status for this verdict
    pub fn exit_code(&self) -> u8 {
        if self.passed() {
            EXIT_PASS
        } else {
            EXIT_REGRESSION
        }
    }

    pub fn status(&self) -> &'static str {
        match (self.mode, self.passed()) {
            (_, false) => "FAILED",
            (GateMode::Gated, true) => "PASSED",
            (GateMode::DiffOnly, true) => "PASSED (diff only)",
            (GateMode::NoBaseline, true) => "PASSED (no baseline)",
        }
    }
}

/// Evaluate every rule in `config` against `diff`
///
/// **Public** - the single pass/fail decision point
///
/// Every rule is checked; one violation never hides another. With no
/// rules the verdict is a diff-only pass.
///
/// # Example
/// ```ignore
/// let diff = generate_diff(&baseline, &current);
/// let config = load_threshold_config(Some(Path::new("thresholds.toml")), &overrides)?;
/// let verdict = evaluate(&diff, &config);
/// return ExitCode::from(verdict.exit_code());
/// ```
pub fn evaluate(diff: &Diff, config: &ThresholdConfig) -> Verdict {
    if config.is_empty() {
        debug!("No threshold rules configured; diff only");
        return Verdict {
            mode: GateMode::DiffOnly,
            rules_evaluated: 0,
            violations: Vec::new(),
        };
    }

    let mut violations = Vec::new();
    for rule in config.rules() {
        match rule.scope() {
            RuleScope::Aggregate => check_aggregate(diff, rule, &mut violations),
            RuleScope::PerCallSite => check_entries(diff, rule, &mut violations),
        }
    }

    debug!(
        "Evaluated {} rules: {} violations",
        config.rules().len(),
        violations.len()
    );

    Verdict {
        mode: GateMode::Gated,
        rules_evaluated: config.rules().len(),
        violations,
    }
}

fn check_aggregate(diff: &Diff, rule: &ThresholdRule, violations: &mut Vec<Violation>) {
    let aggregate: Option<&AggregateDelta> = match rule.target() {
        RuleTarget::TotalGas => Some(&diff.gas),
        RuleTarget::TotalHostioCalls => Some(&diff.hostio_calls),
        RuleTarget::HostioCalls(name) => diff.hostio_by_name.get(name),
    };

    if let Some(aggregate) = aggregate.filter(|a| !a.is_zero()) {
        if aggregate.percent.exceeds(rule.limit()) {
            violations.push(Violation {
                rule: rule.clone(),
                call_site: None,
                metric: None,
                actual: aggregate.percent,
                limit: rule.limit(),
            });
        }
    }
}

fn check_entries(diff: &Diff, rule: &ThresholdRule, violations: &mut Vec<Violation>) {
    let applies = |entry: &DiffEntry| match (rule.target(), &entry.metric) {
        (RuleTarget::TotalGas, Metric::Gas) => true,
        (RuleTarget::TotalHostioCalls, Metric::Hostio(_)) => true,
        (RuleTarget::HostioCalls(name), Metric::Hostio(entry_name)) => name == entry_name,
        _ => false,
    };

    for entry in diff.entries.iter().filter(|e| applies(e) && !e.is_zero()) {
        if entry.percent.exceeds(rule.limit()) {
            violations.push(Violation {
                rule: rule.clone(),
                call_site: Some(entry.call_site.clone()),
                metric: Some(entry.metric.clone()),
                actual: entry.percent,
                limit: rule.limit(),
            });
        }
    }
}
