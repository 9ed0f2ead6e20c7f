//! Integration tests for threshold loading and the gate decision.

use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use stylus_trace_gate::diff::{generate_diff, Diff, MetricFamily, PercentDelta};
use stylus_trace_gate::gate::*;
use stylus_trace_gate::profile::{CallSite, CaptureMetadata, FrameNode, Profile};
use stylus_trace_gate::utils::error::ConfigError;
use tempfile::tempdir;

// ============================================================================
// SHARED TEST HELPERS
// ============================================================================

fn profile(tx: &str, root: FrameNode) -> Profile {
    Profile::from_tree(CaptureMetadata::new(tx), root).unwrap()
}

fn gas_only(tx: &str, gas: u64) -> Profile {
    profile(tx, FrameNode::new("root", 0).with_child(FrameNode::new("main", gas)))
}

fn config(toml: &str) -> ThresholdConfig {
    ThresholdConfig::from_toml_str(toml).unwrap()
}

/// storage_load 10 -> 25 at one site, hostio totals 50 -> 53
fn scenario_d_diff() -> Diff {
    let baseline = profile(
        "0x1",
        FrameNode::new("root", 0)
            .with_child(FrameNode::new("read", 100).with_hostio("storage_load", 10))
            .with_child(FrameNode::new("forward", 100).with_hostio("call", 40)),
    );
    let current = profile(
        "0x2",
        FrameNode::new("root", 0)
            .with_child(FrameNode::new("read", 100).with_hostio("storage_load", 25))
            .with_child(FrameNode::new("forward", 100).with_hostio("call", 28)),
    );
    generate_diff(&baseline, &current)
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn test_scenario_a_gas_regression_fails() {
    let diff = generate_diff(&gas_only("0x1", 100_000), &gas_only("0x2", 106_000));
    let verdict = evaluate(&diff, &config("[gas]\nmax_increase_percent = 5.0"));

    assert!(!verdict.passed());
    assert_eq!(verdict.exit_code(), 1);
    assert_eq!(verdict.mode, GateMode::Gated);
    assert_eq!(verdict.violations.len(), 1);

    let violation = &verdict.violations[0];
    assert_eq!(violation.actual, PercentDelta::Finite(6.0));
    assert_eq!(violation.limit, 5.0);
    assert_eq!(violation.rule.family(), MetricFamily::Gas);
    assert_eq!(violation.call_site, None);
    assert_eq!(
        violation.to_string(),
        "gas.max_increase_percent: +6.00% (limit 5.00%)"
    );
}

#[test]
fn test_scenario_b_within_limit_passes() {
    let diff = generate_diff(&gas_only("0x1", 100_000), &gas_only("0x2", 104_000));
    let verdict = evaluate(&diff, &config("[gas]\nmax_increase_percent = 5.0"));

    assert!(verdict.passed());
    assert_eq!(verdict.exit_code(), 0);
    assert_eq!(verdict.rules_evaluated, 1);
}

#[test]
fn test_scenario_c_no_baseline_passes() {
    let verdict = Verdict::no_baseline();

    assert!(verdict.passed());
    assert_eq!(verdict.mode, GateMode::NoBaseline);
    assert_eq!(verdict.exit_code(), 0);
}

#[test]
fn test_scenario_d_aggregate_scope_passes() {
    let diff = scenario_d_diff();
    assert_eq!(diff.hostio_calls.percent, PercentDelta::Finite(6.0));

    let verdict = evaluate(&diff, &config("[hostio]\nmax_total_calls_increase_percent = 10.0"));

    assert!(verdict.passed());
}

#[test]
fn test_scenario_d_per_call_site_scope_fails() {
    let diff = scenario_d_diff();
    let verdict = evaluate(
        &diff,
        &config(
            r#"
            [[rule]]
            family = "hostio"
            field = "max_total_calls_increase_percent"
            limit = 10.0
            scope = "per_call_site"
            "#,
        ),
    );

    assert_eq!(verdict.violations.len(), 1);
    let violation = &verdict.violations[0];
    assert_eq!(violation.call_site, Some(CallSite::from("root;read")));
    assert_eq!(violation.actual, PercentDelta::Finite(150.0));
}

#[test]
fn test_named_hostio_rule_aggregate() {
    let diff = scenario_d_diff();
    let verdict = evaluate(&diff, &config("[hostio]\nmax_storage_load_increase_percent = 100.0"));

    assert_eq!(verdict.violations.len(), 1);
    assert_eq!(verdict.violations[0].actual, PercentDelta::Finite(150.0));
}

// ============================================================================
// DECISION PROPERTIES
// ============================================================================

#[test]
fn test_every_rule_is_reported() {
    let diff = scenario_d_diff();
    let verdict = evaluate(
        &diff,
        &config(
            r#"
            [gas]
            max_increase_percent = 0.0

            [hostio]
            max_total_calls_increase_percent = 1.0
            max_storage_load_increase_percent = 1.0
            "#,
        ),
    );

    // gas unchanged passes; both hostio rules fail independently
    assert_eq!(verdict.rules_evaluated, 3);
    assert_eq!(verdict.violations.len(), 2);
}

#[test]
fn test_new_cost_violates_any_limit() {
    let baseline = gas_only("0x1", 100);
    let current = profile(
        "0x2",
        FrameNode::new("root", 0)
            .with_child(FrameNode::new("main", 100))
            .with_child(FrameNode::new("transfer", 5_000)),
    );
    let diff = generate_diff(&baseline, &current);
    let verdict = evaluate(
        &diff,
        &config(
            r#"
            [gas]
            max_increase_percent = 1000000.0
            scope = "per_call_site"
            "#,
        ),
    );

    assert_eq!(verdict.violations.len(), 1);
    assert_eq!(verdict.violations[0].actual, PercentDelta::New);
    assert_eq!(
        verdict.violations[0].call_site,
        Some(CallSite::from("root;transfer"))
    );
}

#[test]
fn test_zero_entries_are_never_considered() {
    // root carries zero gas on both sides
    let diff = generate_diff(&gas_only("0x1", 100), &gas_only("0x2", 100));
    let verdict = evaluate(
        &diff,
        &config("[gas]\nmax_increase_percent = 0.0\nscope = \"per_call_site\""),
    );

    assert!(verdict.passed());
}

#[test]
fn test_empty_config_is_diff_only() {
    let diff = generate_diff(&gas_only("0x1", 100), &gas_only("0x2", 1_000));
    let verdict = evaluate(&diff, &ThresholdConfig::empty());

    assert!(verdict.passed());
    assert_eq!(verdict.mode, GateMode::DiffOnly);
    assert_eq!(verdict.rules_evaluated, 0);
}

#[test]
fn test_self_diff_never_violates() {
    let p = profile(
        "0x1",
        FrameNode::new("root", 10)
            .with_child(FrameNode::new("main", 100).with_hostio("storage_load", 3)),
    );
    let diff = generate_diff(&p, &p);

    for limit in [0.0, 0.5, 5.0, 100.0] {
        let rules = vec![
            ThresholdRule::gas_aggregate(limit).unwrap(),
            ThresholdRule::hostio_aggregate(limit).unwrap(),
            ThresholdRule::new(MetricFamily::Gas, GAS_INCREASE_FIELD, limit, RuleScope::PerCallSite)
                .unwrap(),
            ThresholdRule::new(MetricFamily::Hostio, HOSTIO_TOTAL_FIELD, limit, RuleScope::PerCallSite)
                .unwrap(),
        ];
        let verdict = evaluate(&diff, &ThresholdConfig::new(rules).unwrap());
        assert!(verdict.passed(), "limit {} produced violations", limit);
    }
}

#[test]
fn test_raising_limit_never_adds_violations() {
    let diff = scenario_d_diff();
    let mut previous = usize::MAX;

    for limit in [0.0, 1.0, 5.0, 6.0, 10.0, 50.0, 150.0, 151.0, 1_000.0] {
        let rules = vec![
            ThresholdRule::hostio_aggregate(limit).unwrap(),
            ThresholdRule::new(MetricFamily::Hostio, HOSTIO_TOTAL_FIELD, limit, RuleScope::PerCallSite)
                .unwrap(),
        ];
        let verdict = evaluate(&diff, &ThresholdConfig::new(rules).unwrap());
        assert!(verdict.violations.len() <= previous);
        previous = verdict.violations.len();
    }

    assert_eq!(previous, 0);
}

#[test]
fn test_limit_is_strict() {
    let diff = generate_diff(&gas_only("0x1", 100_000), &gas_only("0x2", 106_000));
    let verdict = evaluate(&diff, &config("[gas]\nmax_increase_percent = 6.0"));

    assert!(verdict.passed());
}

// ============================================================================
// LOADING
// ============================================================================

#[test]
fn test_missing_file_falls_back_to_overrides() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("thresholds.toml");

    let config = load_threshold_config(
        Some(&missing),
        &ThresholdOverrides {
            gas_percent: Some(5.0),
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(config.rules().len(), 1);
    assert_eq!(config.rules()[0].field(), GAS_INCREASE_FIELD);
}

#[test]
fn test_no_file_no_overrides_is_empty() {
    let config = load_threshold_config(None, &ThresholdOverrides::default()).unwrap();
    assert!(config.is_empty());
}

#[test]
fn test_file_and_override_merge() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("thresholds.toml");
    fs::write(
        &path,
        "[gas]\nmax_increase_percent = 5.0\n\n[hostio]\nmax_total_calls_increase_percent = 10.0\n",
    )
    .unwrap();

    let config = load_threshold_config(
        Some(&path),
        &ThresholdOverrides {
            percent: Some(2.5),
            ..Default::default()
        },
    )
    .unwrap();

    // gas and hostio aggregates replaced, gas per call site added
    assert_eq!(config.rules().len(), 3);
    assert!(config.rules().iter().all(|r| r.limit() == 2.5));
}

#[test]
fn test_gas_focus_ignores_hostio_regression() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("thresholds.toml");
    fs::write(&path, "[hostio]\nmax_total_calls_increase_percent = 0.0\n").unwrap();

    let config = load_threshold_config(
        Some(&path),
        &ThresholdOverrides {
            gas_percent: Some(50.0),
            ..Default::default()
        },
    )
    .unwrap();

    let diff = scenario_d_diff();
    let verdict = evaluate(&diff, &config);

    assert_eq!(verdict.mode, GateMode::Gated);
    assert!(verdict.passed());
}

#[test]
fn test_invalid_file_fails_closed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("thresholds.toml");
    fs::write(&path, "[gas\nmax_increase_percent = ").unwrap();

    let err = load_threshold_config(Some(Path::new(&path)), &ThresholdOverrides::default())
        .unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_unknown_family_in_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("thresholds.toml");
    fs::write(&path, "[memory]\nmax_increase_percent = 5.0\n").unwrap();

    let err = load_threshold_config(Some(&path), &ThresholdOverrides::default()).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownFamily(_)));
}

#[test]
fn test_unreadable_file_fails_closed() {
    let dir = tempdir().unwrap();
    // A directory exists but cannot be read as a file
    let err = load_threshold_config(Some(dir.path()), &ThresholdOverrides::default()).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_unreadable_file_fails_even_with_overrides() {
    let dir = tempdir().unwrap();
    let overrides = ThresholdOverrides {
        percent: Some(5.0),
        ..Default::default()
    };

    assert!(load_threshold_config(Some(dir.path()), &overrides).is_err());
}
