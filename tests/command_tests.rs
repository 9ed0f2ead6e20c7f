use pretty_assertions::assert_eq;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use stylus_trace_gate::commands::{
    capture_from_trace, execute_diff, exit_status, validate_args, CaptureArgs, DiffArgs,
};
use stylus_trace_gate::gate::{GateMode, ThresholdOverrides, Verdict};
use stylus_trace_gate::output::{read_profile, write_profile};
use stylus_trace_gate::profile::{CaptureMetadata, FrameNode, Profile};
use tempfile::tempdir;

const TX: &str = "0x1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef";

// ============================================================================
// SHARED TEST HELPERS
// ============================================================================

/// structLogs trace: 100,000 gas total, two storage loads
fn trace_with_gas(total: u64) -> serde_json::Value {
    json!({
        "gas": total,
        "structLogs": [
            { "op": "SLOAD", "depth": 1, "gasCost": 2100 },
            { "op": "SLOAD", "depth": 1, "gasCost": 2100 }
        ]
    })
}

fn write_test_profile(path: &Path, tx: &str, main_gas: u64) {
    let root = FrameNode::new("root", 21_000).with_child(
        FrameNode::new("main", main_gas)
            .with_child(FrameNode::new("storage_load", 2_100).with_hostio("storage_load", 1)),
    );
    let profile = Profile::from_tree(CaptureMetadata::new(tx), root).unwrap();
    write_profile(&profile, path).unwrap();
}

/// No gas anywhere, only hostio calls
fn write_gasless_profile(path: &Path, tx: &str, calls: u64) {
    let root = FrameNode::new("root", 0).with_child(FrameNode::new("main", 0).with_hostio("call", calls));
    let profile = Profile::from_tree(CaptureMetadata::new(tx), root).unwrap();
    write_profile(&profile, path).unwrap();
}

fn quiet_diff_args(baseline: &Path, current: &Path) -> DiffArgs {
    DiffArgs {
        baseline: baseline.to_path_buf(),
        current: current.to_path_buf(),
        summary: false,
        ..Default::default()
    }
}

// ============================================================================
// CAPTURE
// ============================================================================

#[test]
fn test_capture_without_baseline_writes_profile() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("profile.json");
    let args = CaptureArgs {
        transaction_hash: TX.to_string(),
        output_json: output.clone(),
        output_svg: Some(dir.path().join("flamegraph.svg")),
        ..Default::default()
    };

    let verdict = capture_from_trace(&args, &trace_with_gas(100_000)).unwrap();

    assert_eq!(verdict.mode, GateMode::NoBaseline);
    assert_eq!(verdict.exit_code(), 0);

    let profile = read_profile(&output).unwrap();
    assert_eq!(profile.transaction_hash(), TX);
    assert_eq!(profile.total_gas(), 100_000);
    assert!(dir.path().join("flamegraph.svg").exists());
}

#[test]
fn test_capture_missing_baseline_is_capture_only() {
    let dir = tempdir().unwrap();
    let args = CaptureArgs {
        transaction_hash: TX.to_string(),
        output_json: dir.path().join("profile.json"),
        baseline: Some(dir.path().join("baseline.json")),
        overrides: ThresholdOverrides {
            gas_percent: Some(0.0),
            ..Default::default()
        },
        ..Default::default()
    };

    let verdict = capture_from_trace(&args, &trace_with_gas(100_000)).unwrap();

    assert_eq!(verdict.mode, GateMode::NoBaseline);
    assert!(verdict.passed());
}

#[test]
fn test_capture_gates_against_baseline() {
    let dir = tempdir().unwrap();
    let baseline = dir.path().join("baseline.json");
    let report = dir.path().join("report.json");

    let first = CaptureArgs {
        transaction_hash: TX.to_string(),
        output_json: baseline.clone(),
        ..Default::default()
    };
    capture_from_trace(&first, &trace_with_gas(100_000)).unwrap();

    let second = CaptureArgs {
        transaction_hash: TX.to_string(),
        output_json: dir.path().join("current.json"),
        baseline: Some(baseline),
        overrides: ThresholdOverrides {
            gas_percent: Some(5.0),
            ..Default::default()
        },
        report_output: Some(report.clone()),
        ..Default::default()
    };
    let verdict = capture_from_trace(&second, &trace_with_gas(106_000)).unwrap();

    assert_eq!(verdict.exit_code(), 1);
    assert_eq!(verdict.violations.len(), 1);

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["diff"]["gas"]["baseline"], 100_000);
    assert_eq!(json["diff"]["gas"]["current"], 106_000);
}

#[test]
fn test_capture_can_overwrite_its_baseline() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("profile.json");
    let args = CaptureArgs {
        transaction_hash: TX.to_string(),
        output_json: path.clone(),
        baseline: Some(path.clone()),
        ..Default::default()
    };

    capture_from_trace(&args, &trace_with_gas(100_000)).unwrap();
    let verdict = capture_from_trace(&args, &trace_with_gas(100_000)).unwrap();

    assert_eq!(verdict.mode, GateMode::DiffOnly);
    assert_eq!(read_profile(&path).unwrap().total_gas(), 100_000);
}

#[test]
fn test_capture_rejects_bad_config_before_writing() {
    let dir = tempdir().unwrap();
    let thresholds = dir.path().join("thresholds.toml");
    fs::write(&thresholds, "[gas]\nmax_increase_percent = -1.0\n").unwrap();
    let output = dir.path().join("profile.json");

    let args = CaptureArgs {
        transaction_hash: TX.to_string(),
        output_json: output.clone(),
        threshold_file: Some(thresholds),
        ..Default::default()
    };

    assert!(capture_from_trace(&args, &trace_with_gas(100_000)).is_err());
    assert!(!output.exists());
}

#[test]
fn test_capture_rejects_unparseable_trace() {
    let dir = tempdir().unwrap();
    let args = CaptureArgs {
        transaction_hash: TX.to_string(),
        output_json: dir.path().join("profile.json"),
        ..Default::default()
    };

    assert!(capture_from_trace(&args, &json!("not a trace")).is_err());
}

#[test]
fn test_capture_of_gasless_trace_still_gates() {
    let dir = tempdir().unwrap();
    let svg = dir.path().join("flamegraph.svg");
    let args = CaptureArgs {
        transaction_hash: TX.to_string(),
        output_json: dir.path().join("profile.json"),
        output_svg: Some(svg.clone()),
        ..Default::default()
    };

    let verdict = capture_from_trace(&args, &json!({ "gasUsed": 0 })).unwrap();

    assert_eq!(verdict.mode, GateMode::NoBaseline);
    assert!(!svg.exists());
}

// ============================================================================
// DIFF
// ============================================================================

#[test]
fn test_diff_regression_exit_code() {
    let dir = tempdir().unwrap();
    let baseline = dir.path().join("baseline.json");
    let current = dir.path().join("current.json");
    let thresholds = dir.path().join("thresholds.toml");
    write_test_profile(&baseline, "0x1", 76_900);
    write_test_profile(&current, "0x2", 82_900);
    fs::write(&thresholds, "[gas]\nmax_increase_percent = 5.0\n").unwrap();

    let verdict = execute_diff(DiffArgs {
        threshold_file: Some(thresholds),
        ..quiet_diff_args(&baseline, &current)
    })
    .unwrap();

    // 100,000 -> 106,000
    assert_eq!(verdict.exit_code(), 1);
    assert_eq!(verdict.violations[0].to_string(), "gas.max_increase_percent: +6.00% (limit 5.00%)");
}

#[test]
fn test_diff_override_beats_file() {
    let dir = tempdir().unwrap();
    let baseline = dir.path().join("baseline.json");
    let current = dir.path().join("current.json");
    let thresholds = dir.path().join("thresholds.toml");
    write_test_profile(&baseline, "0x1", 76_900);
    write_test_profile(&current, "0x2", 82_900);
    fs::write(&thresholds, "[gas]\nmax_increase_percent = 5.0\n").unwrap();

    let verdict = execute_diff(DiffArgs {
        threshold_file: Some(thresholds),
        overrides: ThresholdOverrides {
            gas_percent: Some(10.0),
            ..Default::default()
        },
        ..quiet_diff_args(&baseline, &current)
    })
    .unwrap();

    assert!(verdict.passed());
    assert_eq!(verdict.mode, GateMode::Gated);
}

#[test]
fn test_diff_writes_report_and_flamegraph() {
    let dir = tempdir().unwrap();
    let baseline = dir.path().join("baseline.json");
    let current = dir.path().join("current.json");
    let report = dir.path().join("out").join("diff_report.json");
    let svg = dir.path().join("out").join("diff.svg");
    write_test_profile(&baseline, "0x1", 1_000);
    write_test_profile(&current, "0x2", 1_500);

    let verdict = execute_diff(DiffArgs {
        output: Some(report.clone()),
        output_svg: Some(svg.clone()),
        summary: true,
        ..quiet_diff_args(&baseline, &current)
    })
    .unwrap();

    assert_eq!(verdict.mode, GateMode::DiffOnly);
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["verdict"]["mode"], "diff_only");
    assert!(fs::read_to_string(&svg).unwrap().contains("<svg"));
}

#[test]
fn test_diff_missing_baseline_passes() {
    let dir = tempdir().unwrap();
    let current = dir.path().join("current.json");
    write_test_profile(&current, "0x2", 1_000);

    let verdict = execute_diff(quiet_diff_args(&dir.path().join("baseline.json"), &current)).unwrap();

    assert_eq!(verdict.mode, GateMode::NoBaseline);
    assert_eq!(verdict.exit_code(), 0);
}

#[test]
fn test_diff_missing_current_is_an_error() {
    let dir = tempdir().unwrap();
    let baseline = dir.path().join("baseline.json");
    write_test_profile(&baseline, "0x1", 1_000);

    assert!(execute_diff(quiet_diff_args(&baseline, &dir.path().join("current.json"))).is_err());
}

#[test]
fn test_diff_corrupt_baseline_is_an_error() {
    let dir = tempdir().unwrap();
    let baseline = dir.path().join("baseline.json");
    let current = dir.path().join("current.json");
    fs::write(&baseline, "{ \"version\": ").unwrap();
    write_test_profile(&current, "0x2", 1_000);

    assert!(execute_diff(quiet_diff_args(&baseline, &current)).is_err());
}

#[test]
fn test_diff_blanket_percent_gates_hostio() {
    let dir = tempdir().unwrap();
    let baseline = dir.path().join("baseline.json");
    let current = dir.path().join("current.json");
    write_gasless_profile(&baseline, "0x1", 1);
    write_gasless_profile(&current, "0x2", 3);

    let verdict = execute_diff(DiffArgs {
        overrides: ThresholdOverrides {
            percent: Some(10.0),
            ..Default::default()
        },
        ..quiet_diff_args(&baseline, &current)
    })
    .unwrap();

    assert_eq!(verdict.exit_code(), 1);
    assert_eq!(
        verdict.violations[0].to_string(),
        "hostio.max_total_calls_increase_percent: +200.00% (limit 10.00%)"
    );
}

#[test]
fn test_diff_gas_focus_ignores_hostio() {
    let dir = tempdir().unwrap();
    let baseline = dir.path().join("baseline.json");
    let current = dir.path().join("current.json");
    write_gasless_profile(&baseline, "0x1", 1);
    write_gasless_profile(&current, "0x2", 3);

    let verdict = execute_diff(DiffArgs {
        overrides: ThresholdOverrides {
            percent: Some(10.0),
            gas_percent: Some(10.0),
            hostio_percent: None,
        },
        ..quiet_diff_args(&baseline, &current)
    })
    .unwrap();

    assert!(verdict.passed());
    assert_eq!(verdict.mode, GateMode::Gated);
}

#[test]
fn test_diff_of_gasless_profiles_keeps_verdict() {
    let dir = tempdir().unwrap();
    let baseline = dir.path().join("baseline.json");
    let current = dir.path().join("current.json");
    let report = dir.path().join("diff_report.json");
    let svg = dir.path().join("diff.svg");
    write_gasless_profile(&baseline, "0x1", 1);
    write_gasless_profile(&current, "0x2", 3);

    let verdict = execute_diff(DiffArgs {
        overrides: ThresholdOverrides {
            hostio_percent: Some(10.0),
            ..Default::default()
        },
        output: Some(report.clone()),
        output_svg: Some(svg.clone()),
        ..quiet_diff_args(&baseline, &current)
    })
    .unwrap();

    assert_eq!(verdict.exit_code(), 1);
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["verdict"]["mode"], "gated");
    assert!(!svg.exists());
}

// ============================================================================
// ARTIFACT PATHS
// ============================================================================

#[test]
fn test_bare_baseline_resolves_like_capture_output() {
    let args = CaptureArgs {
        transaction_hash: TX.to_string(),
        output_json: PathBuf::from("profile.json"),
        baseline: Some(PathBuf::from("profile.json")),
        report_output: Some(PathBuf::from("diff_report.json")),
        ..Default::default()
    }
    .in_artifacts();

    assert_eq!(args.output_json, PathBuf::from("artifacts/capture/profile.json"));
    assert_eq!(args.baseline.as_ref(), Some(&args.output_json));
    assert_eq!(
        args.report_output,
        Some(PathBuf::from("artifacts/diff/diff_report.json"))
    );
}

#[test]
fn test_diff_inputs_resolve_to_capture_artifacts() {
    let args = DiffArgs {
        baseline: PathBuf::from("baseline.json"),
        current: PathBuf::from("current.json"),
        output: Some(PathBuf::from("report.json")),
        output_svg: Some(PathBuf::from("diff.svg")),
        ..Default::default()
    }
    .in_artifacts();

    assert_eq!(args.baseline, PathBuf::from("artifacts/capture/baseline.json"));
    assert_eq!(args.current, PathBuf::from("artifacts/capture/current.json"));
    assert_eq!(args.output, Some(PathBuf::from("artifacts/diff/report.json")));
    assert_eq!(args.output_svg, Some(PathBuf::from("artifacts/diff/diff.svg")));
}

#[test]
fn test_explicit_paths_are_not_moved() {
    let dir = tempdir().unwrap();
    let baseline = dir.path().join("baseline.json");
    let current = dir.path().join("current.json");
    write_test_profile(&baseline, "0x1", 1_000);
    write_test_profile(&current, "0x2", 1_000);

    let args = quiet_diff_args(&baseline, &current).in_artifacts();
    assert_eq!(args.baseline, baseline);

    // The resolved baseline is found, so the run is compared, not skipped
    let verdict = execute_diff(args).unwrap();
    assert_eq!(verdict.mode, GateMode::DiffOnly);
}

// ============================================================================
// EXIT STATUS
// ============================================================================

#[test]
fn test_exit_status_mapping() {
    assert_eq!(exit_status(&Ok(Verdict::no_baseline())), 0);
    assert_eq!(exit_status(&Err(anyhow::anyhow!("node unreachable"))), 2);
}

#[test]
fn test_exit_status_of_regression_and_failure() {
    let dir = tempdir().unwrap();
    let baseline = dir.path().join("baseline.json");
    let current = dir.path().join("current.json");
    write_test_profile(&baseline, "0x1", 76_900);
    write_test_profile(&current, "0x2", 82_900);

    let regression = execute_diff(DiffArgs {
        overrides: ThresholdOverrides {
            gas_percent: Some(5.0),
            ..Default::default()
        },
        ..quiet_diff_args(&baseline, &current)
    });
    assert_eq!(exit_status(&regression), 1);

    let missing_current = execute_diff(quiet_diff_args(&baseline, &dir.path().join("gone.json")));
    assert_eq!(exit_status(&missing_current), 2);

    let unreadable_thresholds = execute_diff(DiffArgs {
        threshold_file: Some(dir.path().to_path_buf()),
        ..quiet_diff_args(&baseline, &current)
    });
    assert_eq!(exit_status(&unreadable_thresholds), 2);
}

// ============================================================================
// ARGUMENT VALIDATION
// ============================================================================

#[test]
fn test_validate_args_valid() {
    let args = CaptureArgs {
        rpc_url: "http://localhost:8547".to_string(),
        transaction_hash: TX.to_string(),
        ..Default::default()
    };

    assert!(validate_args(&args).is_ok());
}

#[test]
fn test_validate_args_nan_override() {
    let args = CaptureArgs {
        transaction_hash: TX.to_string(),
        overrides: ThresholdOverrides {
            hostio_percent: Some(f64::NAN),
            ..Default::default()
        },
        ..Default::default()
    };

    assert!(validate_args(&args).is_err());
}
