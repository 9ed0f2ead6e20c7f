//! Regression gating.
//!
//! Threshold rules come from a TOML file and command-line overrides;
//! [`evaluate`] applies them to a [`Diff`](crate::diff::Diff) and returns a
//! [`Verdict`] whose exit code drives CI.
//!
//! # Example
//! ```ignore
//! use stylus_trace_gate::gate::{evaluate, load_threshold_config, ThresholdOverrides};
//!
//! let overrides = ThresholdOverrides { percent: Some(5.0), ..Default::default() };
//! let config = load_threshold_config(None, &overrides)?;
//! let verdict = evaluate(&diff, &config);
//! ```

pub mod config;
pub mod decision;

pub use config::{
    load_threshold_config, RuleScope, RuleTarget, ThresholdConfig, ThresholdOverrides,
    ThresholdRule, GAS_INCREASE_FIELD, HOSTIO_TOTAL_FIELD,
};
pub use decision::{evaluate, GateMode, Verdict, Violation};
