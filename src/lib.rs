//! Stylus Trace Gate
//!
//! Profile capture, diffing and regression gating for
//! Arbitrum Stylus transactions.
//!
//! This crate provides the core implementation for the
//! `stylus-trace-gate` CLI tool: a captured trace becomes a
//! [`Profile`](profile::Profile), two profiles become a
//! [`Diff`](diff::Diff), and threshold rules turn the diff into a
//! [`Verdict`](gate::Verdict) whose exit code gates CI.
//!
//! ## Getting Started
//!
//! ```bash
//! stylus-trace-gate capture --tx 0x... --baseline artifacts/baseline.json -p 5
//! stylus-trace-gate diff baseline.json current.json --threshold thresholds.toml
//! ```

pub mod commands;
pub mod diff;
pub mod gate;
pub mod output;
pub mod parser;
pub mod profile;
pub mod report;
pub mod rpc;
pub mod utils;
