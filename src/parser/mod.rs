//! Trace parsing: raw `debug_traceTransaction` JSON into a call-tree arena.
//!
//! This is where capture output enters the system. Everything downstream
//! works on [`RawTrace`](crate::profile::RawTrace) and
//! [`Profile`](crate::profile::Profile), never on tracer JSON.

pub mod hostio;
pub mod stylus_trace;

// Re-export main types
pub use hostio::HostIoType;
pub use stylus_trace::{ink_to_gas, parse_gas_value, parse_trace, ExecutionStep};
