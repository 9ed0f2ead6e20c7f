//! Main trace parser for stylusTracer and structLog output.
//!
//! Parses raw JSON from debug_traceTransaction into a [`RawTrace`] arena.
//! Steps are nested by call depth and repeated sibling calls are merged, so
//! the resulting tree carries one node per distinct call path.

use super::hostio::HostIoType;
use crate::profile::RawTrace;
use crate::utils::config::{GAS_FIELD_NAMES, GAS_TO_INK_MULTIPLIER, ROOT_LABEL, STEP_FIELD_NAMES};
use crate::utils::error::MalformedTrace;
use log::{debug, warn};
use serde::Deserialize;
use std::collections::HashMap;

/// Detected trace format from RPC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TraceFormat {
    /// Standard EVM trace with structLogs/gasUsed
    StandardEvm,
    /// Stylus tracer format (array of steps with ink values)
    StylusTracer,
}

/// Raw execution step from stylusTracer or standard EVM tracer
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionStep {
    /// Operation name
    #[serde(default, alias = "op")]
    pub name: Option<String>,

    /// Function name (if debug symbols present)
    #[serde(default)]
    pub function: Option<String>,

    /// Call depth; stylusTracer omits it for flat hostio lists
    #[serde(default)]
    pub depth: Option<u32>,

    /// Cost of this operation (Ink for stylusTracer, gas for structLogs)
    #[serde(default, alias = "gasCost")]
    pub gas_cost: Option<u64>,

    #[serde(default, rename = "startInk")]
    pub start_ink: Option<u64>,

    #[serde(default, rename = "endInk")]
    pub end_ink: Option<u64>,
}

impl ExecutionStep {
    /// Display label, keeping only the last segment of "a;b" style names
    fn label(&self) -> &str {
        let raw = self
            .function
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("unknown");
        match raw.split(';').next_back().map(str::trim) {
            Some(part) if !part.is_empty() => part,
            _ => "unknown",
        }
    }

    /// Step cost in ink
    fn ink_cost(&self, format: TraceFormat) -> u64 {
        if let (Some(start), Some(end)) = (self.start_ink, self.end_ink) {
            return start.saturating_sub(end);
        }
        let cost = self.gas_cost.unwrap_or(0);
        match format {
            TraceFormat::StandardEvm => cost.saturating_mul(GAS_TO_INK_MULTIPLIER),
            TraceFormat::StylusTracer => cost,
        }
    }
}

/// Parse raw trace JSON into an unvalidated call-tree arena
///
/// **Public** - main entry point for parsing
///
/// # Arguments
/// * `tx_hash` - Transaction hash being profiled
/// * `raw_trace` - Raw JSON from debug_traceTransaction
///
/// # Errors
/// * `MalformedTrace::InvalidFormat` - not an object/array, or no step parses
pub fn parse_trace(tx_hash: &str, raw_trace: &serde_json::Value) -> Result<RawTrace, MalformedTrace> {
    debug!("Parsing trace for transaction: {}", tx_hash);

    let (trace_obj, format) = detect_trace_format(raw_trace)?;
    let steps = extract_execution_steps(&trace_obj)?;
    debug!("Parsed {} execution steps ({:?})", steps.len(), format);

    let mut builder = TreeBuilder::new(tx_hash);
    let base_depth = steps.iter().filter_map(|s| s.depth).min().unwrap_or(0);

    for step in &steps {
        let level = step.depth.map(|d| (d - base_depth) as usize).unwrap_or(0);
        builder.push_step(level, step.label(), step.ink_cost(format));
    }

    let intrinsic_gas = match format {
        TraceFormat::StandardEvm => extract_total_gas(&trace_obj)
            .map(|total| total.saturating_sub(builder.execution_gas()))
            .unwrap_or(0),
        TraceFormat::StylusTracer => 0,
    };

    Ok(builder.finish(intrinsic_gas))
}

/// Accumulates steps into the arena, merging repeated calls per parent
struct TreeBuilder {
    raw: RawTrace,
    ink: Vec<u64>,
    by_parent: HashMap<(usize, String), usize>,
    open: Vec<usize>,
}

impl TreeBuilder {
    fn new(tx_hash: &str) -> Self {
        let mut raw = RawTrace::new(tx_hash);
        let root = raw.push_root(ROOT_LABEL, 0);
        Self {
            raw,
            ink: vec![0],
            by_parent: HashMap::new(),
            open: vec![root],
        }
    }

    fn push_step(&mut self, level: usize, label: &str, ink: u64) {
        // Missing intermediate frames attach to the deepest open one.
        let parent_level = level.min(self.open.len() - 1);
        let parent = self.open[parent_level];

        let hostio = HostIoType::from_label(label);
        let label = match hostio {
            Some(io_type) => io_type.name().to_string(),
            None => label.to_string(),
        };

        let index = match self.by_parent.get(&(parent, label.clone())) {
            Some(index) => *index,
            None => {
                let index = self.raw.push_child(parent, label.clone(), 0);
                self.ink.push(0);
                self.by_parent.insert((parent, label.clone()), index);
                index
            }
        };

        self.ink[index] = self.ink[index].saturating_add(ink);
        if hostio.is_some() {
            self.raw.add_hostio(index, label, 1);
        }

        self.open.truncate(parent_level + 1);
        self.open.push(index);
    }

    fn execution_gas(&self) -> u64 {
        self.ink
            .iter()
            .fold(0u64, |total, ink| total.saturating_add(ink_to_gas(*ink)))
    }

    fn finish(mut self, intrinsic_gas: u64) -> RawTrace {
        for (node, ink) in self.raw.nodes.iter_mut().zip(&self.ink) {
            node.gas = i64::try_from(ink_to_gas(*ink)).unwrap_or(i64::MAX);
        }
        if intrinsic_gas > 0 {
            debug!("Attributing {} intrinsic gas to the root frame", intrinsic_gas);
            self.raw.add_gas(0, i64::try_from(intrinsic_gas).unwrap_or(i64::MAX));
        }
        self.raw
    }
}

/// Round an ink amount to the nearest whole gas
pub fn ink_to_gas(ink: u64) -> u64 {
    ink.saturating_add(GAS_TO_INK_MULTIPLIER / 2) / GAS_TO_INK_MULTIPLIER
}

/// Detect the trace format and normalize to a standard object structure
///
/// **Private** - internal helper for parse_trace
fn detect_trace_format(
    raw_trace: &serde_json::Value,
) -> Result<(serde_json::Map<String, serde_json::Value>, TraceFormat), MalformedTrace> {
    match raw_trace {
        // Format 1: Direct object (could be either format)
        serde_json::Value::Object(obj) => {
            // Heuristic: If it has "result" array, it's likely Stylus tracer
            let format = if obj.get("result").map(|r| r.is_array()).unwrap_or(false) {
                TraceFormat::StylusTracer
            } else {
                TraceFormat::StandardEvm
            };
            Ok((obj.clone(), format))
        }

        // Format 2: Array (typical for stylusTracer result)
        serde_json::Value::Array(_) => {
            debug!("Trace is array format (stylusTracer), wrapping in object");
            let mut wrapper = serde_json::Map::new();
            wrapper.insert("steps".to_string(), raw_trace.clone());
            Ok((wrapper, TraceFormat::StylusTracer))
        }

        _ => Err(MalformedTrace::InvalidFormat(
            "Trace must be a JSON object or array".to_string(),
        )),
    }
}

/// Extract total gas used from trace, if the tracer reports it
///
/// **Public** - also used by capture to sanity-check totals
pub fn extract_total_gas(trace_obj: &serde_json::Map<String, serde_json::Value>) -> Option<u64> {
    GAS_FIELD_NAMES.iter().find_map(|field| {
        trace_obj
            .get(*field)
            .and_then(|val| match parse_json_u64(val) {
                Ok(gas) => Some(gas),
                Err(e) => {
                    warn!("Found gas field '{}' but failed to parse: {}", field, e);
                    None
                }
            })
    })
}

/// Helper to parse a u64 from various JSON types (number, string)
///
/// **Private** - internal utility
fn parse_json_u64(val: &serde_json::Value) -> Result<u64, MalformedTrace> {
    if let Some(n) = val.as_u64() {
        Ok(n)
    } else if let Some(s) = val.as_str() {
        parse_gas_value(s)
    } else {
        Err(MalformedTrace::InvalidFormat(format!(
            "Expected number or string, found {}",
            val
        )))
    }
}

/// Extract execution steps from trace
///
/// **Private** - internal extraction logic
fn extract_execution_steps(
    trace_obj: &serde_json::Map<String, serde_json::Value>,
) -> Result<Vec<ExecutionStep>, MalformedTrace> {
    // Try multiple possible field names
    for field in STEP_FIELD_NAMES {
        if let Some(steps_array) = trace_obj.get(*field).and_then(|v| v.as_array()) {
            return parse_steps_array(steps_array);
        }
    }

    // No steps found - this might be valid for very simple transactions
    warn!("No execution steps found in trace");
    Ok(Vec::new())
}

/// Parse array of execution steps
///
/// **Private** - internal parsing logic
fn parse_steps_array(steps_array: &[serde_json::Value]) -> Result<Vec<ExecutionStep>, MalformedTrace> {
    let mut steps = Vec::with_capacity(steps_array.len());

    for (index, step_value) in steps_array.iter().enumerate() {
        match ExecutionStep::deserialize(step_value) {
            Ok(step) => steps.push(step),
            Err(e) => {
                // Log but don't fail - some steps may be malformed
                warn!("Failed to parse step {}: {}", index, e);
            }
        }
    }

    if steps.is_empty() && !steps_array.is_empty() {
        return Err(MalformedTrace::InvalidFormat(
            "All execution steps failed to parse".to_string(),
        ));
    }

    Ok(steps)
}

/// Parse a gas value from hex or decimal string
pub fn parse_gas_value(value: &str) -> Result<u64, MalformedTrace> {
    // Handle hex values (0x prefix)
    if let Some(hex_str) = value.strip_prefix("0x") {
        u64::from_str_radix(hex_str, 16)
            .map_err(|e| MalformedTrace::InvalidFormat(format!("Invalid hex gas value: {}", e)))
    } else {
        value
            .parse::<u64>()
            .map_err(|e| MalformedTrace::InvalidFormat(format!("Invalid decimal gas value: {}", e)))
    }
}
