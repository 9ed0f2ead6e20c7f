//! Call-tree profile of one captured transaction.
//!
//! A [`Profile`] owns a strict tree of [`Frame`]s rooted at the entry frame.
//! Every frame is identified by its [`CallSite`], the label path from the root,
//! so two independent captures of the same contract logic line up even when
//! absolute trace positions differ.

use super::raw::RawTrace;
use crate::utils::config::CALL_SITE_SEPARATOR;
use crate::utils::error::MalformedTrace;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Stable identity of a point of cost attribution
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallSite(String);

impl CallSite {
    /// Identity of an entry frame
    pub fn root(label: &str) -> Self {
        Self(label.to_string())
    }

    /// Identity of a child frame called from this site
    pub fn child(&self, label: &str) -> Self {
        Self(format!("{}{}{}", self.0, CALL_SITE_SEPARATOR, label))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Labels from the root down to this site
    pub fn segments(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.0.split(CALL_SITE_SEPARATOR)
    }

    /// Label of the frame itself
    pub fn leaf(&self) -> &str {
        self.segments().next_back().unwrap_or(&self.0)
    }

    /// Number of frames above this one
    pub fn depth(&self) -> usize {
        self.0.matches(CALL_SITE_SEPARATOR).count()
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CallSite {
    fn from(path: &str) -> Self {
        Self(path.to_string())
    }
}

/// Capture metadata stored alongside the call tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureMetadata {
    /// Transaction hash that was profiled
    pub transaction_hash: String,

    /// When the capture was taken
    pub captured_at: DateTime<Utc>,

    /// Whether the capture asked for Ink display units
    #[serde(default)]
    pub ink: bool,
}

impl CaptureMetadata {
    pub fn new(transaction_hash: impl Into<String>) -> Self {
        Self {
            transaction_hash: transaction_hash.into(),
            captured_at: Utc::now(),
            ink: false,
        }
    }

    pub fn with_ink(mut self, ink: bool) -> Self {
        self.ink = ink;
        self
    }

    pub fn with_captured_at(mut self, captured_at: DateTime<Utc>) -> Self {
        self.captured_at = captured_at;
        self
    }
}

/// Owned, unvalidated tree node used to assemble a profile
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameNode {
    pub label: String,
    pub gas: u64,
    pub hostio: BTreeMap<String, u64>,
    pub children: Vec<FrameNode>,
}

impl FrameNode {
    pub fn new(label: impl Into<String>, gas: u64) -> Self {
        Self {
            label: label.into(),
            gas,
            ..Default::default()
        }
    }

    pub fn with_hostio(mut self, name: impl Into<String>, count: u64) -> Self {
        let entry = self.hostio.entry(name.into()).or_insert(0);
        *entry = entry.saturating_add(count);
        self
    }

    pub fn with_child(mut self, child: FrameNode) -> Self {
        self.children.push(child);
        self
    }
}

/// One validated node of a profile's call tree
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    call_site: CallSite,
    label: String,
    depth: usize,
    self_gas: u64,
    self_hostio: BTreeMap<String, u64>,
    cumulative_gas: u64,
    cumulative_hostio_calls: u64,
    children: Vec<Frame>,
}

impl Frame {
    pub fn call_site(&self) -> &CallSite {
        &self.call_site
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Gas consumed directly at this frame
    pub fn self_gas(&self) -> u64 {
        self.self_gas
    }

    /// Hostio calls issued directly at this frame
    pub fn self_hostio(&self) -> &BTreeMap<String, u64> {
        &self.self_hostio
    }

    pub fn self_hostio_calls(&self) -> u64 {
        // Bounded by cumulative_hostio_calls, which was checked on build
        self.self_hostio
            .values()
            .fold(0u64, |acc, count| acc.saturating_add(*count))
    }

    /// Gas of this frame plus all descendants
    pub fn cumulative_gas(&self) -> u64 {
        self.cumulative_gas
    }

    /// Hostio calls of this frame plus all descendants
    pub fn cumulative_hostio_calls(&self) -> u64 {
        self.cumulative_hostio_calls
    }

    pub fn children(&self) -> &[Frame] {
        &self.children
    }

    /// Convert back into an owned builder tree
    pub fn to_node(&self) -> FrameNode {
        FrameNode {
            label: self.label.clone(),
            gas: self.self_gas,
            hostio: self.self_hostio.clone(),
            children: self.children.iter().map(Frame::to_node).collect(),
        }
    }
}

/// Pre-order iterator over a frame tree
pub struct Frames<'a> {
    stack: Vec<&'a Frame>,
}

impl<'a> Iterator for Frames<'a> {
    type Item = &'a Frame;

    fn next(&mut self) -> Option<Self::Item> {
        let frame = self.stack.pop()?;
        self.stack.extend(frame.children.iter().rev());
        Some(frame)
    }
}

/// Immutable profile of one captured transaction
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    metadata: CaptureMetadata,
    root: Frame,
    total_gas: u64,
    hostio_totals: BTreeMap<String, u64>,
}

impl Profile {
    /// Build a profile from a raw, index-linked trace
    ///
    /// # Errors
    /// * `MalformedTrace::Cycle` - a node's parent chain never reaches the root
    /// * `MalformedTrace::DuplicateCallSite` - two siblings share a label
    /// * `MalformedTrace::NegativeCost` - negative gas or hostio count
    pub fn from_raw(raw: &RawTrace, metadata: CaptureMetadata) -> Result<Self, MalformedTrace> {
        if raw.nodes.is_empty() {
            return Err(MalformedTrace::Empty);
        }

        let mut root_index = None;
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); raw.nodes.len()];

        for (index, node) in raw.nodes.iter().enumerate() {
            validate_label(index, &node.label)?;
            check_costs(index, node)?;

            match node.parent {
                None => match root_index {
                    Some(first) => {
                        return Err(MalformedTrace::MultipleRoots {
                            first,
                            second: index,
                        })
                    }
                    None => root_index = Some(index),
                },
                Some(parent) if parent >= raw.nodes.len() => {
                    return Err(MalformedTrace::InvalidParent { index, parent });
                }
                Some(parent) if parent == index => {
                    return Err(MalformedTrace::Cycle {
                        index,
                        label: node.label.clone(),
                    });
                }
                Some(parent) => children[parent].push(index),
            }
        }

        let root_index = root_index.ok_or(MalformedTrace::MissingRoot)?;
        let mut visited = vec![false; raw.nodes.len()];
        let tree = assemble(raw, &children, root_index, &mut visited);

        // Each node has one parent, so anything the root cannot reach sits on a cycle.
        if let Some(index) = visited.iter().position(|seen| !seen) {
            return Err(MalformedTrace::Cycle {
                index,
                label: raw.nodes[index].label.clone(),
            });
        }

        Self::from_tree(metadata, tree)
    }

    /// Build a profile from an owned tree, computing all totals bottom-up
    pub fn from_tree(metadata: CaptureMetadata, root: FrameNode) -> Result<Self, MalformedTrace> {
        let mut counter = 0;
        let root = build_frame(root, None, 0, &mut counter)?;

        let mut hostio_totals: BTreeMap<String, u64> = BTreeMap::new();
        for frame in (Frames { stack: vec![&root] }) {
            for (name, count) in &frame.self_hostio {
                let total = hostio_totals.entry(name.clone()).or_insert(0);
                *total = total
                    .checked_add(*count)
                    .ok_or_else(|| MalformedTrace::CostOverflow {
                        call_site: frame.call_site.to_string(),
                        field: format!("hostio.{}", name),
                    })?;
            }
        }

        debug!(
            "Built profile for {}: {} frames, {} gas",
            metadata.transaction_hash, counter, root.cumulative_gas
        );

        Ok(Self {
            metadata,
            total_gas: root.cumulative_gas,
            root,
            hostio_totals,
        })
    }

    pub fn metadata(&self) -> &CaptureMetadata {
        &self.metadata
    }

    pub fn transaction_hash(&self) -> &str {
        &self.metadata.transaction_hash
    }

    /// Total gas over the whole tree
    pub fn total_gas(&self) -> u64 {
        self.total_gas
    }

    /// Total calls per hostio name over the whole tree
    pub fn hostio_totals(&self) -> &BTreeMap<String, u64> {
        &self.hostio_totals
    }

    pub fn total_hostio_calls(&self) -> u64 {
        self.root.cumulative_hostio_calls
    }

    pub fn root(&self) -> &Frame {
        &self.root
    }

    /// All frames in pre-order, root first
    pub fn frames(&self) -> Frames<'_> {
        Frames {
            stack: vec![&self.root],
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames().count()
    }

    pub fn find(&self, call_site: &CallSite) -> Option<&Frame> {
        self.frames().find(|frame| &frame.call_site == call_site)
    }
}

fn validate_label(index: usize, label: &str) -> Result<(), MalformedTrace> {
    let reason = if label.is_empty() {
        "label is empty"
    } else if label.contains(CALL_SITE_SEPARATOR) {
        "label contains ';'"
    } else {
        return Ok(());
    };

    Err(MalformedTrace::InvalidLabel {
        index,
        label: label.to_string(),
        reason,
    })
}

fn check_costs(index: usize, node: &super::raw::RawNode) -> Result<(), MalformedTrace> {
    if node.gas < 0 {
        return Err(MalformedTrace::NegativeCost {
            index,
            label: node.label.clone(),
            field: "gas".to_string(),
            value: node.gas,
        });
    }

    if let Some((name, count)) = node.hostio.iter().find(|(_, count)| **count < 0) {
        return Err(MalformedTrace::NegativeCost {
            index,
            label: node.label.clone(),
            field: format!("hostio.{}", name),
            value: *count,
        });
    }

    Ok(())
}

fn assemble(
    raw: &RawTrace,
    children: &[Vec<usize>],
    index: usize,
    visited: &mut [bool],
) -> FrameNode {
    visited[index] = true;
    let node = &raw.nodes[index];

    FrameNode {
        label: node.label.clone(),
        gas: node.gas as u64,
        hostio: node
            .hostio
            .iter()
            .map(|(name, count)| (name.clone(), *count as u64))
            .collect(),
        children: children[index]
            .iter()
            .map(|child| assemble(raw, children, *child, visited))
            .collect(),
    }
}

fn build_frame(
    node: FrameNode,
    parent: Option<&CallSite>,
    depth: usize,
    counter: &mut usize,
) -> Result<Frame, MalformedTrace> {
    let index = *counter;
    *counter += 1;
    validate_label(index, &node.label)?;

    let call_site = match parent {
        Some(parent) => parent.child(&node.label),
        None => CallSite::root(&node.label),
    };

    let mut self_hostio = node.hostio;
    self_hostio.retain(|_, count| *count > 0);

    let overflow = |call_site: &CallSite, field: &str| MalformedTrace::CostOverflow {
        call_site: call_site.to_string(),
        field: field.to_string(),
    };

    let mut cumulative_gas = node.gas;
    let mut cumulative_hostio_calls: u64 = 0;
    for count in self_hostio.values() {
        cumulative_hostio_calls = cumulative_hostio_calls
            .checked_add(*count)
            .ok_or_else(|| overflow(&call_site, "hostio"))?;
    }
    let mut seen = HashSet::with_capacity(node.children.len());
    let mut children = Vec::with_capacity(node.children.len());

    for child in node.children {
        if !seen.insert(child.label.clone()) {
            return Err(MalformedTrace::DuplicateCallSite {
                call_site: call_site.child(&child.label).to_string(),
            });
        }

        let frame = build_frame(child, Some(&call_site), depth + 1, counter)?;
        cumulative_gas = cumulative_gas
            .checked_add(frame.cumulative_gas)
            .ok_or_else(|| overflow(&call_site, "gas"))?;
        cumulative_hostio_calls = cumulative_hostio_calls
            .checked_add(frame.cumulative_hostio_calls)
            .ok_or_else(|| overflow(&call_site, "hostio"))?;
        children.push(frame);
    }

    Ok(Frame {
        call_site,
        label: node.label,
        depth,
        self_gas: node.gas,
        self_hostio,
        cumulative_gas,
        cumulative_hostio_calls,
        children,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_raw() -> RawTrace {
        let mut raw = RawTrace::new("0x1");
        let root = raw.push_root("root", 100);
        let transfer = raw.push_child(root, "transfer", 300);
        let load = raw.push_child(transfer, "storage_load", 2100);
        raw.add_hostio(load, "storage_load", 3);
        let log = raw.push_child(root, "emit_log", 400);
        raw.add_hostio(log, "emit_log", 1);
        raw
    }

    #[test]
    fn test_totals_are_sum_of_self_costs() {
        let profile = Profile::from_raw(&sample_raw(), CaptureMetadata::new("0x1")).unwrap();

        assert_eq!(profile.total_gas(), 2900);
        assert_eq!(profile.total_hostio_calls(), 4);
        assert_eq!(profile.hostio_totals()["storage_load"], 3);
        assert_eq!(profile.frame_count(), 4);
    }

    #[test]
    fn test_cumulative_costs() {
        let profile = Profile::from_raw(&sample_raw(), CaptureMetadata::new("0x1")).unwrap();
        let transfer = profile.find(&CallSite::from("root;transfer")).unwrap();

        assert_eq!(transfer.self_gas(), 300);
        assert_eq!(transfer.cumulative_gas(), 2400);
        assert_eq!(transfer.cumulative_hostio_calls(), 3);
        assert_eq!(transfer.depth(), 1);
    }

    #[test]
    fn test_frames_are_preorder() {
        let profile = Profile::from_raw(&sample_raw(), CaptureMetadata::new("0x1")).unwrap();
        let sites: Vec<&str> = profile.frames().map(|f| f.call_site().as_str()).collect();

        assert_eq!(
            sites,
            vec![
                "root",
                "root;transfer",
                "root;transfer;storage_load",
                "root;emit_log"
            ]
        );
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut raw = sample_raw();
        let a = raw.push_child(0, "a", 1);
        let b = raw.push_child(a, "b", 1);
        raw.nodes[a].parent = Some(b);

        let err = Profile::from_raw(&raw, CaptureMetadata::new("0x1")).unwrap_err();
        assert!(matches!(err, MalformedTrace::Cycle { .. }));
    }

    #[test]
    fn test_self_parent_is_a_cycle() {
        let mut raw = sample_raw();
        raw.nodes[1].parent = Some(1);

        let err = Profile::from_raw(&raw, CaptureMetadata::new("0x1")).unwrap_err();
        assert!(matches!(err, MalformedTrace::Cycle { index: 1, .. }));
    }

    #[test]
    fn test_duplicate_siblings_are_rejected() {
        let mut raw = sample_raw();
        raw.push_child(0, "transfer", 5);

        let err = Profile::from_raw(&raw, CaptureMetadata::new("0x1")).unwrap_err();
        assert_eq!(
            err,
            MalformedTrace::DuplicateCallSite {
                call_site: "root;transfer".to_string()
            }
        );
    }

    #[test]
    fn test_same_label_at_different_positions_is_fine() {
        let mut raw = sample_raw();
        raw.push_child(3, "storage_load", 10);

        assert!(Profile::from_raw(&raw, CaptureMetadata::new("0x1")).is_ok());
    }

    #[test]
    fn test_negative_costs_are_rejected() {
        let mut raw = sample_raw();
        raw.nodes[2].gas = -1;
        let err = Profile::from_raw(&raw, CaptureMetadata::new("0x1")).unwrap_err();
        assert!(matches!(err, MalformedTrace::NegativeCost { index: 2, .. }));

        let mut raw = sample_raw();
        raw.add_hostio(1, "call", -4);
        let err = Profile::from_raw(&raw, CaptureMetadata::new("0x1")).unwrap_err();
        assert!(matches!(err, MalformedTrace::NegativeCost { ref field, .. } if field == "hostio.call"));
    }

    #[test]
    fn test_root_errors() {
        let empty = RawTrace::new("0x1");
        assert_eq!(
            Profile::from_raw(&empty, CaptureMetadata::new("0x1")).unwrap_err(),
            MalformedTrace::Empty
        );

        let mut two_roots = sample_raw();
        two_roots.push_root("other", 1);
        assert!(matches!(
            Profile::from_raw(&two_roots, CaptureMetadata::new("0x1")).unwrap_err(),
            MalformedTrace::MultipleRoots { first: 0, .. }
        ));

        let mut bad_parent = sample_raw();
        bad_parent.nodes[1].parent = Some(42);
        assert!(matches!(
            Profile::from_raw(&bad_parent, CaptureMetadata::new("0x1")).unwrap_err(),
            MalformedTrace::InvalidParent { index: 1, parent: 42 }
        ));
    }

    #[test]
    fn test_separator_in_label_is_rejected() {
        let mut raw = sample_raw();
        raw.nodes[1].label = "a;b".to_string();

        let err = Profile::from_raw(&raw, CaptureMetadata::new("0x1")).unwrap_err();
        assert!(matches!(err, MalformedTrace::InvalidLabel { index: 1, .. }));
    }

    #[test]
    fn test_call_site_helpers() {
        let site = CallSite::root("root").child("transfer").child("storage_load");
        assert_eq!(site.as_str(), "root;transfer;storage_load");
        assert_eq!(site.leaf(), "storage_load");
        assert_eq!(site.depth(), 2);
    }

    #[test]
    fn test_cost_overflow_is_rejected() {
        let root = FrameNode::new("root", 1)
            .with_child(FrameNode::new("a", u64::MAX))
            .with_child(FrameNode::new("b", 1));
        let err = Profile::from_tree(CaptureMetadata::new("0x1"), root).unwrap_err();
        assert_eq!(
            err,
            MalformedTrace::CostOverflow {
                call_site: "root".to_string(),
                field: "gas".to_string(),
            }
        );

        let root = FrameNode::new("root", 1).with_child(
            FrameNode::new("a", 1)
                .with_hostio("call", u64::MAX)
                .with_hostio("emit_log", 1),
        );
        let err = Profile::from_tree(CaptureMetadata::new("0x1"), root).unwrap_err();
        assert!(matches!(err, MalformedTrace::CostOverflow { ref call_site, .. } if call_site == "root;a"));
    }
}
