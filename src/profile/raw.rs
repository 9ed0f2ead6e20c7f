//! Raw trace arena as produced by a capture.
//!
//! Nodes reference their parent by index, the same way node traces come off
//! the wire. Nothing here is validated; [`Profile::from_raw`] does that.
//!
//! [`Profile::from_raw`]: super::Profile::from_raw

use std::collections::BTreeMap;

/// One node of a raw trace
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawNode {
    /// Function or hostio name for this frame
    pub label: String,

    /// Index of the parent node, `None` for the entry frame
    pub parent: Option<usize>,

    /// Gas consumed directly at this frame
    pub gas: i64,

    /// Hostio calls issued directly at this frame, keyed by hostio name
    pub hostio: BTreeMap<String, i64>,
}

/// Flat, index-linked trace for a single transaction
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTrace {
    pub transaction_hash: String,
    pub nodes: Vec<RawNode>,
}

impl RawTrace {
    pub fn new(transaction_hash: impl Into<String>) -> Self {
        Self {
            transaction_hash: transaction_hash.into(),
            nodes: Vec::new(),
        }
    }

    /// Append a parentless node and return its index
    pub fn push_root(&mut self, label: impl Into<String>, gas: i64) -> usize {
        self.push(label.into(), None, gas)
    }

    /// Append a node under `parent` and return its index
    pub fn push_child(&mut self, parent: usize, label: impl Into<String>, gas: i64) -> usize {
        self.push(label.into(), Some(parent), gas)
    }

    /// Record `count` more calls of `hostio` at node `index`
    ///
    /// Out-of-range indices are ignored.
    pub fn add_hostio(&mut self, index: usize, hostio: impl Into<String>, count: i64) {
        if let Some(node) = self.nodes.get_mut(index) {
            let entry = node.hostio.entry(hostio.into()).or_insert(0);
            *entry = entry.saturating_add(count);
        }
    }

    /// Add gas to an existing node
    pub fn add_gas(&mut self, index: usize, gas: i64) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.gas = node.gas.saturating_add(gas);
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, label: String, parent: Option<usize>, gas: i64) -> usize {
        self.nodes.push(RawNode {
            label,
            parent,
            gas,
            hostio: BTreeMap::new(),
        });
        self.nodes.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_links_parents() {
        let mut raw = RawTrace::new("0xabc");
        let root = raw.push_root("root", 10);
        let child = raw.push_child(root, "transfer", 5);
        raw.add_hostio(child, "storage_load", 2);
        raw.add_hostio(child, "storage_load", 1);

        assert_eq!(raw.len(), 2);
        assert_eq!(raw.nodes[child].parent, Some(root));
        assert_eq!(raw.nodes[child].hostio["storage_load"], 3);
    }

    #[test]
    fn test_add_hostio_out_of_range_is_ignored() {
        let mut raw = RawTrace::new("0xabc");
        raw.add_hostio(3, "call", 1);
        assert!(raw.is_empty());
    }
}
