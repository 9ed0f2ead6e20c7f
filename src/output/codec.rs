//! Profile artifact codec.
//!
//! Profiles persist as a versioned JSON document holding the nested call tree
//! plus the aggregate totals. Decoding rebuilds the tree through
//! [`Profile::from_tree`] and then checks the stored totals against it, so a
//! hand-edited or half-written baseline is caught before any comparison.

use crate::profile::{CaptureMetadata, FrameNode, Profile};
use crate::utils::config::SCHEMA_VERSION;
use crate::utils::error::CodecError;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use std::collections::BTreeMap;

/// On-disk profile document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileDocument {
    /// Schema version for compatibility checking
    pub version: String,

    /// Transaction hash that was profiled
    pub transaction_hash: String,

    /// Capture timestamp (RFC 3339)
    pub captured_at: DateTime<Utc>,

    /// Display-unit flag recorded at capture time
    #[serde(default)]
    pub ink: bool,

    /// Total gas over the whole call tree
    pub total_gas: u64,

    /// Total calls per hostio name
    #[serde(default)]
    pub hostio_totals: BTreeMap<String, u64>,

    /// Entry frame of the call tree
    pub root: WireFrame,
}

/// One frame of the persisted call tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFrame {
    pub name: String,

    /// Self gas
    pub gas: u64,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hostio: BTreeMap<String, u64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<WireFrame>,
}

impl WireFrame {
    fn from_node(node: FrameNode) -> Self {
        Self {
            name: node.label,
            gas: node.gas,
            hostio: node.hostio,
            children: node.children.into_iter().map(WireFrame::from_node).collect(),
        }
    }

    fn into_node(self) -> FrameNode {
        FrameNode {
            label: self.name,
            gas: self.gas,
            hostio: self.hostio,
            children: self.children.into_iter().map(WireFrame::into_node).collect(),
        }
    }
}

/// Serialize a profile into artifact bytes
pub fn encode(profile: &Profile) -> Result<Vec<u8>, CodecError> {
    let metadata = profile.metadata();
    let document = ProfileDocument {
        version: SCHEMA_VERSION.to_string(),
        transaction_hash: metadata.transaction_hash.clone(),
        captured_at: metadata.captured_at,
        ink: metadata.ink,
        total_gas: profile.total_gas(),
        hostio_totals: profile.hostio_totals().clone(),
        root: WireFrame::from_node(profile.root().to_node()),
    };

    serde_json::to_vec_pretty(&document).map_err(CodecError::Encode)
}

/// Rebuild a profile from artifact bytes
///
/// # Errors
/// * `CodecError::Truncated` - input ends early (including empty input)
/// * `CodecError::SchemaMismatch` - valid JSON with the wrong shape
/// * `CodecError::UnsupportedVersion` - different major schema version
/// * `CodecError::InconsistentTotals` - stored totals disagree with the tree
pub fn decode(bytes: &[u8]) -> Result<Profile, CodecError> {
    let document: ProfileDocument = serde_json::from_slice(bytes).map_err(classify)?;
    check_version(&document.version)?;

    debug!(
        "Decoding profile v{} for {}",
        document.version, document.transaction_hash
    );

    let metadata = CaptureMetadata {
        transaction_hash: document.transaction_hash,
        captured_at: document.captured_at,
        ink: document.ink,
    };
    let profile = Profile::from_tree(metadata, document.root.into_node())?;

    if profile.total_gas() != document.total_gas {
        return Err(CodecError::InconsistentTotals {
            field: "total_gas".to_string(),
            stored: document.total_gas,
            computed: profile.total_gas(),
        });
    }
    check_hostio_totals(&document.hostio_totals, profile.hostio_totals())?;

    Ok(profile)
}

fn classify(error: serde_json::Error) -> CodecError {
    match error.classify() {
        Category::Eof => CodecError::Truncated(error),
        Category::Data => CodecError::SchemaMismatch(error),
        Category::Syntax | Category::Io => CodecError::Syntax(error),
    }
}

fn check_version(found: &str) -> Result<(), CodecError> {
    let major = |v: &str| v.split('.').next().map(str::to_string);
    if major(found) != major(SCHEMA_VERSION) {
        return Err(CodecError::UnsupportedVersion {
            found: found.to_string(),
            expected: SCHEMA_VERSION.to_string(),
        });
    }
    Ok(())
}

fn check_hostio_totals(
    stored: &BTreeMap<String, u64>,
    computed: &BTreeMap<String, u64>,
) -> Result<(), CodecError> {
    for name in stored.keys().chain(computed.keys()) {
        let stored_count = stored.get(name).copied().unwrap_or(0);
        let computed_count = computed.get(name).copied().unwrap_or(0);
        if stored_count != computed_count {
            return Err(CodecError::InconsistentTotals {
                field: format!("hostio_totals.{}", name),
                stored: stored_count,
                computed: computed_count,
            });
        }
    }
    Ok(())
}
