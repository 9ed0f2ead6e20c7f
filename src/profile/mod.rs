//! Profile model: the canonical in-memory form of one capture.
//!
//! - `raw`: index-linked arena handed over by the capture side
//! - `model`: validated, owned call tree with aggregate totals

pub mod model;
pub mod raw;

pub use model::{CallSite, CaptureMetadata, Frame, FrameNode, Frames, Profile};
pub use raw::{RawNode, RawTrace};
