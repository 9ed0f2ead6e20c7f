//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks
//! and hand the gate [`Verdict`](crate::gate::Verdict) back to main.rs.

pub mod capture;
pub mod diff;
pub mod models;
pub mod utils;

// Re-export main command functions
pub use capture::{capture_from_trace, execute_capture, validate_args};
pub use diff::execute_diff;
pub use models::{CaptureArgs, DiffArgs};
pub use utils::{
    display_schema, display_version, exit_status, resolve_artifact_path, validate_profile_file,
    validate_top_n,
};
