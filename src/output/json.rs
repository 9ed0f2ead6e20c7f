//! Profile and report files on disk.
//!
//! Profiles go through [`codec`](super::codec); reports are plain pretty JSON.

use super::codec::{decode, encode};
use crate::profile::Profile;
use crate::utils::error::{CodecError, OutputError};
use log::{debug, info};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;

/// Write a profile artifact
///
/// **Public** - main entry point for profile output
///
/// # Errors
/// * `OutputError::InvalidPath` - path is empty, a directory, or its parent cannot be created
/// * `OutputError::Codec` - profile could not be encoded
/// * `OutputError::WriteFailed` - I/O error during write
///
/// # Example
/// ```ignore
/// let profile = Profile::from_raw(&raw, CaptureMetadata::new(tx))?;
/// write_profile(&profile, "artifacts/capture/profile.json")?;
/// ```
pub fn write_profile(profile: &Profile, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();
    info!("Writing profile to: {}", output_path.display());

    let bytes = encode(profile)?;
    write_bytes(&bytes, output_path)?;

    info!("Profile written successfully ({} bytes)", bytes.len());
    Ok(())
}

/// Read a profile artifact that must exist
///
/// # Errors
/// * `CodecError::Io` - file cannot be opened or read
/// * `CodecError::Corrupt` - file exists but does not decode
pub fn read_profile(input_path: impl AsRef<Path>) -> Result<Profile, CodecError> {
    let input_path = input_path.as_ref();
    debug!("Reading profile from: {}", input_path.display());

    let bytes = std::fs::read(input_path).map_err(|source| CodecError::Io {
        path: input_path.to_path_buf(),
        source,
    })?;

    let profile = decode(&bytes).map_err(|source| CodecError::Corrupt {
        path: input_path.to_path_buf(),
        source: Box::new(source),
    })?;

    debug!(
        "Profile loaded: tx {}, {} frames",
        profile.transaction_hash(),
        profile.frame_count()
    );
    Ok(profile)
}

/// Load a baseline profile, treating a missing file as "no baseline"
///
/// # Returns
/// `Ok(None)` when the file does not exist, `Ok(Some(profile))` when it decodes
///
/// # Errors
/// Any other read failure, or a present-but-corrupt file
pub fn load_baseline(path: impl AsRef<Path>) -> Result<Option<Profile>, CodecError> {
    let path = path.as_ref();
    match read_profile(path) {
        Ok(profile) => Ok(Some(profile)),
        Err(CodecError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
            info!("No baseline at {}; skipping comparison", path.display());
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Write any serializable report as pretty JSON
pub fn write_json<T: Serialize>(value: &T, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();
    let bytes = serde_json::to_vec_pretty(value)?;
    write_bytes(&bytes, output_path)?;
    info!("Report written to: {}", output_path.display());
    Ok(())
}

/// Validate the path, create parent directories and write the bytes
pub(crate) fn write_bytes(bytes: &[u8], output_path: &Path) -> Result<(), OutputError> {
    super::prepare_output_path(output_path)?;

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes).map_err(OutputError::WriteFailed)?;
    writer.flush().map_err(OutputError::WriteFailed)?;
    Ok(())
}
