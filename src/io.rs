// File-level helpers for IPS patches.
//
// Provides `read_patch()`, `read_patch_file()`, `write_patch_file()` and
// `apply_patch_file()`. Patches and targets are loaded fully into memory.
// Optionally computes a SHA-256 of the patched output (feature-gated behind
// `file-io`).

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};
#[cfg(feature = "file-io")]
use sha2::Digest;
use thiserror::Error;

use crate::ips::apply::{self, ApplyOptions};
use crate::ips::decoder;
use crate::ips::encoder;
use crate::ips::error::PatchError;
use crate::ips::table::PatchTable;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for file-level operations.
#[derive(Debug, Error)]
pub enum IoError {
    /// The path does not exist or cannot be accessed.
    #[error("{}: {source}", path.display())]
    PathUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The output exists and overwriting was not requested.
    #[error("output file exists: {}", path.display())]
    OutputExists { path: PathBuf },
    /// Any other I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Malformed patch or failed application.
    #[error("patch error: {0}")]
    Patch(#[from] PatchError),
}

fn path_error(path: &Path, e: io::Error) -> IoError {
    match e.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => IoError::PathUnavailable {
            path: path.to_path_buf(),
            source: e,
        },
        _ => IoError::Io(e),
    }
}

fn read_all(path: &Path) -> Result<Vec<u8>, IoError> {
    std::fs::read(path).map_err(|e| path_error(path, e))
}

fn create_output(path: &Path, overwrite: bool) -> Result<BufWriter<File>, IoError> {
    if !overwrite && path.exists() {
        return Err(IoError::OutputExists {
            path: path.to_path_buf(),
        });
    }
    let file = File::create(path).map_err(|e| path_error(path, e))?;
    Ok(BufWriter::with_capacity(BUF_SIZE, file))
}

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `apply_patch_file()`.
#[derive(Debug, Clone)]
pub struct ApplyStats {
    /// Records in the patch.
    pub records: usize,
    /// Bytes written by all records.
    pub patched_bytes: u64,
    /// Target size before patching.
    pub target_size: u64,
    /// Output size after patching (differs only when growing).
    pub output_size: u64,
    /// SHA-256 of the output (if `file-io` feature is enabled).
    pub output_sha256: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// read / write
// ---------------------------------------------------------------------------

/// Read and decode an IPS patch file.
pub fn read_patch_file(path: &Path) -> Result<PatchTable, IoError> {
    let data = read_all(path)?;
    let table = decoder::decode(&data)?;
    debug!("{}: {} records", path.display(), table.len());
    Ok(table)
}

/// Read a whole IPS patch from `reader` and decode it.
pub fn read_patch<R: Read>(reader: &mut R) -> Result<PatchTable, IoError> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    Ok(decoder::decode(&data)?)
}

/// Encode `table` to `path`, forcing an `.ips` extension.
///
/// Refuses tables with a record at the address that encodes as `EOF`;
/// nothing is written then. Returns the path actually written.
pub fn write_patch_file(path: &Path, table: &PatchTable, overwrite: bool) -> Result<PathBuf, IoError> {
    encoder::check_encodable(table)?;
    let path = path.with_extension("ips");
    let mut w = create_output(&path, overwrite)?;
    encoder::encode_to(table, &mut w)?;
    w.flush()?;
    info!("wrote {} ({} records)", path.display(), table.len());
    Ok(path)
}

// ---------------------------------------------------------------------------
// apply_patch_file
// ---------------------------------------------------------------------------

/// Apply the patch at `patch_path` to `target_path`, writing `output_path`.
///
/// The target is patched in memory; nothing is written if application
/// fails. `output_path` may equal `target_path` for in-place patching.
pub fn apply_patch_file(
    patch_path: &Path,
    target_path: &Path,
    output_path: &Path,
    opts: ApplyOptions,
    overwrite: bool,
) -> Result<ApplyStats, IoError> {
    let table = read_patch_file(patch_path)?;
    let mut target = read_all(target_path)?;
    let target_size = target.len() as u64;

    apply::apply_with(&table, &mut target, opts)?;

    let in_place = output_path == target_path;
    let mut w = create_output(output_path, overwrite || in_place)?;
    w.write_all(&target)?;
    w.flush()?;

    #[cfg(feature = "file-io")]
    let output_sha256 = Some(sha2::Sha256::digest(&target).into());
    #[cfg(not(feature = "file-io"))]
    let output_sha256: Option<[u8; 32]> = None;

    Ok(ApplyStats {
        records: table.len(),
        patched_bytes: table.total_patched_bytes(),
        target_size,
        output_size: target.len() as u64,
        output_sha256,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
