// IPS patch format implementation.
//
// # Modules
//
// - `record`: Standard / RunLength records and their in-place apply
// - `key`: Tagged table keys and the legacy signed-integer key codec
// - `table`: Insertion-ordered patch table with merge policies
// - `wire`: Magic, trailer, limits and big-endian field helpers
// - `decoder`: Bytes to patch table
// - `encoder`: Patch table to bytes
// - `apply`: Applying a table to a target buffer
// - `display`: Diagnostic dumps
// - `error`: Error type

pub mod apply;
pub mod decoder;
pub mod display;
pub mod encoder;
pub mod error;
pub mod key;
pub mod record;
pub mod table;
pub mod wire;

// Re-export key types for convenience.
pub use apply::{ApplyOptions, GrowthPolicy, apply, apply_with};
pub use decoder::{DecodeSummary, decode, decode_with_summary};
pub use encoder::{check_encodable, encode, encode_to, encoded_len};
pub use error::PatchError;
pub use key::{PatchKey, RecordKind};
pub use record::PatchRecord;
pub use table::{MergeMode, MergeReport, PatchTable};
pub use wire::{EOF_MARKER, MAX_ADDRESS, MAX_PAYLOAD, PATCH_MAGIC};

/// Merge `src` into `dst` under `mode`.
pub fn merge(dst: &mut PatchTable, src: &PatchTable, mode: MergeMode) -> Result<MergeReport, PatchError> {
    dst.merge(src, mode)
}
