// Error type shared by the IPS record model, table, codec and applier.

use thiserror::Error;

use super::key::PatchKey;

/// Errors produced while building, decoding or applying an IPS patch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// The stream does not start with the `PATCH` magic.
    #[error("invalid IPS header: expected \"PATCH\", got {found:02X?}")]
    InvalidHeader { found: Vec<u8> },

    /// Fewer bytes remain than the field being read requires.
    #[error("truncated record at offset {offset}: {field} needs {needed} bytes, {available} available")]
    TruncatedRecord {
        offset: usize,
        field: &'static str,
        needed: usize,
        available: usize,
    },

    /// Record address does not fit in 24 bits.
    #[error("address {address:#X} exceeds the 24-bit limit 0xFFFFFF")]
    AddressOutOfRange { address: u32 },

    /// Standard payload length or run length outside `1..=65535`.
    #[error("payload size {size} is outside 1..=65535")]
    PayloadSizeOutOfRange { size: usize },

    /// A record with the same kind and address is already present.
    #[error("duplicate {key} in patch table")]
    DuplicateAddress { key: PatchKey },

    /// The record's address encodes as the `EOF` trailer, so readers would
    /// stop there and drop it along with every later record.
    #[error("{key} encodes its address as the \"EOF\" trailer")]
    ReservedAddress { key: PatchKey },

    /// Applying a record would write past the end of the target.
    #[error("target too small: record at {address:#08X} needs {required} bytes, target has {available}")]
    BufferTooSmall {
        address: u32,
        required: usize,
        available: usize,
    },
}
