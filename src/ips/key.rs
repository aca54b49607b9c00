// Address keys for the patch table.
//
// Standard and RunLength records share one 24-bit address space but are
// distinct entries: a fill at 0x10 and a literal write at 0x10 may coexist.
// `PatchKey` carries the kind explicitly. The legacy single-integer form
// (non-negative for Standard, negated for RunLength, `i32::MIN` for a
// RunLength at address 0) is provided for dumps and interop.

use std::fmt;

use super::error::PatchError;
use super::wire::{self, MAX_ADDRESS};

/// Which of the two record variants a key refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    /// Literal replacement bytes.
    Standard,
    /// Single byte repeated over a range.
    RunLength,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => f.pad("standard"),
            Self::RunLength => f.pad("rle"),
        }
    }
}

/// Table key: record kind plus its logical 24-bit address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatchKey {
    pub kind: RecordKind,
    pub address: u32,
}

impl PatchKey {
    /// Build a key, rejecting addresses above 24 bits.
    pub fn new(kind: RecordKind, address: u32) -> Result<Self, PatchError> {
        wire::check_address(address)?;
        Ok(Self { kind, address })
    }

    #[inline]
    pub fn standard(address: u32) -> Self {
        Self {
            kind: RecordKind::Standard,
            address,
        }
    }

    #[inline]
    pub fn run_length(address: u32) -> Self {
        Self {
            kind: RecordKind::RunLength,
            address,
        }
    }

    /// Legacy signed-integer form of this key.
    #[inline]
    pub fn to_raw(self) -> i32 {
        encode_key(self.kind, self.address)
    }

    /// Parse a legacy signed-integer key.
    pub fn from_raw(raw: i32) -> Result<Self, PatchError> {
        let (kind, address) = decode_key(raw);
        Self::new(kind, address)
    }
}

impl fmt::Display for PatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} record at {:#08X}", self.kind, self.address)
    }
}

// ---------------------------------------------------------------------------
// Legacy integer codec
// ---------------------------------------------------------------------------

/// Raw key of a RunLength record at address 0 (`-0` would collide with a
/// Standard record at 0).
pub const RAW_SENTINEL: i32 = i32::MIN;

/// Encode `(kind, address)` as a signed integer key.
///
/// `address` must already be within 24 bits.
#[inline]
pub fn encode_key(kind: RecordKind, address: u32) -> i32 {
    debug_assert!(address <= MAX_ADDRESS);
    let address = address as i32;
    match kind {
        RecordKind::Standard => address,
        RecordKind::RunLength if address == 0 => RAW_SENTINEL,
        RecordKind::RunLength => -address,
    }
}

/// Decode a signed integer key back into `(kind, address)`.
#[inline]
pub fn decode_key(raw: i32) -> (RecordKind, u32) {
    if raw >= 0 {
        (RecordKind::Standard, raw as u32)
    } else if raw == RAW_SENTINEL {
        (RecordKind::RunLength, 0)
    } else {
        (RecordKind::RunLength, raw.unsigned_abs())
    }
}

/// Logical address of a raw key, discarding the kind.
#[inline]
pub fn logical_address(raw: i32) -> u32 {
    decode_key(raw).1
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_keys_are_the_address() {
        assert_eq!(encode_key(RecordKind::Standard, 0), 0);
        assert_eq!(encode_key(RecordKind::Standard, 0x10), 0x10);
        assert_eq!(encode_key(RecordKind::Standard, MAX_ADDRESS), 0xFF_FFFF);
    }

    #[test]
    fn run_length_keys_are_negated() {
        assert_eq!(encode_key(RecordKind::RunLength, 4), -4);
        assert_eq!(encode_key(RecordKind::RunLength, MAX_ADDRESS), -0xFF_FFFF);
    }

    #[test]
    fn run_length_at_zero_uses_sentinel() {
        assert_eq!(encode_key(RecordKind::RunLength, 0), RAW_SENTINEL);
        assert_ne!(
            encode_key(RecordKind::RunLength, 0),
            encode_key(RecordKind::Standard, 0)
        );
        assert_eq!(decode_key(RAW_SENTINEL), (RecordKind::RunLength, 0));
        assert_eq!(logical_address(RAW_SENTINEL), 0);
    }

    #[test]
    fn decode_inverts_encode() {
        for kind in [RecordKind::Standard, RecordKind::RunLength] {
            for address in [0, 1, 0x45_4F46, MAX_ADDRESS] {
                let raw = encode_key(kind, address);
                assert_eq!(decode_key(raw), (kind, address));
                assert_eq!(logical_address(raw), address);
            }
        }
    }

    #[test]
    fn patch_key_raw_roundtrip() {
        let key = PatchKey::run_length(0);
        assert_eq!(key.to_raw(), RAW_SENTINEL);
        assert_eq!(PatchKey::from_raw(RAW_SENTINEL).unwrap(), key);
        assert_eq!(PatchKey::from_raw(-7).unwrap(), PatchKey::run_length(7));
        assert_eq!(PatchKey::from_raw(7).unwrap(), PatchKey::standard(7));
    }

    #[test]
    fn from_raw_rejects_wide_addresses() {
        assert!(matches!(
            PatchKey::from_raw(0x100_0000),
            Err(PatchError::AddressOutOfRange { .. })
        ));
        assert!(matches!(
            PatchKey::from_raw(-0x100_0000),
            Err(PatchError::AddressOutOfRange { .. })
        ));
    }

    #[test]
    fn same_address_different_kind_are_distinct() {
        assert_ne!(PatchKey::standard(0), PatchKey::run_length(0));
        assert_eq!(PatchKey::standard(3).address, PatchKey::run_length(3).address);
    }
}
