// IPS patch records and their in-place apply semantics.

use super::error::PatchError;
use super::key::{PatchKey, RecordKind};
use super::wire;

/// One unit of modification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchRecord {
    /// Write `data` verbatim starting at `address`.
    Standard { address: u32, data: Vec<u8> },
    /// Write `fill` to `size` consecutive bytes starting at `address`.
    RunLength { address: u32, size: u16, fill: u8 },
}

impl PatchRecord {
    /// Validated Standard record.
    pub fn standard(address: u32, data: impl Into<Vec<u8>>) -> Result<Self, PatchError> {
        let record = Self::Standard {
            address,
            data: data.into(),
        };
        record.validate()?;
        Ok(record)
    }

    /// Validated RunLength record.
    pub fn run_length(address: u32, size: u16, fill: u8) -> Result<Self, PatchError> {
        let record = Self::RunLength {
            address,
            size,
            fill,
        };
        record.validate()?;
        Ok(record)
    }

    /// Check the 24-bit address and the `1..=65535` size bounds.
    pub fn validate(&self) -> Result<(), PatchError> {
        wire::check_address(self.address())?;
        wire::check_size(self.len())
    }

    #[inline]
    pub fn address(&self) -> u32 {
        match self {
            Self::Standard { address, .. } | Self::RunLength { address, .. } => *address,
        }
    }

    #[inline]
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Standard { .. } => RecordKind::Standard,
            Self::RunLength { .. } => RecordKind::RunLength,
        }
    }

    #[inline]
    pub fn key(&self) -> PatchKey {
        PatchKey {
            kind: self.kind(),
            address: self.address(),
        }
    }

    /// Number of target bytes this record writes.
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Self::Standard { data, .. } => data.len(),
            Self::RunLength { size, .. } => usize::from(*size),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One past the last target offset written.
    #[inline]
    pub fn end(&self) -> usize {
        self.address() as usize + self.len()
    }

    /// Encoded size on the wire, header included.
    pub fn encoded_len(&self) -> usize {
        wire::RECORD_HEADER_LEN
            + match self {
                Self::Standard { data, .. } => data.len(),
                Self::RunLength { .. } => wire::RLE_BODY_LEN,
            }
    }

    /// Write this record into `target` in place.
    ///
    /// Fails without touching `target` if the record extends past its end.
    pub fn apply(&self, target: &mut [u8]) -> Result<(), PatchError> {
        let start = self.address() as usize;
        let end = self.end();
        if end > target.len() {
            return Err(PatchError::BufferTooSmall {
                address: self.address(),
                required: end,
                available: target.len(),
            });
        }

        match self {
            Self::Standard { data, .. } => target[start..end].copy_from_slice(data),
            Self::RunLength { fill, .. } => target[start..end].fill(*fill),
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
