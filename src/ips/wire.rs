// IPS wire-format constants and big-endian field helpers.
//
// Every multi-byte field in an IPS file is big-endian. Addresses are
// 24-bit, sizes and run lengths are 16-bit.

use std::io::{self, Write};

use super::error::PatchError;

// ---------------------------------------------------------------------------
// Magic and trailer
// ---------------------------------------------------------------------------

/// File magic, ASCII `PATCH`.
pub const PATCH_MAGIC: [u8; 5] = *b"PATCH";

/// End-of-patch marker, ASCII `EOF`.
pub const EOF_MARKER: [u8; 3] = *b"EOF";

/// The address whose 3-byte encoding is indistinguishable from [`EOF_MARKER`].
pub const EOF_ADDRESS: u32 = 0x45_4F_46;

// ---------------------------------------------------------------------------
// Hard limits
// ---------------------------------------------------------------------------

/// Largest addressable offset (24 bits).
pub const MAX_ADDRESS: u32 = 0xFF_FFFF;

/// Largest Standard payload length and RunLength size.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// Header (3-byte address + 2-byte size) preceding every record body.
pub const RECORD_HEADER_LEN: usize = 5;

/// RunLength body: 2-byte run length + 1-byte fill value.
pub const RLE_BODY_LEN: usize = 3;

// ---------------------------------------------------------------------------
// Bounds checks
// ---------------------------------------------------------------------------

#[inline]
pub fn check_address(address: u32) -> Result<(), PatchError> {
    if address > MAX_ADDRESS {
        return Err(PatchError::AddressOutOfRange { address });
    }
    Ok(())
}

#[inline]
pub fn check_size(size: usize) -> Result<(), PatchError> {
    if size == 0 || size > MAX_PAYLOAD {
        return Err(PatchError::PayloadSizeOutOfRange { size });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Big-endian bytes of the low 24 bits of `value`.
#[inline]
pub fn u24_to_be(value: u32) -> [u8; 3] {
    let b = value.to_be_bytes();
    [b[1], b[2], b[3]]
}

pub fn write_u24<W: Write>(w: &mut W, value: u32) -> io::Result<()> {
    w.write_all(&u24_to_be(value))
}

pub fn write_u16<W: Write>(w: &mut W, value: u16) -> io::Result<()> {
    w.write_all(&value.to_be_bytes())
}

// ---------------------------------------------------------------------------
// Decoding from byte slices
// ---------------------------------------------------------------------------

/// Forward-only cursor over an in-memory IPS stream.
///
/// Every read checks the remaining length first and reports
/// [`PatchError::TruncatedRecord`] naming the field that ran short.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Look at the next `n` bytes without consuming them.
    #[inline]
    pub fn peek(&self, n: usize) -> Option<&'a [u8]> {
        self.data.get(self.pos..self.pos + n)
    }

    pub fn read_bytes(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], PatchError> {
        let bytes = self.peek(n).ok_or(PatchError::TruncatedRecord {
            offset: self.pos,
            field,
            needed: n,
            available: self.remaining(),
        })?;
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_u8(&mut self, field: &'static str) -> Result<u8, PatchError> {
        Ok(self.read_bytes(1, field)?[0])
    }

    pub fn read_u16(&mut self, field: &'static str) -> Result<u16, PatchError> {
        let b = self.read_bytes(2, field)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u24(&mut self, field: &'static str) -> Result<u32, PatchError> {
        let b = self.read_bytes(3, field)?;
        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
