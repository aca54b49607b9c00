// IPS decoder: bytes -> PatchTable.
//
// The whole patch is held in memory; the 24-bit address space keeps real
// patches small. Decoding is all-or-nothing: the first malformed field
// aborts with a single error and no partial table is returned.

use log::{debug, trace, warn};

use super::error::PatchError;
use super::record::PatchRecord;
use super::table::PatchTable;
use super::wire::{Cursor, EOF_MARKER, PATCH_MAGIC};

/// Summary of a decode, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeSummary {
    /// Records read.
    pub records: usize,
    /// Whether the `EOF` trailer was present.
    pub saw_trailer: bool,
    /// Bytes after the trailer (ignored).
    pub trailing_bytes: usize,
}

/// Decode an in-memory IPS patch.
pub fn decode(data: &[u8]) -> Result<PatchTable, PatchError> {
    decode_with_summary(data).map(|(table, _)| table)
}

/// Decode an in-memory IPS patch, also reporting trailer details.
///
/// Records are read while at least three bytes remain and they are not
/// `EOF`. Input that ends cleanly on a record boundary without the trailer
/// is accepted; a partial record or one or two stray bytes is
/// `TruncatedRecord`. Bytes following the trailer are ignored.
pub fn decode_with_summary(data: &[u8]) -> Result<(PatchTable, DecodeSummary), PatchError> {
    let mut cur = Cursor::new(data);

    match cur.peek(PATCH_MAGIC.len()) {
        Some(magic) if magic == PATCH_MAGIC => {}
        _ => {
            return Err(PatchError::InvalidHeader {
                found: data.iter().take(PATCH_MAGIC.len()).copied().collect(),
            });
        }
    }
    cur.read_bytes(PATCH_MAGIC.len(), "magic")?;

    let mut table = PatchTable::new();
    let mut summary = DecodeSummary::default();

    loop {
        match cur.peek(EOF_MARKER.len()) {
            Some(marker) if marker == EOF_MARKER => {
                cur.read_bytes(EOF_MARKER.len(), "trailer")?;
                summary.saw_trailer = true;
                break;
            }
            Some(_) => {}
            None if cur.remaining() == 0 => break,
            None => {
                // One or two bytes: neither a trailer nor a record header.
                cur.read_u24("address")?;
            }
        }

        let offset = cur.position();
        let record = read_record(&mut cur)?;
        trace!("record at offset {offset}: {}", record.key());
        table.insert(record)?;
        summary.records += 1;
    }

    summary.trailing_bytes = cur.remaining();
    if !summary.saw_trailer {
        warn!("IPS patch has no EOF trailer; accepted {} records", summary.records);
    }
    if summary.trailing_bytes > 0 {
        warn!(
            "ignoring {} bytes after the IPS EOF trailer",
            summary.trailing_bytes
        );
    }
    debug!(
        "decoded IPS patch: {} records, {} bytes",
        summary.records,
        data.len()
    );

    Ok((table, summary))
}

fn read_record(cur: &mut Cursor<'_>) -> Result<PatchRecord, PatchError> {
    let address = cur.read_u24("address")?;
    let size = cur.read_u16("size")?;

    if size == 0 {
        let run = cur.read_u16("run length")?;
        let fill = cur.read_u8("fill value")?;
        Ok(PatchRecord::RunLength {
            address,
            size: run,
            fill,
        })
    } else {
        let data = cur.read_bytes(usize::from(size), "payload")?;
        Ok(PatchRecord::Standard {
            address,
            data: data.to_vec(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
