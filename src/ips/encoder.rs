// IPS encoder: PatchTable -> bytes.
//
// Records are emitted in table order, so a decoded patch re-encodes to
// the same bytes it was read from (trailer extensions aside).

use std::io::{self, Write};

use log::{debug, warn};

use super::error::PatchError;
use super::record::PatchRecord;
use super::table::PatchTable;
use super::wire::{self, EOF_ADDRESS, EOF_MARKER, PATCH_MAGIC};

/// Encode `table` into a fresh buffer.
pub fn encode(table: &PatchTable) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(table));
    // Writes into a Vec cannot fail.
    let _ = encode_to(table, &mut out);
    out
}

/// Encode `table` to any writer.
pub fn encode_to<W: Write>(table: &PatchTable, w: &mut W) -> io::Result<()> {
    w.write_all(&PATCH_MAGIC)?;
    for record in table {
        write_record(w, record)?;
    }
    w.write_all(&EOF_MARKER)?;

    debug!(
        "encoded IPS patch: {} records, {} bytes",
        table.len(),
        encoded_len(table)
    );
    Ok(())
}

/// Check that `table` decodes back to itself once encoded.
///
/// Fails with `ReservedAddress` on the first record at
/// [`EOF_ADDRESS`](super::wire::EOF_ADDRESS). [`encode`] still writes
/// such tables, with a warning; file writers refuse them.
pub fn check_encodable(table: &PatchTable) -> Result<(), PatchError> {
    match table.iter().find(|r| r.address() == EOF_ADDRESS) {
        Some(record) => Err(PatchError::ReservedAddress { key: record.key() }),
        None => Ok(()),
    }
}

/// Exact size of `encode(table)`.
pub fn encoded_len(table: &PatchTable) -> usize {
    PATCH_MAGIC.len() + table.iter().map(PatchRecord::encoded_len).sum::<usize>() + EOF_MARKER.len()
}

fn write_record<W: Write>(w: &mut W, record: &PatchRecord) -> io::Result<()> {
    if record.address() == EOF_ADDRESS {
        warn!(
            "record at {EOF_ADDRESS:#08X} encodes its address as \"EOF\"; \
             decoders will stop reading there"
        );
    }

    wire::write_u24(w, record.address())?;
    match record {
        PatchRecord::Standard { data, .. } => {
            // Table insertion bounds data to 1..=65535 bytes.
            wire::write_u16(w, data.len() as u16)?;
            w.write_all(data)
        }
        PatchRecord::RunLength { size, fill, .. } => {
            wire::write_u16(w, 0)?;
            wire::write_u16(w, *size)?;
            w.write_all(&[*fill])
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ips::decoder::{decode, decode_with_summary};
    use crate::ips::key::PatchKey;

    #[test]
    fn empty_table() {
        assert_eq!(encode(&PatchTable::new()), b"PATCHEOF");
    }

    #[test]
    fn record_layout() {
        let mut t = PatchTable::new();
        t.insert_standard(0x01_0203, vec![0xAA, 0xBB]).unwrap();
        t.insert_run_length(0, 0x0102, 0x7F).unwrap();

        let bytes = encode(&t);
        assert_eq!(
            bytes,
            [
                b'P', b'A', b'T', b'C', b'H', //
                0x01, 0x02, 0x03, 0x00, 0x02, 0xAA, 0xBB, //
                0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x02, 0x7F, //
                b'E', b'O', b'F',
            ]
        );
        assert_eq!(bytes.len(), encoded_len(&t));
    }

    #[test]
    fn roundtrip_preserves_order_and_kinds() {
        let mut t = PatchTable::new();
        t.insert_run_length(0, 5, 0x01).unwrap();
        t.insert_standard(0, vec![1, 2, 3]).unwrap();
        t.insert_standard(0xFF_FFFF, vec![0xEE]).unwrap();
        t.insert_run_length(0x80, 0xFFFF, 0x00).unwrap();

        let decoded = decode(&encode(&t)).unwrap();
        assert_eq!(decoded, t);
    }

    #[test]
    fn max_payload_roundtrip() {
        let mut t = PatchTable::new();
        t.insert_standard(0x10, vec![0x5A; 65535]).unwrap();
        let bytes = encode(&t);
        assert_eq!(&bytes[8..10], &[0xFF, 0xFF]);
        assert_eq!(decode(&bytes).unwrap(), t);
    }

    #[test]
    fn eof_address_truncates_the_decoded_patch() {
        let mut t = PatchTable::new();
        t.insert_standard(EOF_ADDRESS, vec![1]).unwrap();
        t.insert_standard(0x10, vec![2]).unwrap();

        assert_eq!(
            check_encodable(&t),
            Err(PatchError::ReservedAddress {
                key: PatchKey::standard(EOF_ADDRESS)
            })
        );

        // Still encoded, but a reader stops at the record's address bytes
        // and skips the rest as trailing data.
        let bytes = encode(&t);
        let (decoded, summary) = decode_with_summary(&bytes).unwrap();
        assert!(decoded.is_empty());
        assert!(summary.saw_trailer);
        assert_eq!(summary.trailing_bytes, 3 + 6 + 3);
    }

    #[test]
    fn check_encodable_accepts_ordinary_tables() {
        let mut t = PatchTable::new();
        t.insert_standard(EOF_ADDRESS - 1, vec![1]).unwrap();
        t.insert_run_length(EOF_ADDRESS + 1, 4, 0).unwrap();
        assert_eq!(check_encodable(&t), Ok(()));
        assert_eq!(decode(&encode(&t)).unwrap(), t);
    }

    #[test]
    fn encode_to_writer_matches_encode() {
        let mut t = PatchTable::new();
        t.insert_standard(3, vec![9]).unwrap();
        let mut out = Vec::new();
        encode_to(&t, &mut out).unwrap();
        assert_eq!(out, encode(&t));
    }
}
