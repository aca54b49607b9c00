// Human-readable dumps of patch records and tables.

use std::fmt;

use super::record::PatchRecord;
use super::table::PatchTable;

/// Upper-case, space-separated hex.
pub fn hex_bytes(data: &[u8]) -> String {
    let digits = hex::encode_upper(data);
    let mut s = String::with_capacity(data.len() * 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && i % 2 == 0 {
            s.push(' ');
        }
        s.push(c);
    }
    s
}

/// One-line view of a record: address, size and optionally its data.
#[derive(Debug, Clone, Copy)]
pub struct RecordLine<'a> {
    pub record: &'a PatchRecord,
    pub show_data: bool,
    pub show_key: bool,
}

impl fmt::Display for RecordLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.record;
        write!(f, "{:#08X}  {:<8}  size {:>5}", r.address(), r.kind(), r.len())?;
        if self.show_key {
            write!(f, "  key {:>11}", r.key().to_raw())?;
        }
        if self.show_data {
            match r {
                PatchRecord::Standard { data, .. } => write!(f, "  data {}", hex_bytes(data))?,
                PatchRecord::RunLength { fill, .. } => write!(f, "  fill {fill:02X}")?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for PatchRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = RecordLine {
            record: self,
            show_data: f.alternate(),
            show_key: false,
        };
        fmt::Display::fmt(&line, f)
    }
}

/// Full table dump. `{:#}` includes payload bytes.
impl fmt::Display for PatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PATCH")?;
        writeln!(f, "-----")?;
        for record in self {
            if f.alternate() {
                writeln!(f, "{record:#}")?;
            } else {
                writeln!(f, "{record}")?;
            }
        }
        write!(f, "EOF")
    }
}
