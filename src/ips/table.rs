// Insertion-ordered patch table.
//
// Records live in a Vec in insertion order (file order for decoded patches)
// with a key -> position index beside it. Order is significant: it is the
// order records are applied and re-encoded in.

use std::collections::HashMap;

use log::{debug, trace};

use super::error::PatchError;
use super::key::PatchKey;
use super::record::PatchRecord;

// ---------------------------------------------------------------------------
// Merge policy
// ---------------------------------------------------------------------------

/// How [`PatchTable::merge`] resolves a key present in both tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MergeMode {
    /// Keep the destination record.
    #[default]
    Ignore,
    /// Overwrite the destination record with the source record.
    Replace,
    /// Overlay the source payload onto the head of the destination payload.
    ///
    /// A source payload at least as long as the destination's behaves like
    /// `Replace`. A shorter one overwrites only the leading bytes and keeps
    /// the destination's length. RunLength pairs always replace.
    Combine,
}

/// Counts of what a merge did with each source record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub inserted: usize,
    pub ignored: usize,
    pub replaced: usize,
    pub combined: usize,
}

// ---------------------------------------------------------------------------
// PatchTable
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchTable {
    entries: Vec<PatchRecord>,
    index: HashMap<PatchKey, usize>,
}

impl PatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Build a table from records in order, failing on the first invalid or
    /// duplicate record.
    pub fn from_records<I>(records: I) -> Result<Self, PatchError>
    where
        I: IntoIterator<Item = PatchRecord>,
    {
        let mut table = Self::new();
        for record in records {
            table.insert(record)?;
        }
        Ok(table)
    }

    // --- Insert / update -----------------------------------------------------

    /// Append a record.
    ///
    /// Validates bounds and refuses to overwrite: a record with the same
    /// kind and address already present yields `DuplicateAddress`.
    pub fn insert(&mut self, record: PatchRecord) -> Result<(), PatchError> {
        record.validate()?;
        let key = record.key();
        if self.index.contains_key(&key) {
            return Err(PatchError::DuplicateAddress { key });
        }
        trace!("insert {key} ({} bytes)", record.len());
        self.index.insert(key, self.entries.len());
        self.entries.push(record);
        Ok(())
    }

    pub fn insert_standard(
        &mut self,
        address: u32,
        data: impl Into<Vec<u8>>,
    ) -> Result<(), PatchError> {
        self.insert(PatchRecord::Standard {
            address,
            data: data.into(),
        })
    }

    pub fn insert_run_length(&mut self, address: u32, size: u16, fill: u8) -> Result<(), PatchError> {
        self.insert(PatchRecord::RunLength {
            address,
            size,
            fill,
        })
    }

    /// Overwrite the record stored under `record.key()`, keeping its position.
    ///
    /// Returns `Ok(false)` if no such key exists; the table is unchanged then.
    pub fn update(&mut self, record: PatchRecord) -> Result<bool, PatchError> {
        record.validate()?;
        match self.index.get(&record.key()) {
            Some(&pos) => {
                self.entries[pos] = record;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // --- Removal -------------------------------------------------------------

    /// Remove a record by logical address.
    ///
    /// The Standard record at `address` is tried first, then the RunLength
    /// record. At most one record is removed per call.
    pub fn remove(&mut self, address: u32) -> bool {
        [PatchKey::standard(address), PatchKey::run_length(address)]
            .into_iter()
            .any(|key| self.remove_key(&key).is_some())
    }

    /// Remove and return the record stored under `key`.
    pub fn remove_key(&mut self, key: &PatchKey) -> Option<PatchRecord> {
        let pos = *self.index.get(key)?;
        Some(self.remove_position(pos))
    }

    /// Remove the record at `index` in iteration order.
    pub fn remove_at(&mut self, index: usize) -> bool {
        if index >= self.entries.len() {
            return false;
        }
        self.remove_position(index);
        true
    }

    fn remove_position(&mut self, pos: usize) -> PatchRecord {
        let record = self.entries.remove(pos);
        self.index.remove(&record.key());
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        trace!("removed {} at position {pos}", record.key());
        record
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    // --- Merge ---------------------------------------------------------------

    /// Fold every record of `other` into `self`, in `other`'s order.
    ///
    /// Keys absent here are appended. Keys present are resolved by `mode`.
    /// `other` is only read; records are cloned across.
    pub fn merge(&mut self, other: &PatchTable, mode: MergeMode) -> Result<MergeReport, PatchError> {
        let mut report = MergeReport::default();

        for src in &other.entries {
            let key = src.key();
            let Some(&pos) = self.index.get(&key) else {
                self.insert(src.clone())?;
                report.inserted += 1;
                continue;
            };

            let dst = &mut self.entries[pos];
            match mode {
                MergeMode::Ignore => report.ignored += 1,
                MergeMode::Replace => {
                    *dst = src.clone();
                    report.replaced += 1;
                }
                MergeMode::Combine => match (dst, src) {
                    (
                        PatchRecord::Standard { data: head, .. },
                        PatchRecord::Standard { data: overlay, .. },
                    ) if overlay.len() < head.len() => {
                        head[..overlay.len()].copy_from_slice(overlay);
                        report.combined += 1;
                    }
                    (dst, src) => {
                        *dst = src.clone();
                        report.replaced += 1;
                    }
                },
            }
        }

        debug!(
            "merge ({mode:?}): {} inserted, {} ignored, {} replaced, {} combined",
            report.inserted, report.ignored, report.replaced, report.combined
        );
        Ok(report)
    }

    // --- Queries -------------------------------------------------------------

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &PatchKey) -> Option<&PatchRecord> {
        self.index.get(key).map(|&pos| &self.entries[pos])
    }

    pub fn contains_key(&self, key: &PatchKey) -> bool {
        self.index.contains_key(key)
    }

    /// Position of `key` in iteration order.
    pub fn position(&self, key: &PatchKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Records in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, PatchRecord> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = PatchKey> + '_ {
        self.entries.iter().map(PatchRecord::key)
    }

    pub fn records(&self) -> &[PatchRecord] {
        &self.entries
    }

    /// Sum of bytes written to the target by every record.
    pub fn total_patched_bytes(&self) -> u64 {
        self.entries.iter().map(|r| r.len() as u64).sum()
    }

    /// Smallest target length every record fits in.
    pub fn required_len(&self) -> usize {
        self.entries.iter().map(PatchRecord::end).max().unwrap_or(0)
    }
}

impl<'a> IntoIterator for &'a PatchTable {
    type Item = &'a PatchRecord;
    type IntoIter = std::slice::Iter<'a, PatchRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for PatchTable {
    type Item = PatchRecord;
    type IntoIter = std::vec::IntoIter<PatchRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with(data: &[u8]) -> PatchTable {
        let mut t = PatchTable::new();
        t.insert_standard(0x40, data.to_vec()).unwrap();
        t
    }

    fn payload(t: &PatchTable, key: PatchKey) -> Vec<u8> {
        match t.get(&key).unwrap() {
            PatchRecord::Standard { data, .. } => data.clone(),
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn insert_preserves_order() {
        let mut t = PatchTable::new();
        t.insert_standard(0x30, vec![1]).unwrap();
        t.insert_run_length(0x10, 4, 0xFF).unwrap();
        t.insert_standard(0x20, vec![2, 3]).unwrap();

        let addrs: Vec<u32> = t.iter().map(PatchRecord::address).collect();
        assert_eq!(addrs, vec![0x30, 0x10, 0x20]);
        assert_eq!(t.len(), 3);
        assert_eq!(t.total_patched_bytes(), 7);
        assert_eq!(t.required_len(), 0x32);
    }

    #[test]
    fn insert_rejects_duplicate_key() {
        let mut t = table_with(&[1, 2]);
        let err = t.insert_standard(0x40, vec![9]).unwrap_err();
        assert_eq!(
            err,
            PatchError::DuplicateAddress {
                key: PatchKey::standard(0x40)
            }
        );
        assert_eq!(payload(&t, PatchKey::standard(0x40)), vec![1, 2]);
    }

    #[test]
    fn standard_and_run_length_share_address() {
        let mut t = PatchTable::new();
        t.insert_standard(0, vec![1]).unwrap();
        t.insert_run_length(0, 2, 0xEE).unwrap();
        assert_eq!(t.len(), 2);
        assert!(t.contains_key(&PatchKey::standard(0)));
        assert!(t.contains_key(&PatchKey::run_length(0)));
    }

    #[test]
    fn insert_rejects_out_of_range() {
        let mut t = PatchTable::new();
        assert_eq!(
            t.insert_standard(0x100_0000, vec![0]),
            Err(PatchError::AddressOutOfRange {
                address: 0x100_0000
            })
        );
        assert_eq!(
            t.insert_standard(0, Vec::<u8>::new()),
            Err(PatchError::PayloadSizeOutOfRange { size: 0 })
        );
        assert_eq!(
            t.insert_run_length(0, 0, 0),
            Err(PatchError::PayloadSizeOutOfRange { size: 0 })
        );
        assert!(t.is_empty());
    }

    #[test]
    fn update_overwrites_in_place() {
        let mut t = PatchTable::new();
        t.insert_standard(1, vec![1]).unwrap();
        t.insert_standard(2, vec![2]).unwrap();
        assert!(t.update(PatchRecord::standard(1, vec![7, 7, 7]).unwrap()).unwrap());
        assert_eq!(t.records()[0], PatchRecord::standard(1, vec![7, 7, 7]).unwrap());
        assert!(!t.update(PatchRecord::standard(3, vec![3]).unwrap()).unwrap());
        assert_eq!(t.len(), 2);

        let empty = PatchRecord::Standard {
            address: 2,
            data: Vec::new(),
        };
        assert_eq!(
            t.update(empty),
            Err(PatchError::PayloadSizeOutOfRange { size: 0 })
        );
        assert_eq!(t.records()[1], PatchRecord::standard(2, vec![2]).unwrap());
    }

    #[test]
    fn remove_by_address_tries_standard_first() {
        let mut t = PatchTable::new();
        t.insert_run_length(0, 2, 0xAA).unwrap();
        t.insert_standard(0, vec![1]).unwrap();

        assert!(t.remove(0));
        assert!(!t.contains_key(&PatchKey::standard(0)));
        assert!(t.contains_key(&PatchKey::run_length(0)));

        assert!(t.remove(0));
        assert!(t.is_empty());
        assert!(!t.remove(0));
    }

    #[test]
    fn remove_at_reindexes() {
        let mut t = PatchTable::new();
        for a in 0..5u32 {
            t.insert_standard(a * 10, vec![a as u8]).unwrap();
        }
        assert!(t.remove_at(1));
        assert!(!t.remove_at(10));

        assert_eq!(t.position(&PatchKey::standard(20)), Some(1));
        assert_eq!(t.position(&PatchKey::standard(40)), Some(3));
        assert!(t.remove(30));
        assert_eq!(t.position(&PatchKey::standard(40)), Some(2));

        let addrs: Vec<u32> = t.keys().map(|k| k.address).collect();
        assert_eq!(addrs, vec![0, 20, 40]);
    }

    #[test]
    fn merge_combine_overlays_prefix() {
        let mut dst = table_with(&[1, 2, 3, 4, 5]);
        let src = table_with(&[9, 9]);
        let report = dst.merge(&src, MergeMode::Combine).unwrap();
        assert_eq!(payload(&dst, PatchKey::standard(0x40)), vec![9, 9, 3, 4, 5]);
        assert_eq!(report.combined, 1);
        assert_eq!(dst.len(), 1);
    }

    #[test]
    fn merge_combine_longer_source_replaces() {
        let mut dst = table_with(&[1, 2]);
        let src = table_with(&[9, 9, 9]);
        let report = dst.merge(&src, MergeMode::Combine).unwrap();
        assert_eq!(payload(&dst, PatchKey::standard(0x40)), vec![9, 9, 9]);
        assert_eq!(report.replaced, 1);
    }

    #[test]
    fn merge_replace_takes_source() {
        let mut dst = table_with(&[1, 2, 3, 4, 5]);
        let src = table_with(&[9, 9]);
        dst.merge(&src, MergeMode::Replace).unwrap();
        assert_eq!(payload(&dst, PatchKey::standard(0x40)), vec![9, 9]);
    }

    #[test]
    fn merge_ignore_keeps_destination() {
        let mut dst = table_with(&[1, 2, 3]);
        let src = table_with(&[9]);
        let report = dst.merge(&src, MergeMode::Ignore).unwrap();
        assert_eq!(payload(&dst, PatchKey::standard(0x40)), vec![1, 2, 3]);
        assert_eq!(report.ignored, 1);
    }

    #[test]
    fn merge_appends_absent_keys_in_source_order() {
        let mut dst = table_with(&[1]);
        let mut src = PatchTable::new();
        src.insert_standard(0x90, vec![2]).unwrap();
        src.insert_run_length(0x40, 8, 0).unwrap();
        src.insert_standard(0x40, vec![5]).unwrap();

        let report = dst.merge(&src, MergeMode::Ignore).unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(report.ignored, 1);
        let keys: Vec<PatchKey> = dst.keys().collect();
        assert_eq!(
            keys,
            vec![
                PatchKey::standard(0x40),
                PatchKey::standard(0x90),
                PatchKey::run_length(0x40),
            ]
        );
        // Source is left untouched.
        assert_eq!(src.len(), 3);
    }

    #[test]
    fn merge_combine_run_length_replaces() {
        let mut dst = PatchTable::new();
        dst.insert_run_length(8, 10, 0x00).unwrap();
        let mut src = PatchTable::new();
        src.insert_run_length(8, 2, 0xFF).unwrap();

        dst.merge(&src, MergeMode::Combine).unwrap();
        assert_eq!(
            dst.get(&PatchKey::run_length(8)),
            Some(&PatchRecord::run_length(8, 2, 0xFF).unwrap())
        );
    }

    #[test]
    fn from_records_stops_at_duplicate() {
        let records = vec![
            PatchRecord::standard(1, vec![1]).unwrap(),
            PatchRecord::standard(1, vec![2]).unwrap(),
        ];
        assert!(matches!(
            PatchTable::from_records(records),
            Err(PatchError::DuplicateAddress { .. })
        ));
    }

    #[test]
    fn iteration_is_restartable() {
        let mut t = PatchTable::new();
        t.insert_standard(3, vec![3]).unwrap();
        t.insert_standard(1, vec![1]).unwrap();
        let first: Vec<_> = t.iter().cloned().collect();
        let second: Vec<_> = (&t).into_iter().cloned().collect();
        assert_eq!(first, second);
        assert_eq!(t.into_iter().collect::<Vec<_>>(), first);
    }
}
