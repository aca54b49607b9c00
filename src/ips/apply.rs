// Applying a patch table to a target buffer.
//
// Records are applied in table order. Application is fail-fast and not
// transactional: the first record that does not fit aborts the call and
// every record before it stays written.

use log::{debug, trace};

use super::error::PatchError;
use super::record::PatchRecord;
use super::table::PatchTable;

/// What to do when a record reaches past the end of the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GrowthPolicy {
    /// Fail with `BufferTooSmall`.
    #[default]
    Bounded,
    /// Zero-extend the target to fit the record.
    Grow,
}

/// Options for [`apply_with`] and the file-level helpers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    pub growth: GrowthPolicy,
}

/// Apply every record of `table` to `target` in place.
///
/// On error, records preceding the failing one remain applied.
pub fn apply(table: &PatchTable, target: &mut [u8]) -> Result<(), PatchError> {
    for (i, record) in table.iter().enumerate() {
        trace!("apply #{i}: {}", record.key());
        record.apply(target).inspect_err(|e| {
            debug!("apply stopped at record #{i} of {}: {e}", table.len());
        })?;
    }
    debug!(
        "applied {} records ({} bytes) to {}-byte target",
        table.len(),
        table.total_patched_bytes(),
        target.len()
    );
    Ok(())
}

/// Apply `table` to a growable target according to `opts`.
///
/// With [`GrowthPolicy::Grow`] the target is zero-extended before each
/// record that would otherwise overflow it, so this never fails.
pub fn apply_with(
    table: &PatchTable,
    target: &mut Vec<u8>,
    opts: ApplyOptions,
) -> Result<(), PatchError> {
    match opts.growth {
        GrowthPolicy::Bounded => apply(table, target),
        GrowthPolicy::Grow => {
            let original = target.len();
            for record in table {
                grow_to_fit(record, target);
                record.apply(target)?;
            }
            if target.len() > original {
                debug!("grew target from {original} to {} bytes", target.len());
            }
            Ok(())
        }
    }
}

fn grow_to_fit(record: &PatchRecord, target: &mut Vec<u8>) {
    let end = record.end();
    if end > target.len() {
        trace!("growing target to {end} bytes for {}", record.key());
        target.resize(end, 0);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
