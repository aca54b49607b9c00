//! Oxips: IPS binary patch encoding, decoding and application in Rust.
//!
//! The crate provides:
//! - The IPS format engine (`ips`): records, the patch table, the wire
//!   codec and the applier
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use oxips::ips::{self, MergeMode, PatchTable};
//!
//! let mut table = PatchTable::new();
//! table.insert_standard(0x10, vec![0xAA, 0xBB]).unwrap();
//! table.insert_run_length(0x04, 3, 0x7F).unwrap();
//!
//! let bytes = ips::encode(&table);
//! let decoded = ips::decode(&bytes).unwrap();
//! assert_eq!(decoded, table);
//!
//! let mut fix = PatchTable::new();
//! fix.insert_standard(0x10, vec![0xCC]).unwrap();
//! table.merge(&fix, MergeMode::Combine).unwrap();
//!
//! let mut target = vec![0u8; 32];
//! ips::apply(&table, &mut target).unwrap();
//! assert_eq!(&target[4..7], &[0x7F; 3]);
//! assert_eq!(&target[16..18], &[0xCC, 0xBB]);
//! ```

pub mod io;
pub mod ips;

#[cfg(feature = "cli")]
pub mod cli;
