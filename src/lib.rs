//! A logical, unbounded file stored as a directory of fixed-size part files.
//!
//! ```no_run
//! use std::num::NonZeroU64;
//! use partfile::SegmentedFile;
//!
//! # fn main() -> partfile::Result<()> {
//! let mut file = SegmentedFile::open("data/log", NonZeroU64::new(64 * 1024).unwrap());
//! file.write_at(b"hello", 0)?;
//! let mut buf = [0u8; 5];
//! file.read_at(&mut buf, 0)?;
//! assert_eq!(file.size()?, 5);
//! file.close();
//! partfile::remove("data/log")?;
//! # Ok(())
//! # }
//! ```

mod cache;
mod config;
mod error;
mod file;
pub mod part;
pub mod storage;

pub use config::{DEFAULT_PART_SIZE, PartFileConfig};
pub use error::{Error, Op, Result};
pub use file::{SegmentedFile, remove, remove_with};
pub use storage::{LocalPartStore, PartHandle, PartStore};
