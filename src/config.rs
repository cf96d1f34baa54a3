use serde::{Deserialize, Serialize};
use std::num::NonZeroU64;

/// Default part size: 256MB.
pub const DEFAULT_PART_SIZE: NonZeroU64 = NonZeroU64::new(256 * 1024 * 1024).unwrap();

/// Options a segmented file is opened with.
///
/// Serializable so a host can carry it in its own configuration. The part
/// size is fixed for the lifetime of the data: reopening existing parts with
/// a different size maps offsets onto the wrong bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartFileConfig {
    pub part_size: NonZeroU64,
}

impl PartFileConfig {
    pub fn new(part_size: NonZeroU64) -> Self {
        Self { part_size }
    }
}

impl Default for PartFileConfig {
    fn default() -> Self {
        Self { part_size: DEFAULT_PART_SIZE }
    }
}
