//! Mapping of logical offsets onto part files.

mod layout;
mod name;

pub use layout::{PartLayout, Segment, Segments};
pub use name::{PART_NAME_WIDTH, parse_part_name, part_name};
