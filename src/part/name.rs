/// Minimum width of a part file name. Indices below 10^12 are zero padded
/// to this width so directory order matches index order.
pub const PART_NAME_WIDTH: usize = 12;

/// Returns the on-disk file name of the part with the given index.
///
/// Indices with more than [`PART_NAME_WIDTH`] digits are written out in
/// full, never truncated.
pub fn part_name(index: u64) -> String {
    format!("{index:0width$}", width = PART_NAME_WIDTH)
}

/// Parses a part file name back into its index.
///
/// Only names made entirely of ASCII digits are part names; anything else
/// found in the directory is ignored by the caller.
pub fn parse_part_name(name: &str) -> Option<u64> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}
