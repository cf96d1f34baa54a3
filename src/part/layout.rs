use std::num::NonZeroU64;

/// Fixed-size partitioning of a logical address space into parts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartLayout {
    part_size: NonZeroU64,
}

/// One piece of a byte range that lies entirely inside a single part.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment {
    /// Index of the part holding this piece.
    pub part: u64,
    /// Offset of the first byte within that part.
    pub offset: u64,
    /// Position of the first byte within the caller's buffer.
    pub buf_start: usize,
    /// Number of bytes in this piece.
    pub len: usize,
}

impl Segment {
    /// The slice of the caller's buffer this segment covers.
    pub fn buf_range(&self) -> std::ops::Range<usize> {
        self.buf_start..self.buf_start + self.len
    }
}

impl PartLayout {
    pub const fn new(part_size: NonZeroU64) -> Self {
        Self { part_size }
    }

    pub const fn part_size(&self) -> u64 {
        self.part_size.get()
    }

    pub const fn non_zero_part_size(&self) -> NonZeroU64 {
        self.part_size
    }

    /// Index of the part that holds `offset`.
    pub const fn part_index(&self, offset: u64) -> u64 {
        offset / self.part_size.get()
    }

    /// Position of `offset` inside its part, always below the part size.
    pub const fn in_part_offset(&self, offset: u64) -> u64 {
        offset % self.part_size.get()
    }

    /// Bytes between `offset` and the end of its part. A range longer than
    /// this has to be split at the boundary.
    pub const fn split_point(&self, offset: u64) -> u64 {
        self.part_size.get() - self.in_part_offset(offset)
    }

    /// Absolute offset of the first byte of part `index`.
    pub const fn part_start(&self, index: u64) -> u64 {
        index.saturating_mul(self.part_size.get())
    }

    /// Splits the range `[offset, offset + len)` into per-part segments.
    pub fn segments(&self, offset: u64, len: usize) -> Segments {
        Segments { layout: *self, offset, buf_start: 0, remaining: len }
    }
}

/// Iterator over the segments of a byte range, produced by
/// [`PartLayout::segments`].
#[derive(Clone, Debug)]
pub struct Segments {
    layout: PartLayout,
    offset: u64,
    buf_start: usize,
    remaining: usize,
}

impl Iterator for Segments {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        if self.remaining == 0 {
            return None;
        }
        let room = self.layout.split_point(self.offset);
        let len = usize::try_from(room).map_or(self.remaining, |room| room.min(self.remaining));
        let segment = Segment {
            part: self.layout.part_index(self.offset),
            offset: self.layout.in_part_offset(self.offset),
            buf_start: self.buf_start,
            len,
        };
        self.offset = self.offset.saturating_add(len as u64);
        self.buf_start += len;
        self.remaining -= len;
        Some(segment)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.remaining == 0 {
            return (0, Some(0));
        }
        let first = self.layout.split_point(self.offset);
        let rest = (self.remaining as u64).saturating_sub(first);
        let count = 1 + rest.div_ceil(self.layout.part_size());
        let count = usize::try_from(count).unwrap_or(usize::MAX);
        (count, Some(count))
    }
}

impl ExactSizeIterator for Segments {}
