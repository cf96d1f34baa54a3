use std::io::{self, Read, Seek, SeekFrom, Write};
use std::num::NonZeroU64;
use std::ops::Range;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::cache::{OpenPart, PartSlot};
use crate::config::PartFileConfig;
use crate::error::{Error, Op, Result};
use crate::part::{PartLayout, Segment, part_name};
use crate::storage::{LocalPartStore, PartHandle, PartStore};

/// How a transfer addresses the open part.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Access {
    /// Through the handle's own position, following the cursor.
    Sequential,
    /// At an explicit in-part offset, leaving the cursor alone.
    Positioned,
}

/// A logical file of unbounded length stored as a directory of fixed-size
/// part files.
///
/// Part `i` holds the bytes `[i * part_size, (i + 1) * part_size)` and is
/// named by [`part_name`]. At most one part file is open at a time; it is
/// kept open across calls that stay inside the same part.
///
/// Parts must be filled left to right without gaps. [`size`](Self::size)
/// counts the parts present and assumes every part but the last is full.
/// Every access creates the part it lands in, so a write, read or seek far
/// past the current end leaves a sequence it cannot measure.
///
/// A `SegmentedFile` is not synchronized. Sharing a directory between
/// several instances is only sound if the caller serializes every access.
pub struct SegmentedFile<S: PartStore = LocalPartStore> {
    dir: PathBuf,
    layout: PartLayout,
    store: S,
    slot: PartSlot<S::Part>,
    cursor: u64,
}

impl SegmentedFile<LocalPartStore> {
    /// Prepares a segmented file rooted at `dir`. No I/O happens until the
    /// first read, write, seek or size query; `dir` need not exist yet.
    pub fn open(dir: impl Into<PathBuf>, part_size: NonZeroU64) -> Self {
        Self::with_store(dir, part_size, LocalPartStore::new())
    }

    pub fn from_config(dir: impl Into<PathBuf>, config: &PartFileConfig) -> Self {
        Self::open(dir, config.part_size)
    }
}

impl<S: PartStore> SegmentedFile<S> {
    /// Like [`open`](SegmentedFile::open), backed by a custom store.
    pub fn with_store(dir: impl Into<PathBuf>, part_size: NonZeroU64, store: S) -> Self {
        Self {
            dir: dir.into(),
            layout: PartLayout::new(part_size),
            store,
            slot: PartSlot::new(),
            cursor: 0,
        }
    }

    pub fn part_size(&self) -> u64 {
        self.layout.part_size()
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    pub fn config(&self) -> PartFileConfig {
        PartFileConfig::new(self.layout.non_zero_part_size())
    }

    /// The cursor used by [`read`](Self::read) and [`write`](Self::write).
    pub fn position(&self) -> u64 {
        self.cursor
    }

    /// Whether a part file is currently held open.
    pub fn is_open(&self) -> bool {
        self.slot.index().is_some()
    }

    /// Releases the open part, if any. Calling it again is a no-op, and the
    /// file stays usable: the next operation reopens what it needs.
    pub fn close(&mut self) {
        self.slot.close();
    }

    /// Logical length: `(n - 1) * part_size` plus the length of the last of
    /// the `n` parts present. Creates the directory if it is missing.
    pub fn size(&self) -> Result<u64> {
        let parts = match self.store.list_parts(&self.dir) {
            Ok(parts) => parts,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                self.store
                    .create_dir_all(&self.dir)
                    .map_err(|e| Error::directory(Op::Create, &self.dir, e))?;
                debug!(dir = %self.dir.display(), "created part directory");
                return Ok(0);
            }
            Err(err) => return Err(Error::directory(Op::List, &self.dir, err)),
        };

        let Some(last) = (parts.len() as u64).checked_sub(1) else {
            return Ok(0);
        };
        let start = self.layout.part_start(last);
        let tail = self
            .store
            .part_len(&self.dir.join(part_name(last)))
            .map_err(|e| Error::part(Op::Stat, last, start, e))?;
        trace!(parts = parts.len(), tail, "derived size");
        Ok(start + tail)
    }

    /// Moves the cursor and returns its new absolute value. Seeking relative
    /// to the end measures the file with [`size`](Self::size) first.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => i128::from(n),
            SeekFrom::Current(delta) => i128::from(self.cursor) + i128::from(delta),
            SeekFrom::End(delta) => i128::from(self.size()?) + i128::from(delta),
        };
        let target = u64::try_from(target).map_err(|_| Error::InvalidSeek { position: target })?;

        let index = self.layout.part_index(target);
        let in_part = self.layout.in_part_offset(target);
        let part = self.slot.ensure(&self.store, &self.dir, index, target)?;
        if let Err(err) = part.handle.seek(SeekFrom::Start(in_part)) {
            part.position = None;
            return Err(Error::part(Op::Seek, index, target, err));
        }
        part.position = Some(in_part);
        self.cursor = target;
        Ok(target)
    }

    /// Reads from the cursor into `buf` and advances the cursor by the bytes
    /// read. Returns fewer than `buf.len()` bytes only at the end of the data.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let result = self.transfer(Op::Read, Access::Sequential, self.cursor, buf.len(), |handle, range, _| {
            handle.read(&mut buf[range])
        });
        self.advance(&result);
        result
    }

    /// Writes `buf` at the cursor and advances the cursor by the bytes
    /// written.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let result = self.transfer(Op::Write, Access::Sequential, self.cursor, buf.len(), |handle, range, _| {
            handle.write(&buf[range])
        });
        self.advance(&result);
        result
    }

    /// Reads into `buf` starting at the logical `offset`. The cursor is not
    /// used or moved.
    pub fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.transfer(Op::Read, Access::Positioned, offset, buf.len(), |handle, range, at| {
            handle.read_at(&mut buf[range], at)
        })
    }

    /// Writes `buf` starting at the logical `offset`. The cursor is not used
    /// or moved.
    pub fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<usize> {
        self.transfer(Op::Write, Access::Positioned, offset, buf.len(), |handle, range, at| {
            handle.write_at(&buf[range], at)
        })
    }

    /// Flushes the open part, if any.
    pub fn flush(&mut self) -> Result<()> {
        if let Some(part) = self.slot.current_mut() {
            let index = part.index;
            part.handle
                .flush()
                .map_err(|e| Error::part(Op::Flush, index, self.layout.part_start(index), e))?;
        }
        Ok(())
    }

    fn advance(&mut self, result: &Result<usize>) {
        let moved = match result {
            Ok(n) => *n,
            Err(err) => err.transferred(),
        };
        // `transfer` rejects ranges that end past u64::MAX.
        self.cursor += moved as u64;
    }

    /// Runs `call` over every segment of `[offset, offset + len)` in order,
    /// switching parts as needed. `call` performs one call on the open part for
    /// the given buffer range and in-part offset.
    ///
    /// Stops early when a segment comes up short. On failure the error carries
    /// the number of bytes moved before it.
    fn transfer<F>(&mut self, op: Op, access: Access, offset: u64, len: usize, mut call: F) -> Result<usize>
    where
        F: FnMut(&mut S::Part, Range<usize>, u64) -> io::Result<usize>,
    {
        if offset.checked_add(len as u64).is_none() {
            return Err(Error::OutOfRange { offset, len });
        }
        let mut done = 0;
        for segment in self.layout.segments(offset, len) {
            let at = offset + segment.buf_start as u64;
            let part = match self.slot.ensure(&self.store, &self.dir, segment.part, at) {
                Ok(part) => part,
                Err(err) => return Err(Error::incomplete(done, err)),
            };
            match run_segment(part, &segment, at, op, access, &mut call, &mut done) {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => return Err(Error::incomplete(done, err)),
            }
        }
        Ok(done)
    }
}

/// Moves one segment through the open part, retrying until it is complete or
/// the part reports no progress. Returns whether the segment was complete.
fn run_segment<P, F>(
    part: &mut OpenPart<P>,
    segment: &Segment,
    at: u64,
    op: Op,
    access: Access,
    call: &mut F,
    done: &mut usize,
) -> Result<bool>
where
    P: PartHandle,
    F: FnMut(&mut P, Range<usize>, u64) -> io::Result<usize>,
{
    match access {
        Access::Sequential if part.position != Some(segment.offset) => {
            if let Err(err) = part.handle.seek(SeekFrom::Start(segment.offset)) {
                part.position = None;
                return Err(Error::part(Op::Seek, segment.part, at, err));
            }
            part.position = Some(segment.offset);
        }
        Access::Sequential => {}
        Access::Positioned => part.position = None,
    }

    let mut moved = 0;
    while moved < segment.len {
        let range = segment.buf_start + moved..segment.buf_start + segment.len;
        match call(&mut part.handle, range, segment.offset + moved as u64) {
            Ok(0) => break,
            Ok(n) => {
                moved += n;
                *done += n;
                if access == Access::Sequential {
                    part.position = Some(segment.offset + moved as u64);
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => {
                if access == Access::Sequential {
                    part.position = None;
                }
                return Err(Error::part(op, segment.part, at + moved as u64, err));
            }
        }
    }
    trace!(%op, part = segment.part, offset = segment.offset, len = segment.len, moved, "segment done");
    Ok(moved == segment.len)
}

/// Deletes the directory at `dir` with every part in it. A missing directory
/// is not an error.
pub fn remove(dir: impl AsRef<Path>) -> Result<()> {
    remove_with(&LocalPartStore::new(), dir.as_ref())
}

/// Like [`remove`], through a custom store.
pub fn remove_with<S: PartStore>(store: &S, dir: &Path) -> Result<()> {
    match store.remove_dir_all(dir) {
        Ok(()) => {
            debug!(dir = %dir.display(), "removed part directory");
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(Error::directory(Op::Remove, dir, err)),
    }
}

impl<S: PartStore> Read for SegmentedFile<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        SegmentedFile::read(self, buf).map_err(io::Error::from)
    }
}

impl<S: PartStore> Write for SegmentedFile<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        SegmentedFile::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        SegmentedFile::flush(self).map_err(io::Error::from)
    }
}

impl<S: PartStore> Seek for SegmentedFile<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        SegmentedFile::seek(self, pos).map_err(io::Error::from)
    }
}
