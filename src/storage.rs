use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, Write};
use std::path::Path;

use crate::part::parse_part_name;

#[cfg(test)]
pub(crate) mod memory;

/// Owner-only permissions for the part directory.
#[cfg(unix)]
const DIR_MODE: u32 = 0o700;
/// Owner-only permissions for part files.
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// An open part file.
///
/// Sequential transfers go through `Read`/`Write` at the handle's own
/// position; positioned transfers take an explicit offset and are not
/// expected to leave that position in any particular place.
pub trait PartHandle: Read + Write + Seek {
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize>;
    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize>;
}

/// The filesystem operations a segmented file needs.
///
/// Opening a part and creating it are separate calls so that the
/// create-on-missing fallback lives with the caller and can be tested
/// against a fake store.
pub trait PartStore {
    type Part: PartHandle;

    /// Opens an existing part read-write. Fails with `NotFound` if the part
    /// or its directory does not exist.
    fn open_part(&self, path: &Path) -> io::Result<Self::Part>;
    /// Opens a part read-write, creating an empty file if it is absent.
    fn create_part(&self, path: &Path) -> io::Result<Self::Part>;
    /// Creates `dir` and any missing parents. Succeeds if it already exists.
    fn create_dir_all(&self, dir: &Path) -> io::Result<()>;
    /// Indices of the part files present in `dir`.
    fn list_parts(&self, dir: &Path) -> io::Result<Vec<u64>>;
    /// Length in bytes of the part at `path`.
    fn part_len(&self, path: &Path) -> io::Result<u64>;
    /// Deletes `dir` and everything below it.
    fn remove_dir_all(&self, dir: &Path) -> io::Result<()>;
}

/// [`PartStore`] backed by the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalPartStore;

impl LocalPartStore {
    pub fn new() -> Self {
        Self
    }
}

impl PartStore for LocalPartStore {
    type Part = File;

    fn open_part(&self, path: &Path) -> io::Result<File> {
        OpenOptions::new().read(true).write(true).open(path)
    }

    fn create_part(&self, path: &Path) -> io::Result<File> {
        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(FILE_MODE);
        }
        options.open(path)
    }

    fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(DIR_MODE);
        }
        builder.create(dir)
    }

    fn list_parts(&self, dir: &Path) -> io::Result<Vec<u64>> {
        let mut parts = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if let Some(index) = entry.file_name().to_str().and_then(parse_part_name) {
                parts.push(index);
            }
        }
        Ok(parts)
    }

    fn part_len(&self, path: &Path) -> io::Result<u64> {
        fs::metadata(path).map(|meta| meta.len())
    }

    fn remove_dir_all(&self, dir: &Path) -> io::Result<()> {
        fs::remove_dir_all(dir)
    }
}

#[cfg(unix)]
impl PartHandle for File {
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::unix::fs::FileExt::read_at(self, buf, offset)
    }

    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        std::os::unix::fs::FileExt::write_at(self, buf, offset)
    }
}

#[cfg(windows)]
impl PartHandle for File {
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::windows::fs::FileExt::seek_read(self, buf, offset)
    }

    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        std::os::windows::fs::FileExt::seek_write(self, buf, offset)
    }
}
