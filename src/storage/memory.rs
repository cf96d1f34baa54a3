//! In-memory [`PartStore`] used by unit tests to observe descriptor traffic
//! and to inject short or failing transfers.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::{PartHandle, PartStore};
use crate::part::parse_part_name;

type Bytes = Rc<RefCell<Vec<u8>>>;

#[derive(Default)]
pub struct MemStore {
    dirs: RefCell<BTreeSet<PathBuf>>,
    files: RefCell<BTreeMap<PathBuf, Bytes>>,
    pub opens: Cell<usize>,
    pub creates: Cell<usize>,
    /// Largest transfer a single call on a handed-out part performs.
    pub max_chunk: Cell<Option<usize>>,
    /// Part whose transfers fail with `PermissionDenied`.
    pub failing: RefCell<Option<PathBuf>>,
    /// Makes `list_parts` fail with `PermissionDenied`.
    pub failing_list: Cell<bool>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_dir(&self, dir: &Path) -> bool {
        self.dirs.borrow().contains(dir)
    }

    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.borrow().get(path).map(|data| data.borrow().clone())
    }

    pub fn handle(&self, path: &Path, data: Bytes) -> MemPart {
        MemPart {
            data,
            pos: 0,
            max_chunk: self.max_chunk.get(),
            failing: self.failing.borrow().as_deref() == Some(path),
        }
    }
}

#[derive(Debug)]
pub struct MemPart {
    data: Bytes,
    pos: u64,
    max_chunk: Option<usize>,
    failing: bool,
}

impl MemPart {
    fn check(&self) -> io::Result<()> {
        if self.failing {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        Ok(())
    }

    fn limit(&self, len: usize) -> usize {
        self.max_chunk.map_or(len, |max| max.min(len))
    }
}

impl PartHandle for MemPart {
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.check()?;
        let data = self.data.borrow();
        let start = (offset as usize).min(data.len());
        let n = self.limit(buf.len()).min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        self.check()?;
        let n = self.limit(buf.len());
        let start = offset as usize;
        let mut data = self.data.borrow_mut();
        if data.len() < start + n {
            data.resize(start + n, 0);
        }
        data[start..start + n].copy_from_slice(&buf[..n]);
        Ok(n)
    }
}

impl Read for MemPart {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.read_at(buf, self.pos)?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl Write for MemPart {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.write_at(buf, self.pos)?;
        self.pos += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemPart {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = self.data.borrow().len() as i128;
        let target = match pos {
            SeekFrom::Start(n) => i128::from(n),
            SeekFrom::Current(n) => i128::from(self.pos) + i128::from(n),
            SeekFrom::End(n) => len + i128::from(n),
        };
        self.pos = u64::try_from(target).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
        Ok(self.pos)
    }
}

impl PartStore for MemStore {
    type Part = MemPart;

    fn open_part(&self, path: &Path) -> io::Result<MemPart> {
        self.opens.set(self.opens.get() + 1);
        let data = self.files.borrow().get(path).cloned();
        let data = data.ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
        Ok(self.handle(path, data))
    }

    fn create_part(&self, path: &Path) -> io::Result<MemPart> {
        self.creates.set(self.creates.get() + 1);
        let parent = path.parent().unwrap_or(Path::new(""));
        if !self.dirs.borrow().contains(parent) {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        let data = self.files.borrow_mut().entry(path.to_path_buf()).or_default().clone();
        Ok(self.handle(path, data))
    }

    fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        let mut dirs = self.dirs.borrow_mut();
        for ancestor in dir.ancestors() {
            dirs.insert(ancestor.to_path_buf());
        }
        Ok(())
    }

    fn list_parts(&self, dir: &Path) -> io::Result<Vec<u64>> {
        if self.failing_list.get() {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        if !self.dirs.borrow().contains(dir) {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        Ok(self
            .files
            .borrow()
            .keys()
            .filter(|path| path.parent() == Some(dir))
            .filter_map(|path| path.file_name()?.to_str().and_then(parse_part_name))
            .collect())
    }

    fn part_len(&self, path: &Path) -> io::Result<u64> {
        self.files
            .borrow()
            .get(path)
            .map(|data| data.borrow().len() as u64)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn remove_dir_all(&self, dir: &Path) -> io::Result<()> {
        if !self.dirs.borrow_mut().remove(dir) {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        self.dirs.borrow_mut().retain(|d| !d.starts_with(dir));
        self.files.borrow_mut().retain(|path, _| !path.starts_with(dir));
        Ok(())
    }
}
