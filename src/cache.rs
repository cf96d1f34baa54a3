use std::io;
use std::path::Path;

use tracing::{debug, trace};

use crate::error::{Error, Op, Result};
use crate::part::part_name;
use crate::storage::{PartHandle, PartStore};

/// The one part file a segmented file holds open.
pub(crate) struct OpenPart<P> {
    pub(crate) index: u64,
    pub(crate) handle: P,
    /// Where the handle's own position is known to be, for sequential
    /// transfers. `None` after a positioned transfer moved it unpredictably.
    pub(crate) position: Option<u64>,
}

/// Descriptor cache of depth one.
///
/// Holds at most one open part. Switching to a different part closes the
/// current one first, so `index()` is `Some` exactly when a handle is held.
pub(crate) struct PartSlot<P> {
    current: Option<OpenPart<P>>,
}

impl<P: PartHandle> PartSlot<P> {
    pub(crate) fn new() -> Self {
        Self { current: None }
    }

    pub(crate) fn index(&self) -> Option<u64> {
        self.current.as_ref().map(|part| part.index)
    }

    pub(crate) fn current_mut(&mut self) -> Option<&mut OpenPart<P>> {
        self.current.as_mut()
    }

    /// Drops the open handle, if any.
    pub(crate) fn close(&mut self) {
        if let Some(part) = self.current.take() {
            debug!(part = part.index, "closed part");
        }
    }

    /// Makes part `index` the open part and returns it.
    ///
    /// `offset` is the logical offset being accessed, used for error context.
    pub(crate) fn ensure<S>(&mut self, store: &S, dir: &Path, index: u64, offset: u64) -> Result<&mut OpenPart<P>>
    where
        S: PartStore<Part = P>,
    {
        let part = match self.current.take() {
            Some(part) if part.index == index => {
                trace!(part = index, "reusing open part");
                part
            }
            stale => {
                if let Some(stale) = stale {
                    debug!(part = stale.index, "closed part");
                }
                let handle = open_or_create(store, dir, index, offset)?;
                OpenPart { index, handle, position: Some(0) }
            }
        };
        Ok(self.current.insert(part))
    }
}

/// Opens part `index` under `dir`, creating the directory and the part file
/// when either is missing.
pub(crate) fn open_or_create<S: PartStore>(store: &S, dir: &Path, index: u64, offset: u64) -> Result<S::Part> {
    let path = dir.join(part_name(index));
    match store.open_part(&path) {
        Ok(handle) => {
            debug!(part = index, path = %path.display(), "opened part");
            Ok(handle)
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            store.create_dir_all(dir).map_err(|e| Error::directory(Op::Create, dir, e))?;
            let handle = store.create_part(&path).map_err(|e| Error::part(Op::Create, index, offset, e))?;
            debug!(part = index, path = %path.display(), "created part");
            Ok(handle)
        }
        Err(err) => Err(Error::part(Op::Open, index, offset, err)),
    }
}
