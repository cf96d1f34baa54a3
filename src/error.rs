use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The filesystem call that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Open,
    Create,
    Read,
    Write,
    Seek,
    Stat,
    Flush,
    List,
    Remove,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Op::Open => "open",
            Op::Create => "create",
            Op::Read => "read",
            Op::Write => "write",
            Op::Seek => "seek",
            Op::Stat => "stat",
            Op::Flush => "flush",
            Op::List => "list",
            Op::Remove => "remove",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("{op} of part {part} at offset {offset} failed: {source}")]
    Part {
        op: Op,
        part: u64,
        offset: u64,
        #[source]
        source: io::Error,
    },
    #[error("{op} of directory {} failed: {source}", path.display())]
    Directory {
        op: Op,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("transfer stopped after {transferred} bytes: {source}")]
    Incomplete {
        transferred: usize,
        #[source]
        source: Box<Error>,
    },
    #[error("invalid seek to position {position}")]
    InvalidSeek { position: i128 },
    #[error("range of {len} bytes at offset {offset} runs past the addressable end")]
    OutOfRange { offset: u64, len: usize },
}

impl Error {
    pub(crate) fn part(op: Op, part: u64, offset: u64, source: io::Error) -> Self {
        Error::Part { op, part, offset, source }
    }

    pub(crate) fn directory(op: Op, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Directory { op, path: path.into(), source }
    }

    /// Wraps `err` with the count of bytes moved before it, unless nothing
    /// moved.
    pub(crate) fn incomplete(transferred: usize, err: Error) -> Self {
        if transferred == 0 {
            err
        } else {
            Error::Incomplete { transferred, source: Box::new(err) }
        }
    }

    /// The kind of the underlying I/O failure.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            Error::Part { source, .. } | Error::Directory { source, .. } => source.kind(),
            Error::Incomplete { source, .. } => source.kind(),
            Error::InvalidSeek { .. } | Error::OutOfRange { .. } => io::ErrorKind::InvalidInput,
        }
    }

    /// Bytes moved before the failure, if the failure interrupted a transfer.
    pub fn transferred(&self) -> usize {
        match self {
            Error::Incomplete { transferred, .. } => *transferred,
            _ => 0,
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        io::Error::new(err.kind(), err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
