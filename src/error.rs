//! [`CabinetError`]: the single structured error type returned by every
//! fallible engine and service operation.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error kinds: engine-internal I/O failures carry a path for context;
/// service-layer validation errors carry the offending name.
#[derive(Error, Debug)]
pub enum CabinetError {
    /// Could not create or open a required file.
    #[error("open {path}: {source}")]
    Open {
        /// File or directory that failed to open.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
    /// A read, or a short read, failed.
    #[error("read {path}: {source}")]
    Read {
        /// File the read was attempted against.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
    /// A write, or a short write, failed.
    #[error("write {path}: {source}")]
    Write {
        /// File the write was attempted against.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
    /// A `stat` call failed.
    #[error("stat {path}: {source}")]
    Stat {
        /// File the stat was attempted against.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
    /// A truncate failed.
    #[error("truncate {path}: {source}")]
    Truncate {
        /// File the truncate was attempted against.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
    /// A fully-read index record failed structural validation. Reserved:
    /// the engine currently treats a torn trailing record as benign EOF
    /// rather than raising this.
    #[error("corrupt file: {0}")]
    FileCorrupt(String),
    /// Serialization or deserialization error on the RPC wire protocol.
    #[error("{0}")]
    Serde(#[from] serde_json::Error),
    /// Database name fails service-layer validation (empty, or contains
    /// `/`).
    #[error("bad database name: {0:?}")]
    BadDbName(String),
    /// `Create` named an already-existing database.
    #[error("database already exists: {0:?}")]
    DbExists(String),
    /// An operation named a database that does not exist.
    #[error("no such database: {0:?}")]
    DbNotExist(String),
    /// Startup found a non-empty PID lock file; a prior process exited
    /// uncleanly and the operator must investigate.
    #[error("data root is locked by pid file {0:?}; remove it after investigating")]
    StartupLocked(PathBuf),
    /// Catch-all for I/O errors not already carrying a path (e.g. bubbled
    /// up via `?` from `std::fs` helpers that take their own path).
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// An ambient, non-storage failure with no dedicated variant (thread
    /// pool construction, for instance).
    #[error("{0}")]
    Other(String),
}

impl CabinetError {
    /// Builds a [`CabinetError::Open`].
    pub fn open(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        CabinetError::Open {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Builds a [`CabinetError::Read`].
    pub fn read(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        CabinetError::Read {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Builds a [`CabinetError::Write`].
    pub fn write(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        CabinetError::Write {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Builds a [`CabinetError::Stat`].
    pub fn stat(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        CabinetError::Stat {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Builds a [`CabinetError::Truncate`].
    pub fn truncate(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        CabinetError::Truncate {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Whether this error maps to the wire-level `IOError` bucket at the
    /// RPC boundary, as opposed to a named service-layer validation error.
    pub fn is_io_error(&self) -> bool {
        !matches!(
            self,
            CabinetError::BadDbName(_) | CabinetError::DbExists(_) | CabinetError::DbNotExist(_)
        )
    }
}

/// Custom result type for [`CabinetError`].
pub type Result<T> = std::result::Result<T, CabinetError>;
