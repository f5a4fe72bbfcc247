//! Error type for reader sessions
//!
//! Every platform I/O failure is wrapped into one error value carrying the
//! failing stage and the underlying native status, and aborts the current
//! session. There is no retry at this layer.

use std::fmt;
use std::io;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ReadError>;

/// The stage at which a session failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Opening the input file failed.
    Open,
    /// Resolving the file's containing volume/device failed.
    ResolveVolume,
    /// Querying the device geometry failed.
    QueryGeometry,
    /// Querying the file size failed.
    QuerySize,
    /// Registering the file handle or buffer arena failed.
    Register,
    /// Submitting a read request failed.
    Submit,
    /// A completion carried a non-success, non-end-of-file status.
    Complete,
    /// The reader configuration is invalid.
    InvalidConfig,
}

impl ErrorKind {
    /// Get the kind as a string
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Open => "open",
            ErrorKind::ResolveVolume => "resolve volume",
            ErrorKind::QueryGeometry => "query geometry",
            ErrorKind::QuerySize => "query size",
            ErrorKind::Register => "register",
            ErrorKind::Submit => "submit",
            ErrorKind::Complete => "complete",
            ErrorKind::InvalidConfig => "invalid config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned by reader sessions.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {source}")]
pub struct ReadError {
    kind: ErrorKind,
    #[source]
    source: io::Error,
}

impl ReadError {
    /// Wrap an I/O error with the stage it occurred in.
    pub fn new(kind: ErrorKind, source: io::Error) -> Self {
        Self { kind, source }
    }

    /// Build an error from a raw native status code.
    pub fn from_raw_status(kind: ErrorKind, status: i32) -> Self {
        Self {
            kind,
            source: io::Error::from_raw_os_error(status),
        }
    }

    /// The stage at which the session failed.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The native OS status code, if one was captured.
    pub fn raw_os_status(&self) -> Option<i32> {
        self.source.raw_os_error()
    }

    /// The underlying I/O error.
    pub fn io_error(&self) -> &io::Error {
        &self.source
    }
}

/// Extension trait to tag `io::Result` values with the failing stage.
pub(crate) trait IoResultExt<T> {
    fn stage(self, kind: ErrorKind) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn stage(self, kind: ErrorKind) -> Result<T> {
        self.map_err(|e| ReadError::new(kind, e))
    }
}
