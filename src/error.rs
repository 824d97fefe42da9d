//! Unified error type.

use std::fmt;
use std::io;
use std::net::AddrParseError;
use std::path::PathBuf;

/// The error type returned by zipserve's fallible startup operations.
///
/// Per-request failures (an unknown archive, a dead client) are expressed as
/// HTTP responses or as [`StreamError`](crate::archive::StreamError) values,
/// not as `Error`s. This type surfaces infrastructure failures: an invalid
/// listen address, a socket that cannot be bound, or a data root that does
/// not point at a directory.
#[derive(Debug)]
pub enum Error {
    /// The listen address could not be parsed as `host:port`.
    Addr(AddrParseError),
    /// Binding the listener or driving the accept loop failed.
    Io(io::Error),
    /// The configured data root is missing or not a directory.
    DataRoot { path: PathBuf, source: io::Error },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Addr(e) => write!(f, "invalid listen address: {e}"),
            Self::Io(e) => write!(f, "io: {e}"),
            Self::DataRoot { path, source } => {
                write!(f, "data root {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Addr(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::DataRoot { source, .. } => Some(source),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<AddrParseError> for Error {
    fn from(e: AddrParseError) -> Self {
        Self::Addr(e)
    }
}
