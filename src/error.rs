//! Error types for hub operations.

use std::io;

use thiserror::Error;

/// Errors returned by hub operations.
///
/// Per-device I/O failures never escape through the event stream: the affected device is closed
/// and a removal event is queued instead. These variants surface through the query and control
/// operations only.
#[derive(Debug, Error)]
pub enum Error {
    /// The device id or path is unknown, or the device is currently disabled.
    #[error("no such device")]
    NotFound,

    /// Opening the device was denied.
    #[error("permission denied: {0}")]
    PermissionDenied(io::Error),

    /// A read or ioctl against the device failed.
    #[error("device i/o failed: {0}")]
    Io(io::Error),

    /// The device does not advertise the capability the request needs.
    #[error("operation not supported by device")]
    Unsupported,

    /// An index or range argument was out of bounds.
    #[error("invalid argument")]
    InvalidArgument,

    /// The controller number pool has no free slots.
    #[error("controller number pool exhausted")]
    Exhausted,

    /// Enable on an enabled device, or disable on a disabled one. Advisory, not fatal.
    #[error("device already in requested state")]
    AlreadyInState,
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Error::NotFound,
            io::ErrorKind::PermissionDenied => Error::PermissionDenied(e),
            io::ErrorKind::Unsupported => Error::Unsupported,
            _ => Error::Io(e),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
