use thiserror::Error;

/// Errors raised by capture sessions and streaming encoders.
///
/// All variants are raised synchronously at the point of violation and none
/// are retried internally: a failed session or encoder must be discarded and
/// reconstructed by the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// Unsupported audio format combination or output bit rate.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// Device open or start failure during session construction.
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// Native codec library missing or failed to bind.
    #[error("codec library load failed: {0}")]
    LibraryLoad(String),

    /// An underlying device or codec call reported a non-success status.
    #[error("native call {call} failed with status {status}")]
    NativeCall { call: &'static str, status: i32 },

    /// Protocol violation by the caller: double release, encode after flush,
    /// double dispose, and the like.
    #[error("usage error: {0}")]
    Usage(String),
}
