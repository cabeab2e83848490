//! Error types shared by every disc container reader

use thiserror::Error;

/// Result type alias for discimg operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur while reading a disc container
#[derive(Error, Debug)]
pub enum CoreError {
    /// I/O error reading from the backing stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not look like any supported container format
    #[error("unrecognized format: {0}")]
    Format(String),

    /// The container is encrypted and no usable password was supplied
    #[error("encrypted and no password available")]
    EncryptedNoPassword,

    /// A supplied or derived password did not validate against the container
    #[error("decryption failed: {0}")]
    Decrypt(String),

    /// Compressed data failed to decompress to the expected size or failed
    /// a stream-integrity check
    #[error("decompression failed: {0}")]
    Decompress(String),

    /// An address or argument was out of range for this fragment/track
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A checksum stored in the container did not match the computed value
    #[error("checksum mismatch: expected {expected:#x}, got {actual:#x}")]
    ChecksumMismatch { expected: u32, actual: u32 },
}
