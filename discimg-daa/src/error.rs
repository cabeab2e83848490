//! Errors specific to the DAA back-end

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DaaError>;

#[derive(Error, Debug)]
pub enum DaaError {
    #[error(transparent)]
    Core(#[from] discimg_core::CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unrecognized DAA layout: {0}")]
    Format(String),

    #[error("image is encrypted and no password was supplied")]
    EncryptedNoPassword,

    #[error("decryption failed: {0}")]
    Decrypt(String),

    #[error("decompression failed: {0}")]
    Decompress(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<DaaError> for discimg_core::CoreError {
    fn from(e: DaaError) -> Self {
        match e {
            DaaError::Core(c) => c,
            DaaError::Io(io) => discimg_core::CoreError::Io(io),
            DaaError::Format(s) => discimg_core::CoreError::Format(s),
            DaaError::EncryptedNoPassword => discimg_core::CoreError::EncryptedNoPassword,
            DaaError::Decrypt(s) => discimg_core::CoreError::Decrypt(s),
            DaaError::Decompress(s) => discimg_core::CoreError::Decompress(s),
            DaaError::InvalidArgument(s) => discimg_core::CoreError::InvalidArgument(s),
        }
    }
}
