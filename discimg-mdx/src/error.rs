//! Errors specific to the MDX/MDSv2 back-end

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MdxError>;

#[derive(Error, Debug)]
pub enum MdxError {
    #[error(transparent)]
    Core(#[from] discimg_core::CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unrecognized MDX/MDSv2 layout: {0}")]
    Format(String),

    #[error("decryption failed: {0}")]
    Decrypt(String),

    #[error("decompression failed: {0}")]
    Decompress(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<MdxError> for discimg_core::CoreError {
    fn from(e: MdxError) -> Self {
        match e {
            MdxError::Core(c) => c,
            MdxError::Io(io) => discimg_core::CoreError::Io(io),
            MdxError::Format(s) => discimg_core::CoreError::Format(s),
            MdxError::Decrypt(s) => discimg_core::CoreError::Decrypt(s),
            MdxError::Decompress(s) => discimg_core::CoreError::Decompress(s),
            MdxError::InvalidArgument(s) => discimg_core::CoreError::InvalidArgument(s),
        }
    }
}
