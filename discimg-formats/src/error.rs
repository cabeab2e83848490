//! Parsing errors specific to the container front-ends in this crate.
//!
//! Every public entry point (`ccd::open`, `cue::open`, `b6t::open`,
//! `mds1::open`, `mdx::open`, `daa::open`) returns `discimg_core::Result`
//! instead of this type directly: callers deal with one uniform error type
//! no matter which container format they opened, matching the crate's
//! "uniform object model" framing. `FormatsError` exists as the local
//! working error type during parsing and converts into `CoreError` at the
//! boundary.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FormatsError>;

#[derive(Error, Debug)]
pub enum FormatsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Core(#[from] discimg_core::CoreError),

    #[error("{0}")]
    Mdx(#[from] discimg_mdx::MdxError),

    #[error("{0}")]
    Daa(#[from] discimg_daa::DaaError),

    #[error("unrecognized format: {0}")]
    Format(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<FormatsError> for discimg_core::CoreError {
    fn from(e: FormatsError) -> Self {
        match e {
            FormatsError::Io(io) => discimg_core::CoreError::Io(io),
            FormatsError::Core(c) => c,
            FormatsError::Mdx(m) => m.into(),
            FormatsError::Daa(d) => d.into(),
            FormatsError::Format(s) => discimg_core::CoreError::Format(s),
            FormatsError::InvalidArgument(s) => discimg_core::CoreError::InvalidArgument(s),
        }
    }
}
