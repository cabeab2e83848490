//! CCD/B6T/CUE/MDS-v1 parsers and the MDX/DAA entry points, built on
//! `discimg-core`'s `Disc`/`Session`/`Track`/`Fragment` object model.
//!
//! Every format here is a thin front-end: CCD, B6T, CUE and MDS-v1 read a
//! flat, uncompressed, unencrypted track layout (via [`raw_fragment::RawFragment`]);
//! MDX and DAA delegate the heavy lifting to `discimg-mdx` and `discimg-daa`
//! and only assemble their descriptors/headers into a `Disc`.

pub mod b6t;
pub mod ccd;
pub mod cue;
pub mod daa;
pub mod error;
pub mod mds1;
pub mod mdx;
pub mod raw_fragment;
pub mod registry;

pub use error::{FormatsError, Result};
pub use raw_fragment::RawFragment;
pub use registry::{identify, open, Format};
