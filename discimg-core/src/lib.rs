//! Shared object model and primitives for optical disc container readers.
//!
//! This crate has no knowledge of any specific container file format; it
//! defines the `Stream`/`Fragment` capabilities every format-specific crate
//! implements, the `Disc`/`Session`/`Track` bookkeeping those fragments get
//! assembled into, and the CD-ROM-level helpers (MSF conversion, subchannel
//! interleave, the EDC CRC table) that more than one format needs.

pub mod crc;
pub mod disc;
pub mod error;
pub mod fragment;
pub mod msf;
pub mod password;
pub mod sector;
pub mod stream;
pub mod subchannel;

pub use disc::{Disc, Index, Language, MediumType, Session, Track};
pub use error::{CoreError, Result};
pub use fragment::Fragment;
pub use password::{NoPassword, PasswordPrompt};
pub use sector::{MainFormat, Sector, SubchannelFormat};
pub use stream::Stream;
