//! MDX / MDSv2 encrypted, compressed disc container back-end.
//!
//! Ties together four layers: the 48-byte file header, an optional
//! 512-byte encryption header (AES-256 CBC-with-dewhitening over a
//! PBKDF2-HMAC-RIPEMD160-derived key), a zlib-compressed descriptor that
//! replaces the plain MDS descriptor, and the per-track
//! [`fragment::MdxFragment`] that decodes compressed/encrypted sector
//! payloads on demand.

pub mod aes_modes;
pub mod descriptor;
pub mod error;
pub mod file_header;
pub mod fragment;
pub mod gf128;
pub mod header;
pub mod kdf;

pub use error::{MdxError, Result};
pub use file_header::{FileHeader, Footer, FILE_HEADER_SIZE, NO_ENCRYPTION_HEADER};
pub use fragment::{MdxFragment, TrackCipher};
pub use gf128::{GfElement, Gf64kTable};
pub use header::{decipher_header, EncryptionHeader, HEADER_SIZE};
