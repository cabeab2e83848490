//! Process-wide parser dispatch, keyed off each format's signature bytes
//! or file extension when a signature isn't available. Grounded on
//! `dpp::pipeline`'s single dispatch-point style, generalized from its
//! one-format case to several.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use discimg_core::password::PasswordPrompt;
use discimg_core::Disc;

use crate::error::{FormatsError, Result};

/// Which container format a path resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ccd,
    B6t,
    Cue,
    Mds1,
    Mdx,
    Daa,
}

fn read_prefix(path: &Path, len: usize) -> Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut buf = vec![0u8; len];
    let read = file.read(&mut buf)?;
    buf.truncate(read);
    Ok(buf)
}

/// Identify a container format from its signature bytes (falling back to
/// extension for the plain-text CCD/CUE formats, which have none).
pub fn identify(path: &Path) -> discimg_core::Result<Format> {
    identify_inner(path).map_err(Into::into)
}

fn identify_inner(path: &Path) -> Result<Format> {
    let prefix = read_prefix(path, 16)?;

    if prefix.starts_with(discimg_mdx::file_header::MEDIA_DESCRIPTOR.as_slice()) {
        return Ok(Format::Mdx);
    }
    if prefix.as_slice() == discimg_daa::MAIN_SIGNATURE.as_slice() {
        return Ok(Format::Daa);
    }
    if crate::b6t::probe(path)? {
        return Ok(Format::B6t);
    }

    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()) {
        Some(ext) if ext == "ccd" => Ok(Format::Ccd),
        Some(ext) if ext == "cue" => Ok(Format::Cue),
        Some(ext) if ext == "mds" => Ok(Format::Mds1),
        _ => Err(FormatsError::Format(format!("could not identify container format for {}", path.display()))),
    }
}

/// Identify and open `path`, dispatching to the matching format's entry
/// point. `password` is consulted only by MDX/DAA when they carry an
/// encryption layer.
pub fn open(path: &Path, password: &dyn PasswordPrompt) -> discimg_core::Result<Disc> {
    match identify(path)? {
        Format::Ccd => crate::ccd::open(path),
        Format::B6t => crate::b6t::open(path),
        Format::Cue => crate::cue::open(path),
        Format::Mds1 => crate::mds1::open(path),
        Format::Mdx => crate::mdx::open(path, password.prompt("this MDX/MDS image is encrypted").as_deref()),
        Format::Daa => crate::daa::open(path, password),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifies_ccd_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.ccd");
        std::fs::write(&path, "[CloneCD]\nVersion=3\n").unwrap();
        assert_eq!(identify(&path).unwrap(), Format::Ccd);
    }

    #[test]
    fn identifies_daa_by_signature() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.daa");
        let mut data = discimg_daa::MAIN_SIGNATURE.to_vec();
        data.extend_from_slice(&[0u8; 72]);
        std::fs::write(&path, &data).unwrap();
        assert_eq!(identify(&path).unwrap(), Format::Daa);
    }

    #[test]
    fn unrecognized_extension_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.bin");
        std::fs::write(&path, [0u8; 16]).unwrap();
        assert!(identify(&path).is_err());
    }
}
