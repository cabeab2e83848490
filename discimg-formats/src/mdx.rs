//! MDX/MDS-v2 entry point: locates the encryption header, deciphers and
//! inflates the descriptor (`discimg_mdx::descriptor`), and builds a
//! single-session `Disc` with one `MdxFragment` per track.
//!
//! The compression/encryption pipeline up through the flat, 18-byte-prefixed
//! decompressed descriptor buffer is fully specified (§4.3–§4.5); the
//! descriptor body's internal track-list byte layout beyond the already-
//! defined 32-byte `Footer` record is not. This entry point assumes the
//! simplest layout consistent with the rest of the format: a little-endian
//! `u32` track count immediately after the 18-byte prefix, followed by that
//! many `Footer` records, each naming its track data file via
//! `filename_offset` (a null-terminated string, offset relative to the
//! start of the descriptor). Track geometry defaults to 2352-byte raw
//! sectors with no subchannel, matching the common case; a real-world
//! descriptor could extend this record with explicit main/subchannel
//! format fields if needed. Documented as an Open Question decision in
//! DESIGN.md.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use discimg_core::{Disc, Index, MainFormat, Session, SubchannelFormat, Track};
use discimg_mdx::{decipher_header, FileHeader, Footer, TrackCipher, FILE_HEADER_SIZE};

use crate::error::{FormatsError, Result};

const DEFAULT_SECTOR_SIZE: u32 = 2352;

fn read_null_terminated(buf: &[u8], offset: usize) -> String {
    let end = buf[offset..].iter().position(|&b| b == 0).map(|p| offset + p).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[offset..end]).into_owned()
}

/// Open an `.mdx`/`.mds` image (single-file MDX or MDS-v2 multi-file),
/// optionally supplying a password (otherwise the salt-derived fallback is
/// tried first).
pub fn open(path: &Path, password: Option<&str>) -> discimg_core::Result<Disc> {
    open_inner(path, password).map_err(Into::into)
}

fn open_inner(path: &Path, password: Option<&str>) -> Result<Disc> {
    let mut file = File::open(path)?;
    let mut raw_header = [0u8; FILE_HEADER_SIZE];
    file.read_exact(&mut raw_header)?;
    let file_header = FileHeader::parse(&raw_header)?;

    let (descriptor_start, header_offset) = if file_header.is_mds_v2() {
        (FILE_HEADER_SIZE as u64, file_header.encryption_header_offset as u64)
    } else {
        let footer_offset = file.read_u64::<LittleEndian>()?;
        let footer_length = file.read_u64::<LittleEndian>()?;
        let header_offset = footer_offset + footer_length - 64;
        (FILE_HEADER_SIZE as u64 + 16, header_offset)
    };

    let mut raw_encryption_header = [0u8; discimg_mdx::HEADER_SIZE];
    file.seek(SeekFrom::Start(header_offset))?;
    file.read_exact(&mut raw_encryption_header)?;

    let password_bytes = password.map(|p| p.as_bytes().to_vec());
    let encryption_header = decipher_header(&raw_encryption_header, password_bytes.as_deref(), true)?;

    let padded_size = (encryption_header.compressed_size as u64).div_ceil(16) * 16;
    let available = header_offset.saturating_sub(descriptor_start);
    if padded_size > available {
        return Err(FormatsError::Format(format!(
            "descriptor size {padded_size} exceeds available range {available}"
        )));
    }

    file.seek(SeekFrom::Start(descriptor_start))?;
    let mut padded_descriptor = vec![0u8; padded_size as usize];
    file.read_exact(&mut padded_descriptor)?;

    let mut descriptor = discimg_mdx::descriptor::decipher_and_decompress(&padded_descriptor, &encryption_header)?;
    descriptor[0..18].copy_from_slice(&FileHeader::signature_prefix(&raw_header));

    let body = &descriptor[18..];
    if body.len() < 4 {
        return Err(FormatsError::Format("descriptor body too short for a track count".into()));
    }
    let track_count = LittleEndian::read_u32(&body[0..4]) as usize;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tracks = Vec::with_capacity(track_count);
    let mut shared_table = None;

    for i in 0..track_count {
        let record_offset = 4 + i * Footer::SIZE;
        if record_offset + Footer::SIZE > body.len() {
            return Err(FormatsError::Format(format!("descriptor truncated before track {i}'s footer record")));
        }
        let raw_footer: [u8; Footer::SIZE] = body[record_offset..record_offset + Footer::SIZE].try_into().unwrap();
        let footer = Footer::parse(&raw_footer);

        let filename = read_null_terminated(body, footer.filename_offset as usize);
        let track_path = base_dir.join(&filename);
        let track_file = File::open(&track_path)?;
        let stream: Box<dyn discimg_core::Stream> = Box::new(track_file);

        let length = (footer.track_data_length / DEFAULT_SECTOR_SIZE as u64) as u32;
        let cipher = match &shared_table {
            None => {
                let cipher = TrackCipher::new(&encryption_header);
                shared_table = Some(cipher.table().clone());
                cipher
            }
            Some(table) => TrackCipher::with_shared_table(&encryption_header, table),
        };

        let fragment = discimg_mdx::MdxFragment::new(
            stream,
            0,
            DEFAULT_SECTOR_SIZE,
            MainFormat::Data,
            0,
            SubchannelFormat::None,
            length,
            if footer.is_compressed() { Some(&footer) } else { None },
            Some(cipher),
        )?;

        tracks.push(Track {
            number: (i + 1) as u8,
            main_format: MainFormat::Data,
            subchannel_format: SubchannelFormat::None,
            fragments: vec![Box::new(fragment)],
            indices: vec![Index { number: 1, start: 0 }],
            isrc: None,
        });
    }

    for track in &mut tracks {
        track.ensure_pregap();
    }

    let mut disc = Disc::new();
    disc.sessions.push(Session { number: 1, tracks, mcn: None, languages: Vec::new() });
    Ok(disc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_null_terminated_stops_at_nul() {
        let buf = b"track01.mdf\0garbage";
        assert_eq!(read_null_terminated(buf, 0), "track01.mdf");
    }
}
