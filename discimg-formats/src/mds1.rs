//! DaemonTools v1 `.mds`+`.mdf` parser: the pre-encryption fixed-record MDS
//! layout (no compression, no per-track encryption — those arrived with
//! MDS v2/MDX). Deliberately simple, matching spec.md's framing of MDS v1
//! as a thin external-collaborator format alongside CCD/B6T/CUE.
//!
//! Grounded structurally on `xara::header`'s fixed-size binary record
//! reader.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use discimg_core::{Disc, Index, MainFormat, Session, SubchannelFormat, Track};

use crate::error::{FormatsError, Result};
use crate::raw_fragment::RawFragment;

pub const SIGNATURE: &[u8; 16] = b"MEDIA DESCRIPTOR";

struct FileHeader {
    track_count: u8,
    first_track_offset: u32,
}

struct TrackEntry {
    number: u8,
    mode: u8,
    subchannel_mode: u8,
    start_lba: u32,
    length: u32,
    data_offset: u32,
}

fn read_header(file: &mut File) -> Result<FileHeader> {
    let mut magic = [0u8; 16];
    file.read_exact(&mut magic)?;
    if &magic != SIGNATURE {
        return Err(FormatsError::Format("not a DaemonTools v1 .mds file".into()));
    }
    let _version = (file.read_u8()?, file.read_u8()?);
    let _medium_type = file.read_u16::<LittleEndian>()?;
    let _session_count = file.read_u16::<LittleEndian>()?;
    let _reserved = file.read_u16::<LittleEndian>()?;
    let _bca_len = file.read_u16::<LittleEndian>()?;
    let _bca_data_offset = file.read_u32::<LittleEndian>()?;
    let _disc_struct_offset = file.read_u32::<LittleEndian>()?;
    let _reserved2 = file.read_u64::<LittleEndian>()?;
    let _session_block_offset = file.read_u32::<LittleEndian>()?;
    let _dpm_block_offset = file.read_u32::<LittleEndian>()?;

    // Session block: track_count/track_block_offset among its fields.
    let track_count = file.read_u8()?;
    let _first_track = file.read_u8()?;
    let _last_track = file.read_u8()?;
    let _session_reserved = file.read_u8()?;
    let _session_number = file.read_u16::<LittleEndian>()?;
    let _session_reserved2 = file.read_u16::<LittleEndian>()?;
    let first_track_offset = file.read_u32::<LittleEndian>()?;

    Ok(FileHeader { track_count, first_track_offset })
}

fn read_track_entry(file: &mut File) -> Result<TrackEntry> {
    let mode = file.read_u8()?;
    let subchannel_mode = file.read_u8()?;
    let _adr_ctl = file.read_u8()?;
    let _reserved = file.read_u8()?;
    let number = file.read_u8()?;
    let _point = file.read_u8()?;
    let _reserved2 = file.read_u16::<LittleEndian>()?;
    let _amin_asec_aframe = file.read_u32::<LittleEndian>()?;
    let start_lba = file.read_u32::<LittleEndian>()?;
    let data_offset = file.read_u32::<LittleEndian>()?;
    let length = file.read_u32::<LittleEndian>()?;
    Ok(TrackEntry { number, mode, subchannel_mode, start_lba, length, data_offset })
}

fn track_mode_layout(mode: u8, subchannel_mode: u8) -> (MainFormat, u32, SubchannelFormat) {
    let main_format = match mode {
        0xA9 => MainFormat::Audio,
        _ => MainFormat::Data,
    };
    let subchannel_format = match subchannel_mode {
        0 => SubchannelFormat::None,
        _ => SubchannelFormat::Pw96,
    };
    (main_format, 2352, subchannel_format)
}

/// Open a `.mds` file plus the `.mdf` data file(s) its track entries point
/// into (resolved relative to the `.mds` file's directory, defaulting to
/// the same base name with a `.mdf` extension).
pub fn open(mds_path: &Path) -> discimg_core::Result<Disc> {
    open_inner(mds_path).map_err(Into::into)
}

fn open_inner(mds_path: &Path) -> Result<Disc> {
    let mut file = File::open(mds_path)?;
    let header = read_header(&mut file)?;

    let mdf_path = mds_path.with_extension("mdf");
    let mdf_file = File::open(&mdf_path)?;

    file.seek(std::io::SeekFrom::Start(header.first_track_offset as u64))?;
    let mut tracks = Vec::with_capacity(header.track_count as usize);

    for _ in 0..header.track_count {
        let entry = read_track_entry(&mut file)?;
        let (main_format, sector_size, subchannel_format) = track_mode_layout(entry.mode, entry.subchannel_mode);

        let stream: Box<dyn discimg_core::Stream> = Box::new(mdf_file.try_clone()?);
        let fragment = RawFragment::new(stream, entry.data_offset as u64, sector_size, main_format, subchannel_format, entry.length);

        tracks.push(Track {
            number: entry.number,
            main_format,
            subchannel_format,
            fragments: vec![Box::new(fragment)],
            indices: vec![Index { number: 1, start: 0 }],
            isrc: None,
        });
        let _ = entry.start_lba; // absolute disc LBA, not needed for fragment-relative addressing
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
    fn track_mode_layout_maps_audio_and_data() {
        let (format, size, sub) = track_mode_layout(0xA9, 0);
        assert_eq!(format, MainFormat::Audio);
        assert_eq!(size, 2352);
        assert_eq!(sub, SubchannelFormat::None);

        let (format, _, sub) = track_mode_layout(0x00, 1);
        assert_eq!(format, MainFormat::Data);
        assert_eq!(sub, SubchannelFormat::Pw96);
    }

    #[test]
    fn rejects_bad_signature() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.mds");
        std::fs::write(&path, b"not an mds file at all!").unwrap();
        let mut file = File::open(&path).unwrap();
        assert!(read_header(&mut file).is_err());
    }
}
