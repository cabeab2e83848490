//! BlindWrite `.b6t`/`.bwa` parser: a small fixed-record binary layout
//! describing sessions and tracks, paired with one or more flat data files.
//! Deliberately simple, per spec.md's framing of B6T as a thin
//! external-collaborator format: BlindWrite's full on-disk layout carries a
//! great deal of vendor-specific metadata (CD-Text, disc serials, drive
//! capability blocks) this reader does not attempt to decode; only the
//! records needed to lay out tracks over their data files are read.
//!
//! Grounded structurally on `xara::header`'s fixed-size binary record
//! reader (sequential `byteorder` reads building a plain struct).

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use discimg_core::{Disc, Index, MainFormat, Session, SubchannelFormat, Track};

use crate::error::{FormatsError, Result};
use crate::raw_fragment::RawFragment;

pub const SIGNATURE: &[u8; 4] = b"BWT5";

struct FileHeader {
    track_count: u32,
}

struct TrackRecord {
    number: u8,
    mode: u8, // 0 = audio, 1 = data
    start_lba: u32,
    length: u32,
    data_filename: String,
}

fn read_fixed_string<R: Read>(reader: &mut R, len: usize) -> Result<String> {
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    let end = buf.iter().position(|&b| b == 0).unwrap_or(len);
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}

fn read_header<R: Read>(reader: &mut R) -> Result<FileHeader> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != SIGNATURE {
        return Err(FormatsError::Format("not a BlindWrite .b6t file".into()));
    }
    let _format_version = reader.read_u32::<LittleEndian>()?;
    let track_count = reader.read_u32::<LittleEndian>()?;
    Ok(FileHeader { track_count })
}

fn read_track_record<R: Read>(reader: &mut R) -> Result<TrackRecord> {
    let number = reader.read_u8()?;
    let mode = reader.read_u8()?;
    let _reserved = reader.read_u16::<LittleEndian>()?;
    let start_lba = reader.read_u32::<LittleEndian>()?;
    let length = reader.read_u32::<LittleEndian>()?;
    let data_filename = read_fixed_string(reader, 260)?;
    Ok(TrackRecord { number, mode, start_lba, length, data_filename })
}

/// Open a `.b6t` file and the data file(s) its track records reference
/// (resolved relative to the `.b6t` file's directory).
pub fn open(b6t_path: &Path) -> discimg_core::Result<Disc> {
    open_inner(b6t_path).map_err(Into::into)
}

fn open_inner(b6t_path: &Path) -> Result<Disc> {
    let mut file = File::open(b6t_path)?;
    let header = read_header(&mut file)?;

    let base_dir = b6t_path.parent().unwrap_or_else(|| Path::new("."));
    let mut tracks = Vec::with_capacity(header.track_count as usize);

    for _ in 0..header.track_count {
        let record = read_track_record(&mut file)?;
        let (main_format, sector_size) = if record.mode == 0 { (MainFormat::Audio, 2352) } else { (MainFormat::Data, 2352) };

        let data_path = base_dir.join(&record.data_filename);
        let data_file = File::open(&data_path)?;
        let stream: Box<dyn discimg_core::Stream> = Box::new(data_file);
        let fragment = RawFragment::new(stream, record.start_lba as u64 * sector_size as u64, sector_size, main_format, SubchannelFormat::None, record.length);

        tracks.push(Track {
            number: record.number,
            main_format,
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

/// Check whether `path` begins with the BlindWrite `.b6t` signature.
pub fn probe(path: &Path) -> Result<bool> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_err() {
        return Ok(false);
    }
    file.seek(SeekFrom::Start(0))?;
    Ok(&magic == SIGNATURE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_track_record(buf: &mut Vec<u8>, record: &TrackRecord) {
        buf.push(record.number);
        buf.push(record.mode);
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&record.start_lba.to_le_bytes());
        buf.extend_from_slice(&record.length.to_le_bytes());
        let mut name = record.data_filename.clone().into_bytes();
        name.resize(260, 0);
        buf.extend_from_slice(&name);
    }

    #[test]
    fn parses_a_single_data_track() {
        let dir = tempfile::tempdir().unwrap();
        let data_path = dir.path().join("image.iso");
        File::create(&data_path).unwrap().write_all(&vec![0u8; 2352 * 5]).unwrap();

        let mut buf = Vec::new();
        buf.extend_from_slice(SIGNATURE);
        buf.extend_from_slice(&1u32.to_le_bytes()); // format version
        buf.extend_from_slice(&1u32.to_le_bytes()); // track count
        write_track_record(
            &mut buf,
            &TrackRecord { number: 1, mode: 1, start_lba: 0, length: 5, data_filename: "image.iso".into() },
        );

        let b6t_path = dir.path().join("image.b6t");
        std::fs::write(&b6t_path, &buf).unwrap();

        let disc = open(&b6t_path).unwrap();
        assert_eq!(disc.track_count(), 1);
        assert_eq!(disc.sessions[0].tracks[0].length(), 5);
    }

    #[test]
    fn probe_rejects_non_b6t_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notb6t.bin");
        std::fs::write(&path, b"XXXX").unwrap();
        assert!(!probe(&path).unwrap());
    }
}
