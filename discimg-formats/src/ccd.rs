//! CloneCD `.ccd`/`.img`/`.sub` parser: a declarative `[Section]`/`key=value`
//! text format describing a CD-ROM TOC, paired with a flat `.img` data file
//! and an optional interleaved-PW96 `.sub` subchannel file. Deliberately
//! simple, per spec.md's framing of CCD as a thin external-collaborator
//! format: only the `[Entry N]` TOC records needed to lay out tracks are
//! read; CD-Text and non-standard CloneCD extensions are ignored.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufRead;
use std::path::Path;

use discimg_core::{Disc, Index, MainFormat, Session, SubchannelFormat, Track};

use crate::error::{FormatsError, Result};
use crate::raw_fragment::RawFragment;

type Section = BTreeMap<String, String>;

fn parse_ini(path: &Path) -> Result<BTreeMap<String, Section>> {
    let file = File::open(path)?;
    let reader = std::io::BufReader::new(file);

    let mut sections = BTreeMap::new();
    let mut current = String::new();

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') {
            continue;
        }
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            current = trimmed[1..trimmed.len() - 1].to_string();
            sections.insert(current.clone(), Section::new());
        } else if let Some((key, value)) = trimmed.split_once('=') {
            sections.entry(current.clone()).or_default().insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    Ok(sections)
}

fn parse_point(value: &str) -> Result<u32> {
    if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|_| FormatsError::Format(format!("bad hex value {value}")))
    } else {
        value.parse().map_err(|_| FormatsError::Format(format!("bad integer value {value}")))
    }
}

fn field<'a>(section: &'a Section, key: &str) -> Result<&'a str> {
    section.get(key).map(String::as_str).ok_or_else(|| FormatsError::Format(format!("missing field {key}")))
}

/// Open a `.ccd` file plus its sibling `.img` (and optional `.sub`).
pub fn open(ccd_path: &Path) -> discimg_core::Result<Disc> {
    open_inner(ccd_path).map_err(Into::into)
}

fn open_inner(ccd_path: &Path) -> Result<Disc> {
    let sections = parse_ini(ccd_path)?;

    let img_path = ccd_path.with_extension("img");
    let sub_path = ccd_path.with_extension("sub");
    let has_subchannel = sub_path.exists();
    let subchannel_format = if has_subchannel { SubchannelFormat::Pw96 } else { SubchannelFormat::None };

    let img_len = std::fs::metadata(&img_path)?.len();
    let img_file = File::open(&img_path)?;
    let sub_file = if has_subchannel { Some(File::open(&sub_path)?) } else { None };

    // Collect real track entries (Point 1..=99), skipping lead-in/lead-out
    // markers (0xA0/0xA1/0xA2), ordered by TOC entry index.
    let mut entries: Vec<(u32, Section)> = sections
        .iter()
        .filter_map(|(name, section)| name.strip_prefix("Entry ").map(|idx| (idx.parse::<u32>().unwrap_or(0), section.clone())))
        .collect();
    entries.sort_by_key(|(idx, _)| *idx);

    struct TrackLayout {
        number: u8,
        mode: u8,
        start_lba: i32,
    }

    let mut layouts = Vec::new();
    for (_, section) in &entries {
        let point = parse_point(field(section, "Point")?)?;
        if !(1..=99).contains(&point) {
            continue;
        }
        let control = parse_point(field(section, "Control")?)?;
        let plba: i32 = field(section, "PLBA")?.parse().map_err(|_| FormatsError::Format("bad PLBA".into()))?;
        let mode = if control & 0x04 != 0 { 1 } else { 0 }; // bit 2 set => data track
        layouts.push(TrackLayout { number: point as u8, mode, start_lba: plba });
    }

    let mut tracks = Vec::new();
    for (i, layout) in layouts.iter().enumerate() {
        let (sector_size, main_format) = if layout.mode != 0 { (2352, MainFormat::Data) } else { (2352, MainFormat::Audio) };
        let next_lba = layouts.get(i + 1).map(|l| l.start_lba);
        let start_byte = layout.start_lba.max(0) as u64 * sector_size as u64;
        let end_byte = next_lba.map(|lba| lba.max(0) as u64 * sector_size as u64).unwrap_or(img_len);
        let length = ((end_byte.saturating_sub(start_byte)) / sector_size as u64) as u32;

        // Subchannel data, when present, lives in an independent `.sub` file:
        // one 96-byte PW96 record per sector, addressed by the same starting
        // LBA as the main-channel `.img` data.
        let main_stream: Box<dyn discimg_core::Stream> = Box::new(img_file.try_clone()?);
        let fragment: Box<dyn discimg_core::Fragment> = if let Some(sub_file) = &sub_file {
            let sub_stream: Box<dyn discimg_core::Stream> = Box::new(sub_file.try_clone()?);
            Box::new(RawFragment::with_separate_subchannel(
                main_stream,
                start_byte,
                sector_size,
                main_format,
                sub_stream,
                layout.start_lba.max(0) as u64 * 96,
                SubchannelFormat::Pw96,
                length,
            ))
        } else {
            Box::new(RawFragment::new(main_stream, start_byte, sector_size, main_format, SubchannelFormat::None, length))
        };

        tracks.push(Track {
            number: layout.number,
            main_format,
            subchannel_format,
            fragments: vec![fragment],
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
    use std::io::Write;

    #[test]
    fn parses_ini_sections_and_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.ccd");
        std::fs::write(&path, "[CloneCD]\nVersion=3\n[Disc]\nSessions=1\n").unwrap();
        let sections = parse_ini(&path).unwrap();
        assert_eq!(sections["CloneCD"]["Version"], "3");
        assert_eq!(sections["Disc"]["Sessions"], "1");
    }

    #[test]
    fn parses_single_track_data_disc() {
        let dir = tempfile::tempdir().unwrap();
        let img_path = dir.path().join("image.img");
        File::create(&img_path).unwrap().write_all(&vec![0u8; 2352 * 10]).unwrap();

        let ccd_path = dir.path().join("image.ccd");
        std::fs::write(
            &ccd_path,
            "[CloneCD]\nVersion=3\n[Disc]\nTocEntries=2\nSessions=1\n\
             [Entry 0]\nSession=1\nPoint=0x01\nControl=0x04\nPLBA=0\n\
             [Entry 1]\nSession=1\nPoint=0xa2\nControl=0x04\nPLBA=10\n",
        )
        .unwrap();

        let disc = open(&ccd_path).unwrap();
        assert_eq!(disc.track_count(), 1);
        assert_eq!(disc.sessions[0].tracks[0].main_format, MainFormat::Data);
    }
}
