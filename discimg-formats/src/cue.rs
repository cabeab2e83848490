//! CUE-sheet image parser: `FILE`/`TRACK`/`INDEX` directives over one or
//! more flat data files. Deliberately simple, per spec.md's framing of
//! CUE/CCD/B6T as thin external-collaborator formats: only the directives
//! needed to lay out tracks and indices are recognized, and unsupported
//! directives (`REM`, `CATALOG`, `FLAGS`, ...) are skipped.

use std::fs::File;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use discimg_core::{Disc, Index, MainFormat, Session, SubchannelFormat, Track};

use crate::error::{FormatsError, Result};
use crate::raw_fragment::RawFragment;

/// Sector size in bytes implied by a `TRACK` mode string.
fn sector_size_for_mode(mode: &str) -> Result<(u32, MainFormat)> {
    match mode {
        "AUDIO" => Ok((2352, MainFormat::Audio)),
        "MODE1/2048" => Ok((2048, MainFormat::Data)),
        "MODE1/2352" => Ok((2352, MainFormat::Data)),
        "MODE2/2336" => Ok((2336, MainFormat::Data)),
        "MODE2/2352" => Ok((2352, MainFormat::Data)),
        "CDI/2336" => Ok((2336, MainFormat::Data)),
        "CDI/2352" => Ok((2352, MainFormat::Data)),
        other => Err(FormatsError::Format(format!("unrecognized CUE track mode {other}"))),
    }
}

fn parse_msf(token: &str) -> Result<u32> {
    let parts: Vec<&str> = token.split(':').collect();
    if parts.len() != 3 {
        return Err(FormatsError::Format(format!("malformed MSF timestamp {token}")));
    }
    let m: u8 = parts[0].parse().map_err(|_| FormatsError::Format(format!("bad MSF minute {token}")))?;
    let s: u8 = parts[1].parse().map_err(|_| FormatsError::Format(format!("bad MSF second {token}")))?;
    let f: u8 = parts[2].parse().map_err(|_| FormatsError::Format(format!("bad MSF frame {token}")))?;
    let lba = discimg_core::msf::msf_to_lba(m, s, f);
    Ok(lba.max(0) as u32)
}

struct PendingTrack {
    number: u8,
    mode: String,
    indices: Vec<(u8, u32)>,
}

struct PendingFile {
    path: PathBuf,
    tracks: Vec<PendingTrack>,
}

/// Parse a `.cue` file and build a single-session `Disc` from the `FILE`
/// entries it references (resolved relative to the `.cue` file's directory).
pub fn open(cue_path: &Path) -> discimg_core::Result<Disc> {
    open_inner(cue_path).map_err(Into::into)
}

fn open_inner(cue_path: &Path) -> Result<Disc> {
    let file = File::open(cue_path)?;
    let reader = std::io::BufReader::new(file);
    let base_dir = cue_path.parent().unwrap_or_else(|| Path::new("."));

    let mut files: Vec<PendingFile> = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let (keyword, rest) = trimmed.split_once(char::is_whitespace).unwrap_or((trimmed, ""));
        let rest = rest.trim();

        match keyword.to_ascii_uppercase().as_str() {
            "FILE" => {
                let name = unquote(rest.rsplit_once(char::is_whitespace).map(|(n, _)| n).unwrap_or(rest));
                files.push(PendingFile { path: base_dir.join(name), tracks: Vec::new() });
            }
            "TRACK" => {
                let mut parts = rest.split_whitespace();
                let number: u8 = parts
                    .next()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| FormatsError::Format("TRACK line missing number".into()))?;
                let mode = parts.next().unwrap_or("MODE1/2352").to_string();
                let current = files
                    .last_mut()
                    .ok_or_else(|| FormatsError::Format("TRACK directive before any FILE".into()))?;
                current.tracks.push(PendingTrack { number, mode, indices: Vec::new() });
            }
            "INDEX" => {
                let mut parts = rest.split_whitespace();
                let number: u8 = parts
                    .next()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| FormatsError::Format("INDEX line missing number".into()))?;
                let msf = parts.next().ok_or_else(|| FormatsError::Format("INDEX line missing timestamp".into()))?;
                let lba = parse_msf(msf)?;
                let current_track = files
                    .last_mut()
                    .and_then(|f| f.tracks.last_mut())
                    .ok_or_else(|| FormatsError::Format("INDEX directive before any TRACK".into()))?;
                current_track.indices.push((number, lba));
            }
            _ => {} // REM, CATALOG, FLAGS, PREGAP, POSTGAP, etc. not needed for sector layout.
        }
    }

    let mut tracks = Vec::new();
    for pending_file in &files {
        let file_len = std::fs::metadata(&pending_file.path)?.len();
        let file_handle = File::open(&pending_file.path)?;

        for (i, pending_track) in pending_file.tracks.iter().enumerate() {
            let (sector_size, main_format) = sector_size_for_mode(&pending_track.mode)?;
            let start_lba = pending_track.indices.iter().map(|(_, lba)| *lba).min().unwrap_or(0);
            let next_start = pending_file.tracks.get(i + 1).and_then(|t| t.indices.first()).map(|(_, lba)| *lba);
            let end_byte = next_start.map(|lba| lba as u64 * sector_size as u64).unwrap_or(file_len);
            let start_byte = start_lba as u64 * sector_size as u64;
            let length = ((end_byte.saturating_sub(start_byte)) / sector_size as u64) as u32;

            let stream: Box<dyn discimg_core::Stream> = Box::new(file_handle.try_clone()?);
            let fragment = RawFragment::new(stream, start_byte, sector_size, main_format, SubchannelFormat::None, length);

            let indices = pending_track
                .indices
                .iter()
                .map(|(number, lba)| Index { number: *number, start: lba.saturating_sub(start_lba) })
                .collect();

            tracks.push(Track {
                number: pending_track.number,
                main_format,
                subchannel_format: SubchannelFormat::None,
                fragments: vec![Box::new(fragment)],
                indices,
                isrc: None,
            });
        }
    }

    for track in &mut tracks {
        track.ensure_pregap();
    }

    let mut disc = Disc::new();
    disc.sessions.push(Session { number: 1, tracks, mcn: None, languages: Vec::new() });
    Ok(disc)
}

fn unquote(s: &str) -> String {
    s.trim_matches('"').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_a_two_track_cue_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let bin_path = dir.path().join("image.bin");
        let mut bin = File::create(&bin_path).unwrap();
        bin.write_all(&vec![0u8; 2352 * 20]).unwrap();

        let cue_path = dir.path().join("image.cue");
        std::fs::write(
            &cue_path,
            format!(
                "FILE \"{}\" BINARY\n  TRACK 01 MODE1/2352\n    INDEX 01 00:00:00\n  TRACK 02 AUDIO\n    INDEX 00 00:02:00\n    INDEX 01 00:04:00\n",
                bin_path.file_name().unwrap().to_str().unwrap()
            ),
        )
        .unwrap();

        let disc = open(&cue_path).unwrap();
        assert_eq!(disc.track_count(), 2);
        assert_eq!(disc.sessions[0].tracks[0].number, 1);
        assert_eq!(disc.sessions[0].tracks[1].number, 2);
    }
}
