//! Disc → Session → Track → Index object model
//!
//! A deliberately small bookkeeping layer: the heavy lifting (decoding
//! sector bytes) lives behind each track's [`crate::fragment::Fragment`]
//! objects. This module only tracks layout: which fragments make up which
//! track, which tracks make up which session, and session/track metadata
//! (MCN, ISRC, language, pregap).

use crate::fragment::Fragment;

/// Coarse guess at the medium type, derived from track count and mode
/// rather than read from an explicit field (most of the formats in scope
/// don't carry one).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediumType {
    Cdrom,
    CdRecordable,
    Dvd,
}

/// One index point within a track (INDEX 00 is the pregap, INDEX 01 the
/// start of user data, by convention).
#[derive(Debug, Clone, Copy)]
pub struct Index {
    pub number: u8,
    /// Address relative to the track's first sector.
    pub start: u32,
}

/// ISO 639-2 language code plus optional free-text fields, as carried by
/// CD-Text blocks in some source formats. Kept intentionally minimal: none
/// of the in-scope container formats store full CD-Text, only a language
/// map.
#[derive(Debug, Clone, Default)]
pub struct Language {
    pub code: [u8; 2],
    pub title: Option<String>,
    pub performer: Option<String>,
}

/// One track: a main-format/subchannel-format pair, an ordered list of
/// fragments supplying its sectors, and its index points.
pub struct Track {
    pub number: u8,
    pub main_format: crate::sector::MainFormat,
    pub subchannel_format: crate::sector::SubchannelFormat,
    pub fragments: Vec<Box<dyn Fragment>>,
    pub indices: Vec<Index>,
    pub isrc: Option<String>,
}

impl Track {
    /// Total sector count across all fragments.
    pub fn length(&self) -> u32 {
        self.fragments.iter().map(|f| f.length()).sum()
    }

    /// Locate the fragment and fragment-relative address covering disc
    /// address `address` (track-relative).
    fn locate(&mut self, address: u32) -> Option<(&mut Box<dyn Fragment>, u32)> {
        let mut remaining = address;
        for fragment in &mut self.fragments {
            let len = fragment.length();
            if remaining < len {
                return Some((fragment, remaining));
            }
            remaining -= len;
        }
        None
    }

    /// Read one sector at a track-relative address.
    pub fn read_sector(&mut self, address: u32) -> crate::error::Result<crate::sector::Sector> {
        let (fragment, local) = self.locate(address).ok_or_else(|| {
            crate::error::CoreError::InvalidArgument(format!(
                "address {address} out of range for track {}",
                self.number
            ))
        })?;
        fragment.read_sector(local)
    }

    /// Synthesize a Red Book 150-sector pregap index (INDEX 00) when the
    /// source format did not provide one explicitly.
    pub fn ensure_pregap(&mut self) {
        if !self.indices.iter().any(|i| i.number == 0) {
            self.indices.insert(0, Index { number: 0, start: 0 });
            for index in self.indices.iter_mut().skip(1) {
                index.start = index.start.max(150);
            }
        }
    }
}

/// One session: an ordered list of tracks plus the session-level medium
/// catalogue number.
pub struct Session {
    pub number: u8,
    pub tracks: Vec<Track>,
    pub mcn: Option<String>,
    pub languages: Vec<Language>,
}

impl Session {
    /// Guess the medium type from track count and data mode: a single
    /// data track is most likely a pressed/recordable CD-ROM image; more
    /// than one session or mixed audio/data tracks still resolve to
    /// `CdRecordable` here, since none of the in-scope formats carry an
    /// explicit DVD flag.
    pub fn guess_medium_type(&self) -> MediumType {
        if self.tracks.len() == 1
            && self.tracks[0].main_format == crate::sector::MainFormat::Data
            && self.tracks[0].subchannel_format == crate::sector::SubchannelFormat::None
        {
            MediumType::Dvd
        } else {
            MediumType::CdRecordable
        }
    }
}

/// Validate a Media Catalogue Number: 13 ASCII digits, format-only (no
/// check digit defined for MCN).
pub fn validate_mcn(mcn: &str) -> bool {
    mcn.len() == 13 && mcn.bytes().all(|b| b.is_ascii_digit())
}

/// Validate an ISRC: 12 characters, `CCOOOYYSSSSS` (country letters,
/// owner alphanumeric, year digits, serial digits), format-only.
pub fn validate_isrc(isrc: &str) -> bool {
    let b = isrc.as_bytes();
    b.len() == 12
        && b[0..2].iter().all(|c| c.is_ascii_alphabetic())
        && b[2..5].iter().all(|c| c.is_ascii_alphanumeric())
        && b[5..7].iter().all(|c| c.is_ascii_digit())
        && b[7..12].iter().all(|c| c.is_ascii_digit())
}

/// A fully parsed disc image: one or more sessions in disc order.
pub struct Disc {
    pub sessions: Vec<Session>,
}

impl Disc {
    pub fn new() -> Self {
        Disc { sessions: Vec::new() }
    }

    pub fn track_count(&self) -> usize {
        self.sessions.iter().map(|s| s.tracks.len()).sum()
    }
}

impl Default for Disc {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mcn_format_validation() {
        assert!(validate_mcn("1234567890123"));
        assert!(!validate_mcn("12345"));
        assert!(!validate_mcn("123456789012A"));
    }

    #[test]
    fn isrc_format_validation() {
        assert!(validate_isrc("USRC17607839"));
        assert!(!validate_isrc("US1C17607839"));
        assert!(!validate_isrc("TOO-SHORT"));
    }
}
