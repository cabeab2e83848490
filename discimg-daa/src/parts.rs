//! Filename-numbering schemes and parts-table construction for split DAA
//! volumes.

/// Which numbering scheme governs subsequent part filenames, chosen by the
/// number of 5-byte slots in the main file's "split" descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilenameScheme {
    /// `volname.part01.daa`, `volname.part02.daa`, ...
    TwoDigit,
    /// `volname.part001.daa`, `volname.part002.daa`, ...
    ThreeDigit,
    /// `volname.daa`, `volname.d00`, `volname.d01`, ...
    ShortExtension,
}

impl FilenameScheme {
    /// Select a scheme from the descriptor payload's slot count
    /// (`payload_size / 5`), per §4.8.
    pub fn from_slot_count(slots: u32) -> Option<Self> {
        match slots {
            99 => Some(FilenameScheme::TwoDigit),
            512 => Some(FilenameScheme::ThreeDigit),
            101 => Some(FilenameScheme::ShortExtension),
            _ => None,
        }
    }

    /// Build the filename for part `index` (0 = the main file itself, never
    /// passed here in practice since the main file's name is known already).
    pub fn filename_for(&self, main_filename: &str, index: u32) -> String {
        if index == 0 {
            return main_filename.to_string();
        }

        match self {
            FilenameScheme::TwoDigit => replace_last_occurrence(main_filename, "01.", &format!("{:02}.", index + 1)),
            FilenameScheme::ThreeDigit => replace_last_occurrence(main_filename, "001.", &format!("{:03}.", index + 1)),
            FilenameScheme::ShortExtension => {
                let mut name = main_filename.to_string();
                let len = name.len();
                if len >= 2 {
                    name.replace_range(len - 2.., &format!("{:02}", index - 1));
                }
                name
            }
        }
    }
}

fn replace_last_occurrence(s: &str, needle: &str, replacement: &str) -> String {
    match s.rfind(needle) {
        Some(pos) => {
            let mut out = s.to_string();
            out.replace_range(pos..pos + needle.len(), replacement);
            out
        }
        None => s.to_string(),
    }
}

/// One part's usable byte range within the concatenated logical stream.
#[derive(Debug, Clone)]
pub struct Part {
    pub filename: String,
    /// Byte offset within the physical file where usable (header-stripped)
    /// data begins.
    pub file_offset: u64,
    /// Start offset of this part's data within the logical stream.
    pub start: u64,
    /// End offset (exclusive) of this part's data within the logical stream.
    pub end: u64,
}

impl Part {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_digit_scheme_substitutes_index() {
        let scheme = FilenameScheme::TwoDigit;
        assert_eq!(scheme.filename_for("image.part01.daa", 1), "image.part02.daa");
        assert_eq!(scheme.filename_for("image.part01.daa", 9), "image.part10.daa");
    }

    #[test]
    fn three_digit_scheme_substitutes_index() {
        let scheme = FilenameScheme::ThreeDigit;
        assert_eq!(scheme.filename_for("image.part001.daa", 1), "image.part002.daa");
    }

    #[test]
    fn short_extension_scheme_replaces_trailing_digits() {
        let scheme = FilenameScheme::ShortExtension;
        assert_eq!(scheme.filename_for("image.daa", 1), "image.d00");
        assert_eq!(scheme.filename_for("image.daa", 2), "image.d01");
    }

    #[test]
    fn slot_counts_map_to_expected_schemes() {
        assert_eq!(FilenameScheme::from_slot_count(99), Some(FilenameScheme::TwoDigit));
        assert_eq!(FilenameScheme::from_slot_count(512), Some(FilenameScheme::ThreeDigit));
        assert_eq!(FilenameScheme::from_slot_count(101), Some(FilenameScheme::ShortExtension));
        assert_eq!(FilenameScheme::from_slot_count(7), None);
    }
}
