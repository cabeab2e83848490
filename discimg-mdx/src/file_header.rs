//! The 48-byte MDX/MDSv2 file header at the start of the file.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{MdxError, Result};

pub const FILE_HEADER_SIZE: usize = 48;
pub const MEDIA_DESCRIPTOR: &[u8; 16] = b"MEDIA DESCRIPTOR";
/// Sentinel `encryption_header_offset` value used by plain (unencrypted)
/// MDX files, which have no file-level encryption header.
pub const NO_ENCRYPTION_HEADER: u32 = 0xFFFF_FFFF;

#[derive(Debug, Clone)]
pub struct FileHeader {
    pub version_major: u8,
    pub version_minor: u8,
    /// Offset to the file-level encryption header, or `NO_ENCRYPTION_HEADER`.
    pub encryption_header_offset: u32,
}

impl FileHeader {
    pub fn parse(raw: &[u8; FILE_HEADER_SIZE]) -> Result<Self> {
        if &raw[0..16] != MEDIA_DESCRIPTOR {
            return Err(MdxError::Format("missing 'MEDIA DESCRIPTOR' signature".into()));
        }
        Ok(FileHeader {
            version_major: raw[16],
            version_minor: raw[17],
            encryption_header_offset: LittleEndian::read_u32(&raw[44..48]),
        })
    }

    /// `true` for an MDS v2 multi-file image, where `encryption_header_offset`
    /// points directly at the encryption header. `false` for an MDX
    /// single-file image, where the header location must instead be
    /// computed from the footer offset/length that follow this header.
    pub fn is_mds_v2(&self) -> bool {
        self.encryption_header_offset != NO_ENCRYPTION_HEADER
    }

    /// First 18 bytes of the raw header: the signature/version prefix the
    /// descriptor-decompression pipeline expects callers to splice onto
    /// the front of the decompressed descriptor.
    pub fn signature_prefix(raw: &[u8; FILE_HEADER_SIZE]) -> [u8; 18] {
        raw[0..18].try_into().unwrap()
    }
}

/// One 32-byte footer block: per-track metadata describing where a
/// track's compression table lives and how sectors are grouped for
/// compression.
#[derive(Debug, Clone)]
pub struct Footer {
    pub filename_offset: u32,
    pub flags: u8,
    pub blocks_in_compression_group: u32,
    pub track_data_length: u64,
    pub compression_table_offset: u64,
}

impl Footer {
    pub const SIZE: usize = 32;

    pub fn parse(raw: &[u8; Self::SIZE]) -> Self {
        Footer {
            filename_offset: LittleEndian::read_u32(&raw[0..4]),
            flags: raw[4],
            blocks_in_compression_group: LittleEndian::read_u32(&raw[12..16]),
            track_data_length: LittleEndian::read_u64(&raw[16..24]),
            compression_table_offset: LittleEndian::read_u64(&raw[24..32]),
        }
    }

    /// Bit 0 of `flags`: whether this track's data is compressed (and
    /// therefore has a compression table to read).
    pub fn is_compressed(&self) -> bool {
        self.flags & 0x01 != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header(offset: u32) -> [u8; FILE_HEADER_SIZE] {
        let mut raw = [0u8; FILE_HEADER_SIZE];
        raw[0..16].copy_from_slice(MEDIA_DESCRIPTOR);
        raw[16] = 2;
        raw[17] = 1;
        LittleEndian::write_u32(&mut raw[44..48], offset);
        raw
    }

    #[test]
    fn parses_version_and_layout_kind() {
        let raw = sample_header(0x1000);
        let header = FileHeader::parse(&raw).unwrap();
        assert_eq!((header.version_major, header.version_minor), (2, 1));
        assert!(header.is_mds_v2());
    }

    #[test]
    fn single_file_sentinel_is_recognized() {
        let raw = sample_header(NO_ENCRYPTION_HEADER);
        let header = FileHeader::parse(&raw).unwrap();
        assert!(!header.is_mds_v2());
    }

    #[test]
    fn rejects_bad_signature() {
        let mut raw = sample_header(0);
        raw[0] = b'X';
        assert!(FileHeader::parse(&raw).is_err());
    }
}
