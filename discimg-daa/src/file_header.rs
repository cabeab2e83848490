//! DAA main-file and part-file headers, and the descriptor records that
//! follow the main header.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{DaaError, Result};

pub const MAIN_SIGNATURE: &[u8; 16] = b"DAA\0\0\0\0\0\0\0\0\0\0\0\0\0";
pub const PART_SIGNATURE: &[u8; 16] = b"DAA VOL\0\0\0\0\0\0\0\0\0";

pub const MAIN_HEADER_SIZE: usize = 72;
const FORMAT2_SUBHEADER_SIZE: usize = 16;

/// Format-2 (0x110) subheader embedded at the end of both main and part
/// headers.
#[derive(Debug, Clone, Copy)]
pub struct Format2Header {
    pub profile: u8,
    pub chunk_table_bit_settings: u8,
    pub lzma_filter: u8,
    pub lzma_props: [u8; 5],
}

fn parse_format2(raw: &[u8]) -> Format2Header {
    Format2Header {
        profile: raw[0],
        // bytes [1..5) are `chunk_table_compressed`, unused by the reader.
        chunk_table_bit_settings: raw[5],
        lzma_filter: raw[6],
        lzma_props: raw[7..12].try_into().unwrap(),
        // raw[12..16) is reserved.
    }
}

#[derive(Debug, Clone)]
pub struct MainHeader {
    pub chunk_table_offset: u32,
    pub format_version: u32,
    pub chunk_data_offset: u32,
    pub chunk_size: u32,
    pub iso_size: u64,
    pub daa_size: u64,
    pub format2: Format2Header,
}

impl MainHeader {
    /// Parse the 72-byte main header (following the 16-byte `"DAA"`
    /// signature) and verify its trailing CRC-32, computed over the
    /// preceding 68 bytes.
    pub fn parse(raw: &[u8; MAIN_HEADER_SIZE]) -> Result<Self> {
        let crc = crc32fast::hash(&raw[0..MAIN_HEADER_SIZE - 4]);
        let stored_crc = LittleEndian::read_u32(&raw[MAIN_HEADER_SIZE - 4..]);
        if crc != stored_crc {
            return Err(DaaError::Format(format!(
                "main header CRC-32 mismatch (computed {crc:#x}, stored {stored_crc:#x})"
            )));
        }

        let chunk_table_offset = LittleEndian::read_u32(&raw[0..4]);
        let format_version = LittleEndian::read_u32(&raw[4..8]);
        let mut chunk_data_offset = LittleEndian::read_u32(&raw[8..12]);
        let mut chunk_size = LittleEndian::read_u32(&raw[20..24]);
        let iso_size = LittleEndian::read_u64(&raw[24..32]);
        let daa_size = LittleEndian::read_u64(&raw[32..40]);
        let format2 = parse_format2(&raw[40..40 + FORMAT2_SUBHEADER_SIZE]);

        if format_version == crate::chunk_table::FORMAT_VERSION_2 {
            chunk_data_offset &= 0x00FF_FFFF;
            chunk_size = (chunk_size & 0x0000_0FFF) << 14;
        }

        Ok(MainHeader {
            chunk_table_offset,
            format_version,
            chunk_data_offset,
            chunk_size,
            iso_size,
            daa_size,
            format2,
        })
    }
}

pub const PART_HEADER_SIZE: usize = 36;

#[derive(Debug, Clone)]
pub struct PartHeader {
    pub chunk_data_offset: u32,
    pub format2: Format2Header,
}

impl PartHeader {
    pub fn parse(raw: &[u8; PART_HEADER_SIZE]) -> Result<Self> {
        let crc = crc32fast::hash(&raw[0..PART_HEADER_SIZE - 4]);
        let stored_crc = LittleEndian::read_u32(&raw[PART_HEADER_SIZE - 4..]);
        if crc != stored_crc {
            return Err(DaaError::Format(format!(
                "part header CRC-32 mismatch (computed {crc:#x}, stored {stored_crc:#x})"
            )));
        }

        let mut chunk_data_offset = LittleEndian::read_u32(&raw[0..4]);
        chunk_data_offset &= 0x00FF_FFFF;
        let format2 = parse_format2(&raw[4..4 + FORMAT2_SUBHEADER_SIZE]);

        Ok(PartHeader { chunk_data_offset, format2 })
    }
}

/// Descriptor record types recognized between the main header and the
/// chunk table.
pub const DESCRIPTOR_PART: u32 = 1;
pub const DESCRIPTOR_SPLIT: u32 = 2;
pub const DESCRIPTOR_ENCRYPTION: u32 = 3;

#[derive(Debug, Clone, Copy)]
pub struct DescriptorHeader {
    pub kind: u32,
    /// Payload length, already adjusted to exclude the 8-byte type/length
    /// prefix itself.
    pub payload_length: u32,
}

impl DescriptorHeader {
    pub const SIZE: usize = 8;

    pub fn parse(raw: &[u8; Self::SIZE]) -> Self {
        DescriptorHeader {
            kind: LittleEndian::read_u32(&raw[0..4]),
            payload_length: LittleEndian::read_u32(&raw[4..8]).saturating_sub(8),
        }
    }
}

/// Split/filename-layout descriptor payload: `num_parts` followed by a
/// block of 5-byte part-size slots whose count selects the filename scheme.
#[derive(Debug, Clone, Copy)]
pub struct SplitDescriptor {
    pub num_parts: u32,
}

impl SplitDescriptor {
    pub fn parse(raw: &[u8]) -> Self {
        SplitDescriptor {
            num_parts: LittleEndian::read_u32(&raw[0..4]),
            // raw[4..8) is an always-1 reserved field.
        }
    }
}

/// Encryption descriptor payload: type, 128-byte `daa_key`, password CRC.
#[derive(Debug, Clone)]
pub struct EncryptionDescriptor {
    pub encryption_type: u32,
    pub daa_key: [u8; 128],
    pub password_crc: u32,
}

impl EncryptionDescriptor {
    pub const SIZE: usize = 4 + 128 + 4;

    pub fn parse(raw: &[u8; Self::SIZE]) -> Self {
        EncryptionDescriptor {
            encryption_type: LittleEndian::read_u32(&raw[0..4]),
            daa_key: raw[4..132].try_into().unwrap(),
            password_crc: LittleEndian::read_u32(&raw[132..136]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_main_header() -> [u8; MAIN_HEADER_SIZE] {
        let mut raw = [0u8; MAIN_HEADER_SIZE];
        LittleEndian::write_u32(&mut raw[0..4], 0x100);
        LittleEndian::write_u32(&mut raw[4..8], crate::chunk_table::FORMAT_VERSION_1);
        LittleEndian::write_u32(&mut raw[8..12], 0x200);
        LittleEndian::write_u32(&mut raw[20..24], 2048 * 16);
        LittleEndian::write_u64(&mut raw[24..32], 2048 * 32);
        LittleEndian::write_u64(&mut raw[32..40], 1024);
        let crc = crc32fast::hash(&raw[0..MAIN_HEADER_SIZE - 4]);
        LittleEndian::write_u32(&mut raw[MAIN_HEADER_SIZE - 4..], crc);
        raw
    }

    #[test]
    fn parses_a_valid_main_header() {
        let raw = sample_main_header();
        let header = MainHeader::parse(&raw).unwrap();
        assert_eq!(header.chunk_table_offset, 0x100);
        assert_eq!(header.chunk_data_offset, 0x200);
        assert_eq!(header.chunk_size, 2048 * 16);
        assert_eq!(header.iso_size, 2048 * 32);
    }

    #[test]
    fn rejects_bad_crc() {
        let mut raw = sample_main_header();
        raw[0] ^= 0xFF;
        assert!(MainHeader::parse(&raw).is_err());
    }

    #[test]
    fn format_version_2_unpacks_offset_and_size() {
        let mut raw = [0u8; MAIN_HEADER_SIZE];
        LittleEndian::write_u32(&mut raw[4..8], crate::chunk_table::FORMAT_VERSION_2);
        LittleEndian::write_u32(&mut raw[8..12], 0x01FF_FFFF);
        LittleEndian::write_u32(&mut raw[20..24], 0xABCD_0003);
        let crc = crc32fast::hash(&raw[0..MAIN_HEADER_SIZE - 4]);
        LittleEndian::write_u32(&mut raw[MAIN_HEADER_SIZE - 4..], crc);

        let header = MainHeader::parse(&raw).unwrap();
        assert_eq!(header.chunk_data_offset, 0x00FF_FFFF);
        assert_eq!(header.chunk_size, 0x003 << 14);
    }
}
