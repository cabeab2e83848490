//! PowerISO `.daa` entry point: reads the main header and descriptor
//! records, builds the split-volume parts table, parses the chunk
//! directory, validates an encryption password if the image carries one,
//! and assembles a single-track `Disc` backed by one `DaaFragment`.
//!
//! A DAA image has no notion of sessions/subchannel/multiple tracks (§4.6,
//! §4.8): the whole ISO is always one Mode1/2048 data track.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use discimg_core::password::PasswordPrompt;
use discimg_core::{Disc, Index, MainFormat, Session, SubchannelFormat, Track};
use discimg_daa::file_header::{
    DescriptorHeader, EncryptionDescriptor, MainHeader, PartHeader, SplitDescriptor, DESCRIPTOR_ENCRYPTION,
    DESCRIPTOR_PART, DESCRIPTOR_SPLIT, MAIN_HEADER_SIZE, MAIN_SIGNATURE, PART_HEADER_SIZE, PART_SIGNATURE,
};
use discimg_daa::parts::{FilenameScheme, Part};
use discimg_daa::{chunk_table, cipher, DaaFragment};

use crate::error::{FormatsError, Result};

const SECTOR_SIZE: u64 = 2048;

/// Open a (possibly split) `.daa` image, prompting for a password through
/// `prompt` only if an encryption descriptor is present.
pub fn open(daa_path: &Path, prompt: &dyn PasswordPrompt) -> discimg_core::Result<Disc> {
    open_inner(daa_path, prompt).map_err(Into::into)
}

fn open_inner(daa_path: &Path, prompt: &dyn PasswordPrompt) -> Result<Disc> {
    let mut main_file = File::open(daa_path)?;

    let mut signature = [0u8; 16];
    main_file.read_exact(&mut signature)?;
    if &signature != MAIN_SIGNATURE {
        return Err(FormatsError::Format("not a PowerISO .daa file".into()));
    }

    let mut raw_header = [0u8; MAIN_HEADER_SIZE];
    main_file.read_exact(&mut raw_header)?;
    let header = MainHeader::parse(&raw_header)?;

    let mut num_parts = 1u32;
    let mut filename_scheme = None;
    let mut encryption: Option<EncryptionDescriptor> = None;

    let mut cursor = 16 + MAIN_HEADER_SIZE as u64;
    while cursor < header.chunk_table_offset as u64 {
        main_file.seek(SeekFrom::Start(cursor))?;
        let mut raw_record_header = [0u8; DescriptorHeader::SIZE];
        main_file.read_exact(&mut raw_record_header)?;
        let record_header = DescriptorHeader::parse(&raw_record_header);

        let mut payload = vec![0u8; record_header.payload_length as usize];
        main_file.read_exact(&mut payload)?;

        match record_header.kind {
            DESCRIPTOR_SPLIT => {
                let split = SplitDescriptor::parse(&payload);
                num_parts = split.num_parts;
                let slots = (payload.len() as u32).saturating_sub(8) / 5;
                filename_scheme = FilenameScheme::from_slot_count(slots);
            }
            DESCRIPTOR_ENCRYPTION => {
                let raw: [u8; EncryptionDescriptor::SIZE] =
                    payload[..EncryptionDescriptor::SIZE].try_into().map_err(|_| {
                        FormatsError::Format("truncated encryption descriptor".into())
                    })?;
                encryption = Some(EncryptionDescriptor::parse(&raw));
            }
            DESCRIPTOR_PART => {}
            _ => {}
        }

        cursor += DescriptorHeader::SIZE as u64 + record_header.payload_length as u64;
    }

    let main_filename = daa_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| FormatsError::Format("DAA path has no filename".into()))?;
    let base_dir = daa_path.parent().unwrap_or_else(|| Path::new("."));

    let main_len = main_file.metadata()?.len();
    let mut streams: Vec<Box<dyn discimg_core::Stream>> = Vec::with_capacity(num_parts as usize);
    let mut table: Vec<Part> = Vec::with_capacity(num_parts as usize);

    let main_start = 0u64;
    let main_end = main_len - header.chunk_data_offset as u64;
    table.push(Part {
        filename: main_filename.to_string(),
        file_offset: header.chunk_data_offset as u64,
        start: main_start,
        end: main_end,
    });
    streams.push(Box::new(main_file));

    let mut next_start = main_end;
    if num_parts > 1 {
        let scheme = filename_scheme
            .ok_or_else(|| FormatsError::Format("split image has no recognized filename scheme".into()))?;
        for index in 1..num_parts {
            let part_name = scheme.filename_for(main_filename, index);
            let part_path: PathBuf = base_dir.join(&part_name);
            let mut part_file = File::open(&part_path)?;

            let mut part_signature = [0u8; 16];
            part_file.read_exact(&mut part_signature)?;
            if &part_signature != PART_SIGNATURE {
                return Err(FormatsError::Format(format!("{part_name} is not a DAA part file")));
            }
            let mut raw_part_header = [0u8; PART_HEADER_SIZE];
            part_file.read_exact(&mut raw_part_header)?;
            let part_header = PartHeader::parse(&raw_part_header)?;

            let part_len = part_file.metadata()?.len();
            let start = next_start;
            let end = start + (part_len - part_header.chunk_data_offset as u64);
            table.push(Part { filename: part_name, file_offset: part_header.chunk_data_offset as u64, start, end });
            next_start = end;
            streams.push(Box::new(part_file));
        }
    }

    let crypt_table = match &encryption {
        Some(enc) => {
            let password = prompt
                .prompt("this DAA image is encrypted")
                .ok_or(FormatsError::Core(discimg_core::CoreError::EncryptedNoPassword))?;
            Some(cipher::validate_password(password.as_bytes(), &enc.daa_key, enc.password_crc)?)
        }
        None => None,
    };

    let mut chunk_table_raw = vec![0u8; (header.chunk_data_offset - header.chunk_table_offset) as usize];
    streams[0].seek(SeekFrom::Start(header.chunk_table_offset as u64))?;
    streams[0].read_exact(&mut chunk_table_raw)?;
    let chunks = chunk_table::parse(
        &chunk_table_raw,
        header.format_version,
        header.chunk_size,
        header.format2.chunk_table_bit_settings,
    )?;

    let fragment = DaaFragment::new(
        streams,
        table,
        chunks,
        header.chunk_size,
        header.iso_size,
        crypt_table,
        header.format2.lzma_props,
        header.format2.lzma_filter != 0,
    )?;

    let length = (header.iso_size / SECTOR_SIZE) as u32;
    let track = Track {
        number: 1,
        main_format: MainFormat::Data,
        subchannel_format: SubchannelFormat::None,
        fragments: vec![Box::new(fragment)],
        indices: vec![Index { number: 1, start: 0 }],
        isrc: None,
    };

    let mut disc = Disc::new();
    disc.sessions.push(Session { number: 1, tracks: vec![track], mcn: None, languages: Vec::new() });
    Ok(disc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_signature() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.daa");
        std::fs::write(&path, b"not a daa file at all!!!").unwrap();
        let result = open(&path, &discimg_core::password::NoPassword);
        assert!(result.is_err());
    }
}
