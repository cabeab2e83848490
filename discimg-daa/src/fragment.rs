//! `DaaFragment`: decodes sectors out of a DAA chunk-compressed, optionally
//! encrypted, possibly multi-part virtual stream.

use std::io::Read;

use discimg_core::{Fragment, Stream};
use flate2::read::DeflateDecoder;
use xz2::read::XzDecoder;
use xz2::stream::{Filters, LzmaOptions, Stream as XzRawStream};

use crate::chunk_table::{ChunkEntry, Compression};
use crate::cipher::CryptTable;
use crate::error::{DaaError, Result};
use crate::parts::Part;

const SECTOR_SIZE: usize = 2048;

/// A logical, part-stitched byte stream backing a DAA image: `parts` holds
/// one open stream per volume file and `table` the usable byte range each
/// one contributes to the concatenated whole.
struct PartedStream {
    parts: Vec<Box<dyn Stream>>,
    table: Vec<Part>,
}

impl PartedStream {
    /// Read `length` bytes starting at logical `offset`, splicing across
    /// part boundaries as needed (mirrors `mirage_fragment_daa_read_from_stream`).
    fn read_at(&mut self, offset: u64, length: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(length);
        let mut remaining = length as u64;
        let mut cursor = offset;

        while remaining > 0 {
            let part_index = self
                .table
                .iter()
                .position(|p| cursor >= p.start && cursor < p.end)
                .ok_or_else(|| DaaError::InvalidArgument(format!("offset {cursor} outside any part")))?;
            let part = &self.table[part_index];

            let within_part = cursor - part.start;
            let available = part.len() - within_part;
            let chunk_len = remaining.min(available);

            let stream = &mut self.parts[part_index];
            stream
                .seek(std::io::SeekFrom::Start(part.file_offset + within_part))
                .map_err(DaaError::Io)?;
            let mut buf = vec![0u8; chunk_len as usize];
            stream.read_exact(&mut buf).map_err(DaaError::Io)?;
            out.extend_from_slice(&buf);

            cursor += chunk_len;
            remaining -= chunk_len;
        }

        Ok(out)
    }
}

pub struct DaaFragment {
    stream: PartedStream,
    chunks: Vec<ChunkEntry>,
    chunk_size: u32,
    iso_size: u64,
    cipher: Option<CryptTable>,
    lzma_props: [u8; 5],
    lzma_filter: bool,
    cached_chunk_index: Option<usize>,
    cached_chunk: Vec<u8>,
}

impl DaaFragment {
    pub fn new(
        parts: Vec<Box<dyn Stream>>,
        part_table: Vec<Part>,
        chunks: Vec<ChunkEntry>,
        chunk_size: u32,
        iso_size: u64,
        cipher: Option<CryptTable>,
        lzma_props: [u8; 5],
        lzma_filter: bool,
    ) -> Result<Self> {
        if chunk_size == 0 || chunk_size as usize % SECTOR_SIZE != 0 {
            return Err(DaaError::InvalidArgument(format!(
                "chunk size {chunk_size} is not a multiple of {SECTOR_SIZE}"
            )));
        }

        Ok(DaaFragment {
            stream: PartedStream { parts, table: part_table },
            chunks,
            chunk_size,
            iso_size,
            cipher,
            lzma_props,
            lzma_filter,
            cached_chunk_index: None,
            cached_chunk: Vec::new(),
        })
    }

    fn sectors_per_chunk(&self) -> u32 {
        self.chunk_size / SECTOR_SIZE as u32
    }

    fn expected_size(&self, chunk_index: usize) -> u64 {
        if chunk_index + 1 == self.chunks.len() {
            let rem = self.iso_size % self.chunk_size as u64;
            if rem == 0 {
                self.chunk_size as u64
            } else {
                rem
            }
        } else {
            self.chunk_size as u64
        }
    }

    fn ensure_chunk(&mut self, chunk_index: usize) -> Result<()> {
        if self.cached_chunk_index == Some(chunk_index) {
            return Ok(());
        }

        let entry = *self
            .chunks
            .get(chunk_index)
            .ok_or_else(|| DaaError::InvalidArgument(format!("chunk index {chunk_index} out of range")))?;

        let mut raw = self.stream.read_at(entry.offset, entry.length as usize)?;
        if let Some(cipher) = &self.cipher {
            cipher.crypt(&mut raw);
        }

        let expected = self.expected_size(chunk_index) as usize;
        let decoded = match entry.compression {
            Compression::None => {
                raw.truncate(expected.min(raw.len()));
                raw
            }
            Compression::Zlib => {
                let mut out = Vec::with_capacity(expected);
                DeflateDecoder::new(&raw[..])
                    .read_to_end(&mut out)
                    .map_err(|e| DaaError::Decompress(e.to_string()))?;
                out
            }
            Compression::Lzma => {
                let mut out = self.lzma_decompress(&raw, expected)?;
                if self.lzma_filter {
                    crate::bcj::decode(&mut out);
                }
                out
            }
        };

        if decoded.len() != expected {
            return Err(DaaError::Decompress(format!(
                "chunk {chunk_index} decoded to {} bytes, expected {expected}",
                decoded.len()
            )));
        }

        self.cached_chunk = decoded;
        self.cached_chunk_index = Some(chunk_index);
        Ok(())
    }

    /// Decode a raw LZMA1 stream. The chunk holds no properties header of
    /// its own (`chunk_table`'s `+5` already accounts for it in the chunk
    /// length); properties come from the DAA main header's `lzma_props`.
    fn lzma_decompress(&self, raw: &[u8], expected: usize) -> Result<Vec<u8>> {
        let props = &self.lzma_props;

        let mut d = props[0] as u32;
        let lc = d % 9;
        d /= 9;
        let lp = d % 5;
        let pb = d / 5;
        let dict_size = u32::from_le_bytes([props[1], props[2], props[3], props[4]]).max(4096);

        let mut options =
            LzmaOptions::new_preset(6).map_err(|e| DaaError::Decompress(e.to_string()))?;
        options.literal_context_bits(lc);
        options.literal_position_bits(lp);
        options.position_bits(pb);
        options.dict_size(dict_size);

        let mut filters = Filters::new();
        filters.lzma1(&options);

        let xz_stream =
            XzRawStream::new_raw_decoder(&filters).map_err(|e| DaaError::Decompress(e.to_string()))?;
        let mut decoder = XzDecoder::new_stream(raw, xz_stream);
        let mut out = Vec::with_capacity(expected);
        decoder
            .read_to_end(&mut out)
            .map_err(|e| DaaError::Decompress(e.to_string()))?;
        Ok(out)
    }
}

impl Fragment for DaaFragment {
    fn length(&self) -> u32 {
        (self.iso_size / SECTOR_SIZE as u64) as u32
    }

    fn read_main(&mut self, address: u32) -> discimg_core::Result<Vec<u8>> {
        let sectors_per_chunk = self.sectors_per_chunk();
        let chunk_index = (address / sectors_per_chunk) as usize;
        let offset_in_chunk = (address % sectors_per_chunk) as usize * SECTOR_SIZE;

        self.ensure_chunk(chunk_index).map_err(Into::<discimg_core::CoreError>::into)?;
        Ok(self.cached_chunk[offset_in_chunk..offset_in_chunk + SECTOR_SIZE].to_vec())
    }

    fn read_subchannel(&mut self, _address: u32) -> discimg_core::Result<Vec<u8>> {
        // DAA images never carry subchannel data.
        Ok(Vec::new())
    }

    fn has_subchannel(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk_table::Compression;
    use std::io::Cursor;

    fn single_part_fragment(raw_chunks: Vec<u8>, chunk_size: u32, iso_size: u64) -> DaaFragment {
        let len = raw_chunks.len() as u64;
        let parts: Vec<Box<dyn Stream>> = vec![Box::new(Cursor::new(raw_chunks))];
        let table = vec![Part {
            filename: "image.daa".into(),
            file_offset: 0,
            start: 0,
            end: len,
        }];
        let chunks = vec![ChunkEntry {
            offset: 0,
            length: len as u32,
            compression: Compression::None,
        }];
        DaaFragment::new(parts, table, chunks, chunk_size, iso_size, None, [0; 5], false).unwrap()
    }

    #[test]
    fn reads_an_uncompressed_sector() {
        let mut data = vec![0u8; SECTOR_SIZE];
        data[10] = 0xAB;
        let mut fragment = single_part_fragment(data.clone(), SECTOR_SIZE as u32, SECTOR_SIZE as u64);
        let sector = fragment.read_main(0).unwrap();
        assert_eq!(sector, data);
    }

    #[test]
    fn subchannel_is_always_empty() {
        let mut fragment = single_part_fragment(vec![0u8; SECTOR_SIZE], SECTOR_SIZE as u32, SECTOR_SIZE as u64);
        assert!(!fragment.has_subchannel());
        assert_eq!(fragment.read_subchannel(0).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn rejects_chunk_size_not_a_sector_multiple() {
        let parts: Vec<Box<dyn Stream>> = vec![Box::new(Cursor::new(vec![0u8; 16]))];
        let table = vec![Part { filename: "x".into(), file_offset: 0, start: 0, end: 16 }];
        let chunks = vec![];
        assert!(DaaFragment::new(parts, table, chunks, 100, 0, None, [0; 5], false).is_err());
    }
}
