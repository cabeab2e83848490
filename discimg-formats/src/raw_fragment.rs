//! `RawFragment`: a fragment over a flat, uncompressed, unencrypted byte
//! range, as used by every format in this crate except MDX and DAA. Each
//! sector is `main_size + subchannel_size` contiguous bytes in the backing
//! stream, starting at `base_offset`.

use std::io::{Read, Seek, SeekFrom};

use discimg_core::{Fragment, MainFormat, Stream, SubchannelFormat};

/// Where a fragment's subchannel bytes live, if it has any.
enum SubchannelSource {
    /// No subchannel.
    None,
    /// Interleaved into the main stream, immediately after each sector's
    /// main-channel bytes (e.g. a raw `.bin` dump with embedded subchannel).
    Interleaved,
    /// A separate flat file (e.g. CloneCD's `.sub`), one record per sector,
    /// addressed independently of the main stream.
    Separate { stream: Box<dyn Stream>, base_offset: u64 },
}

pub struct RawFragment {
    stream: Box<dyn Stream>,
    base_offset: u64,
    main_size: u32,
    main_format: MainFormat,
    subchannel_size: u32,
    subchannel_format: SubchannelFormat,
    subchannel_source: SubchannelSource,
    length: u32,
}

impl RawFragment {
    /// A fragment whose subchannel, if any, is interleaved in the same
    /// stream immediately after each sector's main-channel bytes.
    pub fn new(
        stream: Box<dyn Stream>,
        base_offset: u64,
        main_size: u32,
        main_format: MainFormat,
        subchannel_format: SubchannelFormat,
        length: u32,
    ) -> Self {
        let subchannel_source = if subchannel_format == SubchannelFormat::None {
            SubchannelSource::None
        } else {
            SubchannelSource::Interleaved
        };
        RawFragment {
            stream,
            base_offset,
            main_size,
            main_format,
            subchannel_size: subchannel_format.size(),
            subchannel_format,
            subchannel_source,
            length,
        }
    }

    /// A fragment whose main and subchannel bytes live in two independent
    /// flat files (CloneCD's `.img`/`.sub` pair), each addressed by sector
    /// number from its own base offset.
    pub fn with_separate_subchannel(
        stream: Box<dyn Stream>,
        base_offset: u64,
        main_size: u32,
        main_format: MainFormat,
        subchannel_stream: Box<dyn Stream>,
        subchannel_base_offset: u64,
        subchannel_format: SubchannelFormat,
        length: u32,
    ) -> Self {
        RawFragment {
            stream,
            base_offset,
            main_size,
            main_format,
            subchannel_size: subchannel_format.size(),
            subchannel_format,
            subchannel_source: SubchannelSource::Separate { stream: subchannel_stream, base_offset: subchannel_base_offset },
            length,
        }
    }

    pub fn main_format(&self) -> MainFormat {
        self.main_format
    }

    fn main_sector_size(&self) -> u32 {
        match self.subchannel_source {
            SubchannelSource::Interleaved => self.main_size + self.subchannel_size,
            _ => self.main_size,
        }
    }

    fn main_offset(&self, address: u32) -> u64 {
        self.base_offset + address as u64 * self.main_sector_size() as u64
    }
}

impl Fragment for RawFragment {
    fn length(&self) -> u32 {
        self.length
    }

    fn read_main(&mut self, address: u32) -> discimg_core::Result<Vec<u8>> {
        let offset = self.main_offset(address);
        self.stream.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; self.main_size as usize];
        self.stream.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn read_subchannel(&mut self, address: u32) -> discimg_core::Result<Vec<u8>> {
        match &mut self.subchannel_source {
            SubchannelSource::None => Ok(Vec::new()),
            SubchannelSource::Interleaved => {
                let offset = self.main_offset(address) + self.main_size as u64;
                self.stream.seek(SeekFrom::Start(offset))?;
                let mut buf = vec![0u8; self.subchannel_size as usize];
                self.stream.read_exact(&mut buf)?;
                Ok(buf)
            }
            SubchannelSource::Separate { stream, base_offset } => {
                let offset = *base_offset + address as u64 * self.subchannel_size as u64;
                stream.seek(SeekFrom::Start(offset))?;
                let mut buf = vec![0u8; self.subchannel_size as usize];
                stream.read_exact(&mut buf)?;
                Ok(buf)
            }
        }
    }

    fn has_subchannel(&self) -> bool {
        self.subchannel_format != SubchannelFormat::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_main_only_sectors() {
        let data: Vec<u8> = (0..2048u32 * 2).map(|i| i as u8).collect();
        let stream: Box<dyn Stream> = Box::new(Cursor::new(data.clone()));
        let mut fragment = RawFragment::new(stream, 0, 2048, MainFormat::Data, SubchannelFormat::None, 2);
        assert_eq!(fragment.read_main(0).unwrap(), data[0..2048]);
        assert_eq!(fragment.read_main(1).unwrap(), data[2048..4096]);
        assert!(!fragment.has_subchannel());
    }

    #[test]
    fn splits_main_and_subchannel() {
        let mut data = vec![0u8; (2352 + 96) * 2];
        data[2352] = 0xAB;
        let stream: Box<dyn Stream> = Box::new(Cursor::new(data));
        let mut fragment = RawFragment::new(stream, 0, 2352, MainFormat::Audio, SubchannelFormat::Pw96, 2);
        let sub = fragment.read_subchannel(0).unwrap();
        assert_eq!(sub.len(), 96);
        assert_eq!(sub[0], 0xAB);
    }
}
