//! Backing-stream capability

use std::io::{Read, Seek, SeekFrom};

/// A seekable, readable backing store for a container file.
///
/// Translates the upstream library's dynamic stream object into a plain
/// trait; any `Read + Seek` (a `File`, a `Cursor<Vec<u8>>`, ...) already
/// implements it.
pub trait Stream: Read + Seek {
    /// Total length of the stream in bytes.
    fn stream_len(&mut self) -> std::io::Result<u64> {
        let current = self.stream_position()?;
        let end = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(current))?;
        Ok(end)
    }
}

impl<T: Read + Seek + ?Sized> Stream for T {}
