//! Deciphering and decompressing the MDX/MDSv2 descriptor: the structure
//! that replaces the plain MDS descriptor in encrypted images.

use flate2::read::ZlibDecoder;
use std::io::Read;

use crate::aes_modes::{self, new_cipher};
use crate::error::{MdxError, Result};
use crate::header::EncryptionHeader;

/// Deciphers the descriptor's `length` encrypted/compressed bytes pointed
/// to by `header`, then inflates it, returning a buffer with 18 bytes of
/// leading padding (the caller copies the signature/version fields from
/// the file header into this padding, since descriptor offsets are
/// computed as if those 18 bytes were part of it).
pub fn decipher_and_decompress(data: &[u8], header: &EncryptionHeader) -> Result<Vec<u8>> {
    let aes_key = header.aes_key();
    let cipher = new_cipher(&aes_key);
    let iv = header.iv();

    let mut buffer = data.to_vec();

    // De-whitening resets every 512 bytes (TrueCrypt's own block size),
    // so a descriptor longer than that must be deciphered in 512-byte
    // chunks, each restarting from the same header IV.
    let mut offset = 0usize;
    while offset < buffer.len() {
        let end = (offset + 512).min(buffer.len());
        aes_modes::decipher_cbc_dewhitened(&cipher, &mut buffer[offset..end], &iv)?;
        offset = end;
    }

    // zlib tolerates trailing padding bytes in the input, so we can feed
    // it the whole (16-byte-aligned) deciphered buffer rather than having
    // to know the exact compressed length up front.
    let mut out = vec![0u8; 18];
    let mut decoder = ZlibDecoder::new(&buffer[..]);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| MdxError::Decompress(format!("inflate failed: {e}")))?;

    let produced = out.len() - 18;
    if produced != header.decompressed_size as usize {
        return Err(MdxError::Decompress(format!(
            "decompression output length mismatch: expected {}, got {produced}",
            header.decompressed_size
        )));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aes_modes::test_support::encipher_cbc_dewhitened;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    fn build_header(key_data: [u8; 256], compressed_size: u32, decompressed_size: u32) -> EncryptionHeader {
        EncryptionHeader {
            salt: [0u8; crate::kdf::SALT_SIZE],
            key_data_checksum: 0,
            key_size: 256,
            key_data,
            compressed_size,
            decompressed_size,
        }
    }

    #[test]
    fn round_trips_a_small_descriptor() {
        let plaintext = b"hello mdx descriptor, this is the payload";

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(plaintext).unwrap();
        let mut compressed = encoder.finish().unwrap();
        let compressed_size = compressed.len() as u32;

        while compressed.len() % 16 != 0 {
            compressed.push(0);
        }

        let mut key_data = [0u8; 256];
        key_data[0..16].copy_from_slice(&[0x11u8; 16]); // iv
        key_data[16..48].copy_from_slice(&[0x22u8; 32]); // aes key
        let header = build_header(key_data, compressed_size, plaintext.len() as u32);

        let aes_key = header.aes_key();
        let iv = header.iv();
        let cipher = new_cipher(&aes_key);

        let mut on_disk = compressed.clone();
        let mut offset = 0usize;
        while offset < on_disk.len() {
            let end = (offset + 512).min(on_disk.len());
            encipher_cbc_dewhitened(&cipher, &mut on_disk[offset..end], &iv);
            offset = end;
        }

        let result = decipher_and_decompress(&on_disk, &header).unwrap();
        assert_eq!(&result[18..], plaintext);
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let mut key_data = [0u8; 256];
        key_data[0..16].copy_from_slice(&[0x33u8; 16]);
        key_data[16..48].copy_from_slice(&[0x44u8; 32]);
        // decompressed_size deliberately wrong relative to any real payload
        let header = build_header(key_data, 16, 9999);
        let garbage = vec![0u8; 16];
        assert!(decipher_and_decompress(&garbage, &header).is_err());
    }
}
