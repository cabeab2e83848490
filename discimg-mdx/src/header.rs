//! The 512-byte MDX/MDSv2 encryption header: a 64-byte unencrypted salt
//! followed by an encrypted block containing the master AES key and the
//! compressed/decompressed sizes of the descriptor it protects.

use byteorder::{ByteOrder, LittleEndian};

use crate::aes_modes::{self, new_cipher};
use crate::error::{MdxError, Result};
use crate::gf128::{GfElement, Gf64kTable};
use crate::kdf::{self, SALT_SIZE};

/// Offset of `key_data_checksum`, the first field of the encrypted region.
const ENCRYPTED_REGION_OFFSET: usize = SALT_SIZE;
pub const HEADER_SIZE: usize = 512;
// Bytes "TRUE" read as a little-endian u32.
const MAGIC_PATTERN: u32 = 0x4555_5254;
const KEY_DATA_SIZE: usize = 256;
const IV_SIZE: usize = 32;

/// Decoded form of `MDX_EncryptionHeader`, after decryption and endian
/// fix-up.
#[derive(Debug, Clone)]
pub struct EncryptionHeader {
    pub salt: [u8; SALT_SIZE],
    pub key_data_checksum: u32,
    pub key_size: u16,
    /// Concatenated master key material; bytes `[0..32)` are the
    /// deprecated IV/tweak-key slot, `[32..64)` is the AES-256 key used by
    /// whatever this header protects.
    pub key_data: [u8; KEY_DATA_SIZE],
    pub compressed_size: u32,
    pub decompressed_size: u32,
}

impl EncryptionHeader {
    /// IV (main header) / tweak key (data header) slot at the start of
    /// `key_data`.
    pub fn iv(&self) -> [u8; 16] {
        self.key_data[0..16].try_into().unwrap()
    }

    /// AES-256 key protecting whatever follows this header (the
    /// descriptor, or track payload data).
    pub fn aes_key(&self) -> [u8; 32] {
        self.key_data[IV_SIZE..IV_SIZE + 32].try_into().unwrap()
    }
}

/// Parse and decipher a 512-byte encryption header read verbatim from the
/// file. `password` overrides the salt-derived synthetic password when
/// present. `main_header` selects the CBC-with-dewhitening path (true, for
/// the file-level header) vs. the LRW path (false, for a track's data
/// header).
pub fn decipher_header(raw: &[u8; HEADER_SIZE], password: Option<&[u8]>, main_header: bool) -> Result<EncryptionHeader> {
    let salt: [u8; SALT_SIZE] = raw[0..SALT_SIZE].try_into().unwrap();

    let owned_synthetic;
    let password_bytes: &[u8] = match password {
        Some(p) => p,
        None => {
            owned_synthetic = kdf::salt_derived_password(&salt);
            &owned_synthetic
        }
    };

    let master_key = kdf::derive_key(password_bytes, &salt);
    let header_iv: [u8; 16] = master_key[0..16].try_into().unwrap();
    let aes_key: [u8; 32] = master_key[kdf::IV_SIZE..kdf::IV_SIZE + 32].try_into().unwrap();

    let mut encrypted = raw[ENCRYPTED_REGION_OFFSET..].to_vec();
    let cipher = new_cipher(&aes_key);

    if main_header {
        aes_modes::decipher_cbc_dewhitened(&cipher, &mut encrypted, &header_iv)?;
    } else {
        let tweak_key = GfElement(header_iv);
        let table = Gf64kTable::new(&tweak_key);
        aes_modes::decipher_lrw(&cipher, &table, &mut encrypted, 1)?;
    }

    let key_data_checksum = LittleEndian::read_u32(&encrypted[0..4]);
    let magic = LittleEndian::read_u32(&encrypted[4..8]);
    let key_size = LittleEndian::read_u16(&encrypted[10..12]);
    let key_data: [u8; KEY_DATA_SIZE] = encrypted[16..16 + KEY_DATA_SIZE].try_into().unwrap();
    let compressed_size = LittleEndian::read_u32(&encrypted[16 + KEY_DATA_SIZE..20 + KEY_DATA_SIZE]);
    let decompressed_size = LittleEndian::read_u32(&encrypted[20 + KEY_DATA_SIZE..24 + KEY_DATA_SIZE]);

    if magic != MAGIC_PATTERN {
        return Err(MdxError::Decrypt(format!(
            "magic pattern mismatch (expected {MAGIC_PATTERN:#x}, found {magic:#x}) — wrong password?"
        )));
    }
    if key_size as usize != KEY_DATA_SIZE {
        return Err(MdxError::Format(format!(
            "unexpected key data size (expected {KEY_DATA_SIZE:#x}, found {key_size:#x})"
        )));
    }

    // crc32fast computes the same little-endian-native CRC-32 (ISO-HDLC
    // polynomial) the reference implementation gets from libgcrypt after
    // un-doing libgcrypt's own big-endian encoding of the digest; no swap
    // is needed here because byteorder already read key_data_checksum as
    // the little-endian value it is stored as.
    let computed_crc = crc32fast::hash(&key_data);
    if key_data_checksum != computed_crc {
        return Err(MdxError::Decrypt(format!(
            "key data checksum mismatch (computed {computed_crc:#x}, stored {key_data_checksum:#x}) — wrong password?"
        )));
    }

    Ok(EncryptionHeader {
        salt,
        key_data_checksum,
        key_size,
        key_data,
        compressed_size,
        decompressed_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_password_fails_magic_check() {
        let raw = [0u8; HEADER_SIZE];
        let result = decipher_header(&raw, Some(b"wrong password"), true);
        assert!(result.is_err());
    }
}
