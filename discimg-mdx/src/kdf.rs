//! Key derivation: PBKDF2-HMAC-RIPEMD160, and the salt-derived
//! ("password-less"/TAGES) synthetic password used when no password was
//! supplied.

use byteorder::{ByteOrder, LittleEndian};
use hmac::Hmac;
use ripemd::Ripemd160;

use discimg_core::crc::edc_crc32;

/// Size of the PKCS#5 salt, in bytes.
pub const SALT_SIZE: usize = 64;
/// Size of the deprecated IV/tweak-key slot at the start of the derived
/// key material.
pub const IV_SIZE: usize = 32;
/// Size of the master AES key slot.
pub const MASTER_KEY_SIZE: usize = 32;
/// Total PBKDF2 output size: IV slot + master key.
pub const DERIVED_KEY_SIZE: usize = IV_SIZE + MASTER_KEY_SIZE;

const PBKDF2_ITERATIONS: u32 = 2000;

/// Derive `DERIVED_KEY_SIZE` bytes of key material from `password` and
/// `salt` using PBKDF2-HMAC-RIPEMD160 with 2000 iterations.
pub fn derive_key(password: &[u8], salt: &[u8; SALT_SIZE]) -> [u8; DERIVED_KEY_SIZE] {
    let mut out = [0u8; DERIVED_KEY_SIZE];
    pbkdf2::pbkdf2::<Hmac<Ripemd160>>(password, salt, PBKDF2_ITERATIONS, &mut out)
        .expect("output buffer length is nonzero");
    out
}

/// Synthesize the password used for descriptor decryption (and, under the
/// TAGES profile, track-data decryption) when none was supplied by the
/// caller, deriving it purely from the salt bytes already present in the
/// encryption header.
pub fn salt_derived_password(salt: &[u8; SALT_SIZE]) -> [u8; SALT_SIZE] {
    let mut words = [0u32; SALT_SIZE / 4];
    LittleEndian::read_u32_into(salt, &mut words);

    let mut buffer = [0u8; SALT_SIZE];
    LittleEndian::write_u32_into(&words, &mut buffer);
    let mut modifier = edc_crc32(&buffer) ^ 0x567372ff;

    for word in words.iter_mut() {
        modifier = modifier.wrapping_mul(0x35e85a6d).wrapping_add(0x1548dce9);
        let mut value = *word ^ modifier ^ 0xec564717;

        // replace every zero octet with 0x5f, byte by byte
        for shift in [0u32, 8, 16, 24] {
            if (value >> shift) & 0xff == 0 {
                value |= 0x5f << shift;
            }
        }

        *word = value;
    }

    let mut out = [0u8; SALT_SIZE];
    LittleEndian::write_u32_into(&words, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salt_derivation_never_leaves_zero_bytes() {
        let salt = [0u8; SALT_SIZE];
        let derived = salt_derived_password(&salt);
        assert!(derived.iter().all(|&b| b != 0));
    }

    #[test]
    fn salt_derivation_is_deterministic() {
        let mut salt = [0u8; SALT_SIZE];
        for (i, b) in salt.iter_mut().enumerate() {
            *b = i as u8;
        }
        assert_eq!(salt_derived_password(&salt), salt_derived_password(&salt));
    }

    #[test]
    fn derive_key_produces_correct_length() {
        let salt = [0x42u8; SALT_SIZE];
        let key = derive_key(b"password", &salt);
        assert_eq!(key.len(), DERIVED_KEY_SIZE);
    }
}
