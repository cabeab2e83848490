//! Luigi Auriemma's custom shuffle/substitution block cipher, used to
//! obfuscate DAA chunk payloads. Not a real cryptographic cipher: a
//! password-keyed nibble-level permutation table, one per block size
//! 1..=128, applied to successive 128-byte blocks plus a final remainder.

use crate::error::{DaaError, Result};

const MAX_BLOCK_SIZE: usize = 128;

/// All 128 substitution tables (one per block size 1..=128), each sized
/// `2*block_size` entries (one per nibble of the block).
pub struct CryptTable {
    tables: Vec<Vec<u8>>,
}

impl CryptTable {
    /// Build the full table set for `password`, matching `daa_crypt_init`'s
    /// loop over block sizes 1..=128.
    pub fn build(password: &[u8]) -> Self {
        let tables = (1..=MAX_BLOCK_SIZE)
            .map(|size| build_table_for_size(password, size))
            .collect();
        CryptTable { tables }
    }

    /// Apply the block transform in place to successive 128-byte blocks of
    /// `data`, with one final application to the remainder (< 128 bytes),
    /// matching `daa_crypt`. The transform is its own inverse, so this
    /// function both encrypts and decrypts.
    pub fn crypt(&self, data: &mut [u8]) {
        let mut offset = 0;
        while data.len() - offset >= MAX_BLOCK_SIZE {
            let block = &mut data[offset..offset + MAX_BLOCK_SIZE];
            let out = self.transform_block(block, MAX_BLOCK_SIZE);
            block.copy_from_slice(&out);
            offset += MAX_BLOCK_SIZE;
        }

        let remaining = data.len() - offset;
        if remaining > 0 {
            let block = &mut data[offset..];
            let out = self.transform_block(block, remaining);
            block.copy_from_slice(&out);
        }
    }

    /// Scatter the nibbles of `input` (exactly `size` bytes) according to
    /// `tab_size`'s substitution table, matching `daa_crypt_block`.
    fn transform_block(&self, input: &[u8], size: usize) -> Vec<u8> {
        if size == 0 {
            return Vec::new();
        }
        let tab = &self.tables[size - 1];
        let mut out = vec![0u8; size];

        for (i, &byte) in input.iter().enumerate().take(size) {
            let low = byte & 0x0F;
            let t_low = tab[i * 2];
            let low = if t_low & 1 != 0 { low << 4 } else { low };
            out[(t_low >> 1) as usize] |= low;

            let high = byte >> 4;
            let t_high = tab[i * 2 + 1];
            let high = if t_high & 1 != 0 { high << 4 } else { high };
            out[(t_high >> 1) as usize] |= high;
        }

        out
    }
}

/// Compute `tab_n` for block size `size`, per the `<=64` / `>64` branching
/// walk of `daa_crypt_key`.
fn build_table_for_size(password: &[u8], size: usize) -> Vec<u8> {
    let d = (size as i32) * 2;
    let passlen = password.len() as i32;
    let first = *password.first().unwrap_or(&0) as i8 as i32;

    let mut tmp = [0i32; 256];
    for (i, slot) in tmp.iter_mut().enumerate().take(d as usize) {
        *slot = i as i32;
    }
    let mut tab = vec![0u8; d as usize];

    if d <= 64 {
        let mut a = first >> 5;
        if a >= d {
            a = d - 1;
        }
        for c in 0..d {
            let mut s = 0;
            while s != 11 {
                a += 1;
                if a == d {
                    a = 0;
                }
                if tmp[a as usize] != -1 {
                    s += 1;
                }
            }
            tab[c as usize] = a as u8;
            tmp[a as usize] = -1;
        }
        return tab;
    }

    let mut a = first >> 5;
    let b = d - 32;
    tmp[(a + 32) as usize] = -1;
    tab[0] = (a + 32) as u8;
    let mut p = 1usize;

    let mut s = 1;
    while s < b {
        let mut c = 11;
        if (p as i32) < passlen {
            c = password[p] as i32;
            p += 1;
            if c == 0 {
                c = 11;
            }
        }
        let mut i = 0;
        while i != c {
            a += 1;
            if a == d {
                a = 32;
            }
            if tmp[a as usize] != -1 {
                i += 1;
            }
        }
        tmp[a as usize] = -1;
        tab[s as usize] = a as u8;
        s += 1;
    }

    let mut i = first & 7;
    if i == 0 {
        i = 7;
    }

    while s < d {
        let mut c = 0;
        while c != i {
            a += 1;
            if a == d {
                a = 0;
            }
            if tmp[a as usize] != -1 {
                c += 1;
            }
        }
        tmp[a as usize] = -1;
        tab[s as usize] = a as u8;
        s += 1;
    }

    for (i, slot) in tmp.iter_mut().enumerate().take(d as usize) {
        *slot = tab[i] as i32;
    }

    let i3 = first & 24;
    if i3 != 0 {
        let mut a = 0;
        let mut s = 0;
        while s < d {
            let mut c = 0;
            while c != i3 {
                a += 1;
                if a == d {
                    a = 0;
                }
                if tmp[a as usize] != -1 {
                    c += 1;
                }
            }
            let c = tmp[a as usize];
            tmp[a as usize] = -1;
            tab[s as usize] = c as u8;
            s += 1;
        }
    }

    tab
}

/// Validate `password` against the DAA encryption descriptor's stored
/// `daa_key`/`password_crc` pair: derive `pwdkey = transform(daa_key, 128)`
/// using the full 128-table set, and accept iff its CRC-32 matches.
/// Returns the built table set on success (it is reused to decrypt chunk
/// data later).
pub fn validate_password(password: &[u8], daa_key: &[u8; 128], stored_crc: u32) -> Result<CryptTable> {
    let table = CryptTable::build(password);
    let pwdkey = table.transform_block(daa_key, 128);

    let computed = crc32fast::hash(&pwdkey);
    if computed != stored_crc {
        return Err(DaaError::Decrypt("incorrect password".into()));
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crypt_is_self_inverse_for_full_block() {
        let table = CryptTable::build(b"hunter2");
        let original: Vec<u8> = (0..128u32).map(|i| i as u8).collect();
        let mut data = original.clone();
        table.crypt(&mut data);
        assert_ne!(data, original);
        table.crypt(&mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn crypt_is_self_inverse_for_partial_block() {
        let table = CryptTable::build(b"a-different-password");
        let original: Vec<u8> = (0..57u32).map(|i| (i * 3) as u8).collect();
        let mut data = original.clone();
        table.crypt(&mut data);
        assert_ne!(data, original);
        table.crypt(&mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn crypt_is_self_inverse_across_multiple_blocks() {
        let table = CryptTable::build(b"multi-block-password");
        let original: Vec<u8> = (0..300u32).map(|i| (i * 7 % 251) as u8).collect();
        let mut data = original.clone();
        table.crypt(&mut data);
        table.crypt(&mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn wrong_password_fails_validation() {
        let mut daa_key = [0u8; 128];
        for (i, b) in daa_key.iter_mut().enumerate() {
            *b = i as u8;
        }
        let table = CryptTable::build(b"correct horse battery staple");
        let pwdkey = table.transform_block(&daa_key, 128);
        let crc = crc32fast::hash(&pwdkey);

        assert!(validate_password(b"correct horse battery staple", &daa_key, crc).is_ok());
        assert!(validate_password(b"wrong password", &daa_key, crc).is_err());
    }
}
