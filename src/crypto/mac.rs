//! ISO/IEC 9797-1 MAC Algorithm 3 ("Retail-MAC"), DES block, zero IV. See
//! spec §4.2.

use super::des::{single_des, Operation};
use crate::error::CryptoError;

/// Computes the 8-byte Retail-MAC of `data` under a 16-byte key.
///
/// 1. ISO/IEC 9797-1 Method 2 padding: append `0x80`, zero-fill to an
///    8-byte boundary.
/// 2. CBC-DES under the left 8 bytes of the key over all but the last
///    block.
/// 3. Final block: DES-decrypt under the right 8 bytes of the key,
///    DES-encrypt under the left 8 bytes.
pub fn retail_mac(data: &[u8], key: &[u8; 16]) -> [u8; 8] {
    let (k1, k2) = key.split_at(8);
    let mut padded = data.to_vec();
    padded.push(0x80);
    while !padded.len().is_multiple_of(8) {
        padded.push(0x00);
    }

    let mut chain = [0u8; 8];
    for block in padded.chunks(8) {
        let mut xored = [0u8; 8];
        for i in 0..8 {
            xored[i] = chain[i] ^ block[i];
        }
        chain = single_des(&xored, k1, Operation::Encrypt).expect("8-byte block, 8-byte key");
    }

    let decrypted = single_des(&chain, k2, Operation::Decrypt).expect("8-byte block, 8-byte key");
    single_des(&decrypted, k1, Operation::Encrypt).expect("8-byte block, 8-byte key")
}

/// Fallible entry point taking a key slice, for call sites that only have a
/// `&[u8]` in hand (e.g. freshly parsed from card data).
pub fn retail_mac_slice(data: &[u8], key: &[u8]) -> Result<[u8; 8], CryptoError> {
    let key: [u8; 16] = key.try_into().map_err(|_| CryptoError::InvalidKeyLength)?;
    Ok(retail_mac(data, &key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn deterministic_and_eight_bytes() {
        let key = hex!("0102030405060708090A0B0C0D0E0F10");
        let data = [0x01, 0x02, 0x03, 0x04];
        let mac1 = retail_mac(&data, &key);
        let mac2 = retail_mac(&data, &key);
        assert_eq!(mac1, mac2);
        assert_eq!(mac1.len(), 8);
    }

    #[test]
    fn different_data_different_mac() {
        let key = hex!("0102030405060708090A0B0C0D0E0F10");
        let mac_a = retail_mac(&[0x01, 0x02, 0x03, 0x04], &key);
        let mac_b = retail_mac(&[0x05, 0x06, 0x07, 0x08], &key);
        assert_ne!(mac_a, mac_b);
    }

    #[test]
    fn empty_data_is_accepted() {
        let key = [0x11u8; 16];
        let mac = retail_mac(&[], &key);
        assert_eq!(mac.len(), 8);
    }
}
