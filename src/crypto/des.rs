//! Single-DES ECB one-block operation and two-key Triple-DES CBC, as
//! required by spec §4.2.

use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit};
use des::{Des, TdesEde2};

use crate::error::CryptoError;

/// Direction of a block cipher operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Encrypt,
    Decrypt,
}

/// Encrypts or decrypts exactly one 8-byte block with single DES under an
/// 8-byte key. Used only by the Retail-MAC final transformation (spec
/// §4.2's step 3).
pub fn single_des(block: &[u8], key: &[u8], op: Operation) -> Result<[u8; 8], CryptoError> {
    if key.len() != 8 {
        return Err(CryptoError::InvalidKeyLength);
    }
    if block.len() != 8 {
        return Err(CryptoError::InvalidDataLength);
    }
    let cipher = Des::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(block);
    let generic = cbc::cipher::generic_array::GenericArray::from_mut_slice(&mut buf);
    match op {
        Operation::Encrypt => cbc::cipher::BlockEncrypt::encrypt_block(&cipher, generic),
        Operation::Decrypt => cbc::cipher::BlockDecrypt::decrypt_block(&cipher, generic),
    }
    Ok(buf)
}

type TdesCbcEnc = cbc::Encryptor<TdesEde2>;
type TdesCbcDec = cbc::Decryptor<TdesEde2>;

/// Two-key Triple-DES (EDE) in CBC mode with a zero IV.
///
/// * `key` must be 16 bytes.
/// * On encrypt: if `data.len() % 8 != 0` (including empty input), the data
///   is PKCS#7-padded before encryption; an already block-aligned input is
///   encrypted verbatim, with no trailing padding block added. This
///   asymmetry matches the card protocol, which uses ISO/IEC 7816-4 padding
///   on SM payloads and strips it itself (see [`crate::sm`]).
/// * On decrypt: the output length always equals the ciphertext length; no
///   padding is stripped.
pub fn tdes(data: &[u8], key: &[u8], op: Operation) -> Result<Vec<u8>, CryptoError> {
    if key.len() != 16 {
        return Err(CryptoError::InvalidKeyLength);
    }
    let iv = [0u8; 8];
    match op {
        Operation::Encrypt => {
            let enc = TdesCbcEnc::new_from_slices(key, &iv)
                .map_err(|_| CryptoError::InvalidKeyLength)?;
            if data.len().is_multiple_of(8) {
                let mut buf = data.to_vec();
                enc.encrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(
                    &mut buf,
                    data.len(),
                )
                .map_err(|_| CryptoError::CipherFailure)?;
                Ok(buf)
            } else {
                Ok(enc.encrypt_padded_vec_mut::<Pkcs7>(data))
            }
        }
        Operation::Decrypt => {
            if !data.len().is_multiple_of(8) {
                return Err(CryptoError::InvalidDataLength);
            }
            let dec = TdesCbcDec::new_from_slices(key, &iv)
                .map_err(|_| CryptoError::InvalidKeyLength)?;
            let mut buf = data.to_vec();
            let len = dec
                .decrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buf)
                .map_err(|_| CryptoError::CipherFailure)?
                .len();
            buf.truncate(len);
            Ok(buf)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn tdes_round_trip_block_aligned() {
        let key = hex!("0123456789ABCDEF FEDCBA9876543210");
        let plaintext = hex!("00112233445566778899AABBCCDDEEFF0011223344556677");
        let ct = tdes(&plaintext, &key, Operation::Encrypt).unwrap();
        assert_eq!(ct.len(), plaintext.len());
        let pt = tdes(&ct, &key, Operation::Decrypt).unwrap();
        assert_eq!(pt, plaintext);
    }

    #[test]
    fn tdes_pads_non_aligned_input() {
        let key = [0x42u8; 16];
        let data = b"not a multiple of eight";
        let ct = tdes(data, &key, Operation::Encrypt).unwrap();
        assert_eq!(ct.len() % 8, 0);
        assert!(ct.len() > data.len());
    }

    #[test]
    fn tdes_rejects_short_key() {
        let key = [0u8; 8];
        assert_eq!(
            tdes(&[0u8; 8], &key, Operation::Encrypt),
            Err(CryptoError::InvalidKeyLength)
        );
    }

    #[test]
    fn single_des_rejects_wrong_lengths() {
        let key = [0u8; 8];
        assert_eq!(
            single_des(&[0u8; 7], &key, Operation::Encrypt),
            Err(CryptoError::InvalidDataLength)
        );
        assert_eq!(
            single_des(&[0u8; 8], &[0u8; 7], Operation::Encrypt),
            Err(CryptoError::InvalidKeyLength)
        );
    }

    #[test]
    fn single_des_round_trip() {
        let key = hex!("133457799BBCDFF1");
        let block = hex!("0123456789ABCDEF");
        let ct = single_des(&block, &key, Operation::Encrypt).unwrap();
        let pt = single_des(&ct, &key, Operation::Decrypt).unwrap();
        assert_eq!(pt, block);
    }
}
