//! Static key derivation from the card number, and session key derivation
//! from the ephemeral key exchange. See spec §4.3.
//!
//! Follows the same "hash(seed [|| counter]), take first 16 bytes" shape as
//! the teacher's own `derive_key`/`derive_keys`/`seed_from_mrz` BAC
//! derivation, but without the DES-parity adjustment that BAC applies —
//! this protocol's key schedule has no parity requirement (see
//! DESIGN.md, open question (a)).

use sha1::{Digest, Sha1};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::card_number::CardNumber;

/// A 16-byte key, zeroized on drop. Used for K.Enc, K.Mac, K.IFD, K.ICC,
/// and the session key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Key16(pub [u8; 16]);

impl Key16 {
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl std::fmt::Debug for Key16 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Key16").field(&"<redacted>").finish()
    }
}

/// The static authentication keys derived from the card number.
///
/// Per spec §4.3, the current protocol derives K.Mac identically to K.Enc
/// — an unusual but intentional choice the reference implementation
/// requires for interoperability (flagged for security review in
/// DESIGN.md).
#[derive(Clone, Debug)]
pub struct StaticKeys {
    pub k_enc: Key16,
    pub k_mac: Key16,
}

/// Derives `{K.Enc, K.Mac}` from a normalized 12-character card number.
///
/// 1. SHA-1 the 12-byte ASCII card number.
/// 2. Take the first 16 bytes of the digest as K.Enc.
/// 3. K.Mac = K.Enc (byte-for-byte, per the reference implementation).
pub fn derive_static_keys(card_number: &CardNumber) -> StaticKeys {
    let mut hasher = Sha1::new();
    hasher.update(card_number.as_bytes());
    let digest = hasher.finalize();
    let mut k_enc = [0u8; 16];
    k_enc.copy_from_slice(&digest[0..16]);
    StaticKeys {
        k_enc: Key16(k_enc),
        k_mac: Key16(k_enc),
    }
}

/// Derives the 16-byte Secure Messaging session key from K.IFD and K.ICC.
///
/// XOR the two keys, append the big-endian 32-bit counter `1`, SHA-1 the
/// 20-byte input, and take the first 16 bytes. Commutative in (k_ifd,
/// k_icc) because XOR is.
pub fn derive_session_key(k_ifd: &Key16, k_icc: &Key16) -> Key16 {
    let mut xored = [0u8; 16];
    for (x, (a, b)) in xored.iter_mut().zip(k_ifd.0.iter().zip(k_icc.0.iter())) {
        *x = a ^ b;
    }
    let mut hasher = Sha1::new();
    hasher.update(xored);
    hasher.update(1u32.to_be_bytes());
    let digest = hasher.finalize();
    let mut key = [0u8; 16];
    key.copy_from_slice(&digest[0..16]);
    Key16(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_keys_match_and_are_deterministic() {
        let n = CardNumber::parse("AB12345678CD").unwrap();
        let a = derive_static_keys(&n);
        let b = derive_static_keys(&n);
        assert_eq!(a.k_enc.0, b.k_enc.0);
        assert_eq!(a.k_enc.0, a.k_mac.0);
    }

    #[test]
    fn session_key_is_commutative() {
        let k1 = Key16([0x11; 16]);
        let k2 = Key16([0x22; 16]);
        assert_eq!(
            derive_session_key(&k1, &k2).0,
            derive_session_key(&k2, &k1).0
        );
    }
}
