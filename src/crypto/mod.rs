//! Block cipher primitives: single-DES, two-key Triple-DES in CBC mode, and
//! ISO/IEC 9797-1 Retail-MAC. See spec §4.2.
//!
//! Built on the `des`/`cipher`/`cbc` crates rather than a hand-rolled DES
//! implementation — the protocol only needs the standard DES/TDES block
//! transform, which the RustCrypto crates already provide in constant time.

pub mod des;
pub mod mac;

pub use des::{single_des, tdes, Operation};
pub use mac::retail_mac;
