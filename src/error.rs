//! Unified error taxonomy for the core. Every fallible operation in this
//! crate eventually returns [`Error`]; lower-level modules define their own
//! narrower error enums and `From`-convert into it at the module boundary.

use thiserror::Error;

use crate::signature::SignatureError;

/// Top-level error surfaced to callers of the orchestrator and its
/// constituent components. Mirrors spec §7.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no NFC reader available")]
    NfcNotAvailable,

    #[error("invalid card number: wrong length (expected 12, got {0})")]
    InvalidCardNumberLength(usize),

    #[error("invalid card number: expected AA99999999AA, got {0:?}")]
    InvalidCardNumberFormat(String),

    #[error("invalid card number: non-ASCII characters")]
    InvalidCardNumberCharacters,

    #[error("invalid or malformed response from card: {0}")]
    InvalidResponse(&'static str),

    #[error("card returned error status {sw1:02X}{sw2:02X}")]
    CardError { sw1: u8, sw2: u8 },

    #[error("cryptographic failure: {0}")]
    CryptographyError(&'static str),

    #[error("signature verification failed: {0}")]
    SignatureVerificationError(#[from] SignatureError),

    #[error("transport error: {0}")]
    Transport(TransportError),
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::NotAvailable => Error::NfcNotAvailable,
            other => Error::Transport(other),
        }
    }
}

/// Errors a [`crate::apdu::CommandExecutor`] implementation reports back to
/// the core. Transport-specific detail (USB errors, radio timeouts, ...)
/// belongs to the caller's own error type, which should convert into this
/// one at the `CommandExecutor` boundary.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no card present or reader unavailable")]
    NotAvailable,
    #[error("transport I/O failure: {0}")]
    Io(String),
    #[error("operation timed out")]
    Timeout,
}

impl From<TlvError> for Error {
    fn from(e: TlvError) -> Self {
        match e {
            TlvError::UnsupportedLength => Error::InvalidResponse("unsupported BER length form"),
            TlvError::Truncated => Error::InvalidResponse("truncated TLV"),
        }
    }
}

/// Errors from [`crate::tlv`]. Kept separate so the codec stays a pure,
/// dependency-free function over byte slices.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TlvError {
    #[error("unsupported BER length form")]
    UnsupportedLength,
    #[error("truncated length field")]
    Truncated,
}

impl From<CryptoError> for Error {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::InvalidKeyLength => {
                Error::CryptographyError("invalid key length for block cipher")
            }
            CryptoError::InvalidDataLength => {
                Error::CryptographyError("invalid data length for single-block cipher")
            }
            CryptoError::CipherFailure => Error::CryptographyError("platform cipher failure"),
        }
    }
}

/// Errors from [`crate::crypto`]. See spec §4.2.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid key length")]
    InvalidKeyLength,
    #[error("invalid data length")]
    InvalidDataLength,
    #[error("platform cipher failure")]
    CipherFailure,
}
