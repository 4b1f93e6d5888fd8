//! Core library for reading Japanese Residence Cards / Special Permanent
//! Resident Certificates over ISO/IEC 7816-4 APDUs. Transport-agnostic: the
//! only thing callers must supply is a [`apdu::CommandExecutor`].

#![forbid(unsafe_code)]

pub mod apdu;
pub mod auth;
pub mod card_number;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod orchestrator;
pub mod signature;
pub mod sm;
pub mod test_support;
pub mod tlv;

pub use error::Error;
pub use orchestrator::{read_card, ResidenceCardData};
