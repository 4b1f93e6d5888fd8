//! Card number parsing and normalization. See spec §3 and §7.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::Error;

/// A validated, normalized 12-character card number: `^[A-Z]{2}[0-9]{8}[A-Z]{2}$`.
///
/// Constructed only via [`CardNumber::parse`], which upper-cases and trims
/// whitespace before validating — lowercase input is normalized, not
/// rejected.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CardNumber([u8; 12]);

impl CardNumber {
    pub fn parse(input: &str) -> Result<Self, Error> {
        let trimmed = input.trim().to_ascii_uppercase();
        if !trimmed.is_ascii() {
            return Err(Error::InvalidCardNumberCharacters);
        }
        if trimmed.len() != 12 {
            return Err(Error::InvalidCardNumberLength(trimmed.len()));
        }
        let bytes = trimmed.as_bytes();
        let shape_ok = bytes[0..2].iter().all(u8::is_ascii_uppercase)
            && bytes[2..10].iter().all(u8::is_ascii_digit)
            && bytes[10..12].iter().all(u8::is_ascii_uppercase);
        if !shape_ok {
            return Err(Error::InvalidCardNumberFormat(trimmed));
        }
        let mut buf = [0u8; 12];
        buf.copy_from_slice(bytes);
        Ok(CardNumber(buf))
    }

    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).expect("validated ASCII on construction")
    }
}

impl std::fmt::Debug for CardNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CardNumber").field(&self.as_str()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_whitespace_and_case() {
        let n = CardNumber::parse("  ab12345678cd  ").unwrap();
        assert_eq!(n.as_str(), "AB12345678CD");
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            CardNumber::parse("AB1234567CD"),
            Err(Error::InvalidCardNumberLength(_))
        ));
    }

    #[test]
    fn rejects_wrong_shape() {
        // digits where letters are expected
        assert!(matches!(
            CardNumber::parse("1212345678CD"),
            Err(Error::InvalidCardNumberFormat(_))
        ));
        // letters where digits are expected
        assert!(matches!(
            CardNumber::parse("ABXX345678CD"),
            Err(Error::InvalidCardNumberFormat(_))
        ));
    }

    #[test]
    fn rejects_non_ascii() {
        assert!(matches!(
            CardNumber::parse("AB123456789€"),
            Err(Error::InvalidCardNumberCharacters)
        ));
    }
}
