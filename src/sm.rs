//! Secure Messaging reader: wraps READ BINARY under CLA=0x08, decrypts the
//! tag-0x86 response object, strips ISO/IEC 7816-4 padding, and performs
//! chunked reads for files too large for one response window. See spec
//! §4.6.

use crate::{
    apdu::{check_sw, CommandExecutor, StatusWord},
    crypto::{tdes, Operation},
    error::Error,
    keys::Key16,
    tlv,
};

/// Conservative default for "close enough to the response ceiling that
/// more data probably remains". Spec §9(b) notes the card's exact chunking
/// rule is undocumented; this mirrors the reference implementation's
/// heuristic and is kept overridable for testing against the real
/// threshold once characterized.
pub const DEFAULT_NEAR_CEILING_MARGIN: usize = 100;

/// Conservative default for the largest single-response ciphertext payload
/// this family of cards is known to return. Override via
/// [`SmReader::with_max_response_len`] if a given reader/card combination
/// is characterized to do better.
pub const DEFAULT_MAX_RESPONSE_LEN: usize = 256;

/// Reads files from the card under Secure Messaging, given a live session
/// key. Stateless beyond the tunable thresholds above; the session key is
/// borrowed for the read's duration, matching spec §5's "session key is
/// produced before any SM read and must not be mutated thereafter".
pub struct SmReader<'k> {
    session_key: &'k Key16,
    max_response_len: usize,
    near_ceiling_margin: usize,
}

impl<'k> SmReader<'k> {
    pub fn new(session_key: &'k Key16) -> Self {
        Self {
            session_key,
            max_response_len: DEFAULT_MAX_RESPONSE_LEN,
            near_ceiling_margin: DEFAULT_NEAR_CEILING_MARGIN,
        }
    }

    pub fn with_max_response_len(session_key: &'k Key16, max_response_len: usize) -> Self {
        Self {
            session_key,
            max_response_len,
            near_ceiling_margin: DEFAULT_NEAR_CEILING_MARGIN,
        }
    }

    /// Reads the elementary file selected by `(p1, p2)` under SM,
    /// transparently chaining continuation reads if the file is larger
    /// than one response window.
    pub async fn read_binary_sm(
        &self,
        executor: &mut dyn CommandExecutor,
        p1: u8,
        p2: u8,
    ) -> Result<Vec<u8>, Error> {
        // `(p1, p2)` selects the short EF and the *first* request's byte
        // offset (0 on every real call site) — it is not itself a numeric
        // offset. Only the first request uses that short-EF form; once the
        // EF is selected, continuation reads switch to plain 15-bit P1/P2
        // offset addressing (short-EF bit cleared) so the running byte
        // count, not the EF identifier, drives P1/P2 from then on.
        let mut bytes_read: u16 = 0;
        let mut first = true;
        let mut ciphertext = Vec::new();

        loop {
            let (cur_p1, cur_p2) = if first {
                (p1, p2)
            } else {
                (((bytes_read >> 8) as u8) & 0x7F, (bytes_read & 0xFF) as u8)
            };
            first = false;
            let chunk = self.read_one_chunk(executor, cur_p1, cur_p2).await?;

            if chunk.is_empty() {
                break;
            }
            let chunk_len = chunk.len();
            ciphertext.extend_from_slice(&chunk);

            if chunk_len + self.near_ceiling_margin < self.max_response_len {
                // Comfortably short of the ceiling: this was the last chunk.
                break;
            }
            bytes_read = bytes_read
                .checked_add(chunk_len as u16)
                .ok_or(Error::InvalidResponse("file offset overflowed 15 bits"))?;
            if bytes_read > 0x7FFF {
                return Err(Error::InvalidResponse("file offset exceeded 15 bits"));
            }
        }

        let decrypted = tdes(&ciphertext, self.session_key.as_bytes(), Operation::Decrypt)?;
        strip_iso7816_padding(&decrypted)
    }

    /// Sends one `READ BINARY` under SM and returns the raw ciphertext
    /// bytes of its tag-0x86 value, with the leading padding-indicator
    /// byte already validated and stripped.
    async fn read_one_chunk(
        &self,
        executor: &mut dyn CommandExecutor,
        p1: u8,
        p2: u8,
    ) -> Result<Vec<u8>, Error> {
        let apdu = [
            0x08, 0xB0, p1, p2, 0x04, 0x96, 0x02, 0x00, 0x00, 0x00,
        ];
        let (data, sw1, sw2) = executor.transmit(&apdu).await?;
        check_sw(StatusWord::new(sw1, sw2))?;

        if data.is_empty() {
            return Ok(Vec::new());
        }

        if data[0] != 0x86 {
            return Err(Error::InvalidResponse(
                "SM READ BINARY response missing tag 0x86",
            ));
        }
        let (len, value_off) = tlv::parse_length(&data, 1)?;
        let value_end = value_off
            .checked_add(len)
            .filter(|&end| end <= data.len())
            .ok_or(Error::InvalidResponse("truncated tag-0x86 TLV"))?;
        let value = &data[value_off..value_end];
        let (&padding_indicator, ciphertext) = value
            .split_first()
            .ok_or(Error::InvalidResponse("tag-0x86 value is empty"))?;
        if padding_indicator != 0x01 {
            return Err(Error::InvalidResponse(
                "unexpected SM padding indicator byte",
            ));
        }
        Ok(ciphertext.to_vec())
    }
}

/// Strips ISO/IEC 7816-4 padding: remove trailing `0x00` bytes, then the
/// single `0x80` separator. Rejects input with no `0x80` found, or with
/// non-zero bytes after the last `0x80`.
pub fn strip_iso7816_padding(data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut end = data.len();
    while end > 0 && data[end - 1] == 0x00 {
        end -= 1;
    }
    if end == 0 || data[end - 1] != 0x80 {
        return Err(Error::InvalidResponse(
            "ISO/IEC 7816-4 padding separator not found",
        ));
    }
    Ok(data[..end - 1].to_vec())
}
