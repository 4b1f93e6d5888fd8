//! APDU driver: assembles SELECT FILE and plaintext READ BINARY commands
//! and checks status words. See spec §4.5 and §6.
//!
//! The driver is stateless — all transport state lives in the caller's
//! [`CommandExecutor`] implementation. This mirrors the teacher's own
//! `Icao9303` methods, which only ever borrow `&mut self.nfc` to send one
//! APDU at a time and never retain cross-call state of their own.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, TransportError};

/// The two status bytes ending every APDU response. Success is `0x9000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusWord {
    pub sw1: u8,
    pub sw2: u8,
}

impl StatusWord {
    pub fn new(sw1: u8, sw2: u8) -> Self {
        Self { sw1, sw2 }
    }

    pub fn is_success(&self) -> bool {
        self.sw1 == 0x90 && self.sw2 == 0x00
    }
}

impl std::fmt::Display for StatusWord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02X}{:02X}", self.sw1, self.sw2)
    }
}

/// Raises [`Error::CardError`] unless `sw` is `0x9000`.
pub fn check_sw(sw: StatusWord) -> Result<(), Error> {
    if sw.is_success() {
        Ok(())
    } else {
        Err(Error::CardError {
            sw1: sw.sw1,
            sw2: sw.sw2,
        })
    }
}

/// The single transport abstraction the core depends on. Implementors wrap
/// whatever physical (or simulated) channel talks to the card; the core
/// never touches radio or session APIs directly (spec §6, §9).
#[async_trait]
pub trait CommandExecutor {
    /// Sends one APDU and returns `(response data, sw1, sw2)`.
    async fn transmit(&mut self, apdu: &[u8]) -> Result<(Vec<u8>, u8, u8), TransportError>;
}

/// Sends `apdu` and returns `(data, StatusWord)`, tracing the exchange.
async fn send(
    executor: &mut dyn CommandExecutor,
    apdu: &[u8],
) -> Result<(Vec<u8>, StatusWord), Error> {
    let (data, sw1, sw2) = executor.transmit(apdu).await?;
    let sw = StatusWord::new(sw1, sw2);
    debug!(cla = apdu[0], ins = apdu[1], p1 = apdu[2], p2 = apdu[3], %sw, len = data.len(), "apdu exchange");
    Ok((data, sw))
}

/// `SELECT MF`: `00 A4 00 00 02 3F 00`.
pub async fn select_mf(executor: &mut dyn CommandExecutor) -> Result<(), Error> {
    let (_, sw) = send(executor, &[0x00, 0xA4, 0x00, 0x00, 0x02, 0x3F, 0x00]).await?;
    check_sw(sw)
}

/// `SELECT DF` by AID: `00 A4 04 0C Lc | aid`.
pub async fn select_df(executor: &mut dyn CommandExecutor, aid: &[u8]) -> Result<(), Error> {
    let mut apdu = vec![0x00, 0xA4, 0x04, 0x0C, aid.len() as u8];
    apdu.extend_from_slice(aid);
    let (_, sw) = send(executor, &apdu).await?;
    check_sw(sw)
}

/// `READ BINARY` (plain): `00 B0 P1 P2 00 00`, requesting "as much as
/// possible" via the extended-length Le form.
pub async fn read_binary_plain(
    executor: &mut dyn CommandExecutor,
    p1: u8,
    p2: u8,
) -> Result<Vec<u8>, Error> {
    let apdu = [0x00, 0xB0, p1, p2, 0x00, 0x00];
    let (data, sw) = send(executor, &apdu).await?;
    check_sw(sw)?;
    Ok(data)
}

/// `GET CHALLENGE`: `00 84 00 00 00` (Le=8). Returns RND.ICC.
pub async fn get_challenge(executor: &mut dyn CommandExecutor) -> Result<[u8; 8], Error> {
    let (data, sw) = send(executor, &[0x00, 0x84, 0x00, 0x00, 0x08]).await?;
    check_sw(sw)?;
    data.try_into()
        .map_err(|_| Error::InvalidResponse("GET CHALLENGE did not return 8 bytes"))
}

/// `MUTUAL AUTHENTICATE`: `00 82 00 00 28 | data | 00`. `data` must be
/// exactly 40 bytes (E.IFD || M.IFD); returns the 40-byte response
/// (E.ICC || M.ICC).
pub async fn mutual_authenticate(
    executor: &mut dyn CommandExecutor,
    data: &[u8],
) -> Result<Vec<u8>, Error> {
    if data.len() != 0x28 {
        return Err(Error::InvalidResponse(
            "MUTUAL AUTHENTICATE command data must be 40 bytes",
        ));
    }
    let mut apdu = vec![0x00, 0x82, 0x00, 0x00, 0x28];
    apdu.extend_from_slice(data);
    apdu.push(0x00);
    let (resp, sw) = send(executor, &apdu).await?;
    check_sw(sw)?;
    Ok(resp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::SimulatedCard;

    #[tokio::test]
    async fn select_mf_emits_exact_bytes() {
        let mut card = SimulatedCard::with_defaults();
        select_mf(&mut card).await.unwrap();
        assert_eq!(
            card.last_command(),
            &[0x00, 0xA4, 0x00, 0x00, 0x02, 0x3F, 0x00][..]
        );
    }

    #[test]
    fn check_sw_success_and_failure() {
        assert!(check_sw(StatusWord::new(0x90, 0x00)).is_ok());
        let err = check_sw(StatusWord::new(0x6A, 0x82)).unwrap_err();
        assert!(matches!(
            err,
            Error::CardError {
                sw1: 0x6A,
                sw2: 0x82
            }
        ));
    }
}
