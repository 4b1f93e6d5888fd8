//! Mutual authentication engine: GET CHALLENGE → MUTUAL AUTHENTICATE,
//! E.IFD/M.IFD construction, E.ICC/M.ICC verification, session key
//! extraction. See spec §4.4.

use rand::RngCore;

use crate::{
    apdu::{get_challenge, mutual_authenticate, CommandExecutor},
    crypto::{retail_mac, tdes, Operation},
    error::Error,
    keys::{derive_session_key, Key16, StaticKeys},
};

/// State of the mutual authentication handshake. `Failed` is terminal: any
/// card error, MAC mismatch, nonce mismatch, or malformed length moves the
/// engine here and it does not retry.
#[derive(Debug)]
pub enum AuthState {
    Fresh,
    Challenged { rnd_icc: [u8; 8] },
    Authenticated { session_key: Key16 },
    Failed,
}

/// Owns the authentication state and drives the handshake. Session and
/// ephemeral key material lives here for the engine's lifetime and is
/// zeroized when the engine (or its `Key16` fields) drop.
pub struct MutualAuthenticator {
    state: AuthState,
}

impl MutualAuthenticator {
    pub fn new() -> Self {
        Self {
            state: AuthState::Fresh,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Runs the full handshake (spec §4.4 steps 1-9) and returns the
    /// session key on success. Leaves the engine in `Authenticated` or
    /// `Failed`.
    pub async fn authenticate(
        &mut self,
        executor: &mut dyn CommandExecutor,
        keys: &StaticKeys,
    ) -> Result<Key16, Error> {
        let result = self.run(executor, keys).await;
        match &result {
            Ok(session_key) => {
                self.state = AuthState::Authenticated {
                    session_key: session_key.clone(),
                };
            }
            Err(_) => self.state = AuthState::Failed,
        }
        result
    }

    async fn run(
        &mut self,
        executor: &mut dyn CommandExecutor,
        keys: &StaticKeys,
    ) -> Result<Key16, Error> {
        // Step 1: GET CHALLENGE.
        let rnd_icc = get_challenge(executor).await?;
        self.state = AuthState::Challenged { rnd_icc };

        // Step 2: generate RND.IFD and K.IFD.
        let mut rng = rand::thread_rng();
        let mut rnd_ifd = [0u8; 8];
        rng.fill_bytes(&mut rnd_ifd);
        let mut k_ifd_bytes = [0u8; 16];
        rng.fill_bytes(&mut k_ifd_bytes);
        let k_ifd = Key16(k_ifd_bytes);

        // Step 3: S = RND.IFD || RND.ICC || K.IFD.
        let mut s = Vec::with_capacity(32);
        s.extend_from_slice(&rnd_ifd);
        s.extend_from_slice(&rnd_icc);
        s.extend_from_slice(&k_ifd_bytes);

        // Step 4: E.IFD = TDES-CBC-encrypt(S, K.Enc). S is block-aligned
        // (32 bytes), so no padding is added.
        let e_ifd = tdes(&s, keys.k_enc.as_bytes(), Operation::Encrypt)?;

        // Step 5: M.IFD = retail_mac(E.IFD, K.Mac).
        let m_ifd = retail_mac(&e_ifd, keys.k_mac.as_bytes());

        // Step 6: MUTUAL AUTHENTICATE.
        let mut cmd_data = e_ifd.clone();
        cmd_data.extend_from_slice(&m_ifd);
        let response = mutual_authenticate(executor, &cmd_data).await?;
        if response.len() != 40 {
            return Err(Error::InvalidResponse(
                "MUTUAL AUTHENTICATE response must be 40 bytes",
            ));
        }
        let e_icc = &response[0..32];
        let m_icc = &response[32..40];

        // Step 7: verify the card's MAC.
        let expected_mac = retail_mac(e_icc, keys.k_mac.as_bytes());
        if expected_mac != m_icc {
            return Err(Error::CryptographyError("M.ICC verification failed"));
        }

        // Step 8: decrypt and check nonces, extract K.ICC.
        let r = tdes(e_icc, keys.k_enc.as_bytes(), Operation::Decrypt)?;
        if r.len() != 32 {
            return Err(Error::InvalidResponse(
                "decrypted authentication response must be 32 bytes",
            ));
        }
        if r[0..8] != rnd_icc[..] {
            return Err(Error::CryptographyError("RND.ICC mismatch"));
        }
        if r[8..16] != rnd_ifd[..] {
            return Err(Error::CryptographyError("RND.IFD mismatch"));
        }
        let mut k_icc_bytes = [0u8; 16];
        k_icc_bytes.copy_from_slice(&r[16..32]);
        let k_icc = Key16(k_icc_bytes);

        // Step 9: derive and return the session key.
        Ok(derive_session_key(&k_ifd, &k_icc))
    }
}

impl Default for MutualAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{card_number::CardNumber, keys::derive_static_keys, test_support::SimulatedCard};

    #[tokio::test]
    async fn successful_handshake_extracts_matching_session_key() {
        let mut card = SimulatedCard::with_defaults();
        let card_number = CardNumber::parse("AB12345678CD").unwrap();
        let keys = derive_static_keys(&card_number);

        let mut engine = MutualAuthenticator::new();
        let session_key = engine.authenticate(&mut card, &keys).await.unwrap();

        assert!(matches!(engine.state(), AuthState::Authenticated { .. }));
        assert_eq!(session_key.0, card.expected_session_key());
    }

    #[tokio::test]
    async fn mac_mismatch_fails_terminally() {
        let mut card = SimulatedCard::with_defaults();
        card.corrupt_mutual_authenticate_mac();
        let card_number = CardNumber::parse("AB12345678CD").unwrap();
        let keys = derive_static_keys(&card_number);

        let mut engine = MutualAuthenticator::new();
        let result = engine.authenticate(&mut card, &keys).await;
        assert!(result.is_err());
        assert!(matches!(engine.state(), AuthState::Failed));
    }
}
