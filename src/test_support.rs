//! An in-memory card simulator implementing [`CommandExecutor`], used by
//! this crate's own tests and by the demo binary. Not behind `#[cfg(test)]`
//! so the demo can drive a read without real hardware.
//!
//! Modeled on the teacher's own test fixtures (`icao-9303-nfc`'s BAC vectors
//! in `main.rs`), but as a live responder rather than static byte strings,
//! since this protocol's handshake is randomized per session.

use async_trait::async_trait;

use crate::{
    apdu::CommandExecutor,
    card_number::CardNumber,
    crypto::{retail_mac, tdes, Operation},
    error::TransportError,
    keys::{derive_session_key, derive_static_keys, Key16, StaticKeys},
    orchestrator::{AID_DF1, AID_DF2, AID_DF3},
    tlv,
};

const FRONT_IMAGE: &[u8] = b"front-image-tlv-bytes";
const FACE_IMAGE: &[u8] = b"face-image-tlv-bytes";
const COMMON_DATA: &[u8] = b"common-data-bytes";
const ADDRESS: &[u8] = b"address-bytes";
const COMPREHENSIVE_PERMISSION: &[u8] = b"comprehensive-permission-bytes";
const INDIVIDUAL_PERMISSION: &[u8] = b"individual-permission-bytes";
const EXTENSION_APPLICATION: &[u8] = b"extension-application-bytes";
const FIXED_K_ICC: [u8; 16] = [0x77; 16];
const FIXED_RND_ICC: [u8; 8] = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 0x11, 0x22];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    None,
    Mf,
    Df1,
    Df2,
    Df3,
}

/// A simulated card that speaks the exact APDU protocol described by this
/// crate, with a real (if self-issued) signature chain underneath its
/// signature file.
pub struct SimulatedCard {
    selection: Selection,
    last_command: Vec<u8>,
    static_keys: StaticKeys,
    session_key: Option<Key16>,
    corrupt_mac: bool,
    card_type: Vec<u8>,
}

impl SimulatedCard {
    /// A card provisioned for card number `AB12345678CD`, card type `"1"`
    /// (residence card).
    pub fn with_defaults() -> Self {
        Self::new(b"1".to_vec())
    }

    /// A card with a given card-type byte string (e.g. `b"2"` for a Special
    /// Permanent Resident Certificate, which has no `additionalData`).
    pub fn with_card_type(card_type: Vec<u8>) -> Self {
        Self::new(card_type)
    }

    fn new(card_type: Vec<u8>) -> Self {
        let card_number = CardNumber::parse("AB12345678CD").unwrap();
        Self {
            selection: Selection::None,
            last_command: Vec::new(),
            static_keys: derive_static_keys(&card_number),
            session_key: None,
            corrupt_mac: false,
            card_type,
        }
    }

    /// Forces the next `MUTUAL AUTHENTICATE` response's MAC to be wrong,
    /// simulating a card rejecting (or being rejected for) a bad Retail-MAC.
    pub fn corrupt_mutual_authenticate_mac(&mut self) {
        self.corrupt_mac = true;
    }

    pub fn last_command(&self) -> &[u8] {
        &self.last_command
    }

    /// The session key this simulated card computed during the last
    /// successful handshake, for comparison against what the real engine
    /// derived.
    pub fn expected_session_key(&self) -> [u8; 16] {
        self.session_key
            .as_ref()
            .expect("authenticate before calling expected_session_key")
            .0
    }

    pub fn plaintext_front_image(&self) -> Vec<u8> {
        FRONT_IMAGE.to_vec()
    }

    pub fn plaintext_face_image(&self) -> Vec<u8> {
        FACE_IMAGE.to_vec()
    }

    pub fn plaintext_card_type(&self) -> Vec<u8> {
        self.card_type.clone()
    }

    pub fn plaintext_common_data(&self) -> Vec<u8> {
        COMMON_DATA.to_vec()
    }

    fn signature_file(&self) -> Vec<u8> {
        let check_code =
            hex::decode(include_str!("../tests/fixtures/checkcode.hex").trim()).unwrap();
        let certificate_der =
            hex::decode(include_str!("../tests/fixtures/cert.hex").trim()).unwrap();
        let mut file = vec![0xDA];
        file.extend_from_slice(&tlv::encode_length(check_code.len()));
        file.extend_from_slice(&check_code);
        file.push(0xDB);
        file.extend_from_slice(&tlv::encode_length(certificate_der.len()));
        file.extend_from_slice(&certificate_der);
        file
    }

    fn handle_select(&mut self, apdu: &[u8]) -> (Vec<u8>, u8, u8) {
        let p1 = apdu[2];
        if p1 == 0x00 {
            self.selection = Selection::Mf;
        } else {
            let aid = &apdu[5..5 + apdu[4] as usize];
            self.selection = if aid == AID_DF1 {
                Selection::Df1
            } else if aid == AID_DF2 {
                Selection::Df2
            } else if aid == AID_DF3 {
                Selection::Df3
            } else {
                return (Vec::new(), 0x6A, 0x82);
            };
        }
        (Vec::new(), 0x90, 0x00)
    }

    fn handle_read_binary_plain(&self, apdu: &[u8]) -> (Vec<u8>, u8, u8) {
        let (p1, p2) = (apdu[2], apdu[3]);
        let data = match (self.selection, p1, p2) {
            (Selection::Mf, 0x8B, _) => COMMON_DATA.to_vec(),
            (Selection::Mf, 0x8A, _) => self.card_type.clone(),
            (Selection::Df2, 0x81, _) => ADDRESS.to_vec(),
            (Selection::Df2, 0x82, _) => COMPREHENSIVE_PERMISSION.to_vec(),
            (Selection::Df2, 0x83, _) => INDIVIDUAL_PERMISSION.to_vec(),
            (Selection::Df2, 0x84, _) => EXTENSION_APPLICATION.to_vec(),
            (Selection::Df3, 0x82, 0x01) => self.signature_file(),
            _ => return (Vec::new(), 0x6A, 0x82),
        };
        (data, 0x90, 0x00)
    }

    fn handle_get_challenge(&self) -> (Vec<u8>, u8, u8) {
        (FIXED_RND_ICC.to_vec(), 0x90, 0x00)
    }

    fn handle_mutual_authenticate(&mut self, apdu: &[u8]) -> (Vec<u8>, u8, u8) {
        let data = &apdu[5..apdu.len() - 1];
        let e_ifd = &data[0..32];
        let m_ifd = &data[32..40];

        let expected_m_ifd = retail_mac(e_ifd, self.static_keys.k_mac.as_bytes());
        if expected_m_ifd != m_ifd {
            return (Vec::new(), 0x69, 0x88);
        }

        let s = tdes(e_ifd, self.static_keys.k_enc.as_bytes(), Operation::Decrypt).unwrap();
        let rnd_ifd = &s[0..8];
        let rnd_icc_echo = &s[8..16];
        if rnd_icc_echo != FIXED_RND_ICC {
            return (Vec::new(), 0x69, 0x88);
        }
        let mut k_ifd_bytes = [0u8; 16];
        k_ifd_bytes.copy_from_slice(&s[16..32]);

        let mut r = Vec::with_capacity(32);
        r.extend_from_slice(&FIXED_RND_ICC);
        r.extend_from_slice(rnd_ifd);
        r.extend_from_slice(&FIXED_K_ICC);
        let e_icc = tdes(&r, self.static_keys.k_enc.as_bytes(), Operation::Encrypt).unwrap();
        let mut m_icc = retail_mac(&e_icc, self.static_keys.k_mac.as_bytes());
        if self.corrupt_mac {
            m_icc[0] ^= 0xFF;
        }

        self.session_key = Some(derive_session_key(&Key16(k_ifd_bytes), &Key16(FIXED_K_ICC)));

        let mut response = e_icc;
        response.extend_from_slice(&m_icc);
        (response, 0x90, 0x00)
    }

    fn handle_read_binary_sm(&self, apdu: &[u8]) -> (Vec<u8>, u8, u8) {
        let session_key = match &self.session_key {
            Some(k) => k,
            None => return (Vec::new(), 0x69, 0x82),
        };
        let p1 = apdu[2];
        let plaintext = match p1 & 0x7F {
            0x05 => FRONT_IMAGE,
            0x06 => FACE_IMAGE,
            _ => return (Vec::new(), 0x6A, 0x82),
        };

        let mut padded = plaintext.to_vec();
        padded.push(0x80);
        while padded.len() % 8 != 0 {
            padded.push(0x00);
        }
        let ciphertext = tdes(&padded, session_key.as_bytes(), Operation::Encrypt).unwrap();

        let mut value = vec![0x01];
        value.extend_from_slice(&ciphertext);
        let mut body = vec![0x86];
        body.extend_from_slice(&tlv::encode_length(value.len()));
        body.extend_from_slice(&value);
        (body, 0x90, 0x00)
    }
}

#[async_trait]
impl CommandExecutor for SimulatedCard {
    async fn transmit(&mut self, apdu: &[u8]) -> Result<(Vec<u8>, u8, u8), TransportError> {
        self.last_command = apdu.to_vec();
        let (cla, ins) = (apdu[0], apdu[1]);
        let result = match (cla, ins) {
            (0x00, 0xA4) => self.handle_select(apdu),
            (0x00, 0xB0) => self.handle_read_binary_plain(apdu),
            (0x00, 0x84) => self.handle_get_challenge(),
            (0x00, 0x82) => self.handle_mutual_authenticate(apdu),
            (0x08, 0xB0) => self.handle_read_binary_sm(apdu),
            _ => (Vec::new(), 0x6D, 0x00),
        };
        Ok(result)
    }
}
