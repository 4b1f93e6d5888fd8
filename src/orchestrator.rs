//! Top-level read flow: selects MF, reads common data and card type, then
//! selects DF1/DF2/DF3 and reads their files in order, using plain or SM
//! reads as each file's access rule requires. See spec §4.7.

use crate::{
    apdu::{select_df, select_mf, CommandExecutor},
    auth::MutualAuthenticator,
    card_number::CardNumber,
    keys::derive_static_keys,
    signature::{self, SignatureVerificationResult},
    sm::SmReader,
};

/// Fixed 16-byte application identifiers for DF1 (images), DF2 (address
/// and residence-card fields), and DF3 (signature). These are carried
/// verbatim from the card issuer's specification.
pub const AID_DF1: [u8; 16] = [
    0xD3, 0x92, 0xf0, 0x00, 0x26, 0x01, 0x00, 0x00, 0x00, 0x01, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00,
];
pub const AID_DF2: [u8; 16] = [
    0xD3, 0x92, 0xf0, 0x00, 0x26, 0x01, 0x00, 0x00, 0x00, 0x01, 0x02, 0x01, 0x00, 0x00, 0x00, 0x00,
];
pub const AID_DF3: [u8; 16] = [
    0xD3, 0x92, 0xf0, 0x00, 0x26, 0x01, 0x00, 0x00, 0x00, 0x01, 0x03, 0x01, 0x00, 0x00, 0x00, 0x00,
];

/// ASCII card-type marker for "residence card" as opposed to "special
/// permanent resident certificate".
const CARD_TYPE_RESIDENCE_CARD: u8 = b'1';

/// Optional fields present only on residence cards (not on Special
/// Permanent Resident Certificates).
#[derive(Debug, Clone, Default)]
pub struct AdditionalData {
    pub comprehensive_permission: Vec<u8>,
    pub individual_permission: Vec<u8>,
    pub extension_application: Vec<u8>,
}

/// The fully assembled result of a card read. See spec §3.
#[derive(Debug, Clone)]
pub struct ResidenceCardData {
    pub common_data: Vec<u8>,
    pub card_type: Vec<u8>,
    pub front_image: Vec<u8>,
    pub face_image: Vec<u8>,
    pub address: Vec<u8>,
    pub additional_data: Option<AdditionalData>,
    pub check_code: Vec<u8>,
    pub certificate: Vec<u8>,
    pub signature_verification_result: Option<SignatureVerificationResult>,
}

/// Runs the full read flow against `executor` for the given card number,
/// returning the assembled [`ResidenceCardData`]. Each step must succeed
/// before the next runs; any failure aborts the whole read.
pub async fn read_card(
    executor: &mut dyn CommandExecutor,
    card_number: &str,
) -> Result<ResidenceCardData, crate::error::Error> {
    let card_number = CardNumber::parse(card_number)?;
    let static_keys = derive_static_keys(&card_number);

    // Step 1: select MF.
    select_mf(executor).await?;

    // Step 2: plaintext commonData and cardType.
    let common_data = crate::apdu::read_binary_plain(executor, 0x8B, 0x00).await?;
    let card_type = crate::apdu::read_binary_plain(executor, 0x8A, 0x00).await?;

    // Step 3: select DF1 and authenticate.
    select_df(executor, &AID_DF1).await?;
    let mut auth = MutualAuthenticator::new();
    let session_key = auth.authenticate(executor, &static_keys).await?;

    // Step 4: read images under SM.
    let sm = SmReader::new(&session_key);
    let front_image = sm.read_binary_sm(executor, 0x85, 0x00).await?;
    let face_image = sm.read_binary_sm(executor, 0x86, 0x00).await?;

    // Step 5: select DF2, read address, and residence-card-only fields.
    select_df(executor, &AID_DF2).await?;
    let address = crate::apdu::read_binary_plain(executor, 0x81, 0x00).await?;
    let additional_data = if card_type.first() == Some(&CARD_TYPE_RESIDENCE_CARD) {
        Some(AdditionalData {
            comprehensive_permission: crate::apdu::read_binary_plain(executor, 0x82, 0x00).await?,
            individual_permission: crate::apdu::read_binary_plain(executor, 0x83, 0x00).await?,
            extension_application: crate::apdu::read_binary_plain(executor, 0x84, 0x00).await?,
        })
    } else {
        None
    };

    // Step 6: select DF3, read and split the signature file.
    select_df(executor, &AID_DF3).await?;
    let signature_file = crate::apdu::read_binary_plain(executor, 0x82, 0x01).await?;
    let split = signature::split_signature_file(&signature_file)?;

    // Step 7: verify the signature against the image data. `verify` itself
    // reports a genuine hash mismatch as `Ok(is_valid: false)`, so only
    // precondition failures (missing tag, bad certificate, malformed
    // padding) collapse to `None` here — a tampered card still gets a
    // diagnostic record, not a dropped one.
    let signature_verification_result = signature::verify(
        &split.check_code,
        &split.certificate_der,
        &front_image,
        &face_image,
    )
    .ok();

    Ok(ResidenceCardData {
        common_data,
        card_type,
        front_image,
        face_image,
        address,
        additional_data,
        check_code: split.check_code,
        certificate: split.certificate_der,
        signature_verification_result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::SimulatedCard;

    #[tokio::test]
    async fn full_read_flow_matches_simulator_plaintexts() {
        let mut card = SimulatedCard::with_defaults();
        let data = read_card(&mut card, "AB12345678CD").await.unwrap();

        assert_eq!(data.front_image, card.plaintext_front_image());
        assert_eq!(data.face_image, card.plaintext_face_image());
        assert_eq!(data.card_type, card.plaintext_card_type());
        assert_eq!(data.common_data, card.plaintext_common_data());

        let result = data.signature_verification_result.unwrap();
        assert!(result.is_valid);
    }

    #[tokio::test]
    async fn residence_card_reads_additional_data() {
        let mut card = SimulatedCard::with_defaults();
        let data = read_card(&mut card, "AB12345678CD").await.unwrap();
        assert!(data.additional_data.is_some());
    }

    #[tokio::test]
    async fn non_residence_card_skips_additional_data() {
        let mut card = SimulatedCard::with_card_type(b"2".to_vec());
        let data = read_card(&mut card, "AB12345678CD").await.unwrap();
        assert!(data.additional_data.is_none());
    }

    #[tokio::test]
    async fn normalizes_card_number_before_deriving_keys() {
        let mut card = SimulatedCard::with_defaults();
        let data = read_card(&mut card, "  ab12345678cd  ").await.unwrap();
        assert_eq!(data.front_image, card.plaintext_front_image());
    }
}
