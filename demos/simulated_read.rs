//! Drives a full card read against the in-memory simulator in
//! `rdc_core::test_support`, the way `icao-9303-nfc`'s `main.rs` drives a
//! real Proxmark3 session. Useful as a worked example of wiring a
//! `CommandExecutor` and invoking the orchestrator.

use rdc_core::{orchestrator::read_card, test_support::SimulatedCard};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut card = SimulatedCard::with_defaults();
    let data = read_card(&mut card, "AB12345678CD").await?;

    println!("card type: {}", String::from_utf8_lossy(&data.card_type));
    println!(
        "front image: {} bytes, face image: {} bytes",
        data.front_image.len(),
        data.face_image.len()
    );
    if let Some(result) = &data.signature_verification_result {
        println!("signature valid: {}", result.is_valid);
        println!("certificate subject: {}", result.subject);
    }

    Ok(())
}
