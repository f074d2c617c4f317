use std::time::Duration;

use anyhow::Result;

use civicline::call::capability::{SimulatedMicrophone, SimulatedRecognizer, TranscriptEvent};
use civicline::call::CallSession;
use civicline::store::{SimulatedBackend, SimulatedLedger};
use civicline::wizard::{ComplaintType, ComplaintWizard, EvidenceFile};
use civicline::{config, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::Config::load()?;
    println!("✓ Config loaded from ~/.civicline.toml");

    telemetry::init(config.telemetry.enabled, &config.telemetry.log_path)?;
    tracing::info!("civicline starting");
    println!("✓ Telemetry initialized");

    run_wizard_demo(&config).await?;
    run_call_demo(&config).await?;

    println!("\nDone.");
    Ok(())
}

/// Scripted walk through the five wizard steps ending in a submission
async fn run_wizard_demo(config: &config::Config) -> Result<()> {
    println!("\n-- Complaint wizard --");

    let mut wizard = ComplaintWizard::new(config.wizard.clone());

    wizard.select_type(ComplaintType::Noise);
    wizard.set_description("Loud music from the unit upstairs, every night past midnight");
    wizard.advance();

    wizard.set_location("south alley");
    let first_suggestion = wizard
        .location_suggestions()
        .first()
        .map(|s| (*s).to_owned());
    if let Some(first) = first_suggestion {
        wizard.select_location_suggestion(first);
    }
    wizard.advance();

    wizard.set_evidence(vec![EvidenceFile {
        name: "recording.mp3".to_owned(),
    }]);
    wizard.advance();

    wizard.set_email("sairam1203mr@gmail.com");
    wizard.advance();

    let summary = wizard.review_summary();
    println!("  Type:     {}", summary.complaint_type);
    println!("  Location: {}", summary.location);
    println!("  Evidence: {}", summary.evidence);
    println!("  Contact:  {}", summary.contact_email);

    let backend = SimulatedBackend::new(Duration::from_millis(config.wizard.submit_delay_ms));
    println!("  Submitting...");
    let (receipt, _navigation) = wizard.submit(&backend).await?;
    println!("  Accepted: {}", receipt.reference);

    Ok(())
}

/// Scripted emergency call: dial, capture, transcribe, extract, store
async fn run_call_demo(config: &config::Config) -> Result<()> {
    println!("\n-- Emergency call --");

    let mut session = CallSession::new(config.call.clone())?;
    session.open_dial_pad();
    for digit in "100".chars() {
        session.press_digit(digit);
    }
    println!("  Dialing {}", session.phone_number());

    let microphone = SimulatedMicrophone::new(Duration::from_millis(100));
    let recognizer = SimulatedRecognizer::new(
        vec![
            TranscriptEvent::Interim("my name is".to_owned()),
            TranscriptEvent::Final(
                "my name is John Smith at Park Street, report a theft, \
                 my number is 555-123-4567"
                    .to_owned(),
            ),
        ],
        Duration::from_millis(300),
    );

    session.start_call(&microphone, &recognizer).await?;
    println!("  {}", session.status());

    tokio::time::sleep(Duration::from_secs(2)).await;
    session.pump_events();
    println!("  Transcript: {}", session.live_transcript());

    let ledger = SimulatedLedger::new(Duration::from_millis(config.call.store_delay_ms));
    let receipt = session.end_call(&ledger).await?;
    println!("  {}", session.status());
    println!("  Anchored: {}", receipt.transaction_id);

    session.reset();
    Ok(())
}
