//! Civicline - citizen complaint line core
//!
//! Two cooperating state machines: the five-step complaint submission
//! wizard and the simulated emergency-call capture pipeline. Devices and
//! persistence are injected collaborators, so everything here runs and
//! tests without a browser, a microphone or a ledger.

/// Call capture pipeline (dial pad, capture capabilities, session)
pub mod call;
/// Configuration management
pub mod config;
/// Regex field extraction from call transcripts
pub mod extract;
/// Persistence collaborator traits and simulated implementations
pub mod store;
/// Telemetry and logging
pub mod telemetry;
/// Complaint submission wizard
pub mod wizard;
