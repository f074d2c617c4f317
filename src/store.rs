use async_trait::async_trait;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::info;

use crate::extract::ExtractedFields;
use crate::wizard::ComplaintDraft;

/// Errors a persistence collaborator can report
///
/// The simulated collaborators never fail; real implementations plug in
/// behind the same traits and use these variants.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Collaborator could not be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Collaborator rejected the payload
    #[error("store rejected record: {0}")]
    Rejected(String),
}

/// Acknowledgment for an accepted complaint submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    /// Case reference handed back to the citizen, e.g. `COMP-76U2W8F0J`
    pub reference: String,
}

/// Acknowledgment for a stored call record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerReceipt {
    /// Ledger transaction identifier
    pub transaction_id: String,
}

/// Record handed to the ledger when a call ends
#[derive(Debug, Clone)]
pub struct CallRecord {
    /// Fields extracted from the final transcript
    pub fields: ExtractedFields,
    /// Digits dialed to start the call
    pub phone_number: String,
    /// Call duration at hang-up
    pub duration_secs: u64,
    /// Set when extraction found no usable name; the full recording is the
    /// authoritative source and dispatchers should pull the audio
    pub from_recording: bool,
}

/// Backend accepting finalized complaint drafts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ComplaintBackend: Send + Sync {
    /// Submit a finalized complaint draft
    ///
    /// # Errors
    /// Returns error if the backend is unreachable or rejects the draft
    async fn submit_complaint(&self, draft: &ComplaintDraft)
        -> Result<SubmissionReceipt, StoreError>;
}

/// Ledger accepting call records when an emergency call ends
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CallLedger: Send + Sync {
    /// Store one call record
    ///
    /// # Errors
    /// Returns error if the ledger is unreachable or rejects the record
    async fn store_call_record(&self, record: &CallRecord) -> Result<LedgerReceipt, StoreError>;
}

/// Stand-in backend: logs the draft and resolves after a fixed delay
pub struct SimulatedBackend {
    delay: Duration,
}

impl SimulatedBackend {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl ComplaintBackend for SimulatedBackend {
    async fn submit_complaint(
        &self,
        draft: &ComplaintDraft,
    ) -> Result<SubmissionReceipt, StoreError> {
        tokio::time::sleep(self.delay).await;

        let reference = format!("COMP-{}", unique_suffix());
        info!(
            reference = %reference,
            complaint_type = ?draft.complaint_type,
            location = %draft.location,
            evidence_files = draft.evidence_files.len(),
            "complaint accepted (simulated backend)"
        );

        Ok(SubmissionReceipt { reference })
    }
}

/// Stand-in ledger: logs the record and resolves after a fixed delay
pub struct SimulatedLedger {
    delay: Duration,
}

impl SimulatedLedger {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl CallLedger for SimulatedLedger {
    async fn store_call_record(&self, record: &CallRecord) -> Result<LedgerReceipt, StoreError> {
        tokio::time::sleep(self.delay).await;

        let transaction_id = format!("0x{}", unique_suffix().to_lowercase());
        info!(
            transaction_id = %transaction_id,
            caller = %record.fields.name,
            location = %record.fields.location,
            incident = %record.fields.complaint_type,
            duration_secs = record.duration_secs,
            from_recording = record.from_recording,
            "call record anchored (simulated ledger)"
        );

        Ok(LedgerReceipt { transaction_id })
    }
}

/// Base-36 suffix derived from the current time, unique enough for receipts
fn unique_suffix() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());

    let mut value = nanos;
    let digits = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let mut out = Vec::with_capacity(10);
    for _ in 0..10 {
        out.push(digits[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}
