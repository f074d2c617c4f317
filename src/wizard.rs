use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::WizardConfig;
use crate::store::{ComplaintBackend, StoreError, SubmissionReceipt};

/// The ten fixed complaint categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplaintType {
    Noise,
    Traffic,
    Suspicious,
    Harassment,
    Vandalism,
    Domestic,
    Theft,
    Fraud,
    Fire,
    Other,
}

impl ComplaintType {
    /// Every category, in display order
    pub const ALL: [Self; 10] = [
        Self::Noise,
        Self::Traffic,
        Self::Suspicious,
        Self::Harassment,
        Self::Vandalism,
        Self::Domestic,
        Self::Theft,
        Self::Fraud,
        Self::Fire,
        Self::Other,
    ];

    /// Stable identifier used by selection APIs
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Noise => "noise",
            Self::Traffic => "traffic",
            Self::Suspicious => "suspicious",
            Self::Harassment => "harassment",
            Self::Vandalism => "vandalism",
            Self::Domestic => "domestic",
            Self::Theft => "theft",
            Self::Fraud => "fraud",
            Self::Fire => "fire",
            Self::Other => "other",
        }
    }

    /// Human-readable label shown in the review summary
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Noise => "Noise Complaint",
            Self::Traffic => "Traffic Violation",
            Self::Suspicious => "Suspicious Activity",
            Self::Harassment => "Harassment",
            Self::Vandalism => "Vandalism",
            Self::Domestic => "Domestic Dispute",
            Self::Theft => "Theft",
            Self::Fraud => "Fraud",
            Self::Fire => "Fire Emergency",
            Self::Other => "Other",
        }
    }

    /// Look up a category by its identifier
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.id() == id)
    }
}

/// A file the citizen attached as evidence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceFile {
    pub name: String,
}

/// The in-progress complaint; transient UI state, never persisted locally
#[derive(Debug, Clone, Default)]
pub struct ComplaintDraft {
    pub complaint_type: Option<ComplaintType>,
    pub description: String,
    pub location: String,
    pub evidence_files: Vec<EvidenceFile>,
    pub evidence_description: String,
    pub contact_email: String,
}

/// The five wizard steps, strictly sequential
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WizardStep {
    Type = 1,
    Location,
    Evidence,
    Contact,
    Review,
}

impl WizardStep {
    /// 1-based step number shown in the progress header
    #[must_use]
    pub const fn number(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Type => "Type",
            Self::Location => "Location",
            Self::Evidence => "Evidence",
            Self::Contact => "Contact",
            Self::Review => "Review",
        }
    }

    const fn next(self) -> Option<Self> {
        match self {
            Self::Type => Some(Self::Location),
            Self::Location => Some(Self::Evidence),
            Self::Evidence => Some(Self::Contact),
            Self::Contact => Some(Self::Review),
            Self::Review => None,
        }
    }

    const fn previous(self) -> Option<Self> {
        match self {
            Self::Type => None,
            Self::Location => Some(Self::Type),
            Self::Evidence => Some(Self::Location),
            Self::Contact => Some(Self::Evidence),
            Self::Review => Some(Self::Contact),
        }
    }
}

/// Progress header entry for one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepProgress {
    pub step: WizardStep,
    pub active: bool,
    pub completed: bool,
}

/// Where the host view layer should navigate next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Back to the landing view
    Landing,
}

/// Structured snapshot of the draft for the review step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewSummary {
    pub complaint_type: String,
    pub description: String,
    pub location: String,
    pub evidence: String,
    pub evidence_description: String,
    pub contact_email: String,
}

/// Errors from the terminal submit operation
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Submission is only offered on the review step
    #[error("submission requires the review step")]
    NotAtReview,

    /// A submission is already running
    #[error("submission already in progress")]
    InProgress,

    /// Backend refused or could not take the draft
    #[error(transparent)]
    Backend(#[from] StoreError),
}

/// Five-step complaint submission wizard
///
/// Owns the draft and the step cursor. Field setters never validate;
/// the required-field predicates gate only forward navigation.
pub struct ComplaintWizard {
    step: WizardStep,
    draft: ComplaintDraft,
    config: WizardConfig,
    submitting: bool,
    location_suggestions_visible: bool,
    email_suggestions_visible: bool,
}

impl ComplaintWizard {
    #[must_use]
    pub const fn new(config: WizardConfig) -> Self {
        Self {
            step: WizardStep::Type,
            draft: ComplaintDraft {
                complaint_type: None,
                description: String::new(),
                location: String::new(),
                evidence_files: Vec::new(),
                evidence_description: String::new(),
                contact_email: String::new(),
            },
            config,
            submitting: false,
            location_suggestions_visible: false,
            email_suggestions_visible: false,
        }
    }

    #[must_use]
    pub const fn step(&self) -> WizardStep {
        self.step
    }

    #[must_use]
    pub const fn draft(&self) -> &ComplaintDraft {
        &self.draft
    }

    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn select_type(&mut self, complaint_type: ComplaintType) {
        self.draft.complaint_type = Some(complaint_type);
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.draft.description = description.into();
    }

    /// Updates the location text and reveals the suggestion list
    pub fn set_location(&mut self, location: impl Into<String>) {
        self.draft.location = location.into();
        self.location_suggestions_visible = true;
    }

    /// Updates the contact email and reveals the suggestion list
    pub fn set_email(&mut self, email: impl Into<String>) {
        self.draft.contact_email = email.into();
        self.email_suggestions_visible = true;
    }

    pub fn set_evidence(&mut self, files: Vec<EvidenceFile>) {
        self.draft.evidence_files = files;
    }

    pub fn set_evidence_description(&mut self, description: impl Into<String>) {
        self.draft.evidence_description = description.into();
    }

    /// Location candidates matching the current input
    ///
    /// Case-insensitive substring containment; empty input or a hidden list
    /// yields no suggestions.
    #[must_use]
    pub fn location_suggestions(&self) -> Vec<&str> {
        if !self.location_suggestions_visible {
            return Vec::new();
        }
        filter_suggestions(&self.config.location_suggestions, &self.draft.location)
    }

    /// Email candidates matching the current input
    #[must_use]
    pub fn email_suggestions(&self) -> Vec<&str> {
        if !self.email_suggestions_visible {
            return Vec::new();
        }
        filter_suggestions(&self.config.email_suggestions, &self.draft.contact_email)
    }

    /// Overwrites the location with a chosen candidate and hides the list
    pub fn select_location_suggestion(&mut self, suggestion: impl Into<String>) {
        self.draft.location = suggestion.into();
        self.location_suggestions_visible = false;
    }

    /// Overwrites the email with a chosen candidate and hides the list
    pub fn select_email_suggestion(&mut self, suggestion: impl Into<String>) {
        self.draft.contact_email = suggestion.into();
        self.email_suggestions_visible = false;
    }

    /// Whether the active step's required fields are filled
    #[must_use]
    pub fn can_advance(&self) -> bool {
        match self.step {
            WizardStep::Type => {
                self.draft.complaint_type.is_some() && !self.draft.description.trim().is_empty()
            }
            WizardStep::Location => !self.draft.location.trim().is_empty(),
            WizardStep::Evidence | WizardStep::Review => true,
            WizardStep::Contact => !self.draft.contact_email.trim().is_empty(),
        }
    }

    /// Moves to the next step; a no-op when required fields are missing or
    /// on the terminal review step (use [`Self::submit`] there)
    pub fn advance(&mut self) -> bool {
        if !self.can_advance() {
            debug!(step = self.step.number(), "advance blocked: required fields missing");
            return false;
        }
        match self.step.next() {
            Some(next) => {
                info!(from = self.step.number(), to = next.number(), "wizard advanced");
                self.step = next;
                true
            }
            None => {
                debug!("review step is terminal");
                false
            }
        }
    }

    /// Moves back one step, keeping all entered data; a no-op on step 1
    pub fn retreat(&mut self) -> bool {
        match self.step.previous() {
            Some(previous) => {
                info!(from = self.step.number(), to = previous.number(), "wizard went back");
                self.step = previous;
                true
            }
            None => false,
        }
    }

    /// Cancel is only offered on the first step; later steps go back instead
    #[must_use]
    pub fn cancel(&self) -> Option<Navigation> {
        (self.step == WizardStep::Type).then_some(Navigation::Landing)
    }

    /// Progress header flags for all five steps
    #[must_use]
    pub fn progress(&self) -> Vec<StepProgress> {
        [
            WizardStep::Type,
            WizardStep::Location,
            WizardStep::Evidence,
            WizardStep::Contact,
            WizardStep::Review,
        ]
        .into_iter()
        .map(|step| StepProgress {
            step,
            active: step <= self.step,
            completed: step < self.step,
        })
        .collect()
    }

    /// Draft snapshot for the review step
    #[must_use]
    pub fn review_summary(&self) -> ReviewSummary {
        let evidence = if self.draft.evidence_files.is_empty() {
            "No files uploaded".to_owned()
        } else {
            format!("{} file(s) uploaded", self.draft.evidence_files.len())
        };

        let evidence_description = if self.draft.evidence_description.trim().is_empty() {
            "No additional description provided".to_owned()
        } else {
            self.draft.evidence_description.clone()
        };

        ReviewSummary {
            complaint_type: self
                .draft
                .complaint_type
                .map(ComplaintType::label)
                .unwrap_or_default()
                .to_owned(),
            description: self.draft.description.clone(),
            location: self.draft.location.clone(),
            evidence,
            evidence_description,
            contact_email: self.draft.contact_email.clone(),
        }
    }

    /// Submits the draft from the review step
    ///
    /// Sets the submitting flag for the duration of the backend call, logs
    /// the success notification, then waits the configured redirect delay
    /// before handing back the landing navigation.
    ///
    /// # Errors
    /// Returns error when not on the review step, when a submission is
    /// already running, or when the backend fails
    pub async fn submit(
        &mut self,
        backend: &dyn ComplaintBackend,
    ) -> Result<(SubmissionReceipt, Navigation), SubmitError> {
        if self.step != WizardStep::Review {
            return Err(SubmitError::NotAtReview);
        }
        if self.submitting {
            return Err(SubmitError::InProgress);
        }

        self.submitting = true;
        let result = backend.submit_complaint(&self.draft).await;
        self.submitting = false;

        let receipt = result?;
        info!(reference = %receipt.reference, "complaint submitted successfully");

        tokio::time::sleep(Duration::from_millis(self.config.redirect_delay_ms)).await;
        Ok((receipt, Navigation::Landing))
    }
}

/// Case-insensitive substring filter over a fixed candidate list
fn filter_suggestions<'a>(candidates: &'a [String], input: &str) -> Vec<&'a str> {
    if input.is_empty() {
        return Vec::new();
    }
    let needle = input.to_lowercase();
    candidates
        .iter()
        .filter(|candidate| candidate.to_lowercase().contains(&needle))
        .map(String::as_str)
        .collect()
}
