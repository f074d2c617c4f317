use chrono::{DateTime, Utc};
use regex::Regex;
use thiserror::Error;
use tracing::debug;

/// Sentinel for name/location/incident fields with no pattern match
pub const UNKNOWN: &str = "Unknown";
/// Sentinel for the contact number and raw description when absent
pub const NOT_PROVIDED: &str = "Not provided";

/// Name rules: introduction phrases followed by one or two capitalized words
const NAME_PATTERNS: &[&str] = &[
    r"(?i)\bmy name is\s+([A-Za-z]+(?:\s+[A-Za-z]+)?)",
    r"(?i)\bthis is\s+([A-Za-z]+(?:\s+[A-Za-z]+)?)",
    r"(?i)\bi(?:'m| am)\s+([A-Za-z]+(?:\s+[A-Za-z]+)?)",
];

/// Location rules: prepositional phrases ending in a street-type word, then
/// an explicit "location is ..." fallback
const LOCATION_PATTERNS: &[&str] = &[
    r"(?i)\b(?:at|near|on)\s+([A-Za-z0-9][A-Za-z0-9\s]*?(?:street|st|road|rd|avenue|ave|lane|alley|colony|nagar))\b",
    r"(?i)\blocation is\s+([^,.]+)",
    r"(?i)\bi(?:'m| am) (?:at|near)\s+([^,.]+)",
];

/// Incident rules: known category keywords, then "report a ..." phrasing
const INCIDENT_PATTERNS: &[&str] = &[
    r"(?i)\b(theft|robbery|burglary|noise|traffic|harassment|vandalism|fraud|fire|assault|accident|suspicious activity|domestic dispute)\b",
    r"(?i)\breport(?:ing)?\s+an?\s+([a-z]+)",
];

/// Contact rules: phrased numbers first, then any plausible digit run
const CONTACT_PATTERNS: &[&str] = &[
    r"(?i)\b(?:number is|call me at|reach me at|contact)\s*:?\s*(\+?\d[\d\s\-]{5,14}\d)",
    r"(\+?\d[\d\s\-]{5,14}\d)",
];

/// Errors building an extraction rule set
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A rule pattern failed to compile
    #[error("invalid extraction pattern {pattern:?}: {source}")]
    Pattern {
        /// The offending pattern text
        pattern: String,
        /// Underlying regex error
        source: regex::Error,
    },
}

/// Structured fields pulled from a call transcript
///
/// Derived, not authoritative: overwritten every time new final transcript
/// text arrives.
#[derive(Debug, Clone)]
pub struct ExtractedFields {
    pub name: String,
    pub location: String,
    pub complaint_type: String,
    pub contact_number: String,
    pub raw_description: String,
    pub timestamp: DateTime<Utc>,
}

impl ExtractedFields {
    /// All fields at their documented sentinel values
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            name: UNKNOWN.to_owned(),
            location: UNKNOWN.to_owned(),
            complaint_type: UNKNOWN.to_owned(),
            contact_number: NOT_PROVIDED.to_owned(),
            raw_description: NOT_PROVIDED.to_owned(),
            timestamp: Utc::now(),
        }
    }

    /// Whether the name rules produced a usable value
    #[must_use]
    pub fn has_name(&self) -> bool {
        self.name != UNKNOWN
    }
}

/// Ordered first-match-wins rule sets, one per extracted field
pub struct ExtractionRules {
    name: Vec<Regex>,
    location: Vec<Regex>,
    incident: Vec<Regex>,
    contact: Vec<Regex>,
}

impl ExtractionRules {
    /// Compile the standard rule sets
    ///
    /// # Errors
    /// Returns error if any built-in pattern fails to compile
    pub fn standard() -> Result<Self, ExtractError> {
        Ok(Self {
            name: compile_all(NAME_PATTERNS)?,
            location: compile_all(LOCATION_PATTERNS)?,
            incident: compile_all(INCIDENT_PATTERNS)?,
            contact: compile_all(CONTACT_PATTERNS)?,
        })
    }

    /// Run every rule set over the transcript
    ///
    /// Each field takes the first matching rule's first capture group,
    /// trimmed; unmatched fields keep their sentinel defaults. The raw
    /// transcript lands in `raw_description` so nothing said on the call is
    /// lost to a non-matching rule.
    #[must_use]
    pub fn extract(&self, transcript: &str) -> ExtractedFields {
        let mut fields = ExtractedFields::defaults();

        let transcript = transcript.trim();
        if transcript.is_empty() {
            debug!("empty transcript, all fields defaulted");
            return fields;
        }

        if let Some(value) = first_match(&self.name, transcript) {
            fields.name = value;
        }
        if let Some(value) = first_match(&self.location, transcript) {
            fields.location = value;
        }
        if let Some(value) = first_match(&self.incident, transcript) {
            fields.complaint_type = value;
        }
        if let Some(value) = first_match(&self.contact, transcript) {
            fields.contact_number = value;
        }
        fields.raw_description = transcript.to_owned();

        debug!(
            name = %fields.name,
            location = %fields.location,
            incident = %fields.complaint_type,
            contact = %fields.contact_number,
            "transcript extraction complete"
        );

        fields
    }
}

fn compile_all(patterns: &[&str]) -> Result<Vec<Regex>, ExtractError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| ExtractError::Pattern {
                pattern: (*pattern).to_owned(),
                source,
            })
        })
        .collect()
}

/// First capture group of the first rule that matches, trimmed
fn first_match(rules: &[Regex], text: &str) -> Option<String> {
    for rule in rules {
        if let Some(captures) = rule.captures(text) {
            if let Some(value) = captures.get(1) {
                let value = value.as_str().trim();
                if !value.is_empty() {
                    return Some(value.to_owned());
                }
            }
        }
    }
    None
}
