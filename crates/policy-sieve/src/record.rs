use std::fmt;

use serde::{Deserialize, Serialize};

/// A page observed by the browser extension, as received on ingress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
    pub url: String,
    #[serde(default)]
    pub login_detected: bool,
    #[serde(default)]
    pub policy_links: Vec<String>,
}

impl NewRecord {
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.policy_links)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RecordId(pub(crate) usize);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProcessingState {
    Received,
    Queued,
    Processed,
}

/// An admitted record.
///
/// Policy links are frozen at admission, only the state and extracted text evolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    id: RecordId,
    source_url: String,
    login_detected: bool,
    policy_links: Vec<String>,
    state: ProcessingState,
    extracted_text: String,
}

impl Record {
    pub(crate) fn admit(id: RecordId, new: NewRecord) -> Self {
        let state = if new.policy_links.is_empty() {
            ProcessingState::Received
        } else {
            ProcessingState::Queued
        };
        Self {
            id,
            source_url: new.url,
            login_detected: new.login_detected,
            policy_links: new.policy_links,
            state,
            extracted_text: String::new(),
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn login_detected(&self) -> bool {
        self.login_detected
    }

    pub fn policy_links(&self) -> &[String] {
        &self.policy_links
    }

    pub fn state(&self) -> ProcessingState {
        self.state
    }

    pub fn extracted_text(&self) -> &str {
        &self.extracted_text
    }

    pub fn is_processed(&self) -> bool {
        self.state == ProcessingState::Processed
    }

    /// Stores the scraped text, once every link has been attempted.
    pub fn complete(&mut self, text: String) {
        self.extracted_text = text;
        self.state = ProcessingState::Processed;
    }
}

/// Order independent key of a policy link set: the sorted links as a JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of<S: AsRef<str>>(links: &[S]) -> Self {
        let mut sorted = links.iter().map(AsRef::as_ref).collect::<Vec<&str>>();
        sorted.sort_unstable();
        // A list of strings always serializes
        Self(serde_json::to_string(&sorted).unwrap_or_default())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
