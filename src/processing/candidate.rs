//! Per-resume results of a ranking run

use crate::llm::parser::ContactDetails;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A ranked candidate. Column order matches the CSV export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub filename: String,
    #[serde(rename = "match")]
    pub match_percentage: u8,
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl CandidateRecord {
    pub fn new(filename: impl Into<String>, match_percentage: u8, contact: ContactDetails) -> Self {
        Self {
            filename: filename.into(),
            match_percentage: match_percentage.min(100),
            name: contact.name,
            email: contact.email,
            phone: contact.phone,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    #[error("could not read resume: {0}")]
    Unreadable(String),

    #[error("rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("model request failed: {0}")]
    ModelFailure(String),

    #[error("no usable match percentage: {0}")]
    MalformedScore(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedResume {
    pub filename: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResumeOutcome {
    Ranked(CandidateRecord),
    Skipped(SkippedResume),
}

/// Stable sort, highest match first; equal scores keep submission order
pub fn sort_by_match(candidates: &mut [CandidateRecord]) {
    candidates.sort_by(|a, b| b.match_percentage.cmp(&a.match_percentage));
}
