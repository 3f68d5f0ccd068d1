//! Report structures handed to the formatters

use crate::processing::analyzer::TaskResult;
use crate::processing::batch::Ranking;
use crate::processing::candidate::{CandidateRecord, SkippedResume};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where the job description came from and what it starts with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub source: String,
    pub preview: String,
}

impl JobSummary {
    pub fn new(source: impl Into<String>, text: &str) -> Self {
        Self {
            source: source.into(),
            preview: truncate_text(text, 160),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub processing_time_ms: u64,
    pub model: String,
    pub screener_version: String,
}

impl ReportMetadata {
    pub fn new(model: impl Into<String>, processing_time_ms: u64) -> Self {
        Self {
            generated_at: Utc::now(),
            processing_time_ms,
            model: model.into(),
            screener_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Outcome of a bulk ranking run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingReport {
    pub job: JobSummary,
    pub submitted: usize,
    pub min_score: u8,
    /// All ranked candidates, highest match first, before the score threshold
    pub candidates: Vec<CandidateRecord>,
    pub skipped: Vec<SkippedResume>,
    pub batches: usize,
    pub metadata: ReportMetadata,
}

impl RankingReport {
    pub fn new(job: JobSummary, submitted: usize, min_score: u8, ranking: Ranking, metadata: ReportMetadata) -> Self {
        Self {
            job,
            submitted,
            min_score: min_score.min(100),
            candidates: ranking.candidates,
            skipped: ranking.skipped,
            batches: ranking.batches,
            metadata,
        }
    }

    /// Candidates at or above the minimum score, still in rank order
    pub fn visible_candidates(&self) -> impl Iterator<Item = &CandidateRecord> {
        self.candidates
            .iter()
            .filter(move |candidate| candidate.match_percentage >= self.min_score)
    }

    pub fn hidden_count(&self) -> usize {
        self.candidates.len() - self.visible_candidates().count()
    }
}

/// Outcome of a single-resume analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub resume_file: String,
    pub job: JobSummary,
    pub results: Vec<TaskResult>,
    pub metadata: ReportMetadata,
}

/// Truncate text to a maximum number of characters, ending on a word boundary
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    let flattened = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flattened.chars().count() <= max_chars {
        return flattened;
    }

    let truncated: String = flattened.chars().take(max_chars).collect();
    let cut = truncated.rfind(' ').unwrap_or(truncated.len());
    format!("{}...", &truncated[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::parser::ContactDetails;

    fn ranking(scores: &[u8]) -> Ranking {
        Ranking {
            candidates: scores
                .iter()
                .enumerate()
                .map(|(i, score)| CandidateRecord::new(format!("{}.pdf", i), *score, ContactDetails::default()))
                .collect(),
            skipped: Vec::new(),
            batches: 1,
        }
    }

    #[test]
    fn test_visible_candidates_apply_threshold() {
        let report = RankingReport::new(
            JobSummary::new("inline", "Backend engineer"),
            4,
            60,
            ranking(&[90, 75, 60, 12]),
            ReportMetadata::new("gemini-1.5-flash", 10),
        );

        let visible: Vec<u8> = report.visible_candidates().map(|c| c.match_percentage).collect();
        assert_eq!(visible, vec![90, 75, 60]);
        assert_eq!(report.hidden_count(), 1);
        assert_eq!(report.candidates.len(), 4);
    }

    #[test]
    fn test_truncate_text_on_word_boundary() {
        assert_eq!(truncate_text("short text", 50), "short text");
        assert_eq!(truncate_text("Seeking a backend\n engineer with Python", 20), "Seeking a backend...");
        assert_eq!(truncate_text("Développeur backend confirmé", 12), "Développeur...");
    }
}
