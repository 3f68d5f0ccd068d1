//! Bulk ranking of resumes against one job description
//!
//! Resumes are processed one at a time, in submission order, in fixed-size
//! batches. Each resume costs two model calls (match, then contact). A
//! resume that fails at any step is recorded as skipped with its reason and
//! the run carries on. Candidates are sorted by match once all batches are
//! done.

use crate::config::Config;
use crate::error::{Result, ScreenerError};
use crate::input::page_image::{PageImage, PageRenderer, ResumeDocument};
use crate::llm::client::{GenerationRequest, GenerativeModel};
use crate::llm::parser::{parse_match_percentage, ContactDetails};
use crate::llm::prompts::{PromptCatalog, Task};
use crate::llm::retry::{RetryError, RetryingModel, Sleeper};
use crate::processing::candidate::{sort_by_match, CandidateRecord, ResumeOutcome, SkipReason, SkippedResume};
use crate::processing::throttle::Throttle;
use log::{debug, info, warn};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct BatchSettings {
    pub batch_size: usize,
    pub max_resumes: usize,
    pub jpeg_quality: u8,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            batch_size: 5,
            max_resumes: 15,
            jpeg_quality: 85,
        }
    }
}

impl From<&Config> for BatchSettings {
    fn from(config: &Config) -> Self {
        Self {
            batch_size: config.batch.batch_size.max(1),
            max_resumes: config.batch.max_resumes,
            jpeg_quality: config.render.jpeg_quality,
        }
    }
}

/// Callbacks for reporting progress while a run is underway
pub trait RankingProgress {
    fn resume_finished(&self, _outcome: &ResumeOutcome) {}
    fn batch_finished(&self, _batch: usize, _total_batches: usize, _pause: Option<Duration>) {}
}

/// Progress sink that ignores everything
pub struct NoProgress;

impl RankingProgress for NoProgress {}

#[derive(Debug, Clone)]
pub struct Ranking {
    /// Every ranked candidate, highest match first
    pub candidates: Vec<CandidateRecord>,
    /// Resumes that produced no record, in submission order
    pub skipped: Vec<SkippedResume>,
    pub batches: usize,
}

pub struct BatchRanker<'a, M, R, S> {
    model: &'a RetryingModel<M, S>,
    renderer: &'a R,
    prompts: &'a PromptCatalog,
    settings: BatchSettings,
    throttle: Throttle,
}

impl<'a, M, R, S> BatchRanker<'a, M, R, S>
where
    M: GenerativeModel,
    R: PageRenderer,
    S: Sleeper,
{
    pub fn new(
        model: &'a RetryingModel<M, S>,
        renderer: &'a R,
        prompts: &'a PromptCatalog,
        settings: BatchSettings,
        throttle: Throttle,
    ) -> Self {
        Self {
            model,
            renderer,
            prompts,
            settings,
            throttle,
        }
    }

    /// Reject runs that must not reach the model at all
    pub fn validate(&self, resume_count: usize, job_description: &str) -> Result<()> {
        if job_description.trim().is_empty() {
            return Err(ScreenerError::InvalidInput("Please provide a job description".to_string()));
        }
        if resume_count == 0 {
            return Err(ScreenerError::InvalidInput("Please provide at least one resume".to_string()));
        }
        if resume_count > self.settings.max_resumes {
            return Err(ScreenerError::TooManyResumes {
                count: resume_count,
                max: self.settings.max_resumes,
            });
        }
        Ok(())
    }

    pub async fn rank(
        &mut self,
        resumes: Vec<ResumeDocument>,
        job_description: &str,
        progress: &impl RankingProgress,
    ) -> Result<Ranking> {
        self.validate(resumes.len(), job_description)?;

        let batch_size = self.settings.batch_size.max(1);
        let total_batches = resumes.len().div_ceil(batch_size);
        info!(
            "Ranking {} resumes in {} batches of up to {}",
            resumes.len(),
            total_batches,
            batch_size
        );

        let mut candidates = Vec::with_capacity(resumes.len());
        let mut skipped = Vec::new();
        let mut remaining = resumes.into_iter().peekable();
        let mut batch = 0;

        while remaining.peek().is_some() {
            batch += 1;
            debug!("Starting batch {}/{}", batch, total_batches);

            for resume in remaining.by_ref().take(batch_size) {
                let outcome = self.process_resume(resume, job_description).await;
                progress.resume_finished(&outcome);
                match outcome {
                    ResumeOutcome::Ranked(candidate) => candidates.push(candidate),
                    ResumeOutcome::Skipped(skip) => {
                        warn!("Skipping '{}': {}", skip.filename, skip.reason);
                        skipped.push(skip);
                    }
                }
            }

            let pause = self.throttle.after_batch();
            progress.batch_finished(batch, total_batches, pause);
            if let Some(pause) = pause {
                debug!("Batch {} done, pausing {:?}", batch, pause);
                self.model.sleeper().sleep(pause).await;
            }
        }

        sort_by_match(&mut candidates);
        info!("Ranked {} candidates, skipped {}", candidates.len(), skipped.len());

        Ok(Ranking {
            candidates,
            skipped,
            batches: batch,
        })
    }

    async fn process_resume(&mut self, resume: ResumeDocument, job_description: &str) -> ResumeOutcome {
        let filename = resume.filename.clone();
        match self.evaluate(resume, job_description).await {
            Ok(candidate) => ResumeOutcome::Ranked(candidate),
            Err(reason) => ResumeOutcome::Skipped(SkippedResume { filename, reason }),
        }
    }

    async fn evaluate(
        &mut self,
        resume: ResumeDocument,
        job_description: &str,
    ) -> std::result::Result<CandidateRecord, SkipReason> {
        let filename = resume.filename.clone();
        let image = resume
            .into_page_image(self.renderer, self.settings.jpeg_quality)
            .map_err(|e| SkipReason::Unreadable(e.to_string()))?;

        let match_response = self.ask(Task::Match, job_description, &image).await?;
        let score = parse_match_percentage(&match_response).map_err(|e| SkipReason::MalformedScore(e.to_string()))?;

        let contact_response = self.ask(Task::Contact, "", &image).await?;
        let contact = ContactDetails::parse(&contact_response);

        debug!("'{}' scored {}%", filename, score);
        Ok(CandidateRecord::new(filename, score, contact))
    }

    async fn ask(
        &mut self,
        task: Task,
        context: &str,
        image: &PageImage,
    ) -> std::result::Result<String, SkipReason> {
        if let Some(wait) = self.throttle.before_request(Instant::now()) {
            debug!("Pacing {} request, waiting {:?}", task, wait);
            self.model.sleeper().sleep(wait).await;
        }

        let request = GenerationRequest {
            context,
            image,
            instruction: self.prompts.instruction(task),
        };

        match self.model.generate(&request).await {
            Ok(generated) => {
                self.throttle.observe_rate_limits(generated.rate_limited);
                Ok(generated.text)
            }
            Err(RetryError::Exhausted { attempts }) => {
                self.throttle.observe_rate_limits(attempts);
                Err(SkipReason::RateLimited { attempts })
            }
            Err(RetryError::Fatal(err)) => Err(SkipReason::ModelFailure(err.to_string())),
        }
    }
}
