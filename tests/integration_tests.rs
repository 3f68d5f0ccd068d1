//! Integration tests for the resume screener

use image::{DynamicImage, RgbaImage};
use resume_screener::config::Config;
use resume_screener::input::manager::InputManager;
use resume_screener::input::page_image::{PageRenderer, ResumeDocument};
use resume_screener::llm::client::{GenerationRequest, GenerativeModel, ModelError};
use resume_screener::llm::prompts::{PromptCatalog, Task};
use resume_screener::llm::retry::{RetryPolicy, RetryingModel, Sleeper};
use resume_screener::output::formatter::{save_report_to_file, CsvFormatter, OutputFormatter};
use resume_screener::output::report::{JobSummary, RankingReport, ReportMetadata};
use resume_screener::processing::analyzer::ResumeAnalyzer;
use resume_screener::processing::batch::{BatchRanker, BatchSettings, NoProgress};
use resume_screener::processing::candidate::SkipReason;
use resume_screener::processing::throttle::Throttle;
use resume_screener::ScreenerError;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

const JOB: &str = "Seeking a backend engineer with 3 years Python experience";

/// Answers match requests with queued scores and contact requests with a fixed card
struct QueuedModel {
    match_instruction: String,
    scores: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl QueuedModel {
    fn new(prompts: &PromptCatalog, scores: &[&str]) -> Self {
        Self {
            match_instruction: prompts.instruction(Task::Match).to_string(),
            scores: Mutex::new(scores.iter().map(|s| s.to_string()).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl GenerativeModel for QueuedModel {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, ModelError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if request.instruction == self.match_instruction {
            assert_eq!(request.context, JOB);
            self.scores.lock().unwrap().pop_front().ok_or(ModelError::EmptyResponse)
        } else {
            assert!(request.context.is_empty());
            Ok(format!(
                "Name: Candidate {}\nEmail: candidate{}@example.com\nPhone: +1 555 010{}",
                call, call, call % 10
            ))
        }
    }
}

/// Always rate limited
struct BusyModel;

impl GenerativeModel for BusyModel {
    async fn generate(&self, _request: &GenerationRequest<'_>) -> Result<String, ModelError> {
        Err(ModelError::Api {
            status: 429,
            message: "RESOURCE_EXHAUSTED".to_string(),
        })
    }
}

#[derive(Default)]
struct RecordedWaits(Mutex<Vec<Duration>>);

impl Sleeper for RecordedWaits {
    async fn sleep(&self, duration: Duration) {
        self.0.lock().unwrap().push(duration);
    }
}

struct BlankPage;

impl PageRenderer for BlankPage {
    fn render_first_page(&self, pdf: &[u8]) -> resume_screener::Result<DynamicImage> {
        if pdf.starts_with(b"%PDF") {
            Ok(DynamicImage::ImageRgba8(RgbaImage::new(10, 14)))
        } else {
            Err(ScreenerError::PdfRender("file is not a PDF".to_string()))
        }
    }
}

fn resumes(count: usize) -> Vec<ResumeDocument> {
    (0..count)
        .map(|i| ResumeDocument::new(format!("resume_{:02}.pdf", i), b"%PDF-1.4 test".to_vec()))
        .collect()
}

#[tokio::test]
async fn test_job_description_from_txt() {
    let mut manager = InputManager::new();
    let text = manager.job_description(Path::new("tests/fixtures/sample_job.txt")).await.unwrap();

    assert!(text.contains("Senior Backend Engineer"));
    assert!(text.contains("PostgreSQL"));
}

#[tokio::test]
async fn test_job_description_from_markdown() {
    let mut manager = InputManager::new();
    let text = manager.job_description(Path::new("tests/fixtures/sample_job.md")).await.unwrap();

    assert!(text.contains("backend engineer"));
    assert!(text.contains("Docker"));
    // Should not contain markdown formatting
    assert!(!text.contains("**"));
    assert!(!text.contains("##"));
}

#[tokio::test]
async fn test_caching_functionality() {
    let mut manager = InputManager::new();
    let path = Path::new("tests/fixtures/sample_job.txt");

    let text1 = manager.job_description(path).await.unwrap();
    assert_eq!(manager.cache_size(), 1);

    let text2 = manager.job_description(path).await.unwrap();
    assert_eq!(text1, text2);
    assert_eq!(manager.cache_size(), 1);

    manager.clear_cache();
    assert_eq!(manager.cache_size(), 0);
}

#[tokio::test]
async fn test_unusable_job_descriptions() {
    let mut manager = InputManager::new();

    assert!(matches!(
        manager.job_description(Path::new("tests/fixtures/unsupported.xyz")).await,
        Err(ScreenerError::UnsupportedFormat(_))
    ));
    assert!(matches!(
        manager.job_description(Path::new("tests/fixtures/empty_job.txt")).await,
        Err(ScreenerError::InvalidInput(_))
    ));
    assert!(manager.job_description(Path::new("tests/fixtures/nonexistent.txt")).await.is_err());
}

#[tokio::test]
async fn test_resumes_must_be_pdf_files() {
    let manager = InputManager::new();

    let resume = manager.load_resume(Path::new("tests/fixtures/alice.pdf")).await.unwrap();
    assert_eq!(resume.filename, "alice.pdf");
    assert!(resume.bytes.starts_with(b"%PDF"));

    assert!(manager.load_resume(Path::new("tests/fixtures/sample_job.txt")).await.is_err());

    let paths = vec![PathBuf::from("tests/fixtures/alice.pdf"), PathBuf::from("tests/fixtures/missing.pdf")];
    assert!(manager.load_resumes(&paths).await.is_err());
}

#[tokio::test]
async fn test_ranking_end_to_end() {
    let prompts = PromptCatalog::standard();
    let model = RetryingModel::new(
        QueuedModel::new(&prompts, &["41", "Match: 92%", "73", "88", "0", "100", "55"]),
        RecordedWaits::default(),
        RetryPolicy::default(),
    );
    let settings = BatchSettings {
        batch_size: 5,
        max_resumes: 15,
        jpeg_quality: 80,
    };
    let mut ranker = BatchRanker::new(
        &model,
        &BlankPage,
        &prompts,
        settings,
        Throttle::BatchDelay(Duration::from_secs(10)),
    );

    let ranking = ranker.rank(resumes(7), JOB, &NoProgress).await.unwrap();

    let order: Vec<(&str, u8)> = ranking
        .candidates
        .iter()
        .map(|c| (c.filename.as_str(), c.match_percentage))
        .collect();
    assert_eq!(
        order,
        vec![
            ("resume_05.pdf", 100),
            ("resume_01.pdf", 92),
            ("resume_03.pdf", 88),
            ("resume_02.pdf", 73),
            ("resume_06.pdf", 55),
            ("resume_00.pdf", 41),
            ("resume_04.pdf", 0),
        ]
    );
    assert_eq!(ranking.batches, 2);
    assert_eq!(model.inner().calls(), 14);
    assert_eq!(
        *model.sleeper().0.lock().unwrap(),
        vec![Duration::from_secs(10), Duration::from_secs(10)]
    );

    let top = &ranking.candidates[0];
    assert!(top.name.starts_with("Candidate "));
    assert!(top.email.ends_with("@example.com"));
}

#[tokio::test]
async fn test_sixteen_resumes_rejected_before_any_request() {
    let prompts = PromptCatalog::standard();
    let model = RetryingModel::new(QueuedModel::new(&prompts, &[]), RecordedWaits::default(), RetryPolicy::default());
    let mut ranker = BatchRanker::new(
        &model,
        &BlankPage,
        &prompts,
        BatchSettings::default(),
        Throttle::BatchDelay(Duration::from_secs(10)),
    );

    let result = ranker.rank(resumes(16), JOB, &NoProgress).await;

    assert!(matches!(result, Err(ScreenerError::TooManyResumes { count: 16, max: 15 })));
    assert_eq!(model.inner().calls(), 0);
    assert!(model.sleeper().0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_rate_limited_resumes_are_skipped() {
    let prompts = PromptCatalog::standard();
    let model = RetryingModel::new(BusyModel, RecordedWaits::default(), RetryPolicy::default());
    let mut ranker = BatchRanker::new(
        &model,
        &BlankPage,
        &prompts,
        BatchSettings::default(),
        Throttle::BatchDelay(Duration::from_secs(10)),
    );

    let ranking = ranker.rank(resumes(2), JOB, &NoProgress).await.unwrap();

    assert!(ranking.candidates.is_empty());
    assert_eq!(ranking.skipped.len(), 2);
    assert_eq!(ranking.skipped[0].reason, SkipReason::RateLimited { attempts: 3 });

    // two backoff waits per resume, then one batch pause
    let waits = model.sleeper().0.lock().unwrap().clone();
    assert_eq!(waits.len(), 5);
    assert!(waits[0] >= Duration::from_secs(2) && waits[0] < Duration::from_secs(3));
    assert!(waits[1] >= Duration::from_secs(4) && waits[1] < Duration::from_secs(5));
    assert_eq!(waits[4], Duration::from_secs(10));
}

#[tokio::test]
async fn test_contact_only_analysis_needs_no_job_description() {
    let prompts = PromptCatalog::standard();
    let model = RetryingModel::new(QueuedModel::new(&prompts, &[]), RecordedWaits::default(), RetryPolicy::default());
    let analyzer = ResumeAnalyzer::new(&model, &BlankPage, &prompts, 85);

    let results = analyzer
        .analyze(ResumeDocument::new("alice.pdf", b"%PDF-1.7".to_vec()), "", &[Task::Contact])
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    let contact = results[0].contact.as_ref().unwrap();
    assert_eq!(contact.name, "Candidate 0");
    assert_eq!(contact.phone, "+1 555 0100");
}

#[tokio::test]
async fn test_csv_export_written_to_disk() {
    let prompts = PromptCatalog::standard();
    let model = RetryingModel::new(
        QueuedModel::new(&prompts, &["35", "80"]),
        RecordedWaits::default(),
        RetryPolicy::default(),
    );
    let mut ranker = BatchRanker::new(
        &model,
        &BlankPage,
        &prompts,
        BatchSettings::default(),
        Throttle::BatchDelay(Duration::ZERO),
    );
    let ranking = ranker.rank(resumes(2), JOB, &NoProgress).await.unwrap();
    let report = RankingReport::new(
        JobSummary::new("inline", JOB),
        2,
        50,
        ranking,
        ReportMetadata::new("test-model", 5),
    );

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("exports").join("ranked_candidates.csv");
    save_report_to_file(&CsvFormatter.format_ranking(&report).unwrap(), &path).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines[0], "filename,match,name,email,phone");
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("resume_01.pdf,80,Candidate 3,candidate3@example.com,"));
}

#[test]
fn test_config_created_and_updated() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");

    let config = Config::load(Some(&path)).unwrap();
    assert!(path.exists());
    assert_eq!(config.batch.batch_size, 5);

    let updated = config.with_value("batch.batch_size", "3").unwrap();
    updated.save_to(&path).unwrap();
    assert_eq!(Config::load(Some(&path)).unwrap().batch.batch_size, 3);

    assert!(config.with_value("batch.batch_size", "0").is_err());
}
