//! Resume screener: rank and analyze PDF resumes against a job description

use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};
use resume_screener::cli::{self, Cli, Commands, ConfigAction};
use resume_screener::config::{Config, OutputFormat};
use resume_screener::error::{Result, ScreenerError};
use resume_screener::input::manager::InputManager;
use resume_screener::input::page_image::PdfiumRenderer;
use resume_screener::llm::client::GeminiClient;
use resume_screener::llm::prompts::{PromptCatalog, Task};
use resume_screener::llm::retry::{RetryPolicy, RetryingModel, TokioSleeper};
use resume_screener::output::formatter::{
    save_report_to_file, suggest_filename, CsvFormatter, OutputFormatter, ReportGenerator,
};
use resume_screener::output::report::{AnalysisReport, JobSummary, RankingReport, ReportMetadata};
use resume_screener::processing::analyzer::ResumeAnalyzer;
use resume_screener::processing::batch::{BatchRanker, BatchSettings, RankingProgress};
use resume_screener::processing::candidate::ResumeOutcome;
use resume_screener::processing::throttle::Throttle;
use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, Instant};

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    if dotenvy::dotenv().is_ok() {
        info!("Loaded environment from .env");
    }

    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);
    let config = match Config::load(Some(&config_path)) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command, config, &config_path).await {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

async fn run_command(command: Commands, config: Config, config_path: &Path) -> Result<()> {
    match command {
        Commands::Analyze {
            resume,
            job,
            job_text,
            task,
            output,
            save,
        } => {
            let format = cli::analysis_output_format(output.as_deref(), config.output.format)
                .map_err(ScreenerError::InvalidInput)?;
            cli::validate_file_extension(&resume, &["pdf"])
                .map_err(|e| ScreenerError::InvalidInput(format!("Resume file: {}", e)))?;

            let mut input_manager = InputManager::new();
            let (job_summary, job_description) = resolve_job(&mut input_manager, job, job_text).await?;
            let document = input_manager.load_resume(&resume).await?;

            let prompts = PromptCatalog::standard();
            let client = GeminiClient::from_config(&config.model)?;
            let model_name = client.model().to_string();
            let model = RetryingModel::new(client, TokioSleeper, RetryPolicy::from(&config.retry));
            let renderer = PdfiumRenderer::new(config.render.target_width)?;

            println!("🔍 Analyzing {} ({})", resume.display(), task_list(&task));
            let started = Instant::now();

            let analyzer = ResumeAnalyzer::new(&model, &renderer, &prompts, config.render.jpeg_quality);
            let results = analyzer.analyze(document, &job_description, &task).await?;

            let report = AnalysisReport {
                resume_file: display_name(&resume),
                job: job_summary,
                results,
                metadata: ReportMetadata::new(model_name, elapsed_ms(started)),
            };

            let generator = ReportGenerator::with_options(config.output.color_output, config.output.detailed);
            let content = generator.analysis(&report, format)?;
            emit(&content, save.as_deref())?;
        }

        Commands::Rank {
            job,
            job_text,
            resumes,
            min_score,
            batch_size,
            output,
            save,
            export,
        } => {
            let format = resolve_format(output.as_deref(), &config)?;
            for resume in &resumes {
                cli::validate_file_extension(resume, &["pdf"])
                    .map_err(|e| ScreenerError::InvalidInput(format!("{}: {}", resume.display(), e)))?;
            }

            let mut settings = BatchSettings::from(&config);
            if let Some(size) = batch_size {
                settings.batch_size = usize::try_from(size).unwrap_or(usize::MAX);
            }
            if resumes.len() > settings.max_resumes {
                return Err(ScreenerError::TooManyResumes {
                    count: resumes.len(),
                    max: settings.max_resumes,
                });
            }

            let mut input_manager = InputManager::new();
            let (job_summary, job_description) = resolve_job(&mut input_manager, job, job_text).await?;
            let documents = input_manager.load_resumes(&resumes).await?;

            let prompts = PromptCatalog::standard();
            let client = GeminiClient::from_config(&config.model)?;
            let model_name = client.model().to_string();
            let model = RetryingModel::new(client, TokioSleeper, RetryPolicy::from(&config.retry));
            let renderer = PdfiumRenderer::new(config.render.target_width)?;

            let mut ranker = BatchRanker::new(&model, &renderer, &prompts, settings, Throttle::from_config(&config.batch));
            ranker.validate(documents.len(), &job_description)?;

            println!(
                "🚀 Ranking {} resumes in batches of {}",
                documents.len(),
                settings.batch_size
            );
            let started = Instant::now();
            let progress = BatchProgress::new(documents.len());
            let ranking = ranker.rank(documents, &job_description, &progress).await?;
            progress.finish();

            let min_score = min_score.unwrap_or(config.output.min_score);
            let report = RankingReport::new(
                job_summary,
                resumes.len(),
                min_score,
                ranking,
                ReportMetadata::new(model_name, elapsed_ms(started)),
            );

            let generator = ReportGenerator::with_options(config.output.color_output, config.output.detailed);
            let content = generator.ranking(&report, format)?;
            emit(&content, save.as_deref())?;

            if let Some(export_path) = export {
                let export_path = if export_path.is_dir() {
                    export_path.join(suggest_filename(OutputFormat::Csv, "ranked_candidates", false))
                } else {
                    export_path
                };
                let csv = CsvFormatter.format_ranking(&report)?;
                save_report_to_file(&csv, &export_path)?;
                println!("📁 Exported {} candidates to {}", report.visible_candidates().count(), export_path.display());
            }
        }

        Commands::Config { action } => match action {
            Some(ConfigAction::Show) | None => {
                println!("⚙️  Current Configuration\n");
                println!("Model: {} ({})", config.model.model, config.model.endpoint);
                println!("API key variable: {}", config.model.api_key_env);
                println!(
                    "Retries: {} (backoff factor {})",
                    config.retry.max_retries, config.retry.backoff_factor
                );
                println!(
                    "Batches: {} resumes, at most {} per run, throttle {:?}",
                    config.batch.batch_size, config.batch.max_resumes, config.batch.throttle
                );
                println!("Batch delay: {:?}", config.batch_delay());
                println!(
                    "Rendering: {}px wide, JPEG quality {}",
                    config.render.target_width, config.render.jpeg_quality
                );
                println!(
                    "Output: {:?}, minimum match {}%",
                    config.output.format, config.output.min_score
                );
            }

            Some(ConfigAction::Path) => {
                println!("{}", config_path.display());
            }

            Some(ConfigAction::Reset) => {
                println!("🔄 Resetting configuration to defaults...");
                Config::default().save_to(config_path)?;
                println!("✅ Configuration reset successfully!");
            }

            Some(ConfigAction::Set { key, value }) => {
                let updated = config.with_value(&key, &value)?;
                updated.save_to(config_path)?;
                println!("✅ Set {} = {}", key, value);
            }
        },
    }

    Ok(())
}

/// Progress bar advanced once per resume
struct BatchProgress {
    bar: ProgressBar,
}

impl BatchProgress {
    fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl RankingProgress for BatchProgress {
    fn resume_finished(&self, outcome: &ResumeOutcome) {
        match outcome {
            ResumeOutcome::Ranked(candidate) => {
                self.bar
                    .set_message(format!("{} scored {}%", candidate.filename, candidate.match_percentage));
            }
            ResumeOutcome::Skipped(skip) => {
                self.bar
                    .println(format!("{} {}: {}", "skipped".yellow(), skip.filename, skip.reason));
            }
        }
        self.bar.inc(1);
    }

    fn batch_finished(&self, batch: usize, total_batches: usize, pause: Option<Duration>) {
        match pause {
            Some(pause) => self.bar.set_message(format!(
                "batch {}/{} done, waiting {}s",
                batch,
                total_batches,
                pause.as_secs()
            )),
            None => self.bar.set_message(format!("batch {}/{} done", batch, total_batches)),
        }
    }
}

/// Job description from a file, inline text, or nothing at all
async fn resolve_job(
    input_manager: &mut InputManager,
    job: Option<PathBuf>,
    job_text: Option<String>,
) -> Result<(JobSummary, String)> {
    match (job, job_text) {
        (Some(path), _) => {
            cli::validate_file_extension(&path, &["txt", "md"])
                .map_err(|e| ScreenerError::InvalidInput(format!("Job description file: {}", e)))?;
            let text = input_manager.job_description(&path).await?;
            Ok((JobSummary::new(path.display().to_string(), &text), text))
        }
        (None, Some(text)) => Ok((JobSummary::new("inline", &text), text)),
        (None, None) => Ok((JobSummary::new("none", ""), String::new())),
    }
}

fn resolve_format(output: Option<&str>, config: &Config) -> Result<OutputFormat> {
    match output {
        Some(format) => cli::parse_output_format(format).map_err(ScreenerError::InvalidInput),
        None => Ok(config.output.format),
    }
}

fn emit(content: &str, save: Option<&Path>) -> Result<()> {
    match save {
        Some(path) => {
            save_report_to_file(content, path)?;
            println!("💾 Report saved to {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn task_list(tasks: &[Task]) -> String {
    tasks.iter().map(Task::to_string).collect::<Vec<_>>().join(", ")
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
