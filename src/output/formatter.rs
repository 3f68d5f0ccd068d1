//! Output formatters for rankings and single-resume analyses

use crate::config::OutputFormat;
use crate::error::{Result, ScreenerError};
use crate::llm::prompts::Task;
use crate::output::report::*;
use askama::Template;
use colored::{Color, Colorize};
use std::path::Path;

pub const CSV_COLUMNS: [&str; 5] = ["filename", "match", "name", "email", "phone"];

/// Trait for formatting screening reports
pub trait OutputFormatter {
    fn format_ranking(&self, report: &RankingReport) -> Result<String>;
    fn format_analysis(&self, report: &AnalysisReport) -> Result<String>;
    fn supports_format(&self) -> OutputFormat;
}

/// Terminal output with colored match bars
pub struct ConsoleFormatter {
    use_colors: bool,
    detailed: bool,
}

pub struct JsonFormatter {
    pretty: bool,
}

/// Comma-separated export of the ranked candidates
pub struct CsvFormatter;

pub struct MarkdownFormatter {
    include_metadata: bool,
}

pub struct HtmlFormatter {
    include_styles: bool,
}

/// Report generator that coordinates different formatters
pub struct ReportGenerator {
    console_formatter: ConsoleFormatter,
    json_formatter: JsonFormatter,
    csv_formatter: CsvFormatter,
    markdown_formatter: MarkdownFormatter,
    html_formatter: HtmlFormatter,
}

const HTML_STYLES: &str = r#"
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            line-height: 1.6;
            color: #e0e0e0;
            max-width: 960px;
            margin: 0 auto;
            padding: 20px;
            background: #121212;
        }
        .container { background: #1e1e1e; padding: 30px; border-radius: 10px; }
        h1, h2 { color: #28a745; }
        table { width: 100%; border-collapse: collapse; margin: 20px 0; }
        th, td { padding: 10px; border-bottom: 1px solid #333; text-align: left; }
        th { color: #9e9e9e; font-weight: 600; }
        .bar { background: #333; border-radius: 6px; height: 10px; width: 160px; }
        .bar-fill { background: #28a745; border-radius: 6px; height: 10px; }
        .score-low .bar-fill { background: #dc3545; }
        .score-mid .bar-fill { background: #ffc107; }
        .skipped { color: #ffc107; }
        pre { white-space: pre-wrap; background: #2a2a2a; padding: 15px; border-radius: 8px; }
        .metadata { color: #9e9e9e; font-size: 0.9em; margin-top: 30px; }
"#;

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Ranked Candidates</title>
    {% if include_styles %}<style>{{ styles|safe }}</style>{% endif %}
</head>
<body>
<div class="container">
    <h1>Ranked Candidates</h1>
    <p><strong>Job:</strong> {{ job_preview }}</p>
    <p>{{ ranked_count }} of {{ submitted }} resumes ranked &middot; minimum match {{ min_score }}%</p>
    <table>
        <thead>
            <tr><th>#</th><th>Name</th><th>Match</th><th>Email</th><th>Phone</th><th>File</th></tr>
        </thead>
        <tbody>
        {% for candidate in candidates %}
            <tr class="{{ candidate.score_class }}">
                <td>{{ loop.index }}</td>
                <td>{{ candidate.name }}</td>
                <td><div class="bar"><div class="bar-fill" style="width: {{ candidate.score }}%"></div></div>{{ candidate.score }}%</td>
                <td>{{ candidate.email }}</td>
                <td>{{ candidate.phone }}</td>
                <td>{{ candidate.filename }}</td>
            </tr>
        {% endfor %}
        </tbody>
    </table>
    {% if hidden_count > 0 %}<p>{{ hidden_count }} candidates below the minimum match are not shown.</p>{% endif %}
    {% if !skipped.is_empty() %}
    <h2>Skipped Resumes</h2>
    <ul>
    {% for skip in skipped %}
        <li class="skipped"><strong>{{ skip.filename }}</strong>: {{ skip.reason }}</li>
    {% endfor %}
    </ul>
    {% endif %}
    <div class="metadata">Generated {{ generated_at }} by Resume Screener v{{ version }} using {{ model }}</div>
</div>
</body>
</html>"#,
    ext = "html"
)]
struct RankingHtml {
    include_styles: bool,
    styles: &'static str,
    job_preview: String,
    ranked_count: usize,
    submitted: usize,
    min_score: u8,
    candidates: Vec<HtmlCandidate>,
    hidden_count: usize,
    skipped: Vec<HtmlSkip>,
    generated_at: String,
    version: String,
    model: String,
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Resume Analysis</title>
    {% if include_styles %}<style>{{ styles|safe }}</style>{% endif %}
</head>
<body>
<div class="container">
    <h1>Resume Analysis: {{ resume_file }}</h1>
    <p><strong>Job:</strong> {{ job_preview }}</p>
    {% for result in results %}
    <h2>{{ result.title }}</h2>
    {% if let Some(score) = result.score %}
    <div class="bar"><div class="bar-fill" style="width: {{ score }}%"></div></div>
    <p><strong>{{ score }}%</strong></p>
    {% else %}
    <pre>{{ result.response }}</pre>
    {% endif %}
    {% endfor %}
    <div class="metadata">Generated {{ generated_at }} by Resume Screener v{{ version }} using {{ model }}</div>
</div>
</body>
</html>"#,
    ext = "html"
)]
struct AnalysisHtml {
    include_styles: bool,
    styles: &'static str,
    resume_file: String,
    job_preview: String,
    results: Vec<HtmlTaskResult>,
    generated_at: String,
    version: String,
    model: String,
}

struct HtmlCandidate {
    name: String,
    email: String,
    phone: String,
    filename: String,
    score: u8,
    score_class: &'static str,
}

struct HtmlSkip {
    filename: String,
    reason: String,
}

struct HtmlTaskResult {
    title: &'static str,
    response: String,
    score: Option<u8>,
}

fn format_timestamp(metadata: &ReportMetadata) -> String {
    metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

impl ConsoleFormatter {
    pub fn new(use_colors: bool, detailed: bool) -> Self {
        Self { use_colors, detailed }
    }

    fn colorize(&self, text: &str, color: Color) -> String {
        if self.use_colors {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn format_header(&self, title: &str, level: u8) -> String {
        let (prefix, color) = match level {
            1 => ("█", Color::Green),
            2 => ("▓", Color::Cyan),
            _ => ("▒", Color::Yellow),
        };

        if self.use_colors {
            format!("\n{} {}\n", prefix.color(color).bold(), title.color(color).bold())
        } else {
            format!("\n{} {}\n", prefix, title)
        }
    }

    /// Twenty-cell bar, one cell per five percent
    fn match_bar(&self, score: u8) -> String {
        let filled = usize::from(score.min(100)) / 5;
        let bar = format!("{}{}", "█".repeat(filled), "░".repeat(20 - filled));
        let color = match score {
            75..=100 => Color::Green,
            50..=74 => Color::Yellow,
            _ => Color::Red,
        };
        self.colorize(&bar, color)
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_ranking(&self, report: &RankingReport) -> Result<String> {
        let mut output = String::new();

        output.push_str(&self.format_header("RANKED CANDIDATES", 1));
        output.push_str(&format!(
            "Generated: {} | Processing time: {}ms\n",
            format_timestamp(&report.metadata),
            report.metadata.processing_time_ms
        ));
        output.push_str(&format!("Job: {}\n", self.colorize(&report.job.preview, Color::Cyan)));
        output.push_str(&format!(
            "Ranked {} of {} resumes | Minimum match: {}%\n",
            report.candidates.len(),
            report.submitted,
            report.min_score
        ));

        let visible: Vec<_> = report.visible_candidates().collect();
        if visible.is_empty() {
            output.push_str(&format!(
                "\n{}\n",
                self.colorize("No candidates meet the minimum match.", Color::Yellow)
            ));
        }

        for (i, candidate) in visible.iter().enumerate() {
            output.push_str(&self.format_header(&format!("{}. {}", i + 1, candidate.name), 2));
            output.push_str(&format!(
                "{} {}%\n",
                self.match_bar(candidate.match_percentage),
                candidate.match_percentage
            ));
            output.push_str(&format!("  {}\n", candidate.email));
            output.push_str(&format!("  {}\n", candidate.phone));
            if self.detailed {
                output.push_str(&format!("  {}\n", self.colorize(&candidate.filename, Color::BrightBlack)));
            }
        }

        let hidden = report.hidden_count();
        if hidden > 0 {
            output.push_str(&format!("\n{} candidates below {}% hidden\n", hidden, report.min_score));
        }

        if !report.skipped.is_empty() {
            output.push_str(&self.format_header("Skipped Resumes", 3));
            for skip in &report.skipped {
                output.push_str(&format!(
                    "  • {} {}\n",
                    self.colorize(&skip.filename, Color::Yellow),
                    self.colorize(&format!("({})", skip.reason), Color::BrightBlack)
                ));
            }
        }

        output.push_str(&format!(
            "\nGenerated by Resume Screener v{} | Model: {} | Batches: {}\n",
            report.metadata.screener_version, report.metadata.model, report.batches
        ));

        Ok(output)
    }

    fn format_analysis(&self, report: &AnalysisReport) -> Result<String> {
        let mut output = String::new();

        output.push_str(&self.format_header(&format!("RESUME ANALYSIS: {}", report.resume_file), 1));
        if self.detailed {
            output.push_str(&format!("Job: {}\n", self.colorize(&report.job.preview, Color::Cyan)));
        }

        for result in &report.results {
            output.push_str(&self.format_header(result.task.title(), 2));
            match (result.task, result.match_percentage) {
                (Task::Match, Some(score)) => {
                    output.push_str(&format!("{} {}%\n", self.match_bar(score), score));
                }
                _ => {
                    output.push_str(result.response.trim());
                    output.push('\n');
                }
            }
        }

        output.push_str(&format!(
            "\nGenerated by Resume Screener v{} | Model: {} | {}ms\n",
            report.metadata.screener_version, report.metadata.model, report.metadata.processing_time_ms
        ));

        Ok(output)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Console
    }
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn to_json<T: serde::Serialize>(&self, value: &T) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(value)?)
        } else {
            Ok(serde_json::to_string(value)?)
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_ranking(&self, report: &RankingReport) -> Result<String> {
        self.to_json(report)
    }

    fn format_analysis(&self, report: &AnalysisReport) -> Result<String> {
        self.to_json(report)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Json
    }
}

impl OutputFormatter for CsvFormatter {
    fn format_ranking(&self, report: &RankingReport) -> Result<String> {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
        writer.write_record(CSV_COLUMNS)?;
        for candidate in report.visible_candidates() {
            writer.serialize(candidate)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| ScreenerError::OutputFormatting(format!("Failed to flush CSV: {}", e)))?;
        String::from_utf8(bytes).map_err(|e| ScreenerError::OutputFormatting(e.to_string()))
    }

    fn format_analysis(&self, _report: &AnalysisReport) -> Result<String> {
        Err(ScreenerError::OutputFormatting(
            "CSV export is only available for rankings".to_string(),
        ))
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Csv
    }
}

impl MarkdownFormatter {
    pub fn new(include_metadata: bool) -> Self {
        Self { include_metadata }
    }

    /// Keep pipes and newlines from breaking table rows
    fn cell(text: &str) -> String {
        text.replace('|', "\\|").replace('\n', " ")
    }
}

impl OutputFormatter for MarkdownFormatter {
    fn format_ranking(&self, report: &RankingReport) -> Result<String> {
        let mut output = String::new();

        output.push_str("# Ranked Candidates\n\n");
        if self.include_metadata {
            output.push_str(&format!(
                "**Generated:** {} | **Processing Time:** {}ms | **Model:** {}\n\n",
                format_timestamp(&report.metadata),
                report.metadata.processing_time_ms,
                report.metadata.model
            ));
        }
        output.push_str(&format!("**Job:** {}\n\n", report.job.preview));
        output.push_str(&format!(
            "Ranked {} of {} resumes, minimum match {}%.\n\n",
            report.candidates.len(),
            report.submitted,
            report.min_score
        ));

        output.push_str("| # | Name | Match | Email | Phone | File |\n");
        output.push_str("|---|------|-------|-------|-------|------|\n");
        for (i, candidate) in report.visible_candidates().enumerate() {
            output.push_str(&format!(
                "| {} | {} | {}% | {} | {} | `{}` |\n",
                i + 1,
                Self::cell(&candidate.name),
                candidate.match_percentage,
                Self::cell(&candidate.email),
                Self::cell(&candidate.phone),
                Self::cell(&candidate.filename)
            ));
        }
        output.push('\n');

        if !report.skipped.is_empty() {
            output.push_str("## Skipped Resumes\n\n");
            for skip in &report.skipped {
                output.push_str(&format!("- `{}`: {}\n", skip.filename, skip.reason));
            }
            output.push('\n');
        }

        Ok(output)
    }

    fn format_analysis(&self, report: &AnalysisReport) -> Result<String> {
        let mut output = String::new();

        output.push_str(&format!("# Resume Analysis: `{}`\n\n", report.resume_file));
        if self.include_metadata {
            output.push_str(&format!(
                "**Generated:** {} | **Model:** {}\n\n",
                format_timestamp(&report.metadata),
                report.metadata.model
            ));
        }
        output.push_str(&format!("**Job:** {}\n\n", report.job.preview));

        for result in &report.results {
            output.push_str(&format!("## {}\n\n", result.task.title()));
            match result.match_percentage {
                Some(score) => output.push_str(&format!("**{}%**\n\n", score)),
                None => {
                    output.push_str(result.response.trim());
                    output.push_str("\n\n");
                }
            }
        }

        Ok(output)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Markdown
    }
}

impl HtmlFormatter {
    pub fn new(include_styles: bool) -> Self {
        Self { include_styles }
    }

    fn score_class(score: u8) -> &'static str {
        match score {
            75..=100 => "score-high",
            50..=74 => "score-mid",
            _ => "score-low",
        }
    }
}

impl OutputFormatter for HtmlFormatter {
    fn format_ranking(&self, report: &RankingReport) -> Result<String> {
        let template = RankingHtml {
            include_styles: self.include_styles,
            styles: HTML_STYLES,
            job_preview: report.job.preview.clone(),
            ranked_count: report.candidates.len(),
            submitted: report.submitted,
            min_score: report.min_score,
            candidates: report
                .visible_candidates()
                .map(|candidate| HtmlCandidate {
                    name: candidate.name.clone(),
                    email: candidate.email.clone(),
                    phone: candidate.phone.clone(),
                    filename: candidate.filename.clone(),
                    score: candidate.match_percentage,
                    score_class: Self::score_class(candidate.match_percentage),
                })
                .collect(),
            hidden_count: report.hidden_count(),
            skipped: report
                .skipped
                .iter()
                .map(|skip| HtmlSkip {
                    filename: skip.filename.clone(),
                    reason: skip.reason.to_string(),
                })
                .collect(),
            generated_at: format_timestamp(&report.metadata),
            version: report.metadata.screener_version.clone(),
            model: report.metadata.model.clone(),
        };

        template
            .render()
            .map_err(|e| ScreenerError::OutputFormatting(e.to_string()))
    }

    fn format_analysis(&self, report: &AnalysisReport) -> Result<String> {
        let template = AnalysisHtml {
            include_styles: self.include_styles,
            styles: HTML_STYLES,
            resume_file: report.resume_file.clone(),
            job_preview: report.job.preview.clone(),
            results: report
                .results
                .iter()
                .map(|result| HtmlTaskResult {
                    title: result.task.title(),
                    response: result.response.trim().to_string(),
                    score: result.match_percentage,
                })
                .collect(),
            generated_at: format_timestamp(&report.metadata),
            version: report.metadata.screener_version.clone(),
            model: report.metadata.model.clone(),
        };

        template
            .render()
            .map_err(|e| ScreenerError::OutputFormatting(e.to_string()))
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Html
    }
}

impl ReportGenerator {
    pub fn new() -> Self {
        Self {
            console_formatter: ConsoleFormatter::new(true, false),
            json_formatter: JsonFormatter::new(true),
            csv_formatter: CsvFormatter,
            markdown_formatter: MarkdownFormatter::new(true),
            html_formatter: HtmlFormatter::new(true),
        }
    }

    pub fn with_options(use_colors: bool, detailed: bool) -> Self {
        Self {
            console_formatter: ConsoleFormatter::new(use_colors, detailed),
            json_formatter: JsonFormatter::new(true),
            csv_formatter: CsvFormatter,
            markdown_formatter: MarkdownFormatter::new(detailed),
            html_formatter: HtmlFormatter::new(true),
        }
    }

    fn formatter(&self, format: OutputFormat) -> &dyn OutputFormatter {
        match format {
            OutputFormat::Console => &self.console_formatter,
            OutputFormat::Json => &self.json_formatter,
            OutputFormat::Csv => &self.csv_formatter,
            OutputFormat::Markdown => &self.markdown_formatter,
            OutputFormat::Html => &self.html_formatter,
        }
    }

    pub fn ranking(&self, report: &RankingReport, format: OutputFormat) -> Result<String> {
        self.formatter(format).format_ranking(report)
    }

    pub fn analysis(&self, report: &AnalysisReport, format: OutputFormat) -> Result<String> {
        self.formatter(format).format_analysis(report)
    }
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}

pub fn save_report_to_file(content: &str, file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(file_path, content)?;
    Ok(())
}

pub fn suggest_filename(format: OutputFormat, base_name: &str, timestamp: bool) -> String {
    let timestamp_suffix = if timestamp {
        format!("_{}", chrono::Utc::now().format("%Y%m%d_%H%M%S"))
    } else {
        String::new()
    };

    let extension = match format {
        OutputFormat::Console => "txt",
        OutputFormat::Json => "json",
        OutputFormat::Csv => "csv",
        OutputFormat::Markdown => "md",
        OutputFormat::Html => "html",
    };

    format!("{}{}.{}", base_name, timestamp_suffix, extension)
}
