//! Input manager for resumes and job descriptions

use crate::error::{Result, ScreenerError};
use crate::input::file_detector::FileType;
use crate::input::page_image::ResumeDocument;
use crate::input::text_extractor::{MarkdownExtractor, PlainTextExtractor, TextExtractor};
use log::info;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub struct InputManager {
    cache: HashMap<PathBuf, String>,
    enable_cache: bool,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
            enable_cache: true,
        }
    }

    pub fn with_cache(mut self, enable: bool) -> Self {
        self.enable_cache = enable;
        self
    }

    /// Read a job description from a text or markdown file
    pub async fn job_description(&mut self, path: &Path) -> Result<String> {
        if self.enable_cache {
            if let Some(cached_text) = self.cache.get(path) {
                info!("Using cached text for: {}", path.display());
                return Ok(cached_text.clone());
            }
        }

        if !path.exists() {
            return Err(ScreenerError::InvalidInput(format!("File does not exist: {}", path.display())));
        }

        let text = match FileType::from_path(path) {
            FileType::Text => {
                info!("Reading job description: {}", path.display());
                PlainTextExtractor.extract(path).await?
            }
            FileType::Markdown => {
                info!("Processing markdown job description: {}", path.display());
                MarkdownExtractor.extract(path).await?
            }
            FileType::Pdf | FileType::Unknown => {
                return Err(ScreenerError::UnsupportedFormat(format!(
                    "Job descriptions must be .txt or .md files: {}",
                    path.display()
                )));
            }
        };

        if text.trim().is_empty() {
            return Err(ScreenerError::InvalidInput(format!("Job description is empty: {}", path.display())));
        }

        if self.enable_cache {
            self.cache.insert(path.to_path_buf(), text.clone());
        }

        Ok(text)
    }

    /// Load a single PDF resume
    pub async fn load_resume(&self, path: &Path) -> Result<ResumeDocument> {
        if !path.exists() {
            return Err(ScreenerError::InvalidInput(format!("File does not exist: {}", path.display())));
        }
        if FileType::from_path(path) != FileType::Pdf {
            return Err(ScreenerError::UnsupportedFormat(format!(
                "Resumes must be PDF files: {}",
                path.display()
            )));
        }

        info!("Loading resume: {}", path.display());
        ResumeDocument::from_path(path).await
    }

    /// Load resumes in the given order, failing on the first invalid path
    pub async fn load_resumes(&self, paths: &[PathBuf]) -> Result<Vec<ResumeDocument>> {
        let mut resumes = Vec::with_capacity(paths.len());
        for path in paths {
            resumes.push(self.load_resume(path).await?);
        }
        Ok(resumes)
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}
