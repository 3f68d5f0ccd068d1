//! Configuration management for the resume screener

use crate::error::{Result, ScreenerError};
use anyhow::{anyhow, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Largest accepted `retry.backoff_factor`
pub const MAX_BACKOFF_FACTOR: f64 = 10.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub model: ModelConfig,
    pub retry: RetryConfig,
    pub batch: BatchConfig,
    pub render: RenderConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Base URL of the `generateContent` API, without the model segment
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub backoff_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub batch_size: usize,
    pub max_resumes: usize,
    pub throttle: ThrottleKind,
    pub batch_delay_secs: u64,
    pub requests_per_minute: u32,
    pub burst: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThrottleKind {
    BatchDelay,
    TokenBucket,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub target_width: i32,
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub min_score: u8,
    pub detailed: bool,
    pub color_output: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Console,
    Json,
    Csv,
    Markdown,
    Html,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: ModelConfig {
                endpoint: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
                model: "gemini-1.5-flash".to_string(),
                api_key_env: "GOOGLE_API_KEY".to_string(),
                request_timeout_secs: 120,
            },
            retry: RetryConfig {
                max_retries: 3,
                backoff_factor: 2.0,
            },
            batch: BatchConfig {
                batch_size: 5,
                max_resumes: 15,
                throttle: ThrottleKind::BatchDelay,
                batch_delay_secs: 10,
                requests_per_minute: 15,
                burst: 5,
            },
            render: RenderConfig {
                target_width: 1700,
                jpeg_quality: 85,
            },
            output: OutputConfig {
                format: OutputFormat::Console,
                min_score: 0,
                detailed: false,
                color_output: true,
            },
        }
    }
}

impl ModelConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Load the configuration from `path`, or from the default location.
    /// A missing file is created with defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| ScreenerError::Configuration(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ScreenerError::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("resume-screener")
            .join("config.toml")
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch.batch_size == 0 {
            return Err(ScreenerError::Configuration("batch.batch_size must be at least 1".to_string()));
        }
        if self.batch.max_resumes == 0 {
            return Err(ScreenerError::Configuration("batch.max_resumes must be at least 1".to_string()));
        }
        if self.batch.throttle == ThrottleKind::TokenBucket
            && (self.batch.requests_per_minute == 0 || self.batch.burst == 0)
        {
            return Err(ScreenerError::Configuration(
                "batch.requests_per_minute and batch.burst must be positive for the token bucket".to_string(),
            ));
        }
        if !(1.0..=MAX_BACKOFF_FACTOR).contains(&self.retry.backoff_factor) {
            return Err(ScreenerError::Configuration(format!(
                "retry.backoff_factor must be between 1 and {}",
                MAX_BACKOFF_FACTOR
            )));
        }
        if self.retry.max_retries == 0 {
            return Err(ScreenerError::Configuration("retry.max_retries must be at least 1".to_string()));
        }
        if self.output.min_score > 100 {
            return Err(ScreenerError::Configuration("output.min_score must be between 0 and 100".to_string()));
        }
        if !(1..=100).contains(&self.render.jpeg_quality) {
            return Err(ScreenerError::Configuration("render.jpeg_quality must be between 1 and 100".to_string()));
        }
        Ok(())
    }

    /// Set a single dotted key (e.g. `batch.batch_size`) and return the updated config.
    pub fn with_value(&self, key: &str, value: &str) -> Result<Self> {
        let mut document = toml::Value::try_from(self)
            .map_err(|e| ScreenerError::Configuration(format!("Failed to serialize config: {}", e)))?;

        set_dotted(&mut document, key, value)?;

        let updated: Config = document
            .try_into()
            .map_err(|e| ScreenerError::Configuration(format!("Invalid value for {}: {}", key, e)))?;
        updated.validate()?;
        Ok(updated)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_secs(self.batch.batch_delay_secs)
    }
}

fn set_dotted(document: &mut toml::Value, key: &str, raw: &str) -> anyhow::Result<()> {
    let (section, field) = key
        .split_once('.')
        .ok_or_else(|| anyhow!("Configuration key must look like section.field, got '{}'", key))?;

    let table = document
        .get_mut(section)
        .and_then(toml::Value::as_table_mut)
        .ok_or_else(|| anyhow!("Unknown configuration section '{}'", section))?;

    let current = match table.get(field) {
        Some(current) => current,
        None => bail!("Unknown configuration key '{}'", key),
    };

    let value = match current {
        toml::Value::Integer(_) => toml::Value::Integer(raw.parse()?),
        toml::Value::Float(_) => toml::Value::Float(raw.parse()?),
        toml::Value::Boolean(_) => toml::Value::Boolean(raw.parse()?),
        _ => toml::Value::String(raw.to_string()),
    };

    table.insert(field.to_string(), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch.batch_size, 5);
        assert_eq!(config.batch.max_resumes, 15);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.batch_delay(), Duration::from_secs(10));
        assert_eq!(config.model.request_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load(Some(&path)).unwrap();
        assert!(path.exists());
        assert_eq!(config.model.api_key_env, "GOOGLE_API_KEY");

        let reloaded = Config::load(Some(&path)).unwrap();
        assert_eq!(reloaded.model.model, config.model.model);
        assert_eq!(reloaded.batch.throttle, ThrottleKind::BatchDelay);
    }

    #[test]
    fn test_with_value_updates_typed_fields() {
        let config = Config::default();

        let updated = config.with_value("batch.batch_size", "3").unwrap();
        assert_eq!(updated.batch.batch_size, 3);

        let updated = updated.with_value("retry.backoff_factor", "1.5").unwrap();
        assert_eq!(updated.retry.backoff_factor, 1.5);

        let updated = updated.with_value("batch.throttle", "token-bucket").unwrap();
        assert_eq!(updated.batch.throttle, ThrottleKind::TokenBucket);

        let updated = updated.with_value("output.format", "Csv").unwrap();
        assert_eq!(updated.output.format, OutputFormat::Csv);
    }

    #[test]
    fn test_with_value_rejects_bad_input() {
        let config = Config::default();

        assert!(config.with_value("batch.batch_size", "many").is_err());
        assert!(config.with_value("batch.unknown", "1").is_err());
        assert!(config.with_value("nosection", "1").is_err());
        assert!(config.with_value("batch.batch_size", "0").is_err());
        assert!(config.with_value("output.min_score", "101").is_err());
        assert!(config.with_value("batch.throttle", "sometimes").is_err());
        assert!(config.with_value("retry.backoff_factor", "10000000000").is_err());
        assert!(config.with_value("retry.backoff_factor", "inf").is_err());
        assert!(config.with_value("retry.backoff_factor", "0.5").is_err());
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not = [valid").unwrap();

        assert!(matches!(Config::load(Some(&path)), Err(ScreenerError::Configuration(_))));
    }
}
