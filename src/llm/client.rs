//! Gemini `generateContent` client
//!
//! One request carries the free-text context, the first-page image and the
//! task instruction. Errors are returned as-is; retrying is the job of
//! [`crate::llm::retry::RetryingModel`].

use crate::config::ModelConfig;
use crate::error::{Result, ScreenerError};
use crate::input::page_image::PageImage;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("model returned no text")]
    EmptyResponse,
}

impl ModelError {
    /// Rate limiting is recognised by the 429 status, or by its marker in the error text
    pub fn is_rate_limited(&self) -> bool {
        if let ModelError::Api { status: 429, .. } = self {
            return true;
        }
        let text = self.to_string();
        text.contains("429") || text.contains("RESOURCE_EXHAUSTED")
    }
}

/// Everything one model call needs
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub context: &'a str,
    pub image: &'a PageImage,
    pub instruction: &'a str,
}

pub trait GenerativeModel {
    fn generate(
        &self,
        request: &GenerationRequest<'_>,
    ) -> impl Future<Output = std::result::Result<String, ModelError>> + Send;
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

fn build_request<'a>(request: &GenerationRequest<'a>) -> GenerateContentRequest<'a> {
    let mut parts = Vec::with_capacity(3);
    if !request.context.trim().is_empty() {
        parts.push(Part::Text { text: request.context });
    }
    parts.push(Part::InlineData {
        inline_data: InlineData {
            mime_type: &request.image.mime_type,
            data: &request.image.data,
        },
    });
    parts.push(Part::Text { text: request.instruction });

    GenerateContentRequest {
        contents: vec![Content { parts }],
    }
}

fn api_error_message(body: String) -> String {
    match serde_json::from_str::<ApiErrorEnvelope>(&body) {
        Ok(envelope) => match envelope.error.status {
            Some(status) => format!("{} ({})", envelope.error.message, status),
            None => envelope.error.message,
        },
        Err(_) => body,
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(endpoint: String, model: String, api_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScreenerError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            model,
            api_key,
        })
    }

    /// Build a client from config, reading the API key from the configured variable
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ScreenerError::Configuration(format!(
                    "No API key found: set {} in the environment or a .env file",
                    config.api_key_env
                ))
            })?;

        Self::new(
            config.endpoint.clone(),
            config.model.clone(),
            api_key,
            config.request_timeout(),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/{}:generateContent", self.endpoint.trim_end_matches('/'), self.model)
    }
}

impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: &GenerationRequest<'_>) -> std::result::Result<String, ModelError> {
        let body = build_request(request);
        debug!(
            "Calling {} (context: {} chars, image: {} bytes base64)",
            self.model,
            request.context.len(),
            request.image.data.len()
        );

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                message: api_error_message(body),
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        parsed.text().ok_or(ModelError::EmptyResponse)
    }
}
