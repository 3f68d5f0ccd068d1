//! Rate-limit aware retries around a [`GenerativeModel`]
//!
//! Only rate-limited failures are retried. The wait before retry `n`
//! (1-based) is `backoff_factor^n` seconds plus up to one second of jitter.
//! Once the retries are used up the caller gets [`RetryError::Exhausted`]
//! and is expected to skip that unit of work.

use crate::config::RetryConfig;
use crate::llm::client::{GenerationRequest, GenerativeModel, ModelError};
use log::{error, warn};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

pub trait Sleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Real waits on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: 2.0,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_factor: config.backoff_factor,
        }
    }
}

/// Longest single wait between two attempts
pub const MAX_BACKOFF: Duration = Duration::from_secs(300);

impl RetryPolicy {
    /// Wait before retrying after failed attempt `attempt` (1-based), given a jitter in `[0, 1)`.
    /// Capped at [`MAX_BACKOFF`].
    pub fn backoff(&self, attempt: u32, jitter: f64) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let seconds = self.backoff_factor.powi(exponent) + jitter.clamp(0.0, 1.0);
        Duration::try_from_secs_f64(seconds).map_or(MAX_BACKOFF, |wait| wait.min(MAX_BACKOFF))
    }
}

#[derive(Debug, Error)]
pub enum RetryError {
    #[error("still rate limited after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error("{0}")]
    Fatal(ModelError),
}

/// A successful response and how many rate-limit responses preceded it
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub text: String,
    pub rate_limited: u32,
}

pub struct RetryingModel<M, S> {
    model: M,
    sleeper: S,
    policy: RetryPolicy,
}

impl<M: GenerativeModel, S: Sleeper> RetryingModel<M, S> {
    pub fn new(model: M, sleeper: S, policy: RetryPolicy) -> Self {
        Self { model, sleeper, policy }
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    pub fn inner(&self) -> &M {
        &self.model
    }

    pub async fn generate(&self, request: &GenerationRequest<'_>) -> Result<Generated, RetryError> {
        let mut attempt = 0;

        while attempt < self.policy.max_retries {
            attempt += 1;

            match self.model.generate(request).await {
                Ok(text) => {
                    return Ok(Generated {
                        text,
                        rate_limited: attempt - 1,
                    })
                }
                Err(err) if err.is_rate_limited() => {
                    if attempt == self.policy.max_retries {
                        break;
                    }
                    let wait = self.policy.backoff(attempt, rand::random::<f64>());
                    warn!("Rate limit exceeded, retrying in {:.2} seconds...", wait.as_secs_f64());
                    self.sleeper.sleep(wait).await;
                }
                Err(err) => {
                    error!("Model request failed: {}", err);
                    return Err(RetryError::Fatal(err));
                }
            }
        }

        warn!("Giving up after {} rate-limited attempts", attempt);
        Err(RetryError::Exhausted { attempts: attempt })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted model and recording sleeper shared by the pipeline tests

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingSleeper {
        pub waits: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn waits(&self) -> Vec<Duration> {
            self.waits.lock().unwrap().clone()
        }
    }

    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.waits.lock().unwrap().push(duration);
        }
    }

    /// Replays a fixed sequence of results, one per call
    pub struct ScriptedModel {
        script: Mutex<VecDeque<Result<String, ModelError>>>,
        pub calls: Mutex<usize>,
    }

    impl ScriptedModel {
        pub fn new(script: Vec<Result<String, ModelError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    impl GenerativeModel for ScriptedModel {
        async fn generate(&self, _request: &GenerationRequest<'_>) -> Result<String, ModelError> {
            *self.calls.lock().unwrap() += 1;
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ModelError::EmptyResponse))
        }
    }

    pub fn rate_limited() -> ModelError {
        ModelError::Api {
            status: 429,
            message: "Resource has been exhausted (e.g. check quota).".to_string(),
        }
    }
}
