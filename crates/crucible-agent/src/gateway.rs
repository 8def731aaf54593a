//! Generation gateway: the single door to the text-generation backend
//!
//! Key design: `generate` never fails. Transient backend errors are retried
//! with exponential backoff, and once the attempts run out the caller gets
//! empty text. Only the preflight probes (`check_connection`, `list_models`)
//! surface errors, because a run must not start without a backend.

use crate::backend::{ChunkStream, GenerationBackend, OllamaBackend};
use crate::types::{GenerationReport, GenerationRequest, HealthReport, HealthStatus};
use crucible_core::{CrucibleConfig, Result, RetryPolicy, SamplingParameters};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Models shown in a health report
const HEALTH_SAMPLE_MODELS: usize = 5;

/// Retrying front for a [`GenerationBackend`]
#[derive(Clone)]
pub struct Gateway {
    backend: Arc<dyn GenerationBackend>,
    retry: RetryPolicy,
}

impl Gateway {
    pub fn new(backend: Arc<dyn GenerationBackend>, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    /// Gateway over the Ollama backend described by `config`
    pub fn ollama(config: &CrucibleConfig) -> Result<Self> {
        let backend = OllamaBackend::new(&config.backend)?;
        Ok(Self::new(Arc::new(backend), config.retry.clone()))
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn endpoint(&self) -> &str {
        self.backend.endpoint()
    }

    /// Generate text, returning empty text if every attempt fails
    pub async fn generate(&self, prompt: &str, params: &SamplingParameters) -> String {
        self.generate_with_report(prompt, params).await.text
    }

    /// Generate text and report how many attempts and delays it took
    pub async fn generate_with_report(
        &self,
        prompt: &str,
        params: &SamplingParameters,
    ) -> GenerationReport {
        let request = GenerationRequest::new(prompt, params.clone());
        let max_attempts = self.retry.max_attempts.max(1);
        let mut report = GenerationReport::default();

        loop {
            report.attempts += 1;
            debug!(
                "Generation request to {} with {} (attempt {}/{})",
                self.backend.endpoint(),
                params.model,
                report.attempts,
                max_attempts
            );

            let err = match self.backend.generate(&request).await {
                Ok(text) => {
                    report.text = text;
                    return report;
                }
                Err(e) => e,
            };

            if !err.is_transient() || report.attempts >= max_attempts {
                error!(
                    "Generation with {} gave up after {} attempt(s): {}",
                    params.model, report.attempts, err
                );
                report.last_error = Some(err.to_string());
                return report;
            }

            let delay = self.retry.delay_after(report.attempts);
            warn!(
                "Generation attempt {}/{} failed: {}. Retrying in {:?}",
                report.attempts, max_attempts, err, delay
            );
            tokio::time::sleep(delay).await;
            report.delays.push(delay);
        }
    }

    /// Stream generated fragments as they arrive
    ///
    /// Not retried. The stream ends after the backend's final fragment or
    /// its first error; the consumer may drop it at any fragment boundary.
    pub fn stream_generate(&self, prompt: &str, params: &SamplingParameters) -> ChunkStream {
        debug!("Streaming generation with {}", params.model);
        self.backend
            .stream(GenerationRequest::new(prompt, params.clone()).streaming())
    }

    /// Preflight probe: succeeds only if the backend answers
    pub async fn check_connection(&self) -> Result<()> {
        self.backend.list_models().await.map(|_| ())
    }

    /// Preflight probe: models the backend serves
    pub async fn list_models(&self) -> Result<Vec<String>> {
        self.backend.list_models().await
    }

    /// Health summary; never fails, unreachable backends report `Error`
    pub async fn health(&self) -> HealthReport {
        match self.backend.list_models().await {
            Ok(models) => HealthReport {
                status: HealthStatus::Ok,
                url: self.backend.endpoint().to_string(),
                models_available: models.len(),
                models: models.into_iter().take(HEALTH_SAMPLE_MODELS).collect(),
                message: None,
            },
            Err(e) => HealthReport {
                status: HealthStatus::Error,
                url: self.backend.endpoint().to_string(),
                models_available: 0,
                models: Vec::new(),
                message: Some(e.to_string()),
            },
        }
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("endpoint", &self.backend.endpoint())
            .field("retry", &self.retry)
            .finish()
    }
}
