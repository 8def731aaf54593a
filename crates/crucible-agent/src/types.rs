//! Type definitions for generation requests and backend wire formats

use crucible_core::SamplingParameters;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A prompt plus the sampling parameters to run it with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub params: SamplingParameters,
    pub stream: bool,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, params: SamplingParameters) -> Self {
        Self {
            prompt: prompt.into(),
            params,
            stream: false,
        }
    }

    pub fn streaming(mut self) -> Self {
        self.stream = true;
        self
    }
}

/// Outcome of a gateway `generate` call, including its retry history
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationReport {
    /// Generated text; empty when every attempt failed
    pub text: String,
    /// Attempts made, including the successful one
    pub attempts: u32,
    /// Delays slept between attempts, in order
    pub delays: Vec<Duration>,
    /// Error of the final failed attempt, if the call gave up
    pub last_error: Option<String>,
}

impl GenerationReport {
    /// True when the call gave up and the text is a soft-failure placeholder
    pub fn gave_up(&self) -> bool {
        self.last_error.is_some()
    }
}

/// Backend health as seen by a preflight probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Error,
}

/// Summary of a backend health probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub url: String,
    pub models_available: usize,
    /// First few models, for display
    pub models: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthReport {
    pub fn is_ok(&self) -> bool {
        self.status == HealthStatus::Ok
    }
}

/// Body of `POST /api/generate`
#[derive(Debug, Clone, Serialize)]
pub struct OllamaGenerateBody<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub stream: bool,
}

impl<'a> From<&'a GenerationRequest> for OllamaGenerateBody<'a> {
    fn from(request: &'a GenerationRequest) -> Self {
        Self {
            model: &request.params.model,
            prompt: &request.prompt,
            temperature: request.params.temperature,
            top_p: request.params.top_p,
            top_k: request.params.top_k,
            stream: request.stream,
        }
    }
}

/// Response of `POST /api/generate`, or one line of a streamed response
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaGenerateChunk {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
}

/// Response of `GET /api/tags`
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaTagsResponse {
    #[serde(default)]
    pub models: Vec<OllamaModelTag>,
}

/// One installed model in a tags response
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaModelTag {
    pub name: String,
}

impl OllamaModelTag {
    /// Model name without its `:tag` suffix
    pub fn base_name(&self) -> &str {
        self.name.split(':').next().unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_body_is_flat() {
        let request = GenerationRequest::new(
            "design a cache",
            SamplingParameters::new("mistral", 0.7).with_top_k(20),
        );
        let body = serde_json::to_value(OllamaGenerateBody::from(&request)).unwrap();

        assert_eq!(body["model"], "mistral");
        assert_eq!(body["prompt"], "design a cache");
        assert_eq!(body["top_k"], 20);
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn test_streaming_flag() {
        let request = GenerationRequest::new("p", SamplingParameters::new("m", 0.5)).streaming();
        let body = serde_json::to_value(OllamaGenerateBody::from(&request)).unwrap();
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn test_tags_base_name() {
        let tags: OllamaTagsResponse = serde_json::from_str(
            r#"{"models":[{"name":"mistral:latest"},{"name":"codellama"}]}"#,
        )
        .unwrap();
        let names: Vec<_> = tags.models.iter().map(|m| m.base_name()).collect();
        assert_eq!(names, vec!["mistral", "codellama"]);
    }

    #[test]
    fn test_chunk_defaults() {
        let chunk: OllamaGenerateChunk = serde_json::from_str(r#"{"done":true}"#).unwrap();
        assert!(chunk.response.is_empty());
        assert!(chunk.done);
    }
}
