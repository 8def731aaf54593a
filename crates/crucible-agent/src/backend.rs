//! Text-generation backends
//!
//! A backend performs exactly one request per call: no retry, no fallback.
//! Retry and soft-failure policy live in the [`Gateway`](crate::Gateway).

use crate::types::{
    GenerationRequest, OllamaGenerateBody, OllamaGenerateChunk, OllamaTagsResponse,
};
use async_trait::async_trait;
use crucible_core::{BackendConfig, CrucibleError, Result};
use futures::stream::BoxStream;
use futures::StreamExt;
use std::time::Duration;

/// Lazy sequence of generated text fragments
pub type ChunkStream = BoxStream<'static, Result<String>>;

/// A text-generation service
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Run one non-streaming generation request
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Models the backend serves, as base names
    async fn list_models(&self) -> Result<Vec<String>>;

    /// Run one streaming generation request
    ///
    /// Dropping the stream early releases the underlying connection.
    fn stream(&self, request: GenerationRequest) -> ChunkStream;

    /// Where the backend lives, for logs and health reports
    fn endpoint(&self) -> &str;
}

/// Ollama HTTP backend
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    probe_timeout: Duration,
}

impl OllamaBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| CrucibleError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let mut body = OllamaGenerateBody::from(request);
        body.stream = false;

        let response = self
            .http
            .post(self.url("/api/generate"))
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(classify)?;

        let response = check_status(response).await?;
        let chunk: OllamaGenerateChunk = response.json().await.map_err(classify)?;

        Ok(chunk.response.trim().to_string())
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .http
            .get(self.url("/api/tags"))
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(classify)?;

        let response = check_status(response).await?;
        let tags: OllamaTagsResponse = response.json().await.map_err(classify)?;

        Ok(tags
            .models
            .iter()
            .map(|m| m.base_name().to_string())
            .collect())
    }

    fn stream(&self, request: GenerationRequest) -> ChunkStream {
        let http = self.http.clone();
        let url = self.url("/api/generate");
        let timeout = self.timeout;

        let stream = async_stream::try_stream! {
            let request = request.streaming();
            let response = http
                .post(url)
                .timeout(timeout)
                .json(&OllamaGenerateBody::from(&request))
                .send()
                .await
                .map_err(classify)?;
            let response = check_status(response).await?;

            let mut bytes = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();
            let mut finished = false;

            while let Some(next) = bytes.next().await {
                buffer.extend_from_slice(&next.map_err(classify)?);

                while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=pos).collect();
                    if let Some(chunk) = parse_stream_line(&line)? {
                        if !chunk.response.is_empty() {
                            yield chunk.response;
                        }
                        if chunk.done {
                            finished = true;
                            break;
                        }
                    }
                }

                if finished {
                    break;
                }
            }

            if !finished {
                if let Some(chunk) = parse_stream_line(&buffer)? {
                    if !chunk.response.is_empty() {
                        yield chunk.response;
                    }
                }
            }
        };

        stream.boxed()
    }

    fn endpoint(&self) -> &str {
        &self.base_url
    }
}

/// Map a transport error onto the error taxonomy
fn classify(e: reqwest::Error) -> CrucibleError {
    if e.is_timeout() {
        CrucibleError::Timeout(e.to_string())
    } else if e.is_decode() {
        CrucibleError::MalformedPayload(e.to_string())
    } else {
        CrucibleError::BackendUnreachable(e.to_string())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown".to_string());
    Err(CrucibleError::BackendStatus {
        status: status.as_u16(),
        body,
    })
}

/// Parse one NDJSON line of a streamed response; blank lines yield `None`
fn parse_stream_line(line: &[u8]) -> Result<Option<OllamaGenerateChunk>> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    serde_json::from_str(line)
        .map(Some)
        .map_err(|e| CrucibleError::MalformedPayload(format!("Bad stream line: {}", e)))
}
