//! Async HTTP analyzer client
//!
//! Talks to an external speech/text analysis service. Text chunks are posted
//! as `{transcription, topic}` JSON; audio chunks are posted as a multipart
//! form whose `audio` part carries the recording.
//! The reply is parsed tolerantly (see `parser`), so any service that returns
//! a JSON object with word counts and skill scores will do.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Request};
use serde::Serialize;
use tracing::debug;

use crate::analysis::analyzer::{Analyzer, Chunk, ChunkPayload};
use crate::analysis::parser::parse_analysis;
use crate::analysis::result::AnalysisResult;
use crate::core::error::{ArenaError, Result};
use crate::scoring::constants::DEFAULT_DISCOURSE_MARKERS;

/// HTTP-backed analyzer
pub struct HttpAnalyzer {
    client: Client,
    text_url: String,
    audio_url: String,
    api_key: Option<String>,
    markers: Vec<String>,
}

impl HttpAnalyzer {
    /// Create a new analyzer with explicit endpoints
    pub fn new(text_url: String, audio_url: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            text_url,
            audio_url,
            api_key,
            markers: DEFAULT_DISCOURSE_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// Replace the marker list used when the service reports none
    pub fn with_markers(mut self, markers: Vec<String>) -> Self {
        self.markers = markers;
        self
    }

    /// Create a client from environment variables
    ///
    /// Required: ANALYZER_URL (text analysis endpoint)
    /// Optional: ANALYZER_AUDIO_URL (defaults to ANALYZER_URL)
    /// Optional: ANALYZER_API_KEY (sent as a bearer token)
    pub fn from_env() -> Result<Self> {
        let text_url = std::env::var("ANALYZER_URL")
            .map_err(|_| ArenaError::Analyzer("ANALYZER_URL not set".into()))?;
        let audio_url = std::env::var("ANALYZER_AUDIO_URL").unwrap_or_else(|_| text_url.clone());
        let api_key = std::env::var("ANALYZER_API_KEY").ok();

        Ok(Self::new(text_url, audio_url, api_key))
    }

    async fn post_text(&self, text: &str, topic: Option<&str>) -> Result<String> {
        let request = TextRequest {
            transcription: text,
            topic: topic.unwrap_or("Free speaking"),
        };
        let mut builder = self
            .client
            .post(&self.text_url)
            .header("content-type", "application/json")
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }
        let response = builder
            .send()
            .await
            .map_err(|e| ArenaError::Analyzer(e.to_string()))?;
        Self::read_body(response).await
    }

    fn audio_request(&self, bytes: &[u8]) -> Result<Request> {
        let part = Part::bytes(bytes.to_vec())
            .file_name("recording.webm")
            .mime_str("audio/webm")
            .map_err(|e| ArenaError::Analyzer(e.to_string()))?;
        let mut builder = self
            .client
            .post(&self.audio_url)
            .multipart(Form::new().part("audio", part));
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }
        builder.build().map_err(|e| ArenaError::Analyzer(e.to_string()))
    }

    async fn post_audio(&self, bytes: &[u8]) -> Result<String> {
        let request = self.audio_request(bytes)?;
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| ArenaError::Analyzer(e.to_string()))?;
        Self::read_body(response).await
    }

    async fn read_body(response: reqwest::Response) -> Result<String> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ArenaError::Analyzer(format!("API error {}: {}", status, error_text)));
        }
        response
            .text()
            .await
            .map_err(|e| ArenaError::Analyzer(e.to_string()))
    }
}

#[async_trait]
impl Analyzer for HttpAnalyzer {
    async fn analyze(&self, chunk: &Chunk) -> Result<AnalysisResult> {
        // Silence never leaves the process
        if chunk.payload.is_empty() {
            return Ok(AnalysisResult::silence());
        }

        let body = match &chunk.payload {
            ChunkPayload::Text(text) => self.post_text(text, chunk.topic.as_deref()).await?,
            ChunkPayload::Audio(bytes) => self.post_audio(bytes).await?,
        };
        debug!("Analyzer replied to chunk {} with {} bytes", chunk.seq, body.len());

        parse_analysis(&body, &self.markers)
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[derive(Serialize)]
struct TextRequest<'a> {
    transcription: &'a str,
    topic: &'a str,
}
