//! The analyzer seam
//!
//! Speech/text analysis is an external collaborator. The ingest loop only
//! knows this trait; HTTP, offline and simulated backends plug in behind it.

use std::sync::Arc;

use crate::analysis::result::AnalysisResult;
use crate::core::error::Result;
use crate::core::types::{ChunkSeq, SessionId};

/// Raw captured performance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkPayload {
    /// Typed or transcribed text
    Text(String),
    /// Encoded audio segment
    Audio(Vec<u8>),
}

impl ChunkPayload {
    pub fn is_empty(&self) -> bool {
        match self {
            ChunkPayload::Text(text) => text.trim().is_empty(),
            ChunkPayload::Audio(bytes) => bytes.is_empty(),
        }
    }
}

/// One captured chunk, tagged with its capture-order sequence number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub seq: ChunkSeq,
    pub session: SessionId,
    pub payload: ChunkPayload,
    /// Topic title, passed to analyzers that grade relevance
    pub topic: Option<String>,
}

impl Chunk {
    pub fn text(seq: ChunkSeq, session: SessionId, text: impl Into<String>) -> Self {
        Self {
            seq,
            session,
            payload: ChunkPayload::Text(text.into()),
            topic: None,
        }
    }

    pub fn audio(seq: ChunkSeq, session: SessionId, bytes: Vec<u8>) -> Self {
        Self {
            seq,
            session,
            payload: ChunkPayload::Audio(bytes),
            topic: None,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }
}

/// Trait for analysis backends (allows mocking in tests)
#[async_trait::async_trait]
pub trait Analyzer: Send + Sync {
    /// Analyze one chunk; may take arbitrarily long, callers bound it with a timeout
    async fn analyze(&self, chunk: &Chunk) -> Result<AnalysisResult>;

    /// Short backend name for logs
    fn name(&self) -> &str;
}

#[async_trait::async_trait]
impl<A: Analyzer + ?Sized> Analyzer for Arc<A> {
    async fn analyze(&self, chunk: &Chunk) -> Result<AnalysisResult> {
        (**self).analyze(chunk).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
