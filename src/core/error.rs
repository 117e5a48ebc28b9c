use thiserror::Error;

use crate::battle::state::Rejection;
use crate::core::types::ChunkSeq;

#[derive(Error, Debug)]
pub enum ArenaError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Analyzer error: {0}")]
    Analyzer(String),

    #[error("Analyzer timed out on chunk {seq} after {timeout_ms}ms")]
    AnalyzerTimeout { seq: ChunkSeq, timeout_ms: u64 },

    #[error("Malformed analysis result: {0}")]
    MalformedAnalysis(String),

    #[error("Rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("Session closed")]
    SessionClosed,

    #[error("Progress store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ArenaError>;
