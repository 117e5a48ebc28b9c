//! Performance analysis - the external analyzer and its results
//!
//! The analyzer is a collaborator we do not control. Everything it returns
//! passes through `result` clamping before any score is computed.

pub mod analyzer;
pub mod client;
pub mod parser;
pub mod result;
pub mod simulated;
pub mod transcript;

pub use analyzer::{Analyzer, Chunk, ChunkPayload};
pub use client::HttpAnalyzer;
pub use parser::{extract_json, parse_analysis};
pub use result::{detect_markers, AnalysisResult};
pub use simulated::{SimulatedAnalyzer, SimulatedProfile};
pub use transcript::TranscriptAnalyzer;
