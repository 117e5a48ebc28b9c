//! Offline transcript analyzer
//!
//! Deterministic heuristics over a text chunk, for play without an analysis
//! service. It estimates fluency and vocabulary only; grammar and
//! pronunciation are left unreported (and so score zero).

use async_trait::async_trait;
use std::collections::HashSet;

use crate::analysis::analyzer::{Analyzer, Chunk, ChunkPayload};
use crate::analysis::result::{detect_markers, AnalysisResult};
use crate::core::config::ScoringConfig;
use crate::core::error::{ArenaError, Result};
use crate::core::types::Skill;

/// Tokens counted as hesitation rather than words
pub const FILLER_WORDS: [&str; 8] = ["um", "umm", "uh", "uhh", "er", "err", "erm", "hmm"];

/// Written pause markers counted as long pauses
const PAUSE_MARKERS: [&str; 2] = ["...", "\u{2026}"];

pub struct TranscriptAnalyzer {
    markers: Vec<String>,
}

impl TranscriptAnalyzer {
    pub fn new(markers: Vec<String>) -> Self {
        Self { markers }
    }

    pub fn from_config(config: &ScoringConfig) -> Self {
        Self::new(config.discourse_markers.clone())
    }

    /// Analyze a transcript synchronously
    pub fn analyze_text(&self, text: &str) -> AnalysisResult {
        let mut words = Vec::new();
        let mut hesitations = 0u32;
        for token in text.split_whitespace() {
            let word: String = token
                .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                .to_lowercase();
            if word.is_empty() {
                continue;
            }
            if FILLER_WORDS.contains(&word.as_str()) {
                hesitations += 1;
            } else {
                words.push(word);
            }
        }

        let long_pauses = PAUSE_MARKERS
            .iter()
            .map(|marker| text.matches(marker).count() as u32)
            .sum::<u32>();

        let word_count = words.len() as u32;
        let mut result = AnalysisResult::new(word_count)
            .with_hesitations(hesitations)
            .with_long_pauses(long_pauses)
            .with_transcript(text.trim());

        if word_count > 0 {
            result = result
                .with_skill(Skill::Fluency, fluency_estimate(word_count, hesitations, long_pauses))
                .with_skill(Skill::Vocabulary, vocabulary_estimate(&words));
        }

        result.detected_markers = detect_markers(text, &self.markers);
        result
    }
}

/// Longer unbroken runs read as more fluent; each filler and pause costs
fn fluency_estimate(word_count: u32, hesitations: u32, long_pauses: u32) -> f32 {
    let length_credit = word_count.min(25) as f32 * 0.2;
    let penalty = hesitations as f32 * 1.0 + long_pauses as f32 * 1.5;
    3.0 + length_credit - penalty
}

/// Type/token ratio plus a bump for longer words
fn vocabulary_estimate(words: &[String]) -> f32 {
    let unique: HashSet<&str> = words.iter().map(|w| w.as_str()).collect();
    let ratio = unique.len() as f32 / words.len() as f32;
    let mean_len = words.iter().map(|w| w.chars().count()).sum::<usize>() as f32 / words.len() as f32;
    2.0 + ratio * 4.0 + (mean_len - 3.0).max(0.0)
}

#[async_trait]
impl Analyzer for TranscriptAnalyzer {
    async fn analyze(&self, chunk: &Chunk) -> Result<AnalysisResult> {
        match &chunk.payload {
            ChunkPayload::Text(text) => Ok(self.analyze_text(text)),
            ChunkPayload::Audio(_) => Err(ArenaError::Analyzer(
                "transcript analyzer cannot read audio".into(),
            )),
        }
    }

    fn name(&self) -> &str {
        "transcript"
    }
}
