//! Analysis results produced by the external speech/text analyzer
//!
//! The analyzer is never trusted: every numeric field is clamped into its
//! documented range and missing fields read as zero/empty. A result that is
//! out of range still scores; only a reply that is not a JSON object at all is
//! rejected.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

use crate::core::error::{ArenaError, Result};
use crate::core::types::Skill;
use crate::scoring::constants::{SKILL_SCORE_MAX, SKILL_SCORE_MIN};

/// One chunk's analysis, immutable once received
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub word_count: u32,
    pub skill_scores: BTreeMap<Skill, f32>,
    pub hesitation_count: u32,
    pub long_pause_count: u32,
    pub error_count: u32,
    pub detected_markers: BTreeSet<String>,
    pub transcript: Option<String>,
}

impl AnalysisResult {
    pub fn new(word_count: u32) -> Self {
        Self {
            word_count,
            ..Self::default()
        }
    }

    /// Silent chunk: valid, scores zero
    pub fn silence() -> Self {
        Self::default()
    }

    pub fn with_skill(mut self, skill: Skill, score: f32) -> Self {
        self.skill_scores.insert(skill, clamp_score(score as f64));
        self
    }

    pub fn with_hesitations(mut self, hesitations: u32) -> Self {
        self.hesitation_count = hesitations;
        self
    }

    pub fn with_long_pauses(mut self, long_pauses: u32) -> Self {
        self.long_pause_count = long_pauses;
        self
    }

    pub fn with_errors(mut self, errors: u32) -> Self {
        self.error_count = errors;
        self
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.detected_markers.insert(marker.into());
        self
    }

    pub fn with_transcript(mut self, transcript: impl Into<String>) -> Self {
        self.transcript = Some(transcript.into());
        self
    }

    /// Score for a skill, clamped to 0..=9; missing skills read as 0
    pub fn skill_score(&self, skill: Skill) -> f32 {
        self.skill_scores
            .get(&skill)
            .map(|&s| clamp_score(s as f64))
            .unwrap_or(SKILL_SCORE_MIN)
    }

    /// Mean over all tracked skills, missing ones counted as 0
    pub fn mean_skill_score(&self) -> f32 {
        let total: f32 = Skill::ALL.iter().map(|&s| self.skill_score(s)).sum();
        total / Skill::ALL.len() as f32
    }

    /// Fill `detected_markers` from the transcript if the analyzer reported none
    pub fn fill_markers_from_transcript(&mut self, markers: &[String]) {
        if !self.detected_markers.is_empty() {
            return;
        }
        if let Some(transcript) = &self.transcript {
            self.detected_markers = detect_markers(transcript, markers);
        }
    }

    /// Build a result from an analyzer's JSON reply
    ///
    /// Accepts flat fields (`word_count`, `skill_scores`, `hesitation_count`, ...)
    /// as well as the nested `gemini_analysis` shape with IELTS criterion names.
    pub fn from_json(value: &Value, markers: &[String]) -> Result<Self> {
        let root = value.as_object().ok_or_else(|| {
            ArenaError::MalformedAnalysis(format!("expected a JSON object, got {}", value))
        })?;
        let nested = root.get("gemini_analysis").and_then(|v| v.as_object());

        let field = |names: &[&str]| lookup_field(root, nested, names);

        let transcript = field(&["transcript", "transcription"])
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        let word_count = match field(&["word_count", "wordCount"]) {
            Some(v) => clamp_count(number(v)),
            None => transcript
                .as_deref()
                .map(|t| t.split_whitespace().count() as u32)
                .unwrap_or(0),
        };

        let mut skill_scores = BTreeMap::new();
        for map_key in ["skill_scores", "skillScores"] {
            if let Some(map) = root.get(map_key).and_then(|v| v.as_object()) {
                for (name, score) in map {
                    if let Some(skill) = Skill::from_name(name) {
                        skill_scores.insert(skill, clamp_score(number(score)));
                    }
                }
            }
        }
        let score_sources = nested.into_iter().chain(std::iter::once(root));
        for source in score_sources {
            for (name, score) in source {
                if let Some(skill) = Skill::from_name(name) {
                    if score.is_number() || score.is_string() {
                        skill_scores.entry(skill).or_insert(clamp_score(number(score)));
                    }
                }
            }
        }

        let hesitation_count =
            field(&["hesitation_count", "hesitationCount", "hesitations"]).map_or(0, |v| clamp_count(number(v)));
        let long_pause_count = field(&["long_pause_count", "longPauseCount", "pause_count"])
            .map_or(0, |v| clamp_count(number(v)));
        let error_count = match field(&["error_count", "errorCount", "common_errors"]) {
            Some(Value::Array(errors)) => errors.len().min(u32::MAX as usize) as u32,
            Some(v) => clamp_count(number(v)),
            None => 0,
        };

        let detected_markers = field(&["detected_markers", "detectedMarkers", "discourse_markers"])
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| m.as_str())
                    .map(|m| m.trim().to_lowercase())
                    .filter(|m| !m.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let mut result = Self {
            word_count,
            skill_scores,
            hesitation_count,
            long_pause_count,
            error_count,
            detected_markers,
            transcript,
        };
        result.fill_markers_from_transcript(markers);
        Ok(result)
    }
}

/// Case-insensitive substring match of each marker against the transcript
pub fn detect_markers(transcript: &str, markers: &[String]) -> BTreeSet<String> {
    let lowered = transcript.to_lowercase();
    markers
        .iter()
        .map(|m| m.trim().to_lowercase())
        .filter(|m| !m.is_empty() && lowered.contains(m.as_str()))
        .collect()
}

/// Clamp a skill score to 0..=9 (NaN reads as 0)
pub fn clamp_score(score: f64) -> f32 {
    if score.is_nan() {
        return SKILL_SCORE_MIN;
    }
    score.clamp(SKILL_SCORE_MIN as f64, SKILL_SCORE_MAX as f64) as f32
}

/// Clamp a count to 0..=u32::MAX (NaN and negatives read as 0)
pub fn clamp_count(count: f64) -> u32 {
    if count.is_nan() || count <= 0.0 {
        return 0;
    }
    count.floor().min(u32::MAX as f64) as u32
}

/// First non-null field among `names`; the nested analysis wins over top-level fields
fn lookup_field<'a>(
    root: &'a Map<String, Value>,
    nested: Option<&'a Map<String, Value>>,
    names: &[&str],
) -> Option<&'a Value> {
    names.iter().find_map(|name| {
        nested
            .and_then(|n| n.get(*name))
            .or_else(|| root.get(*name))
            .filter(|v| !v.is_null())
    })
}

fn number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => 0.0,
    }
}
