//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Capture-order sequence number of a performance chunk
///
/// Assigned in strict capture order within one battle, starting at 1.
/// `ChunkSeq(0)` never names a real chunk; it is the "nothing applied yet" mark.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkSeq(pub u64);

impl ChunkSeq {
    pub const NONE: ChunkSeq = ChunkSeq(0);

    pub fn first() -> Self {
        Self(1)
    }

    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for ChunkSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Unique identifier for a battle session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the learner owning a progress record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tracked speaking skills, scored 0.0..=9.0 by the external analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    Fluency,
    Grammar,
    Vocabulary,
    Pronunciation,
}

impl Skill {
    /// Evaluation order for skill bonuses
    pub const ALL: [Skill; 4] = [
        Skill::Fluency,
        Skill::Grammar,
        Skill::Vocabulary,
        Skill::Pronunciation,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Skill::Fluency => "fluency",
            Skill::Grammar => "grammar",
            Skill::Vocabulary => "vocabulary",
            Skill::Pronunciation => "pronunciation",
        }
    }

    /// Match the names analyzers use for a skill (IELTS criteria names included)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "fluency" | "fluency_score" | "fluency_and_coherence" => Some(Skill::Fluency),
            "grammar" | "grammar_score" | "grammatical_range_score" | "grammatical_range" => {
                Some(Skill::Grammar)
            }
            "vocabulary" | "vocabulary_score" | "lexical_resource_score" | "lexical_resource" => {
                Some(Skill::Vocabulary)
            }
            "pronunciation" | "pronunciation_score" => Some(Skill::Pronunciation),
            _ => None,
        }
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
