//! Seeded simulated analyzer for headless battles
//!
//! Each chunk draws from its own ChaCha stream keyed by (seed, chunk seq), so
//! results do not depend on the order concurrent calls happen to run in.

use async_trait::async_trait;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::analysis::analyzer::{Analyzer, Chunk};
use crate::analysis::result::AnalysisResult;
use crate::core::error::Result;
use crate::core::types::{ChunkSeq, Skill};
use crate::scoring::constants::DEFAULT_DISCOURSE_MARKERS;

/// How long a stalled call hangs; far beyond any sane watchdog
const STALL_DURATION: Duration = Duration::from_secs(3600);

/// Shape of the simulated speaker and service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedProfile {
    /// Centre of every skill score
    pub skill_mean: f32,
    /// Scores are drawn uniformly from mean +/- spread
    pub skill_spread: f32,
    pub min_words: u32,
    pub max_words: u32,
    pub max_hesitations: u32,
    pub max_errors: u32,
    /// Chance a chunk contains one long pause
    pub long_pause_chance: f64,
    /// Chance a chunk uses a discourse marker
    pub marker_chance: f64,
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    /// Chance the service never answers this chunk
    pub stall_probability: f64,
}

impl Default for SimulatedProfile {
    fn default() -> Self {
        Self {
            skill_mean: 6.5,
            skill_spread: 1.5,
            min_words: 3,
            max_words: 22,
            max_hesitations: 3,
            max_errors: 2,
            long_pause_chance: 0.15,
            marker_chance: 0.2,
            min_latency_ms: 300,
            max_latency_ms: 2500,
            stall_probability: 0.05,
        }
    }
}

pub struct SimulatedAnalyzer {
    seed: u64,
    profile: SimulatedProfile,
    markers: Vec<String>,
}

impl SimulatedAnalyzer {
    pub fn new(seed: u64, profile: SimulatedProfile) -> Self {
        Self {
            seed,
            profile,
            markers: DEFAULT_DISCOURSE_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }

    pub fn with_markers(mut self, markers: Vec<String>) -> Self {
        self.markers = markers;
        self
    }

    pub fn profile(&self) -> &SimulatedProfile {
        &self.profile
    }

    fn rng_for(&self, seq: ChunkSeq) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.seed ^ seq.0.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    /// The analysis this chunk will produce, without latency
    pub fn sample(&self, seq: ChunkSeq) -> AnalysisResult {
        let p = &self.profile;
        let mut rng = self.rng_for(seq);

        let max_words = p.max_words.max(p.min_words);
        let mut result = AnalysisResult::new(rng.gen_range(p.min_words..=max_words))
            .with_hesitations(rng.gen_range(0..=p.max_hesitations))
            .with_errors(rng.gen_range(0..=p.max_errors));

        for skill in Skill::ALL {
            let offset = if p.skill_spread > 0.0 {
                rng.gen_range(-p.skill_spread..=p.skill_spread)
            } else {
                0.0
            };
            result = result.with_skill(skill, p.skill_mean + offset);
        }

        if rng.gen_bool(p.long_pause_chance.clamp(0.0, 1.0)) {
            result = result.with_long_pauses(1);
        }
        if !self.markers.is_empty() && rng.gen_bool(p.marker_chance.clamp(0.0, 1.0)) {
            let marker = &self.markers[rng.gen_range(0..self.markers.len())];
            result = result.with_marker(marker.clone());
        }
        result
    }

    /// Latency for this chunk, or `None` if the call stalls
    pub fn latency(&self, seq: ChunkSeq) -> Option<Duration> {
        let p = &self.profile;
        // Separate stream so latency does not perturb the sampled result
        let mut rng = self.rng_for(seq);
        let _ = rng.gen::<u64>();
        let mut rng = ChaCha8Rng::seed_from_u64(rng.gen());

        if rng.gen_bool(p.stall_probability.clamp(0.0, 1.0)) {
            return None;
        }
        let max = p.max_latency_ms.max(p.min_latency_ms);
        Some(Duration::from_millis(rng.gen_range(p.min_latency_ms..=max)))
    }
}

#[async_trait]
impl Analyzer for SimulatedAnalyzer {
    async fn analyze(&self, chunk: &Chunk) -> Result<AnalysisResult> {
        let delay = self.latency(chunk.seq).unwrap_or(STALL_DURATION);
        tokio::time::sleep(delay).await;
        Ok(self.sample(chunk.seq))
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
