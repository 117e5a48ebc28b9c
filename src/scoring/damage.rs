//! Damage/XP calculator
//!
//! Turns one chunk's analysis plus the current streak into a damage event.
//! Rules run in a fixed order (base tier, skill bonuses, markers, streak) so
//! the bonus log is stable; the arithmetic is additive until one final
//! multiplier, which is the max of the marker and streak multipliers.

use serde::{Deserialize, Serialize};

use crate::analysis::result::AnalysisResult;
use crate::core::config::{ScoringConfig, WordCountTier};
use crate::core::types::{ChunkSeq, Skill};
use crate::scoring::constants::BASE_MULTIPLIER;
use crate::scoring::streak::{StreakPolicy, StreakState};

/// Why a chunk earned extra damage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusTag {
    Skill(Skill),
    DiscourseMarkers,
    FluencyStreak,
}

/// Hesitation/error signal carried to the state machine for the counter-attack
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPressure {
    pub hesitations: u32,
    pub errors: u32,
}

/// Damage dealt to the boss by one chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageEvent {
    pub amount: u32,
    /// Always >= 1.0
    pub multiplier: f32,
    pub triggered_bonuses: Vec<BonusTag>,
    pub source_chunk_seq: ChunkSeq,
    pub pressure: ChunkPressure,
}

impl DamageEvent {
    /// Plain hit with no bonuses and no hesitation
    pub fn flat(amount: u32, source_chunk_seq: ChunkSeq) -> Self {
        Self {
            amount,
            multiplier: BASE_MULTIPLIER,
            triggered_bonuses: Vec::new(),
            source_chunk_seq,
            pressure: ChunkPressure::default(),
        }
    }

    pub fn with_pressure(mut self, hesitations: u32, errors: u32) -> Self {
        self.pressure = ChunkPressure { hesitations, errors };
        self
    }
}

/// Everything one chunk contributes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkScore {
    pub event: DamageEvent,
    pub streak: StreakState,
    pub xp_delta: u32,
    /// Proficiency damage for the learner's band (not boss damage)
    pub proficiency_damage: u32,
}

/// Base damage from the word-count step table
///
/// Highest step reached wins; zero words always scores zero.
pub fn base_damage(word_count: u32, tiers: &[WordCountTier]) -> u32 {
    if word_count == 0 {
        return 0;
    }
    tiers
        .iter()
        .rev()
        .find(|tier| word_count >= tier.min_words)
        .map_or(0, |tier| tier.damage)
}

/// Compute a chunk's damage event and the streak that follows it
///
/// The streak multiplier applied to this chunk is the one earned by the
/// chunks before it, and only if this chunk keeps the streak alive.
pub fn compute_damage(
    analysis: &AnalysisResult,
    streak: StreakState,
    seq: ChunkSeq,
    config: &ScoringConfig,
) -> (DamageEvent, StreakState) {
    let threshold = config.skill_bonus_threshold;
    let mut sum = u64::from(base_damage(analysis.word_count, &config.word_count_tiers));
    let mut bonuses = Vec::new();

    for skill in Skill::ALL {
        if analysis.skill_score(skill) >= threshold {
            sum += u64::from(config.skill_bonus_amounts.amount(skill));
            bonuses.push(BonusTag::Skill(skill));
        }
    }

    let marker_multiplier = if analysis.detected_markers.is_empty() {
        BASE_MULTIPLIER
    } else {
        bonuses.push(BonusTag::DiscourseMarkers);
        config.marker_multiplier_value
    };

    let fluent = analysis.skill_score(Skill::Fluency) >= threshold;
    let streak_multiplier = if fluent {
        streak.current_multiplier()
    } else {
        BASE_MULTIPLIER
    };
    if streak_multiplier > BASE_MULTIPLIER {
        bonuses.push(BonusTag::FluencyStreak);
    }
    let next_streak = streak.advance(fluent, &StreakPolicy::from_config(config));

    let multiplier = marker_multiplier.max(streak_multiplier).max(BASE_MULTIPLIER);
    let scaled = (sum as f64 * f64::from(multiplier)).floor();
    let amount = scaled.min(f64::from(u32::MAX)) as u32;

    let event = DamageEvent {
        amount,
        multiplier,
        triggered_bonuses: bonuses,
        source_chunk_seq: seq,
        pressure: ChunkPressure {
            hesitations: analysis.hesitation_count,
            errors: analysis.error_count,
        },
    };

    (event, next_streak)
}

/// XP for a chunk: `chunk_xp_reward` scaled by mean skill / 9
pub fn compute_xp(analysis: &AnalysisResult, config: &ScoringConfig) -> u32 {
    let fraction = f64::from(analysis.mean_skill_score()) / 9.0;
    (f64::from(config.chunk_xp_reward) * fraction).floor() as u32
}

/// Proficiency damage: the long-pause penalty if the chunk had any long pause
pub fn compute_proficiency_damage(analysis: &AnalysisResult, config: &ScoringConfig) -> u32 {
    if analysis.long_pause_count > 0 {
        config.long_pause_penalty
    } else {
        0
    }
}

/// Full per-chunk scoring: damage event, next streak, XP and proficiency damage
pub fn score_chunk(
    analysis: &AnalysisResult,
    streak: StreakState,
    seq: ChunkSeq,
    config: &ScoringConfig,
) -> ChunkScore {
    let (event, streak) = compute_damage(analysis, streak, seq, config);
    ChunkScore {
        event,
        streak,
        xp_delta: compute_xp(analysis, config),
        proficiency_damage: compute_proficiency_damage(analysis, config),
    }
}
