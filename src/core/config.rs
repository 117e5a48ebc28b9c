//! Arena configuration with documented defaults
//!
//! Every balance value the engine uses is collected here. Values are loaded
//! from TOML (see `data/arena.toml`); any missing section or field falls back
//! to the defaults in `scoring::constants`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::{ArenaError, Result};
use crate::core::types::Skill;
use crate::scoring::constants::*;

/// One step of the word-count damage table
///
/// A chunk earns the damage of the highest step whose `min_words` it reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCountTier {
    pub min_words: u32,
    pub damage: u32,
}

/// Flat bonus added when a skill score reaches the competent threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillBonusAmounts {
    pub fluency: u32,
    pub grammar: u32,
    pub vocabulary: u32,
    pub pronunciation: u32,
}

impl SkillBonusAmounts {
    pub fn amount(&self, skill: Skill) -> u32 {
        match skill {
            Skill::Fluency => self.fluency,
            Skill::Grammar => self.grammar,
            Skill::Vocabulary => self.vocabulary,
            Skill::Pronunciation => self.pronunciation,
        }
    }
}

impl Default for SkillBonusAmounts {
    fn default() -> Self {
        Self {
            fluency: FLUENCY_BONUS,
            grammar: GRAMMAR_BONUS,
            vocabulary: VOCABULARY_BONUS,
            pronunciation: PRONUNCIATION_BONUS,
        }
    }
}

/// Battle setup defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleSettings {
    /// Boss HP at battle start
    pub boss_max_hp: u32,

    /// Countdown length; the battle is lost when it reaches zero
    pub time_limit_seconds: u32,

    /// Player HP at battle start (at most 100)
    pub player_max_hp: u32,
}

impl Default for BattleSettings {
    fn default() -> Self {
        Self {
            boss_max_hp: DEFAULT_BOSS_MAX_HP,
            time_limit_seconds: DEFAULT_TIME_LIMIT_SECONDS,
            player_max_hp: PLAYER_MAX_HP,
        }
    }
}

/// Damage/XP calculator policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Monotonic step table mapping chunk word count to base damage
    pub word_count_tiers: Vec<WordCountTier>,

    /// Skill score (0-9) at or above which a skill counts as competent
    ///
    /// Also decides whether a chunk extends the fluency streak.
    pub skill_bonus_threshold: f32,

    pub skill_bonus_amounts: SkillBonusAmounts,

    /// Consecutive competent-fluency chunks needed before the streak multiplier applies
    pub streak_length_for_multiplier: u32,

    pub streak_multiplier_value: f32,

    /// Multiplier forced by any detected discourse marker
    ///
    /// Combined with the streak multiplier by taking the max, never the product.
    pub marker_multiplier_value: f32,

    /// Phrases recognised in transcripts when the analyzer reports no markers
    pub discourse_markers: Vec<String>,

    /// Proficiency damage recorded for a chunk containing any long pause
    pub long_pause_penalty: u32,

    /// XP for a chunk with a perfect mean skill score; scaled by mean/9
    pub chunk_xp_reward: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            word_count_tiers: DEFAULT_WORD_COUNT_TIERS
                .iter()
                .map(|&(min_words, damage)| WordCountTier { min_words, damage })
                .collect(),
            skill_bonus_threshold: DEFAULT_SKILL_BONUS_THRESHOLD,
            skill_bonus_amounts: SkillBonusAmounts::default(),
            streak_length_for_multiplier: DEFAULT_STREAK_LENGTH,
            streak_multiplier_value: DEFAULT_STREAK_MULTIPLIER,
            marker_multiplier_value: DEFAULT_MARKER_MULTIPLIER,
            discourse_markers: DEFAULT_DISCOURSE_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            long_pause_penalty: LONG_PAUSE_PENALTY,
            chunk_xp_reward: CHUNK_XP_REWARD,
        }
    }
}

/// Boss counter-attack rule
///
/// Fires when hesitations exceed `counter_attack_threshold` or errors exceed
/// `error_threshold`; hits for `hesitations * scale + errors * error_scale`,
/// capped at `max_damage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterAttackConfig {
    pub counter_attack_threshold: u32,
    pub counter_attack_scale: u32,
    pub error_threshold: u32,
    pub error_scale: u32,
    pub max_damage: u32,
}

impl Default for CounterAttackConfig {
    fn default() -> Self {
        Self {
            counter_attack_threshold: COUNTER_ATTACK_HESITATION_THRESHOLD,
            counter_attack_scale: COUNTER_ATTACK_HESITATION_SCALE,
            error_threshold: COUNTER_ATTACK_ERROR_THRESHOLD,
            error_scale: COUNTER_ATTACK_ERROR_SCALE,
            max_damage: COUNTER_ATTACK_MAX_DAMAGE,
        }
    }
}

/// Session ingest timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Watchdog per analyzer call; a chunk still pending after this is dropped
    pub analyzer_timeout_ms: u64,

    /// Capture cadence, independent of analysis latency
    pub chunk_interval_ms: u64,

    /// Battle clock cadence (one `tick()` per interval)
    pub tick_interval_ms: u64,

    /// Consecutive analyzer failures before "analysis delayed" is logged
    pub delayed_after_timeouts: u32,

    /// Capacity of the session command queue
    pub command_buffer: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            analyzer_timeout_ms: DEFAULT_ANALYZER_TIMEOUT_MS,
            chunk_interval_ms: DEFAULT_CHUNK_INTERVAL_MS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            delayed_after_timeouts: DEFAULT_DELAYED_AFTER_TIMEOUTS,
            command_buffer: DEFAULT_COMMAND_BUFFER,
        }
    }
}

/// Boss presentation and phase thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossConfig {
    pub name: String,
    pub title: String,
    /// HP fraction below which the boss becomes Enraged
    pub enraged_below: f32,
    /// HP fraction below which the boss becomes Desperate
    pub desperate_below: f32,
}

impl Default for BossConfig {
    fn default() -> Self {
        Self {
            name: "The Silence Spectre".to_string(),
            title: "Guardian of Samarkand Citadel".to_string(),
            enraged_below: ENRAGED_BELOW_FRACTION,
            desperate_below: DESPERATE_BELOW_FRACTION,
        }
    }
}

/// Complete arena configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub battle: BattleSettings,
    pub scoring: ScoringConfig,
    pub counter_attack: CounterAttackConfig,
    pub ingest: IngestConfig,
    pub boss: BossConfig,
}

impl ArenaConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ArenaConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.battle.boss_max_hp == 0 {
            return Err(ArenaError::Config("boss_max_hp must be positive".into()));
        }
        if self.battle.time_limit_seconds == 0 {
            return Err(ArenaError::Config("time_limit_seconds must be positive".into()));
        }
        if self.battle.player_max_hp == 0 || self.battle.player_max_hp > PLAYER_MAX_HP {
            return Err(ArenaError::Config(format!(
                "player_max_hp ({}) must be within 1..={}",
                self.battle.player_max_hp, PLAYER_MAX_HP
            )));
        }

        self.scoring.validate()?;

        let boss = &self.boss;
        if !(0.0 < boss.desperate_below
            && boss.desperate_below < boss.enraged_below
            && boss.enraged_below < 1.0)
        {
            return Err(ArenaError::Config(format!(
                "boss phase fractions must satisfy 0 < desperate_below ({}) < enraged_below ({}) < 1",
                boss.desperate_below, boss.enraged_below
            )));
        }

        if self.ingest.chunk_interval_ms == 0 || self.ingest.tick_interval_ms == 0 {
            return Err(ArenaError::Config("ingest intervals must be positive".into()));
        }
        if self.ingest.analyzer_timeout_ms == 0 {
            return Err(ArenaError::Config("analyzer_timeout_ms must be positive".into()));
        }
        if self.ingest.command_buffer == 0 {
            return Err(ArenaError::Config("command_buffer must be positive".into()));
        }

        Ok(())
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<()> {
        // Thresholds strictly increasing, damage never decreasing
        for pair in self.word_count_tiers.windows(2) {
            if pair[1].min_words <= pair[0].min_words {
                return Err(ArenaError::Config(format!(
                    "word_count_tiers thresholds must increase ({} then {})",
                    pair[0].min_words, pair[1].min_words
                )));
            }
            if pair[1].damage < pair[0].damage {
                return Err(ArenaError::Config(format!(
                    "word_count_tiers damage must not decrease ({} then {})",
                    pair[0].damage, pair[1].damage
                )));
            }
        }

        if !(SKILL_SCORE_MIN..=SKILL_SCORE_MAX).contains(&self.skill_bonus_threshold) {
            return Err(ArenaError::Config(format!(
                "skill_bonus_threshold ({}) must be within 0..=9",
                self.skill_bonus_threshold
            )));
        }

        // NaN fails both comparisons
        if !(self.streak_multiplier_value >= BASE_MULTIPLIER)
            || !(self.marker_multiplier_value >= BASE_MULTIPLIER)
        {
            return Err(ArenaError::Config("multipliers must be >= 1.0".into()));
        }

        if self.streak_length_for_multiplier == 0 {
            return Err(ArenaError::Config(
                "streak_length_for_multiplier must be positive".into(),
            ));
        }

        Ok(())
    }
}
