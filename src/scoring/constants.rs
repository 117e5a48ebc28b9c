//! Scoring and battle balance defaults - all tunable values in one place
//!
//! Chunk damage is ADDITIVE until the single final multiplier.
//! These are only defaults; `ArenaConfig` may override every one of them.

// Battle
pub const DEFAULT_BOSS_MAX_HP: u32 = 1000;
pub const DEFAULT_TIME_LIMIT_SECONDS: u32 = 120;
pub const PLAYER_MAX_HP: u32 = 100;

// Base damage step table: (minimum words in chunk, damage)
// A chunk with zero words matches no step and contributes nothing.
pub const DEFAULT_WORD_COUNT_TIERS: [(u32, u32); 4] = [(1, 5), (5, 15), (10, 30), (15, 50)];

// Skill bonuses (scores are on the 0-9 band scale)
pub const SKILL_SCORE_MIN: f32 = 0.0;
pub const SKILL_SCORE_MAX: f32 = 9.0;
pub const DEFAULT_SKILL_BONUS_THRESHOLD: f32 = 7.0;
pub const FLUENCY_BONUS: u32 = 40;
pub const GRAMMAR_BONUS: u32 = 30;
pub const VOCABULARY_BONUS: u32 = 35;
pub const PRONUNCIATION_BONUS: u32 = 25;

// Multipliers - max of the two applies, never the product
pub const DEFAULT_STREAK_LENGTH: u32 = 3;
pub const DEFAULT_STREAK_MULTIPLIER: f32 = 2.5;
pub const DEFAULT_MARKER_MULTIPLIER: f32 = 2.5;
pub const BASE_MULTIPLIER: f32 = 1.0;

pub const DEFAULT_DISCOURSE_MARKERS: [&str; 6] = [
    "furthermore",
    "in addition",
    "consequently",
    "moreover",
    "nevertheless",
    "however",
];

// Progression
pub const LONG_PAUSE_PENALTY: u32 = 10;
pub const CHUNK_XP_REWARD: u32 = 20;

// Counter-attack (boss hits the player on hesitation/errors)
pub const COUNTER_ATTACK_HESITATION_THRESHOLD: u32 = 2;
pub const COUNTER_ATTACK_HESITATION_SCALE: u32 = 5;
pub const COUNTER_ATTACK_ERROR_THRESHOLD: u32 = 1;
pub const COUNTER_ATTACK_ERROR_SCALE: u32 = 3;
pub const COUNTER_ATTACK_MAX_DAMAGE: u32 = 20;

// Boss phases, as fractions of max HP
pub const ENRAGED_BELOW_FRACTION: f32 = 2.0 / 3.0;
pub const DESPERATE_BELOW_FRACTION: f32 = 1.0 / 3.0;

// Ingest timing
pub const DEFAULT_ANALYZER_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_CHUNK_INTERVAL_MS: u64 = 3000;
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_DELAYED_AFTER_TIMEOUTS: u32 = 2;
pub const DEFAULT_COMMAND_BUFFER: usize = 64;
