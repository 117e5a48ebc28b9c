//! Scoring - turning analysed speech into damage, XP and bands
//!
//! Everything here is pure: the same analysis and streak always produce the
//! same damage event.

pub mod bands;
pub mod constants;
pub mod damage;
pub mod streak;

pub use bands::{BandInfo, BandRange, BandTable};
pub use damage::{
    base_damage, compute_damage, compute_proficiency_damage, compute_xp, score_chunk, BonusTag, ChunkPressure,
    ChunkScore, DamageEvent,
};
pub use streak::{StreakPolicy, StreakState, StreakTracker};
