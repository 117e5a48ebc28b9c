//! Boss battle - the lifecycle a speaking session fights through
//!
//! One battle per session. Chunks of speech become damage events; the boss
//! answers hesitation with counter-attacks; the clock decides the rest.

pub mod boss;
pub mod counter_attack;
pub mod log;
pub mod state;

// Re-exports for convenient access
pub use boss::{find_topic, topic_catalog, BossPhase, Topic};
pub use counter_attack::{counter_attack_damage, triggers_counter_attack};
pub use log::{CombatLog, LogEntry, LogKind, Speaker};
pub use state::{ApplyOutcome, BattleConfig, BattlePhase, BattleState, Operation, Rejection};
