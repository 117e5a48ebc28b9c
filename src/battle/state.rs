//! Battle state machine
//!
//! Lobby -> Active -> Victory | Defeat -> Lobby, plus Active -> Lobby on retreat.
//! Every operation is total: a call in the wrong phase or a stale chunk comes
//! back as a `Rejection` and leaves the battle untouched (stale chunks are
//! also written to the combat log).

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::battle::boss::{BossPhase, Topic};
use crate::battle::counter_attack::counter_attack_damage;
use crate::battle::log::{CombatLog, LogKind};
use crate::core::config::{ArenaConfig, BossConfig, CounterAttackConfig};
use crate::core::types::ChunkSeq;
use crate::scoring::constants::{
    DEFAULT_BOSS_MAX_HP, DEFAULT_DELAYED_AFTER_TIMEOUTS, DEFAULT_TIME_LIMIT_SECONDS, PLAYER_MAX_HP,
};
use crate::scoring::damage::DamageEvent;

/// Battle lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BattlePhase {
    #[default]
    Lobby,
    Active,
    Victory,
    Defeat,
}

impl BattlePhase {
    pub fn is_active(&self) -> bool {
        matches!(self, BattlePhase::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BattlePhase::Victory | BattlePhase::Defeat)
    }
}

/// State machine operations, named in rejections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    StartBattle,
    ApplyDamageEvent,
    RecordAnalysisFailure,
    Tick,
    Retreat,
    Acknowledge,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::StartBattle => "start_battle",
            Operation::ApplyDamageEvent => "apply_damage_event",
            Operation::RecordAnalysisFailure => "record_analysis_failure",
            Operation::Tick => "tick",
            Operation::Retreat => "retreat",
            Operation::Acknowledge => "acknowledge",
        };
        f.write_str(name)
    }
}

/// Why the state machine declined an operation; never fatal
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("{operation} is not allowed in phase {phase:?}")]
    InvalidTransition { operation: Operation, phase: BattlePhase },

    #[error("stale chunk {seq}: last applied {last_applied}")]
    StaleEvent { seq: ChunkSeq, last_applied: ChunkSeq },
}

/// Parameters for one battle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleConfig {
    pub boss_max_hp: u32,
    pub time_limit_seconds: u32,
    pub player_max_hp: u32,
    pub counter_attack: CounterAttackConfig,
    pub boss: BossConfig,
    /// Consecutive analysis failures before "analysis delayed" is logged
    pub delayed_after_failures: u32,
    pub topic: Option<Topic>,
}

impl BattleConfig {
    pub fn new(boss_max_hp: u32, time_limit_seconds: u32) -> Self {
        Self {
            boss_max_hp,
            time_limit_seconds,
            ..Self::default()
        }
    }

    pub fn from_arena(config: &ArenaConfig) -> Self {
        Self {
            boss_max_hp: config.battle.boss_max_hp,
            time_limit_seconds: config.battle.time_limit_seconds,
            player_max_hp: config.battle.player_max_hp,
            counter_attack: config.counter_attack,
            boss: config.boss.clone(),
            delayed_after_failures: config.ingest.delayed_after_timeouts,
            topic: None,
        }
    }

    /// Battle over a catalogue topic, using the topic's time limit
    pub fn for_topic(topic: Topic, config: &ArenaConfig) -> Self {
        Self {
            time_limit_seconds: topic.time_limit_seconds,
            topic: Some(topic),
            ..Self::from_arena(config)
        }
    }
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            boss_max_hp: DEFAULT_BOSS_MAX_HP,
            time_limit_seconds: DEFAULT_TIME_LIMIT_SECONDS,
            player_max_hp: PLAYER_MAX_HP,
            counter_attack: CounterAttackConfig::default(),
            boss: BossConfig::default(),
            delayed_after_failures: DEFAULT_DELAYED_AFTER_TIMEOUTS,
            topic: None,
        }
    }
}

/// What one applied damage event did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApplyOutcome {
    /// HP actually removed from the boss (clamped at remaining HP)
    pub boss_damage: u32,
    /// HP actually removed from the player by a counter-attack
    pub counter_attack: Option<u32>,
    pub phase: BattlePhase,
}

/// Complete battle state, owned by one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleState {
    phase: BattlePhase,
    boss_hp: u32,
    boss_max_hp: u32,
    boss_phase: BossPhase,
    player_hp: u32,
    seconds_remaining: u32,
    time_limit_seconds: u32,
    /// Last committed chunk sequence number
    chunk_seq: ChunkSeq,
    consecutive_failures: u32,
    combat_log: CombatLog,
    config: BattleConfig,
}

impl BattleState {
    /// A fresh lobby, waiting for `start_battle`
    pub fn new() -> Self {
        let config = BattleConfig::default();
        Self {
            phase: BattlePhase::Lobby,
            boss_hp: config.boss_max_hp,
            boss_max_hp: config.boss_max_hp,
            boss_phase: BossPhase::Weakened,
            player_hp: config.player_max_hp,
            seconds_remaining: config.time_limit_seconds,
            time_limit_seconds: config.time_limit_seconds,
            chunk_seq: ChunkSeq::NONE,
            consecutive_failures: 0,
            combat_log: CombatLog::new(),
            config,
        }
    }

    pub fn phase(&self) -> BattlePhase {
        self.phase
    }

    pub fn boss_hp(&self) -> u32 {
        self.boss_hp
    }

    pub fn boss_max_hp(&self) -> u32 {
        self.boss_max_hp
    }

    pub fn boss_phase(&self) -> BossPhase {
        self.boss_phase
    }

    pub fn player_hp(&self) -> u32 {
        self.player_hp
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.seconds_remaining
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.time_limit_seconds.saturating_sub(self.seconds_remaining)
    }

    pub fn last_applied_seq(&self) -> ChunkSeq {
        self.chunk_seq
    }

    pub fn combat_log(&self) -> &CombatLog {
        &self.combat_log
    }

    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    pub fn topic(&self) -> Option<&Topic> {
        self.config.topic.as_ref()
    }

    fn reject(&self, operation: Operation) -> Rejection {
        debug!("Rejected {} in phase {:?}", operation, self.phase);
        Rejection::InvalidTransition {
            operation,
            phase: self.phase,
        }
    }

    fn log(&mut self, kind: LogKind, message: String) {
        let elapsed = self.elapsed_seconds();
        self.combat_log.push(kind, message, elapsed);
    }

    /// Lobby -> Active
    pub fn start_battle(&mut self, config: &BattleConfig) -> Result<(), Rejection> {
        if self.phase != BattlePhase::Lobby {
            return Err(self.reject(Operation::StartBattle));
        }

        *self = Self {
            phase: BattlePhase::Active,
            boss_hp: config.boss_max_hp,
            boss_max_hp: config.boss_max_hp,
            boss_phase: BossPhase::from_hp(config.boss_max_hp, config.boss_max_hp, &config.boss),
            player_hp: config.player_max_hp.min(PLAYER_MAX_HP),
            seconds_remaining: config.time_limit_seconds,
            time_limit_seconds: config.time_limit_seconds,
            chunk_seq: ChunkSeq::NONE,
            consecutive_failures: 0,
            combat_log: CombatLog::new(),
            config: config.clone(),
        };

        let topic = config.topic.as_ref().map(|t| t.title.clone());
        let message = match &topic {
            Some(title) => format!("Battle begins: {}. Speak continuously to damage {}!", title, config.boss.name),
            None => format!("Battle begins! Speak continuously to damage {}!", config.boss.name),
        };
        self.log(LogKind::BattleStarted { topic }, message);

        info!(
            "Battle started: boss_hp={} time_limit={}s",
            self.boss_hp, self.time_limit_seconds
        );
        Ok(())
    }

    /// Apply one chunk's damage; at most once per chunk sequence number
    pub fn apply_damage_event(&mut self, event: &DamageEvent) -> Result<ApplyOutcome, Rejection> {
        if !self.phase.is_active() {
            return Err(self.reject(Operation::ApplyDamageEvent));
        }

        let seq = event.source_chunk_seq;
        if seq <= self.chunk_seq {
            let last_applied = self.chunk_seq;
            warn!("Discarding stale chunk {} (last applied {})", seq, last_applied);
            self.log(
                LogKind::StaleEventDiscarded {
                    chunk_seq: seq,
                    last_applied,
                },
                format!("Late analysis for chunk {} ignored", seq),
            );
            return Err(Rejection::StaleEvent { seq, last_applied });
        }

        self.chunk_seq = seq;
        self.consecutive_failures = 0;

        // Player strike
        let boss_damage = event.amount.min(self.boss_hp);
        self.boss_hp -= boss_damage;
        let message = if event.multiplier > 1.0 {
            format!("You dealt {} damage! ({:.1}x multiplier)", boss_damage, event.multiplier)
        } else {
            format!("You dealt {} damage!", boss_damage)
        };
        self.log(
            LogKind::PlayerStrike {
                chunk_seq: seq,
                amount: boss_damage,
                multiplier: event.multiplier,
                bonuses: event.triggered_bonuses.clone(),
            },
            message,
        );

        // Counter-attack, evaluated independently of the strike
        let counter_attack = counter_attack_damage(&event.pressure, &self.config.counter_attack).map(|damage| {
            let hit = damage.min(self.player_hp);
            self.player_hp -= hit;
            hit
        });
        if let Some(hit) = counter_attack {
            let message = format!("{} casts Mute Spell! -{} HP", self.config.boss.name, hit);
            self.log(LogKind::BossCounterAttack { chunk_seq: seq, amount: hit }, message);
        }

        debug!(
            "Applied chunk {}: boss_hp={} player_hp={}",
            seq, self.boss_hp, self.player_hp
        );

        if self.boss_hp > 0 {
            let phase = BossPhase::from_hp(self.boss_hp, self.boss_max_hp, &self.config.boss);
            if phase != self.boss_phase {
                self.boss_phase = phase;
                let message = format!("{} enters the {}!", self.config.boss.name, phase.label());
                self.log(LogKind::BossPhaseShift { phase }, message);
            }
        }

        // Terminal checks in fixed priority
        if self.boss_hp == 0 {
            self.end_battle(BattlePhase::Victory);
        } else if self.player_hp == 0 {
            self.end_battle(BattlePhase::Defeat);
        }

        Ok(ApplyOutcome {
            boss_damage,
            counter_attack,
            phase: self.phase,
        })
    }

    /// Note a chunk whose analysis failed or timed out; returns true when this
    /// failure tipped the session into "analysis delayed"
    pub fn record_analysis_failure(&mut self, seq: ChunkSeq, reason: &str) -> Result<bool, Rejection> {
        if !self.phase.is_active() {
            return Err(self.reject(Operation::RecordAnalysisFailure));
        }

        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.log(
            LogKind::AnalysisFailed {
                chunk_seq: seq,
                reason: reason.to_string(),
            },
            format!("Analysis of chunk {} failed: {}", seq, reason),
        );

        let delayed = self.consecutive_failures == self.config.delayed_after_failures;
        if delayed {
            let consecutive_failures = self.consecutive_failures;
            self.log(
                LogKind::AnalysisDelayed { consecutive_failures },
                "Analysis delayed. Keep speaking!".to_string(),
            );
        }
        Ok(delayed)
    }

    /// One second of battle clock
    pub fn tick(&mut self) -> Result<BattlePhase, Rejection> {
        if !self.phase.is_active() {
            return Err(self.reject(Operation::Tick));
        }

        self.seconds_remaining = self.seconds_remaining.saturating_sub(1);
        if self.seconds_remaining == 0 {
            let message = format!("Time expired! {} wins!", self.config.boss.name);
            self.log(LogKind::TimeExpired, message);
            self.end_battle(BattlePhase::Defeat);
        }
        Ok(self.phase)
    }

    /// Active -> Lobby, discarding the battle
    pub fn retreat(&mut self) -> Result<(), Rejection> {
        if !self.phase.is_active() {
            return Err(self.reject(Operation::Retreat));
        }
        info!("Retreated at {}s with boss_hp={}", self.elapsed_seconds(), self.boss_hp);
        *self = Self::new();
        Ok(())
    }

    /// Victory | Defeat -> Lobby; returns the acknowledged outcome
    pub fn acknowledge(&mut self) -> Result<BattlePhase, Rejection> {
        if !self.phase.is_terminal() {
            return Err(self.reject(Operation::Acknowledge));
        }
        let outcome = self.phase;
        *self = Self::new();
        Ok(outcome)
    }

    fn end_battle(&mut self, outcome: BattlePhase) {
        self.phase = outcome;
        let (kind, message) = match outcome {
            BattlePhase::Victory => (
                LogKind::Victory,
                format!("Victory! {} is defeated!", self.config.boss.name),
            ),
            _ => (LogKind::Defeat, format!("Defeat! {} prevails.", self.config.boss.name)),
        };
        self.log(kind, message);
        info!("Battle ended: {:?}", outcome);
    }
}

impl Default for BattleState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active(max_hp: u32, time_limit: u32) -> BattleState {
        let mut state = BattleState::new();
        state.start_battle(&BattleConfig::new(max_hp, time_limit)).unwrap();
        state
    }

    #[test]
    fn test_new_state_is_lobby() {
        let state = BattleState::new();
        assert_eq!(state.phase(), BattlePhase::Lobby);
        assert!(state.combat_log().is_empty());
    }

    #[test]
    fn test_start_initializes() {
        let state = active(300, 120);
        assert_eq!(state.phase(), BattlePhase::Active);
        assert_eq!(state.boss_hp(), 300);
        assert_eq!(state.player_hp(), 100);
        assert_eq!(state.seconds_remaining(), 120);
        assert_eq!(state.last_applied_seq(), ChunkSeq::NONE);
        assert!(state.combat_log().any(|k| matches!(k, LogKind::BattleStarted { .. })));
    }

    #[test]
    fn test_start_outside_lobby_rejected() {
        let mut state = active(300, 120);
        let before = state.clone();
        let result = state.start_battle(&BattleConfig::new(50, 10));
        assert_eq!(
            result,
            Err(Rejection::InvalidTransition {
                operation: Operation::StartBattle,
                phase: BattlePhase::Active
            })
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_damage_clamps_at_zero_and_wins() {
        let mut state = active(100, 120);
        let outcome = state.apply_damage_event(&DamageEvent::flat(250, ChunkSeq(1))).unwrap();
        assert_eq!(outcome.boss_damage, 100);
        assert_eq!(state.boss_hp(), 0);
        assert_eq!(state.phase(), BattlePhase::Victory);
        assert!(state.combat_log().any(|k| matches!(k, LogKind::Victory)));
    }

    #[test]
    fn test_duplicate_seq_is_stale() {
        let mut state = active(300, 120);
        state.apply_damage_event(&DamageEvent::flat(150, ChunkSeq(1))).unwrap();
        let result = state.apply_damage_event(&DamageEvent::flat(150, ChunkSeq(1)));
        assert_eq!(
            result,
            Err(Rejection::StaleEvent {
                seq: ChunkSeq(1),
                last_applied: ChunkSeq(1)
            })
        );
        assert_eq!(state.boss_hp(), 150);
        assert!(state
            .combat_log()
            .any(|k| matches!(k, LogKind::StaleEventDiscarded { .. })));
    }

    #[test]
    fn test_older_seq_after_newer_is_stale() {
        let mut state = active(300, 120);
        state.apply_damage_event(&DamageEvent::flat(10, ChunkSeq(3))).unwrap();
        assert!(state.apply_damage_event(&DamageEvent::flat(10, ChunkSeq(2))).is_err());
        assert_eq!(state.boss_hp(), 290);
        assert_eq!(state.last_applied_seq(), ChunkSeq(3));
    }

    #[test]
    fn test_counter_attack_hits_player() {
        let mut state = active(300, 120);
        let event = DamageEvent::flat(10, ChunkSeq(1)).with_pressure(3, 0);
        let outcome = state.apply_damage_event(&event).unwrap();
        assert_eq!(outcome.counter_attack, Some(15));
        assert_eq!(state.player_hp(), 85);
    }

    #[test]
    fn test_player_depleted_is_defeat() {
        let mut state = active(10_000, 120);
        for seq in 1..=5 {
            let event = DamageEvent::flat(1, ChunkSeq(seq)).with_pressure(10, 10);
            let _ = state.apply_damage_event(&event);
        }
        assert_eq!(state.player_hp(), 0);
        assert_eq!(state.phase(), BattlePhase::Defeat);
    }

    #[test]
    fn test_victory_outranks_defeat_in_same_chunk() {
        let mut state = BattleState::new();
        let mut config = BattleConfig::new(50, 120);
        config.player_max_hp = 10;
        state.start_battle(&config).unwrap();

        let event = DamageEvent::flat(60, ChunkSeq(1)).with_pressure(10, 10);
        let outcome = state.apply_damage_event(&event).unwrap();
        assert_eq!(state.player_hp(), 0);
        assert_eq!(outcome.phase, BattlePhase::Victory);
    }

    #[test]
    fn test_boss_phase_shifts_logged() {
        let mut state = active(900, 120);
        state.apply_damage_event(&DamageEvent::flat(400, ChunkSeq(1))).unwrap();
        assert_eq!(state.boss_phase(), BossPhase::Enraged);
        state.apply_damage_event(&DamageEvent::flat(300, ChunkSeq(2))).unwrap();
        assert_eq!(state.boss_phase(), BossPhase::Desperate);
        assert_eq!(
            state
                .combat_log()
                .count(|k| matches!(k, LogKind::BossPhaseShift { .. })),
            2
        );
    }

    #[test]
    fn test_clock_runs_out() {
        let mut state = active(300, 3);
        assert_eq!(state.tick(), Ok(BattlePhase::Active));
        assert_eq!(state.tick(), Ok(BattlePhase::Active));
        assert_eq!(state.tick(), Ok(BattlePhase::Defeat));
        assert!(state.combat_log().any(|k| matches!(k, LogKind::TimeExpired)));
        assert_eq!(state.elapsed_seconds(), 3);
    }

    #[test]
    fn test_terminal_is_stable() {
        let mut state = active(300, 1);
        state.tick().unwrap();
        assert_eq!(state.phase(), BattlePhase::Defeat);
        let before = state.clone();

        assert!(state.tick().is_err());
        assert!(state.apply_damage_event(&DamageEvent::flat(5, ChunkSeq(9))).is_err());
        assert!(state.record_analysis_failure(ChunkSeq(9), "timeout").is_err());
        assert!(state.retreat().is_err());
        assert_eq!(state, before);

        assert_eq!(state.acknowledge(), Ok(BattlePhase::Defeat));
        assert_eq!(state.phase(), BattlePhase::Lobby);
    }

    #[test]
    fn test_retreat_discards_battle() {
        let mut state = active(300, 120);
        state.apply_damage_event(&DamageEvent::flat(100, ChunkSeq(1))).unwrap();
        state.retreat().unwrap();
        assert_eq!(state, BattleState::new());
        assert!(state.retreat().is_err());
        assert!(state.acknowledge().is_err());
    }

    #[test]
    fn test_delayed_logged_once_after_repeated_failures() {
        let mut state = active(300, 120);
        assert_eq!(state.record_analysis_failure(ChunkSeq(1), "timeout"), Ok(false));
        assert_eq!(state.record_analysis_failure(ChunkSeq(2), "timeout"), Ok(true));
        assert_eq!(state.record_analysis_failure(ChunkSeq(3), "timeout"), Ok(false));
        assert_eq!(
            state
                .combat_log()
                .count(|k| matches!(k, LogKind::AnalysisDelayed { .. })),
            1
        );
        // Failures never change HP or the clock
        assert_eq!(state.boss_hp(), 300);
        assert_eq!(state.seconds_remaining(), 120);
    }

    #[test]
    fn test_success_resets_failure_count() {
        let mut state = active(300, 120);
        state.record_analysis_failure(ChunkSeq(1), "timeout").unwrap();
        state.apply_damage_event(&DamageEvent::flat(5, ChunkSeq(2))).unwrap();
        assert_eq!(state.record_analysis_failure(ChunkSeq(3), "timeout"), Ok(false));
    }

    #[test]
    fn test_topic_battle_uses_topic_limit() {
        let topic = crate::battle::boss::find_topic(1).unwrap();
        let config = BattleConfig::for_topic(topic, &ArenaConfig::default());
        let mut state = BattleState::new();
        state.start_battle(&config).unwrap();
        assert_eq!(state.seconds_remaining(), 120);
        assert_eq!(state.topic().map(|t| t.id), Some(1));
    }
}
