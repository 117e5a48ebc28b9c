//! Single-writer battle engine
//!
//! Glues the damage calculator, the streak tracker and the battle state
//! machine together. All mutation of one battle goes through one
//! `BattleEngine`, and the engine itself is owned by exactly one task.
//!
//! A chunk's score is computed against the current streak first and the new
//! streak is committed only if the state machine accepts the event, so stale
//! or late chunks never move the streak.

use serde::Serialize;
use tracing::debug;

use crate::analysis::result::AnalysisResult;
use crate::battle::state::{ApplyOutcome, BattleConfig, BattlePhase, BattleState, Rejection};
use crate::core::config::ArenaConfig;
use crate::core::types::{ChunkSeq, SessionId};
use crate::progress::store::IdempotencyKey;
use crate::scoring::damage::{score_chunk, DamageEvent};
use crate::scoring::streak::{StreakPolicy, StreakState, StreakTracker};

/// A progress write the engine asks its owner to persist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressDelta {
    pub key: IdempotencyKey,
    pub damage: u64,
    pub xp: u64,
}

/// Everything one accepted chunk did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkOutcome {
    pub event: DamageEvent,
    pub applied: ApplyOutcome,
    pub streak: StreakState,
    pub progress: ProgressDelta,
    /// Topic reward, present only on the chunk that won the battle
    pub victory: Option<ProgressDelta>,
}

/// Read-only view of a session for the UI, published after every transition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BattleSnapshot {
    pub session: SessionId,
    pub battle: BattleState,
    pub streak: StreakState,
}

pub struct BattleEngine {
    config: ArenaConfig,
    session: SessionId,
    state: BattleState,
    streak: StreakTracker,
}

impl BattleEngine {
    pub fn new(config: ArenaConfig) -> Self {
        let streak = StreakTracker::new(StreakPolicy::from_config(&config.scoring));
        Self {
            config,
            session: SessionId::new(),
            state: BattleState::new(),
            streak,
        }
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Id of the current (or last) battle; fresh for every `start_battle`
    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn state(&self) -> &BattleState {
        &self.state
    }

    pub fn streak(&self) -> StreakState {
        self.streak.state()
    }

    pub fn phase(&self) -> BattlePhase {
        self.state.phase()
    }

    pub fn snapshot(&self) -> BattleSnapshot {
        BattleSnapshot {
            session: self.session,
            battle: self.state.clone(),
            streak: self.streak.state(),
        }
    }

    pub fn start_battle(&mut self, battle: &BattleConfig) -> Result<(), Rejection> {
        self.state.start_battle(battle)?;
        self.session = SessionId::new();
        self.streak.reset();
        debug!("Session {} started", self.session);
        Ok(())
    }

    /// Score an analysed chunk and apply it
    pub fn apply_analysis(&mut self, seq: ChunkSeq, analysis: &AnalysisResult) -> Result<ChunkOutcome, Rejection> {
        let score = score_chunk(analysis, self.streak.state(), seq, &self.config.scoring);
        let applied = self.state.apply_damage_event(&score.event)?;
        self.streak.commit(score.streak);

        let progress = ProgressDelta {
            key: IdempotencyKey::chunk(self.session, seq),
            damage: u64::from(score.proficiency_damage),
            xp: u64::from(score.xp_delta),
        };
        let victory = (applied.phase == BattlePhase::Victory).then(|| ProgressDelta {
            key: IdempotencyKey::victory(self.session),
            damage: 0,
            xp: self.state.topic().map_or(0, |t| u64::from(t.xp_reward)),
        });

        let streak = self.streak.state();
        if applied.phase.is_terminal() {
            self.streak.reset();
        }

        Ok(ChunkOutcome {
            event: score.event,
            applied,
            streak,
            progress,
            victory,
        })
    }

    /// Record a chunk whose analysis failed or timed out; returns true when
    /// the session just entered "analysis delayed"
    pub fn record_failure(&mut self, seq: ChunkSeq, reason: &str) -> Result<bool, Rejection> {
        self.state.record_analysis_failure(seq, reason)
    }

    pub fn tick(&mut self) -> Result<BattlePhase, Rejection> {
        let phase = self.state.tick()?;
        if phase.is_terminal() {
            self.streak.reset();
        }
        Ok(phase)
    }

    pub fn retreat(&mut self) -> Result<(), Rejection> {
        self.state.retreat()?;
        self.streak.reset();
        Ok(())
    }

    pub fn acknowledge(&mut self) -> Result<BattlePhase, Rejection> {
        self.state.acknowledge()
    }
}
