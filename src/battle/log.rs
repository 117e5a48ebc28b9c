//! Append-only combat log
//!
//! Every accepted, rejected or failed chunk leaves a line here; it is the only
//! place late and duplicate events become visible.

use serde::{Deserialize, Serialize};

use crate::battle::boss::BossPhase;
use crate::core::types::ChunkSeq;
use crate::scoring::damage::BonusTag;

/// Who a log line is attributed to, for rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Player,
    Boss,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogKind {
    BattleStarted { topic: Option<String> },
    PlayerStrike {
        chunk_seq: ChunkSeq,
        amount: u32,
        multiplier: f32,
        bonuses: Vec<BonusTag>,
    },
    BossCounterAttack { chunk_seq: ChunkSeq, amount: u32 },
    BossPhaseShift { phase: BossPhase },
    StaleEventDiscarded { chunk_seq: ChunkSeq, last_applied: ChunkSeq },
    AnalysisFailed { chunk_seq: ChunkSeq, reason: String },
    AnalysisDelayed { consecutive_failures: u32 },
    TimeExpired,
    Victory,
    Defeat,
}

impl LogKind {
    pub fn speaker(&self) -> Speaker {
        match self {
            LogKind::PlayerStrike { .. } | LogKind::Victory => Speaker::Player,
            LogKind::BossCounterAttack { .. }
            | LogKind::BossPhaseShift { .. }
            | LogKind::TimeExpired
            | LogKind::Defeat => Speaker::Boss,
            LogKind::BattleStarted { .. }
            | LogKind::StaleEventDiscarded { .. }
            | LogKind::AnalysisFailed { .. }
            | LogKind::AnalysisDelayed { .. } => Speaker::System,
        }
    }
}

/// One combat log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Battle seconds elapsed when the entry was written
    pub elapsed_seconds: u32,
    pub speaker: Speaker,
    pub kind: LogKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatLog {
    entries: Vec<LogEntry>,
}

impl CombatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: LogKind, message: String, elapsed_seconds: u32) {
        self.entries.push(LogEntry {
            elapsed_seconds,
            speaker: kind.speaker(),
            kind,
            message,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    /// Any entry matching the predicate?
    pub fn any(&self, pred: impl Fn(&LogKind) -> bool) -> bool {
        self.entries.iter().any(|e| pred(&e.kind))
    }

    pub fn count(&self, pred: impl Fn(&LogKind) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.kind)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_assigns_speaker() {
        let mut log = CombatLog::new();
        log.push(LogKind::TimeExpired, "Time expired!".into(), 120);
        log.push(
            LogKind::BossCounterAttack { chunk_seq: ChunkSeq(1), amount: 5 },
            "Mute Spell".into(),
            3,
        );

        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].speaker, Speaker::Boss);
        assert_eq!(log.entries()[0].elapsed_seconds, 120);
        assert!(log.any(|k| matches!(k, LogKind::TimeExpired)));
        assert_eq!(log.count(|k| matches!(k, LogKind::BossCounterAttack { .. })), 1);
    }

    #[test]
    fn test_entry_serializes_with_tag() {
        let mut log = CombatLog::new();
        log.push(LogKind::Victory, "Victory!".into(), 40);
        let json = serde_json::to_string(log.last().unwrap()).unwrap();
        assert!(json.contains("\"type\":\"victory\""));
        assert!(json.contains("\"speaker\":\"player\""));
    }
}
