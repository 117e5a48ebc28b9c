//! Session actor + ingest loop integration tests
//!
//! All of these run on a paused clock, so analyzer latency and the battle
//! clock advance instantly and deterministically.

use std::sync::Arc;
use std::time::Duration;

use orator_arena::analysis::{Analyzer, AnalysisResult, Chunk, SimulatedAnalyzer, SimulatedProfile, TranscriptAnalyzer};
use orator_arena::battle::{find_topic, BattleConfig, BattlePhase, LogKind};
use orator_arena::core::error::{ArenaError, Result};
use orator_arena::core::types::{ChunkSeq, Skill, UserId};
use orator_arena::core::ArenaConfig;
use orator_arena::progress::{IdempotencyKey, InMemoryProgressStore, ProgressRecord, ProgressStore, ProgressUpdate};
use orator_arena::session::{spawn_session, ChannelSource, IngestLoop, ScriptedSource, SessionHandle};

/// Fluent 20-word analysis after a per-chunk delay (chunk 1 uses `delays_ms[0]`)
struct ScriptedLatency {
    delays_ms: Vec<u64>,
}

#[async_trait::async_trait]
impl Analyzer for ScriptedLatency {
    async fn analyze(&self, chunk: &Chunk) -> Result<AnalysisResult> {
        let index = (chunk.seq.0 as usize).saturating_sub(1);
        let delay = self.delays_ms.get(index).copied().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(AnalysisResult::new(20).with_skill(Skill::Fluency, 8.0))
    }

    fn name(&self) -> &str {
        "scripted_latency"
    }
}

/// In-memory store whose writes take `delay`
struct SluggishStore {
    inner: InMemoryProgressStore,
    delay: Duration,
}

#[async_trait::async_trait]
impl ProgressStore for SluggishStore {
    async fn upsert_progress(
        &self,
        key: IdempotencyKey,
        user: &UserId,
        damage_delta: u64,
        xp_delta: u64,
    ) -> Result<ProgressUpdate> {
        tokio::time::sleep(self.delay).await;
        self.inner.upsert_progress(key, user, damage_delta, xp_delta).await
    }

    async fn get(&self, user: &UserId) -> Result<Option<ProgressRecord>> {
        self.inner.get(user).await
    }

    async fn leaderboard(&self, limit: usize) -> Result<Vec<ProgressRecord>> {
        self.inner.leaderboard(limit).await
    }
}

fn setup() -> (SessionHandle, Arc<InMemoryProgressStore>) {
    let store = Arc::new(InMemoryProgressStore::default());
    let handle = spawn_session(ArenaConfig::default(), UserId::new("noor"), store.clone());
    (handle, store)
}

#[tokio::test(start_paused = true)]
async fn test_late_result_is_discarded_as_stale() {
    let (handle, _) = setup();
    handle.start_battle(BattleConfig::new(10_000, 20)).await.unwrap();

    // Chunk 1 (captured at 3s) lands at 7s, after chunk 2 (captured at 6s) lands at 6.1s
    let analyzer = Arc::new(ScriptedLatency { delays_ms: vec![4_000, 100] });
    let report = IngestLoop::new(handle.clone(), analyzer, ScriptedSource::placeholders(2), &ArenaConfig::default())
        .run()
        .await
        .unwrap();

    assert_eq!(report.chunks_captured, 2);
    assert_eq!(report.chunks_applied, 1);
    assert_eq!(report.chunks_stale, 1);
    assert_eq!(report.final_phase, BattlePhase::Defeat);

    let battle = handle.snapshot().battle;
    assert_eq!(battle.last_applied_seq(), ChunkSeq(2));
    assert!(battle.combat_log().any(|kind| matches!(
        kind,
        LogKind::StaleEventDiscarded {
            chunk_seq: ChunkSeq(1),
            ..
        }
    )));
    assert!(battle.combat_log().any(|kind| matches!(kind, LogKind::TimeExpired)));
}

#[tokio::test(start_paused = true)]
async fn test_hung_analyzer_is_dropped_and_flagged_delayed() {
    let (handle, _) = setup();
    handle.start_battle(BattleConfig::new(10_000, 30)).await.unwrap();

    // Chunks 1 and 2 hang (dropped at 8s and 11s); chunk 3 lands at 13s
    let analyzer = Arc::new(ScriptedLatency {
        delays_ms: vec![600_000, 600_000, 4_000],
    });
    let report = IngestLoop::new(handle.clone(), analyzer, ScriptedSource::placeholders(3), &ArenaConfig::default())
        .run()
        .await
        .unwrap();

    assert_eq!(report.chunks_timed_out, 2);
    assert_eq!(report.chunks_failed, 2);
    assert_eq!(report.chunks_applied, 1);
    // The clock never waited on the analyzer
    assert_eq!(report.ticks, 30);

    let battle = handle.snapshot().battle;
    assert_eq!(
        battle
            .combat_log()
            .count(|kind| matches!(kind, LogKind::AnalysisDelayed { .. })),
        1
    );
    assert_eq!(battle.boss_hp(), 10_000 - 90);
}

#[tokio::test(start_paused = true)]
async fn test_retreat_cancels_in_flight_analyses() {
    let (handle, _) = setup();
    handle.start_battle(BattleConfig::new(10_000, 120)).await.unwrap();

    let analyzer = Arc::new(ScriptedLatency {
        delays_ms: vec![4_000; 10],
    });
    let ingest = IngestLoop::new(handle.clone(), analyzer, ScriptedSource::placeholders(10), &ArenaConfig::default());
    let running = tokio::spawn(ingest.run());

    // Chunk 1 lands at 7s; chunk 2 (captured at 6s) is still running at 7.5s
    tokio::time::sleep(Duration::from_millis(7_500)).await;
    handle.retreat().await.unwrap();

    let report = running.await.unwrap().unwrap();
    assert_eq!(report.final_phase, BattlePhase::Lobby);
    assert_eq!(report.chunks_applied, 1);
    assert!(report.chunks_cancelled >= 1);

    // Nothing from the abandoned battle trickles in later
    tokio::time::sleep(Duration::from_secs(30)).await;
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.battle.phase(), BattlePhase::Lobby);
    assert!(snapshot.battle.combat_log().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_victory_persists_chunk_and_topic_xp() {
    let (handle, _) = setup();
    let arena = ArenaConfig::default();
    let topic = find_topic(1).unwrap();
    let battle = BattleConfig {
        boss_max_hp: 150,
        ..BattleConfig::for_topic(topic.clone(), &arena)
    };
    handle.start_battle(battle).await.unwrap();

    let analyzer = Arc::new(ScriptedLatency { delays_ms: vec![200; 5] });
    let report = IngestLoop::new(handle.clone(), analyzer, ScriptedSource::placeholders(5), &arena)
        .run()
        .await
        .unwrap();

    assert_eq!(report.final_phase, BattlePhase::Victory);
    assert_eq!(report.chunks_applied, 2);
    assert_eq!(report.total_boss_damage, 150);

    let record = handle.progress().await.unwrap().unwrap();
    assert!(record.total_xp >= u64::from(topic.xp_reward));
    assert_eq!(record.cumulative_damage, 0);
    assert_eq!(record.band_key, "band_9.0");

    assert_eq!(handle.acknowledge().await.unwrap(), BattlePhase::Victory);
    assert_eq!(handle.snapshot().battle.phase(), BattlePhase::Lobby);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_duplicate_submissions_apply_once() {
    let (handle, _) = setup();
    handle.start_battle(BattleConfig::new(1_000, 60)).await.unwrap();

    let analysis = AnalysisResult::new(20).with_skill(Skill::Fluency, 8.0);
    let mut tasks = Vec::new();
    for _ in 0..8 {
        let handle = handle.clone();
        let analysis = analysis.clone();
        tasks.push(tokio::spawn(async move { handle.submit_analysis(ChunkSeq(1), analysis).await }));
    }

    let mut applied = 0;
    let mut stale = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => applied += 1,
            Err(ArenaError::Rejected(_)) => stale += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(applied, 1);
    assert_eq!(stale, 7);
    assert_eq!(handle.snapshot().battle.boss_hp(), 1_000 - 90);
}

#[tokio::test(start_paused = true)]
async fn test_typed_lines_through_transcript_analyzer() {
    let (handle, _) = setup();
    let arena = ArenaConfig::default();
    handle.start_battle(BattleConfig::new(10_000, 15)).await.unwrap();

    let (lines, source) = ChannelSource::new();
    lines
        .send("I think cities are growing because people move there for work.".to_string())
        .unwrap();
    lines
        .send("Moreover, public transport makes commuting much easier than before.".to_string())
        .unwrap();

    let analyzer = Arc::new(TranscriptAnalyzer::from_config(&arena.scoring));
    let report = IngestLoop::new(handle.clone(), analyzer, source, &arena)
        .with_max_chunks(2)
        .run()
        .await
        .unwrap();

    assert_eq!(report.final_phase, BattlePhase::Defeat);
    assert!(report.chunks_applied >= 1);
    assert!(report.total_boss_damage > 0);
    assert!(handle.progress().await.unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_seeded_simulation_is_reproducible() {
    async fn run(seed: u64) -> (u32, u64) {
        let (handle, _) = setup();
        handle.start_battle(BattleConfig::new(1_000, 60)).await.unwrap();
        let analyzer = Arc::new(SimulatedAnalyzer::new(seed, SimulatedProfile::default()));
        let report = IngestLoop::new(handle.clone(), analyzer, ScriptedSource::placeholders(15), &ArenaConfig::default())
            .run()
            .await
            .unwrap();
        (handle.snapshot().battle.boss_hp(), report.chunks_applied)
    }

    assert_eq!(run(42).await, run(42).await);
}

#[tokio::test(start_paused = true)]
async fn test_slow_progress_store_keeps_battle_on_time() {
    let store = Arc::new(SluggishStore {
        inner: InMemoryProgressStore::default(),
        delay: Duration::from_secs(4),
    });
    let handle = spawn_session(ArenaConfig::default(), UserId::new("noor"), store);
    handle.start_battle(BattleConfig::new(10_000, 30)).await.unwrap();

    let started = tokio::time::Instant::now();
    let analyzer = Arc::new(ScriptedLatency { delays_ms: vec![] });
    let report = IngestLoop::new(handle.clone(), analyzer, ScriptedSource::placeholders(20), &ArenaConfig::default())
        .run()
        .await
        .unwrap();

    // A 30 second battle lasts 30 seconds even though every write takes 4
    assert!(started.elapsed() < Duration::from_secs(32));
    assert_eq!(report.final_phase, BattlePhase::Defeat);
    assert_eq!(report.ticks, 30);
    assert!(report.chunks_captured >= 9);
    assert!(report.chunks_applied >= 9);

    // The writes catch up afterwards
    assert!(handle.progress().await.unwrap().is_some());
    assert!(handle.band().is_some());
}
