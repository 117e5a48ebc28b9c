//! Session ingest loop
//!
//! Three things run on one select loop:
//! - capture: a fixed-cadence interval that takes the next chunk, assigns it
//!   the next sequence number and spawns its analysis without waiting
//! - clock: a fixed-cadence interval driving `tick()`
//! - completion: finished analyses, each under a watchdog timeout, handed to
//!   a delivery task in whatever order they complete
//!
//! The delivery task feeds results to the session actor one at a time, which
//! serializes them, so the staleness check sees a consistent `last applied`
//! value. The select loop never awaits a delivery, so the clock and the
//! capture cadence keep their pace however long the session takes to answer.
//! When the battle leaves `Active` (victory, defeat or a retreat from any
//! handle) the loop stops and aborts every analysis still in flight.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::analysis::analyzer::{Analyzer, Chunk};
use crate::analysis::result::AnalysisResult;
use crate::battle::state::{BattlePhase, Rejection};
use crate::core::config::{ArenaConfig, IngestConfig};
use crate::core::error::{ArenaError, Result};
use crate::core::types::ChunkSeq;
use crate::session::actor::SessionHandle;
use crate::session::capture::ChunkSource;

/// What came back for one chunk
#[derive(Debug)]
enum Delivery {
    Analyzed(AnalysisResult),
    Failed(ArenaError),
}

/// Counters for one ingest run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub chunks_captured: u64,
    pub chunks_applied: u64,
    pub chunks_stale: u64,
    pub chunks_failed: u64,
    pub chunks_timed_out: u64,
    /// Analyses that finished only after the battle was over
    pub chunks_late: u64,
    /// Analyses still running when the battle ended
    pub chunks_cancelled: u64,
    pub ticks: u64,
    pub total_boss_damage: u64,
    pub final_phase: BattlePhase,
}

pub struct IngestLoop<S: ChunkSource> {
    handle: SessionHandle,
    analyzer: Arc<dyn Analyzer>,
    source: S,
    ingest: IngestConfig,
    markers: Vec<String>,
    max_chunks: Option<u64>,
}

impl<S: ChunkSource> IngestLoop<S> {
    pub fn new(handle: SessionHandle, analyzer: Arc<dyn Analyzer>, source: S, config: &ArenaConfig) -> Self {
        Self {
            handle,
            analyzer,
            source,
            ingest: config.ingest.clone(),
            markers: config.scoring.discourse_markers.clone(),
            max_chunks: None,
        }
    }

    /// Stop capturing after `max` chunks (the clock keeps running)
    pub fn with_max_chunks(mut self, max: u64) -> Self {
        self.max_chunks = Some(max);
        self
    }

    /// Run until the battle leaves `Active`
    pub async fn run(mut self) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        let snapshot = self.handle.snapshot();
        if !snapshot.battle.phase().is_active() {
            report.final_phase = snapshot.battle.phase();
            return Ok(report);
        }
        let session = snapshot.session;
        let topic = snapshot.battle.topic().map(|t| t.title.clone());

        let chunk_every = Duration::from_millis(self.ingest.chunk_interval_ms);
        let tick_every = Duration::from_millis(self.ingest.tick_interval_ms);
        let watchdog = Duration::from_millis(self.ingest.analyzer_timeout_ms);
        let start = Instant::now();
        let mut capture = interval_at(start + chunk_every, chunk_every);
        capture.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut clock = interval_at(start + tick_every, tick_every);
        clock.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut updates = self.handle.subscribe();
        let mut in_flight: JoinSet<(ChunkSeq, Delivery)> = JoinSet::new();
        let (completed, queue) = mpsc::unbounded_channel();
        let delivery = tokio::spawn(deliver_all(self.handle.clone(), self.markers.clone(), queue));
        let mut seq = ChunkSeq::NONE;
        let mut capturing = true;

        info!(
            "Ingest started for session {} (chunk every {:?}, watchdog {:?}, analyzer {})",
            session,
            chunk_every,
            watchdog,
            self.analyzer.name()
        );

        loop {
            if !self.handle.snapshot().battle.phase().is_active() {
                break;
            }

            tokio::select! {
                _ = clock.tick() => {
                    match self.handle.tick().await {
                        Ok(_) => report.ticks += 1,
                        Err(ArenaError::Rejected(_)) => break,
                        Err(e) => return Err(e),
                    }
                }
                _ = capture.tick(), if capturing => {
                    if self.max_chunks.map_or(false, |max| report.chunks_captured >= max) {
                        capturing = false;
                        continue;
                    }
                    let Some(payload) = self.source.capture() else {
                        debug!("Chunk source finished after {} chunks", report.chunks_captured);
                        capturing = false;
                        continue;
                    };
                    seq = seq.next();
                    report.chunks_captured += 1;

                    let mut chunk = Chunk { seq, session, payload, topic: None };
                    if let Some(title) = &topic {
                        chunk = chunk.with_topic(title.clone());
                    }
                    let analyzer = Arc::clone(&self.analyzer);
                    in_flight.spawn(async move {
                        let delivery = match tokio::time::timeout(watchdog, analyzer.analyze(&chunk)).await {
                            Ok(Ok(analysis)) => Delivery::Analyzed(analysis),
                            Ok(Err(e)) => Delivery::Failed(e),
                            Err(_) => Delivery::Failed(ArenaError::AnalyzerTimeout {
                                seq: chunk.seq,
                                timeout_ms: watchdog.as_millis() as u64,
                            }),
                        };
                        (chunk.seq, delivery)
                    });
                }
                Some(joined) = in_flight.join_next() => {
                    forward(joined, &completed, &mut report);
                }
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        // Finished but never joined: not cancelled, just late
        while let Some(joined) = in_flight.try_join_next() {
            forward(joined, &completed, &mut report);
        }
        report.chunks_cancelled = in_flight.len() as u64;
        in_flight.abort_all();

        drop(completed);
        let tally = delivery
            .await
            .map_err(|e| ArenaError::Analyzer(format!("delivery task failed: {}", e)))??;
        tally.add_to(&mut report);

        report.final_phase = self.handle.snapshot().battle.phase();
        info!(
            "Ingest finished: {:?}, {} captured, {} applied, {} stale, {} failed ({} timed out), {} late, {} cancelled",
            report.final_phase,
            report.chunks_captured,
            report.chunks_applied,
            report.chunks_stale,
            report.chunks_failed,
            report.chunks_timed_out,
            report.chunks_late,
            report.chunks_cancelled
        );
        Ok(report)
    }
}

/// Hand a joined analysis to the delivery task
fn forward(
    joined: std::result::Result<(ChunkSeq, Delivery), JoinError>,
    completed: &mpsc::UnboundedSender<(ChunkSeq, Delivery)>,
    report: &mut IngestReport,
) {
    match joined {
        Ok(done) => {
            if completed.send(done).is_err() {
                warn!("Delivery task gone; dropping a finished analysis");
            }
        }
        Err(e) => {
            warn!("Analysis task failed to complete: {}", e);
            report.chunks_failed += 1;
        }
    }
}

/// Counters kept by the delivery task
#[derive(Debug, Default)]
struct DeliveryTally {
    applied: u64,
    stale: u64,
    failed: u64,
    timed_out: u64,
    late: u64,
    boss_damage: u64,
}

impl DeliveryTally {
    fn add_to(&self, report: &mut IngestReport) {
        report.chunks_applied += self.applied;
        report.chunks_stale += self.stale;
        report.chunks_failed += self.failed;
        report.chunks_timed_out += self.timed_out;
        report.chunks_late += self.late;
        report.total_boss_damage += self.boss_damage;
    }
}

/// Feed finished chunks to the session one at a time until the queue closes
async fn deliver_all(
    handle: SessionHandle,
    markers: Vec<String>,
    mut queue: mpsc::UnboundedReceiver<(ChunkSeq, Delivery)>,
) -> Result<DeliveryTally> {
    let mut tally = DeliveryTally::default();
    while let Some((seq, delivery)) = queue.recv().await {
        match delivery {
            Delivery::Analyzed(mut analysis) => {
                analysis.fill_markers_from_transcript(&markers);
                match handle.submit_analysis(seq, analysis).await {
                    Ok(outcome) => {
                        tally.applied += 1;
                        tally.boss_damage += u64::from(outcome.applied.boss_damage);
                    }
                    Err(ArenaError::Rejected(Rejection::StaleEvent { .. })) => tally.stale += 1,
                    Err(ArenaError::Rejected(Rejection::InvalidTransition { .. })) => tally.late += 1,
                    Err(e) => return Err(e),
                }
            }
            Delivery::Failed(error) => {
                if matches!(error, ArenaError::AnalyzerTimeout { .. }) {
                    tally.timed_out += 1;
                }
                tally.failed += 1;
                warn!("Dropping chunk {}: {}", seq, error);
                match handle.report_failure(seq, error.to_string()).await {
                    Ok(_) | Err(ArenaError::Rejected(_)) => {}
                    Err(e) => return Err(e),
                }
            }
        }
    }
    Ok(tally)
}
