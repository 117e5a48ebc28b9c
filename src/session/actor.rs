//! Per-session actor
//!
//! One task owns the `BattleEngine`. Every mutation arrives as a command on
//! an mpsc queue and is answered over a oneshot, so staleness checks never
//! race. Each transition publishes a fresh snapshot on a watch channel, which
//! is what UIs subscribe to.
//!
//! Progress writes never run on the engine task. Accepted chunks queue their
//! deltas to a second task that owns the store, so a slow store delays the
//! band, never the battle.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::analysis::result::AnalysisResult;
use crate::battle::state::{BattleConfig, BattlePhase, Rejection};
use crate::core::config::ArenaConfig;
use crate::core::error::{ArenaError, Result};
use crate::core::types::{ChunkSeq, UserId};
use crate::progress::store::{ProgressRecord, ProgressStore, ProgressUpdate};
use crate::scoring::bands::BandInfo;
use crate::session::engine::{BattleEngine, BattleSnapshot, ChunkOutcome, ProgressDelta};

type Reply<T> = oneshot::Sender<std::result::Result<T, Rejection>>;

/// Command sent to a session task
enum SessionCommand {
    StartBattle {
        battle: BattleConfig,
        reply: Reply<()>,
    },
    SubmitAnalysis {
        seq: ChunkSeq,
        analysis: AnalysisResult,
        reply: Reply<ChunkOutcome>,
    },
    ReportFailure {
        seq: ChunkSeq,
        reason: String,
        reply: Reply<bool>,
    },
    Tick {
        reply: Reply<BattlePhase>,
    },
    Retreat {
        reply: Reply<()>,
    },
    Acknowledge {
        reply: Reply<BattlePhase>,
    },
}

/// Work for the progress task, handled strictly in queue order
enum ProgressCommand {
    Write(ProgressDelta),
    Read {
        reply: oneshot::Sender<Result<Option<ProgressRecord>>>,
    },
}

/// Cloneable handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    user: UserId,
    commands: mpsc::Sender<SessionCommand>,
    progress: mpsc::UnboundedSender<ProgressCommand>,
    snapshots: watch::Receiver<BattleSnapshot>,
    bands: watch::Receiver<Option<BandInfo>>,
}

/// Spawn a session task for `user`; it runs until every handle is dropped
pub fn spawn_session(config: ArenaConfig, user: UserId, store: Arc<dyn ProgressStore>) -> SessionHandle {
    let buffer = config.ingest.command_buffer.max(1);
    let (command_tx, command_rx) = mpsc::channel(buffer);
    let (progress_tx, progress_rx) = mpsc::unbounded_channel();
    let engine = BattleEngine::new(config);
    let (snapshot_tx, snapshot_rx) = watch::channel(engine.snapshot());
    let (band_tx, band_rx) = watch::channel(None);

    info!("Starting session for {}", user);
    tokio::spawn(progress_task(store, user.clone(), progress_rx, band_tx));
    tokio::spawn(session_task(engine, command_rx, progress_tx.clone(), snapshot_tx));

    SessionHandle {
        user,
        commands: command_tx,
        progress: progress_tx,
        snapshots: snapshot_rx,
        bands: band_rx,
    }
}

impl SessionHandle {
    pub fn user(&self) -> &UserId {
        &self.user
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> SessionCommand) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(make(reply_tx))
            .await
            .map_err(|_| ArenaError::SessionClosed)?;
        reply_rx.await.map_err(|_| ArenaError::SessionClosed)
    }

    pub async fn start_battle(&self, battle: BattleConfig) -> Result<()> {
        Ok(self
            .request(|reply| SessionCommand::StartBattle { battle, reply })
            .await??)
    }

    /// Apply an analysed chunk; its progress write is queued, not awaited
    pub async fn submit_analysis(&self, seq: ChunkSeq, analysis: AnalysisResult) -> Result<ChunkOutcome> {
        Ok(self
            .request(|reply| SessionCommand::SubmitAnalysis { seq, analysis, reply })
            .await??)
    }

    /// Report a chunk whose analysis failed or timed out
    pub async fn report_failure(&self, seq: ChunkSeq, reason: impl Into<String>) -> Result<bool> {
        let reason = reason.into();
        Ok(self
            .request(|reply| SessionCommand::ReportFailure { seq, reason, reply })
            .await??)
    }

    pub async fn tick(&self) -> Result<BattlePhase> {
        Ok(self.request(|reply| SessionCommand::Tick { reply }).await??)
    }

    pub async fn retreat(&self) -> Result<()> {
        Ok(self.request(|reply| SessionCommand::Retreat { reply }).await??)
    }

    pub async fn acknowledge(&self) -> Result<BattlePhase> {
        Ok(self.request(|reply| SessionCommand::Acknowledge { reply }).await??)
    }

    /// The user's stored progress, after every write queued before this call
    pub async fn progress(&self) -> Result<Option<ProgressRecord>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.progress
            .send(ProgressCommand::Read { reply: reply_tx })
            .map_err(|_| ArenaError::SessionClosed)?;
        reply_rx.await.map_err(|_| ArenaError::SessionClosed)?
    }

    /// Band from the latest successful progress write
    pub fn band(&self) -> Option<BandInfo> {
        self.bands.borrow().clone()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> BattleSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that sees every published snapshot from now on
    pub fn subscribe(&self) -> watch::Receiver<BattleSnapshot> {
        let mut rx = self.snapshots.clone();
        rx.borrow_and_update();
        rx
    }
}

async fn session_task(
    mut engine: BattleEngine,
    mut commands: mpsc::Receiver<SessionCommand>,
    progress: mpsc::UnboundedSender<ProgressCommand>,
    snapshots: watch::Sender<BattleSnapshot>,
) {
    while let Some(command) = commands.recv().await {
        match command {
            SessionCommand::StartBattle { battle, reply } => {
                let result = engine.start_battle(&battle);
                publish(&snapshots, &engine);
                let _ = reply.send(result);
            }
            SessionCommand::SubmitAnalysis { seq, analysis, reply } => {
                let result = engine.apply_analysis(seq, &analysis);
                match &result {
                    Ok(outcome) => {
                        for delta in std::iter::once(outcome.progress).chain(outcome.victory) {
                            if progress.send(ProgressCommand::Write(delta)).is_err() {
                                warn!("Progress task gone; dropping {:?}", delta.key.event);
                            }
                        }
                    }
                    Err(rejection) => debug!("Chunk {} rejected: {}", seq, rejection),
                }
                publish(&snapshots, &engine);
                let _ = reply.send(result);
            }
            SessionCommand::ReportFailure { seq, reason, reply } => {
                let result = engine.record_failure(seq, &reason);
                publish(&snapshots, &engine);
                let _ = reply.send(result);
            }
            SessionCommand::Tick { reply } => {
                let result = engine.tick();
                publish(&snapshots, &engine);
                let _ = reply.send(result);
            }
            SessionCommand::Retreat { reply } => {
                let result = engine.retreat();
                publish(&snapshots, &engine);
                let _ = reply.send(result);
            }
            SessionCommand::Acknowledge { reply } => {
                let result = engine.acknowledge();
                publish(&snapshots, &engine);
                let _ = reply.send(result);
            }
        }
    }

    info!("Session shutting down (all handles dropped)");
}

/// Snapshots go out before the reply, so a caller never reads a stale one
fn publish(snapshots: &watch::Sender<BattleSnapshot>, engine: &BattleEngine) {
    snapshots.send_replace(engine.snapshot());
}

/// Owns the store; drains writes and reads in the order they were queued
async fn progress_task(
    store: Arc<dyn ProgressStore>,
    user: UserId,
    mut queue: mpsc::UnboundedReceiver<ProgressCommand>,
    bands: watch::Sender<Option<BandInfo>>,
) {
    while let Some(command) = queue.recv().await {
        match command {
            ProgressCommand::Write(delta) => {
                if let Some(update) = persist(store.as_ref(), &user, &delta).await {
                    bands.send_replace(Some(update.band));
                }
            }
            ProgressCommand::Read { reply } => {
                let _ = reply.send(store.get(&user).await);
            }
        }
    }
    debug!("Progress writer for {} finished", user);
}

/// Persist one delta; a store failure is logged and never ends the battle
async fn persist(store: &dyn ProgressStore, user: &UserId, delta: &ProgressDelta) -> Option<ProgressUpdate> {
    match store.upsert_progress(delta.key, user, delta.damage, delta.xp).await {
        Ok(update) => {
            debug!(
                "Progress for {}: damage={} xp={} band={}",
                user, update.record.cumulative_damage, update.record.total_xp, update.record.band_key
            );
            Some(update)
        }
        Err(e) => {
            warn!("Progress write {:?} for {} failed: {}", delta.key.event, user, e);
            None
        }
    }
}
