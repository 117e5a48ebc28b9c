//! Learner progress persistence
//!
//! The store owns physical at-most-once: every write carries an idempotency
//! key, and a key seen before returns the current record untouched. Concurrent
//! battles for one user merge additively. The band key is recomputed under the
//! same lock as the damage it is derived from.

use ahash::{AHashMap, AHashSet};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use tracing::{debug, info};

use crate::core::error::Result;
use crate::core::types::{ChunkSeq, SessionId, UserId};
use crate::scoring::bands::{BandInfo, BandTable};

/// The logical event a progress write comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressEvent {
    Chunk(ChunkSeq),
    Victory,
}

/// Identity of one logical write: at most one effect per key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey {
    pub session: SessionId,
    pub event: ProgressEvent,
}

impl IdempotencyKey {
    pub fn chunk(session: SessionId, seq: ChunkSeq) -> Self {
        Self {
            session,
            event: ProgressEvent::Chunk(seq),
        }
    }

    pub fn victory(session: SessionId) -> Self {
        Self {
            session,
            event: ProgressEvent::Victory,
        }
    }
}

/// Persisted learner progress; `band_key` always matches `cumulative_damage`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub user_id: UserId,
    pub cumulative_damage: u64,
    pub band_key: String,
    pub total_xp: u64,
}

/// Result of one upsert
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    pub record: ProgressRecord,
    /// Band snapshot for the UI
    pub band: BandInfo,
    /// True if the key had already been applied and nothing changed
    pub replayed: bool,
}

/// Trait for progress backends (allows mocking in tests)
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn upsert_progress(
        &self,
        key: IdempotencyKey,
        user: &UserId,
        damage_delta: u64,
        xp_delta: u64,
    ) -> Result<ProgressUpdate>;

    async fn get(&self, user: &UserId) -> Result<Option<ProgressRecord>>;

    /// Best learners first: lowest cumulative damage, ties by higher XP
    async fn leaderboard(&self, limit: usize) -> Result<Vec<ProgressRecord>>;
}

#[derive(Default)]
struct StoreInner {
    records: AHashMap<UserId, ProgressRecord>,
    applied: AHashSet<IdempotencyKey>,
}

/// Process-local store
pub struct InMemoryProgressStore {
    bands: BandTable,
    inner: Mutex<StoreInner>,
}

impl InMemoryProgressStore {
    pub fn new(bands: BandTable) -> Self {
        Self {
            bands,
            inner: Mutex::new(StoreInner::default()),
        }
    }

    pub fn bands(&self) -> &BandTable {
        &self.bands
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fresh_record(&self, user: &UserId) -> ProgressRecord {
        ProgressRecord {
            user_id: user.clone(),
            cumulative_damage: 0,
            band_key: self.bands.lookup(0).band_key.clone(),
            total_xp: 0,
        }
    }
}

impl Default for InMemoryProgressStore {
    fn default() -> Self {
        Self::new(BandTable::standard())
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn upsert_progress(
        &self,
        key: IdempotencyKey,
        user: &UserId,
        damage_delta: u64,
        xp_delta: u64,
    ) -> Result<ProgressUpdate> {
        let mut inner = self.inner.lock();

        if inner.applied.contains(&key) {
            debug!("Replayed progress write {:?} for {}", key.event, user);
            let record = inner
                .records
                .get(user)
                .cloned()
                .unwrap_or_else(|| self.fresh_record(user));
            let band = self.bands.lookup(record.cumulative_damage).clone();
            return Ok(ProgressUpdate {
                record,
                band,
                replayed: true,
            });
        }

        let fresh = self.fresh_record(user);
        let record = inner.records.entry(user.clone()).or_insert(fresh);
        record.cumulative_damage = record.cumulative_damage.saturating_add(damage_delta);
        record.total_xp = record.total_xp.saturating_add(xp_delta);
        let band = self.bands.lookup(record.cumulative_damage).clone();
        if record.band_key != band.band_key {
            info!("{} moved from {} to {}", user, record.band_key, band.band_key);
            record.band_key = band.band_key.clone();
        }
        let record = record.clone();
        inner.applied.insert(key);

        Ok(ProgressUpdate {
            record,
            band,
            replayed: false,
        })
    }

    async fn get(&self, user: &UserId) -> Result<Option<ProgressRecord>> {
        Ok(self.inner.lock().records.get(user).cloned())
    }

    async fn leaderboard(&self, limit: usize) -> Result<Vec<ProgressRecord>> {
        let mut records: Vec<ProgressRecord> = self.inner.lock().records.values().cloned().collect();
        records.sort_by_key(|r| (r.cumulative_damage, Reverse(r.total_xp), r.user_id.clone()));
        records.truncate(limit);
        Ok(records)
    }
}
