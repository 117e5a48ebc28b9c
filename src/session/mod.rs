//! Battle sessions - the single-writer engine, its actor and the ingest loop

pub mod actor;
pub mod capture;
pub mod engine;
pub mod ingest;

pub use actor::{spawn_session, SessionHandle};
pub use capture::{ChannelSource, ChunkSource, ScriptedSource};
pub use engine::{BattleEngine, BattleSnapshot, ChunkOutcome, ProgressDelta};
pub use ingest::{IngestLoop, IngestReport};
