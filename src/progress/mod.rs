//! Learner progress - cumulative proficiency damage, band and XP

pub mod store;

pub use store::{
    IdempotencyKey, InMemoryProgressStore, ProgressEvent, ProgressRecord, ProgressStore, ProgressUpdate,
};
