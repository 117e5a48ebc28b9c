//! Orator Arena - speaking-practice boss battles and proficiency bands

pub mod analysis;
pub mod battle;
pub mod core;
pub mod progress;
pub mod scoring;
pub mod session;
