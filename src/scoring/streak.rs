//! Fluency streak tracking
//!
//! A streak counts consecutive chunks whose fluency reached the competent
//! threshold. The multiplier is derived from the count, never stored on its own.

use serde::Serialize;

use crate::core::config::ScoringConfig;
use crate::scoring::constants::BASE_MULTIPLIER;

/// When the streak multiplier kicks in, and how high it is
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StreakPolicy {
    pub length_for_multiplier: u32,
    pub multiplier: f32,
}

impl StreakPolicy {
    pub fn from_config(config: &ScoringConfig) -> Self {
        Self {
            length_for_multiplier: config.streak_length_for_multiplier,
            multiplier: config.streak_multiplier_value,
        }
    }

    pub fn multiplier_for(&self, consecutive_high_skill: u32) -> f32 {
        if consecutive_high_skill >= self.length_for_multiplier {
            self.multiplier
        } else {
            BASE_MULTIPLIER
        }
    }
}

impl Default for StreakPolicy {
    fn default() -> Self {
        Self::from_config(&ScoringConfig::default())
    }
}

/// Streak value threaded through the damage calculator
///
/// Fields are private so the multiplier can only come from the count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StreakState {
    consecutive_high_skill: u32,
    current_multiplier: f32,
}

impl StreakState {
    /// Fresh streak: `{0, 1.0}`
    pub fn new() -> Self {
        Self {
            consecutive_high_skill: 0,
            current_multiplier: BASE_MULTIPLIER,
        }
    }

    pub fn with_count(consecutive_high_skill: u32, policy: &StreakPolicy) -> Self {
        Self {
            consecutive_high_skill,
            current_multiplier: policy.multiplier_for(consecutive_high_skill),
        }
    }

    pub fn consecutive_high_skill(&self) -> u32 {
        self.consecutive_high_skill
    }

    pub fn current_multiplier(&self) -> f32 {
        self.current_multiplier
    }

    /// Total transition: `count + 1` on a competent chunk, otherwise `0`
    pub fn advance(self, was_high_skill: bool, policy: &StreakPolicy) -> Self {
        let count = if was_high_skill {
            self.consecutive_high_skill.saturating_add(1)
        } else {
            0
        };
        Self::with_count(count, policy)
    }
}

impl Default for StreakState {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the streak for one battle
#[derive(Debug, Clone)]
pub struct StreakTracker {
    policy: StreakPolicy,
    state: StreakState,
}

impl StreakTracker {
    pub fn new(policy: StreakPolicy) -> Self {
        Self {
            policy,
            state: StreakState::new(),
        }
    }

    pub fn policy(&self) -> &StreakPolicy {
        &self.policy
    }

    pub fn state(&self) -> StreakState {
        self.state
    }

    pub fn advance(&mut self, was_high_skill: bool) -> StreakState {
        self.state = self.state.advance(was_high_skill, &self.policy);
        self.state
    }

    /// Replace the state with one computed elsewhere (the damage calculator)
    pub fn commit(&mut self, state: StreakState) {
        self.state = state;
    }

    pub fn reset(&mut self) {
        self.state = StreakState::new();
    }
}
