//! Boss phases and the speaking-topic catalogue

use serde::{Deserialize, Serialize};

use crate::core::config::BossConfig;

/// Boss temperament, derived from remaining HP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BossPhase {
    #[default]
    Weakened,
    Enraged,
    Desperate,
}

impl BossPhase {
    /// Phase for the given HP; above `enraged_below` of max is Weakened,
    /// above `desperate_below` is Enraged, anything lower is Desperate
    pub fn from_hp(boss_hp: u32, boss_max_hp: u32, boss: &BossConfig) -> Self {
        if boss_max_hp == 0 {
            return BossPhase::Desperate;
        }
        let fraction = f64::from(boss_hp) / f64::from(boss_max_hp);
        if fraction > f64::from(boss.enraged_below) {
            BossPhase::Weakened
        } else if fraction > f64::from(boss.desperate_below) {
            BossPhase::Enraged
        } else {
            BossPhase::Desperate
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BossPhase::Weakened => "WEAKENED PHASE",
            BossPhase::Enraged => "ENRAGED PHASE",
            BossPhase::Desperate => "DESPERATE PHASE",
        }
    }
}

/// A speaking prompt the player fights over
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: u32,
    pub title: String,
    pub prompt: String,
    pub time_limit_seconds: u32,
    /// Target band, e.g. "Band 7.0"
    pub difficulty: String,
    /// XP awarded on victory
    pub xp_reward: u32,
}

/// Built-in part-2 cue cards
pub fn topic_catalog() -> Vec<Topic> {
    vec![
        Topic {
            id: 1,
            title: "Describe a person who has influenced you".into(),
            prompt: "You should say:\n- Who this person is\n- How you met them\n- What they taught you\n- And explain why they influenced you".into(),
            time_limit_seconds: 120,
            difficulty: "Band 6.5".into(),
            xp_reward: 250,
        },
        Topic {
            id: 2,
            title: "Describe a memorable journey you took".into(),
            prompt: "You should say:\n- Where you went\n- Who you went with\n- What made it memorable\n- And explain how it changed you".into(),
            time_limit_seconds: 120,
            difficulty: "Band 7.0".into(),
            xp_reward: 300,
        },
        Topic {
            id: 3,
            title: "Describe a global environmental problem".into(),
            prompt: "You should say:\n- What the problem is\n- Its causes and effects\n- How it can be solved\n- And give your opinion".into(),
            time_limit_seconds: 120,
            difficulty: "Band 8.0".into(),
            xp_reward: 400,
        },
    ]
}

/// Find a topic by id
pub fn find_topic(id: u32) -> Option<Topic> {
    topic_catalog().into_iter().find(|t| t.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_thresholds_at_thousand_hp() {
        let boss = BossConfig::default();
        assert_eq!(BossPhase::from_hp(1000, 1000, &boss), BossPhase::Weakened);
        assert_eq!(BossPhase::from_hp(667, 1000, &boss), BossPhase::Weakened);
        assert_eq!(BossPhase::from_hp(666, 1000, &boss), BossPhase::Enraged);
        assert_eq!(BossPhase::from_hp(334, 1000, &boss), BossPhase::Enraged);
        assert_eq!(BossPhase::from_hp(333, 1000, &boss), BossPhase::Desperate);
        assert_eq!(BossPhase::from_hp(0, 1000, &boss), BossPhase::Desperate);
    }

    #[test]
    fn test_catalog_ids_unique() {
        let topics = topic_catalog();
        for (i, a) in topics.iter().enumerate() {
            for b in &topics[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }

    #[test]
    fn test_find_topic() {
        assert_eq!(find_topic(2).map(|t| t.time_limit_seconds), Some(120));
        assert!(find_topic(99).is_none());
    }
}
