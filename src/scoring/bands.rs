//! Proficiency band table
//!
//! Maps cumulative proficiency damage (hesitation/error penalties summed over a
//! learner's history) to a discrete IELTS-style band. More damage means a
//! lower band. Pure lookup, no state.

use serde::{Deserialize, Serialize};

use crate::core::error::{ArenaError, Result};

/// Band details handed to the UI after every lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandInfo {
    /// Stable key, e.g. `band_7.5`
    pub band_key: String,
    /// Numeric band score (3.5 ..= 9.0)
    pub score: f32,
    pub label: String,
    pub feedback: String,
    pub icon: String,
    /// Badge tier: diamond, gold, silver, bronze, iron, broken
    pub tier: String,
}

/// One contiguous damage range of the table
///
/// `max == None` marks the open-ended last range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandRange {
    pub min: u64,
    pub max: Option<u64>,
    pub info: BandInfo,
}

impl BandRange {
    pub fn contains(&self, damage: u64) -> bool {
        damage >= self.min && self.max.map_or(true, |max| damage <= max)
    }
}

/// Ordered, contiguous band table covering `[0, +inf)`
///
/// Ranges are stored in ascending damage order, which is descending
/// proficiency: index 0 is the best band, the last index the lowest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandTable {
    ranges: Vec<BandRange>,
}

impl BandTable {
    /// Build a table, checking that the ranges are disjoint, contiguous,
    /// start at zero and that only the last one is open-ended
    pub fn new(ranges: Vec<BandRange>) -> Result<Self> {
        let first = ranges
            .first()
            .ok_or_else(|| ArenaError::Config("band table must not be empty".into()))?;
        if first.min != 0 {
            return Err(ArenaError::Config(format!(
                "first band must start at 0, starts at {}",
                first.min
            )));
        }

        for (i, range) in ranges.iter().enumerate() {
            let is_last = i + 1 == ranges.len();
            match (range.max, is_last) {
                (None, false) => {
                    return Err(ArenaError::Config(format!(
                        "only the last band may be open-ended ({})",
                        range.info.band_key
                    )));
                }
                (Some(max), _) if max < range.min => {
                    return Err(ArenaError::Config(format!(
                        "band {} has max {} below min {}",
                        range.info.band_key, max, range.min
                    )));
                }
                (Some(max), false) => {
                    let next = &ranges[i + 1];
                    if max.checked_add(1) != Some(next.min) {
                        return Err(ArenaError::Config(format!(
                            "bands {} and {} are not contiguous",
                            range.info.band_key, next.info.band_key
                        )));
                    }
                }
                _ => {}
            }
        }

        if ranges.last().map_or(false, |r| r.max.is_some()) {
            return Err(ArenaError::Config("last band must be open-ended".into()));
        }

        Ok(Self { ranges })
    }

    /// The standard twelve-band table (9.0 down to 3.5)
    pub fn standard() -> Self {
        let rows: [(u64, Option<u64>, &str, f32, &str, &str, &str, &str); 12] = [
            (0, Some(2), "band_9.0", 9.0, "The Sultan of Syntax", "Flawless delivery. Expert user.", "👑", "diamond"),
            (3, Some(5), "band_8.5", 8.5, "The Grand Vizier", "Near-native flow with rare slips.", "⭐", "diamond"),
            (6, Some(9), "band_8.0", 8.0, "The Royal Scribe", "Very good command; occasional hesitation.", "🌟", "gold"),
            (10, Some(14), "band_7.5", 7.5, "The Master Merchant", "Good user. Keep pauses short.", "✨", "gold"),
            (15, Some(19), "band_7.0", 7.0, "The Silk Trader", "Good user. Link ideas with discourse markers.", "💫", "silver"),
            (20, Some(25), "band_6.5", 6.5, "The Bazaar Keeper", "Competent. Hesitation is noticeable.", "🔥", "silver"),
            (26, Some(31), "band_6.0", 6.0, "The Caravan Guide", "Competent but pauses break your flow.", "⚡", "bronze"),
            (32, Some(38), "band_5.5", 5.5, "The Desert Wanderer", "Modest user. Practise speaking without stopping.", "⚠️", "bronze"),
            (39, Some(45), "band_5.0", 5.0, "The Nomadic Seeker", "Modest user. Long pauses cost you.", "🔻", "iron"),
            (46, Some(50), "band_4.5", 4.5, "The Dusty Traveler", "Limited user. Work on continuous speech.", "❌", "iron"),
            (51, Some(60), "band_4.0", 4.0, "The Lost Pilgrim", "Limited user. Frequent breakdowns.", "💀", "broken"),
            (61, None, "band_3.5", 3.5, "The Outcast", "Extremely limited. Start with short answers.", "☠️", "broken"),
        ];

        let ranges = rows
            .into_iter()
            .map(|(min, max, key, score, label, feedback, icon, tier)| BandRange {
                min,
                max,
                info: BandInfo {
                    band_key: key.to_string(),
                    score,
                    label: label.to_string(),
                    feedback: feedback.to_string(),
                    icon: icon.to_string(),
                    tier: tier.to_string(),
                },
            })
            .collect();

        Self { ranges }
    }

    pub fn ranges(&self) -> &[BandRange] {
        &self.ranges
    }

    /// Index of the range containing `damage`; 0 is the best band
    ///
    /// Falls back to the lowest band if nothing matches.
    pub fn lookup_index(&self, cumulative_damage: u64) -> usize {
        // First range whose min is above the damage; the candidate sits just before it
        let after = self.ranges.partition_point(|r| r.min <= cumulative_damage);
        let lowest = self.ranges.len().saturating_sub(1);
        match after.checked_sub(1) {
            Some(i) if self.ranges[i].contains(cumulative_damage) => i,
            _ => lowest,
        }
    }

    /// Band for a cumulative damage value
    pub fn lookup(&self, cumulative_damage: u64) -> &BandInfo {
        &self.ranges[self.lookup_index(cumulative_damage)].info
    }

    /// The lowest-proficiency band
    pub fn lowest(&self) -> &BandInfo {
        &self.ranges[self.ranges.len() - 1].info
    }
}

impl Default for BandTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(key: &str, score: f32) -> BandInfo {
        BandInfo {
            band_key: key.to_string(),
            score,
            label: key.to_string(),
            feedback: String::new(),
            icon: String::new(),
            tier: String::new(),
        }
    }

    #[test]
    fn test_standard_table_is_valid() {
        let standard = BandTable::standard();
        assert!(BandTable::new(standard.ranges().to_vec()).is_ok());
    }

    #[test]
    fn test_zero_damage_is_top_band() {
        let table = BandTable::standard();
        assert_eq!(table.lookup(0).band_key, "band_9.0");
    }

    #[test]
    fn test_huge_damage_is_lowest_band() {
        let table = BandTable::standard();
        assert_eq!(table.lookup(u64::MAX).band_key, "band_3.5");
        assert_eq!(table.lowest().band_key, "band_3.5");
    }

    #[test]
    fn test_every_boundary_is_exact() {
        let table = BandTable::standard();
        for (i, pair) in table.ranges().windows(2).enumerate() {
            let max = pair[0].max.unwrap();
            assert_eq!(table.lookup_index(pair[0].min), i);
            assert_eq!(table.lookup_index(max), i);
            assert_eq!(table.lookup_index(max + 1), i + 1);
            if pair[0].min > 0 {
                assert_eq!(table.lookup_index(pair[0].min - 1), i - 1);
            }
            assert_ne!(table.lookup(max).band_key, table.lookup(max + 1).band_key);
        }
    }

    #[test]
    fn test_scores_descend_with_damage() {
        let table = BandTable::standard();
        for pair in table.ranges().windows(2) {
            assert!(pair[0].info.score > pair[1].info.score);
        }
    }

    #[test]
    fn test_rejects_gap() {
        let ranges = vec![
            BandRange { min: 0, max: Some(4), info: info("a", 9.0) },
            BandRange { min: 6, max: None, info: info("b", 8.0) },
        ];
        assert!(BandTable::new(ranges).is_err());
    }

    #[test]
    fn test_rejects_closed_last_range() {
        let ranges = vec![
            BandRange { min: 0, max: Some(4), info: info("a", 9.0) },
            BandRange { min: 5, max: Some(9), info: info("b", 8.0) },
        ];
        assert!(BandTable::new(ranges).is_err());
    }

    #[test]
    fn test_rejects_open_middle_range() {
        let ranges = vec![
            BandRange { min: 0, max: None, info: info("a", 9.0) },
            BandRange { min: 5, max: None, info: info("b", 8.0) },
        ];
        assert!(BandTable::new(ranges).is_err());
    }

    #[test]
    fn test_rejects_nonzero_start() {
        let ranges = vec![BandRange { min: 1, max: None, info: info("a", 9.0) }];
        assert!(BandTable::new(ranges).is_err());
        assert!(BandTable::new(Vec::new()).is_err());
    }

    #[test]
    fn test_single_open_range_covers_everything() {
        let table = BandTable::new(vec![BandRange { min: 0, max: None, info: info("only", 5.0) }])
            .unwrap();
        assert_eq!(table.lookup(0).band_key, "only");
        assert_eq!(table.lookup(1_000_000).band_key, "only");
    }
}
