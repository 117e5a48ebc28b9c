//! Boss counter-attack
//!
//! Hesitation and grammar errors in a chunk let the boss strike back.

use crate::core::config::CounterAttackConfig;
use crate::scoring::damage::ChunkPressure;

/// Does this chunk's pressure provoke a counter-attack?
pub fn triggers_counter_attack(pressure: &ChunkPressure, rule: &CounterAttackConfig) -> bool {
    pressure.hesitations > rule.counter_attack_threshold || pressure.errors > rule.error_threshold
}

/// Player HP lost to a counter-attack, or `None` if the boss holds back
pub fn counter_attack_damage(pressure: &ChunkPressure, rule: &CounterAttackConfig) -> Option<u32> {
    if !triggers_counter_attack(pressure, rule) {
        return None;
    }

    let raw = pressure
        .hesitations
        .saturating_mul(rule.counter_attack_scale)
        .saturating_add(pressure.errors.saturating_mul(rule.error_scale));
    let damage = raw.min(rule.max_damage);

    (damage > 0).then_some(damage)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pressure(hesitations: u32, errors: u32) -> ChunkPressure {
        ChunkPressure { hesitations, errors }
    }

    #[test]
    fn test_calm_chunk_is_safe() {
        let rule = CounterAttackConfig::default();
        assert_eq!(counter_attack_damage(&pressure(2, 1), &rule), None);
        assert_eq!(counter_attack_damage(&pressure(0, 0), &rule), None);
    }

    #[test]
    fn test_hesitation_triggers() {
        let rule = CounterAttackConfig::default();
        // 3 * 5 + 0 * 3
        assert_eq!(counter_attack_damage(&pressure(3, 0), &rule), Some(15));
    }

    #[test]
    fn test_errors_trigger() {
        let rule = CounterAttackConfig::default();
        // 1 * 5 + 2 * 3
        assert_eq!(counter_attack_damage(&pressure(1, 2), &rule), Some(11));
    }

    #[test]
    fn test_damage_capped() {
        let rule = CounterAttackConfig::default();
        assert_eq!(counter_attack_damage(&pressure(10, 10), &rule), Some(20));
        assert_eq!(counter_attack_damage(&pressure(u32::MAX, u32::MAX), &rule), Some(20));
    }

    #[test]
    fn test_zero_scale_never_hits() {
        let rule = CounterAttackConfig {
            counter_attack_scale: 0,
            error_scale: 0,
            ..CounterAttackConfig::default()
        };
        assert_eq!(counter_attack_damage(&pressure(9, 9), &rule), None);
    }
}
