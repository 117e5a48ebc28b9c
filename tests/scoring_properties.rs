//! Property tests for scoring, bands and the battle HP invariants

use orator_arena::analysis::result::{clamp_count, clamp_score};
use orator_arena::analysis::AnalysisResult;
use orator_arena::battle::{BattleConfig, BattlePhase, BattleState};
use orator_arena::core::config::ScoringConfig;
use orator_arena::core::types::{ChunkSeq, Skill};
use orator_arena::scoring::*;
use proptest::prelude::*;

fn analysis_strategy() -> impl Strategy<Value = AnalysisResult> {
    let markers = prop_oneof![Just(None), Just(Some("however")), Just(Some("moreover"))];
    (
        0u32..200,
        proptest::collection::vec(0.0f32..=9.0, 4),
        0u32..8,
        0u32..4,
        0u32..5,
        markers,
    )
        .prop_map(|(words, scores, hesitations, pauses, errors, marker)| {
            let mut analysis = AnalysisResult::new(words)
                .with_hesitations(hesitations)
                .with_long_pauses(pauses)
                .with_errors(errors);
            for (skill, score) in Skill::ALL.into_iter().zip(scores) {
                analysis = analysis.with_skill(skill, score);
            }
            if let Some(marker) = marker {
                analysis = analysis.with_marker(marker);
            }
            analysis
        })
}

fn streak_strategy() -> impl Strategy<Value = StreakState> {
    (0u32..10).prop_map(|count| StreakState::with_count(count, &StreakPolicy::default()))
}

proptest! {
    #[test]
    fn band_never_improves_with_more_damage(a in 0u64..200, b in 0u64..200) {
        let table = BandTable::standard();
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(table.lookup(low).score >= table.lookup(high).score);
        prop_assert!(table.lookup_index(low) <= table.lookup_index(high));
    }

    #[test]
    fn every_damage_value_has_a_band(damage in any::<u64>()) {
        let table = BandTable::standard();
        let index = table.lookup_index(damage);
        prop_assert!(table.ranges()[index].contains(damage));
    }

    #[test]
    fn damage_is_deterministic(analysis in analysis_strategy(), streak in streak_strategy(), seq in 1u64..1000) {
        let config = ScoringConfig::default();
        let first = compute_damage(&analysis, streak, ChunkSeq(seq), &config);
        let second = compute_damage(&analysis, streak, ChunkSeq(seq), &config);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn damage_multiplier_is_bounded(analysis in analysis_strategy(), streak in streak_strategy()) {
        let config = ScoringConfig::default();
        let (event, _) = compute_damage(&analysis, streak, ChunkSeq(1), &config);
        let ceiling = config.marker_multiplier_value.max(config.streak_multiplier_value);
        prop_assert!(event.multiplier >= 1.0);
        prop_assert!(event.multiplier <= ceiling);
        if analysis.word_count == 0 && event.triggered_bonuses.is_empty() {
            prop_assert_eq!(event.amount, 0);
        }
    }

    #[test]
    fn streak_resets_on_weak_fluency(analysis in analysis_strategy(), streak in streak_strategy()) {
        let config = ScoringConfig::default();
        let (_, next) = compute_damage(&analysis, streak, ChunkSeq(1), &config);
        if analysis.skill_score(Skill::Fluency) >= config.skill_bonus_threshold {
            prop_assert_eq!(next.consecutive_high_skill(), streak.consecutive_high_skill() + 1);
        } else {
            prop_assert_eq!(next.consecutive_high_skill(), 0);
            prop_assert_eq!(next.current_multiplier(), 1.0);
        }
    }

    #[test]
    fn clamped_fields_stay_in_range(raw in any::<f64>()) {
        let score = clamp_score(raw);
        prop_assert!((0.0..=9.0).contains(&score));
        if raw <= 0.0 || raw.is_nan() {
            prop_assert_eq!(clamp_count(raw), 0);
        }
    }

    #[test]
    fn hp_stays_clamped_and_terminal_is_final(
        hits in proptest::collection::vec((0u32..400, 0u32..10, 0u32..5), 1..40),
        max_hp in 1u32..1500,
    ) {
        let mut state = BattleState::new();
        state.start_battle(&BattleConfig::new(max_hp, 120)).unwrap();

        let mut ended: Option<BattlePhase> = None;
        for (i, (amount, hesitations, errors)) in hits.into_iter().enumerate() {
            let event = DamageEvent::flat(amount, ChunkSeq(i as u64 + 1)).with_pressure(hesitations, errors);
            let result = state.apply_damage_event(&event);

            prop_assert!(state.boss_hp() <= max_hp);
            prop_assert!(state.player_hp() <= 100);

            match ended {
                Some(phase) => {
                    prop_assert!(result.is_err());
                    prop_assert_eq!(state.phase(), phase);
                }
                None if state.phase().is_terminal() => {
                    prop_assert!(state.boss_hp() == 0 || state.player_hp() == 0);
                    ended = Some(state.phase());
                }
                None => prop_assert_eq!(state.phase(), BattlePhase::Active),
            }
        }
    }

    #[test]
    fn duplicate_delivery_applies_once(amount in 0u32..500, seq in 1u64..50) {
        let mut state = BattleState::new();
        state.start_battle(&BattleConfig::new(1000, 120)).unwrap();

        let event = DamageEvent::flat(amount, ChunkSeq(seq));
        let _ = state.apply_damage_event(&event);
        let after_first = state.boss_hp();
        let _ = state.apply_damage_event(&event);
        prop_assert_eq!(state.boss_hp(), after_first);
        prop_assert_eq!(after_first, 1000 - amount);
    }
}

#[test]
fn band_boundaries_are_exact() {
    let table = BandTable::standard();
    for range in table.ranges() {
        assert_eq!(table.lookup(range.min).band_key, range.info.band_key);
        if let Some(max) = range.max {
            assert_eq!(table.lookup(max).band_key, range.info.band_key);
            assert_ne!(table.lookup(max + 1).band_key, range.info.band_key);
        }
    }

    assert_eq!(table.lookup(14).band_key, "band_7.5");
    assert_eq!(table.lookup(15).band_key, "band_7.0");
    assert_eq!(table.lookup(25).band_key, "band_6.5");
    assert_eq!(table.lookup(26).band_key, "band_6.0");
    assert_eq!(table.lookup(u64::MAX).band_key, "band_3.5");
}
