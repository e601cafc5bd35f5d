//! Channel ledger tests: accumulation, rollover, streaks, recovery.

use bioclash_core::{
    channel::Channel,
    config::LedgerConfig,
    error::CoreError,
    ledger::{ChannelLedger, RecoveryStatus},
};
use chrono::NaiveDate;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

fn fresh() -> (ChannelLedger, LedgerConfig) {
    let config = LedgerConfig::default();
    (ChannelLedger::new(&config), config)
}

#[test]
fn cumulative_is_the_sum_of_all_logs_in_any_order() {
    let magnitudes = [120.0, 35.5, 480.0, 12.25, 300.0];
    let (mut forward, config) = fresh();
    let (mut backward, _) = fresh();

    for (i, m) in magnitudes.iter().enumerate() {
        forward.log_effort(Channel::Legs, *m, day(1 + i as u32), &config).unwrap();
    }
    for (i, m) in magnitudes.iter().rev().enumerate() {
        backward.log_effort(Channel::Legs, *m, day(1 + i as u32), &config).unwrap();
    }

    let expected: f64 = magnitudes.iter().sum();
    assert_eq!(forward.cumulative(Channel::Legs), expected);
    assert_eq!(backward.cumulative(Channel::Legs), expected);
    assert_eq!(forward.cumulative(Channel::Chest), 0.0, "other channels untouched");
}

#[test]
fn rollover_twice_on_the_same_day_is_a_no_op() {
    let (mut ledger, config) = fresh();
    ledger.log_effort(Channel::Chest, 600.0, day(1), &config).unwrap();
    assert_eq!(ledger.recovery_score(), 90);

    assert!(ledger.rollover_if_new_day(day(2), &config), "first call on a new day rolls over");
    let after_first = ledger.clone();
    assert!(!ledger.rollover_if_new_day(day(2), &config), "second call must not roll over");

    assert_eq!(ledger, after_first, "second rollover changed the ledger");
    assert_eq!(ledger.today(Channel::Chest), 0.0);
    assert_eq!(ledger.cumulative(Channel::Chest), 600.0);
    assert_eq!(ledger.recovery_score(), 100, "overnight regen applied once, clamped at 100");
}

#[test]
fn rollover_on_an_already_logged_day_keeps_today() {
    let (mut ledger, config) = fresh();
    ledger.log_effort(Channel::Back, 200.0, day(4), &config).unwrap();
    ledger.rollover_if_new_day(day(4), &config);
    assert_eq!(ledger.today(Channel::Back), 200.0);
}

#[test]
fn logging_on_a_new_day_starts_a_fresh_today() {
    let (mut ledger, config) = fresh();
    ledger.log_effort(Channel::Back, 200.0, day(1), &config).unwrap();
    ledger.log_effort(Channel::Back, 50.0, day(2), &config).unwrap();
    assert_eq!(ledger.today(Channel::Back), 50.0, "yesterday's total leaked into today");
    assert_eq!(ledger.cumulative(Channel::Back), 250.0);
}

#[test]
fn streak_counts_consecutive_days_and_resets_after_a_gap() {
    let (mut ledger, config) = fresh();
    for d in 1..=5 {
        ledger.log_effort(Channel::Core, 10.0, day(d), &config).unwrap();
    }
    assert_eq!(ledger.streak_days(), 5);

    ledger.log_effort(Channel::Core, 10.0, day(5), &config).unwrap();
    assert_eq!(ledger.streak_days(), 5, "second session on the same day extended the streak");

    ledger.log_effort(Channel::Core, 10.0, day(8), &config).unwrap();
    assert_eq!(ledger.streak_days(), 1, "a missed day must reset the streak");
    assert_eq!(ledger.last_logged_day(), Some(day(8)));
}

#[test]
fn invalid_magnitudes_are_rejected_without_side_effects() {
    let (mut ledger, config) = fresh();
    let before = ledger.clone();
    for bad in [0.0, -5.0, f64::NAN, f64::INFINITY] {
        let err = ledger.log_effort(Channel::Chest, bad, day(1), &config).unwrap_err();
        assert!(matches!(err, CoreError::InvalidMagnitude { .. }), "unexpected error {err:?}");
        assert_eq!(err.reason_code(), "invalid_magnitude");
    }
    assert_eq!(ledger, before);
}

#[test]
fn heavy_sessions_cost_recovery_and_endurance_restores_it() {
    let (mut ledger, config) = fresh();

    ledger.log_effort(Channel::Chest, 500.0, day(1), &config).unwrap();
    assert_eq!(ledger.recovery_score(), 100, "exactly the threshold is not heavy");

    let outcome = ledger.log_effort(Channel::Chest, 501.0, day(1), &config).unwrap();
    assert_eq!(outcome.recovery_before, 100);
    assert_eq!(outcome.recovery_after, 90);

    ledger.log_effort(Channel::Endurance, 32.0, day(1), &config).unwrap();
    assert_eq!(ledger.recovery_score(), 96, "32 minutes is worth 6 points");
}

#[test]
fn recovery_never_leaves_its_bounds() {
    let (mut ledger, config) = fresh();
    for _ in 0..20 {
        ledger.log_effort(Channel::Legs, 900.0, day(1), &config).unwrap();
    }
    assert_eq!(ledger.recovery_score(), 0);
    assert_eq!(ledger.recovery_status(), RecoveryStatus::Critical);

    for _ in 0..10 {
        ledger.log_effort(Channel::Endurance, 600.0, day(1), &config).unwrap();
    }
    assert_eq!(ledger.recovery_score(), 100);
}

#[test]
fn sets_track_personal_records_and_heavy_intensity() {
    let (mut ledger, config) = fresh();

    // 100 × 5 × 3 = 1500 volume. The record becomes 112.5 before intensity
    // is measured, so 100 / 112.5 ≈ 0.89 is already a heavy set.
    let first = ledger.log_set(Channel::Chest, 100.0, 5, 3, day(1), &config).unwrap();
    assert_eq!(first.magnitude, 1500.0);
    assert_eq!(first.new_personal_record, Some(112.5));
    assert_eq!(first.recovery_after, 85);
    assert_eq!(ledger.personal_record(Channel::Chest), 112.5);

    let single = ledger.log_set(Channel::Chest, 100.0, 1, 1, day(1), &config).unwrap();
    assert_eq!(single.recovery_after, 70);
    assert_eq!(single.new_personal_record, None);
    assert_eq!(ledger.cumulative(Channel::Chest), 1600.0);
}

#[test]
fn light_sets_only_pay_the_volume_penalty() {
    let (mut ledger, config) = fresh();
    ledger.log_set(Channel::Back, 100.0, 1, 1, day(1), &config).unwrap();
    assert_eq!(ledger.recovery_score(), 85, "a true single is at 100% of its own record");

    // 60 / 100 is light; 60 × 10 × 1 = 600 volume is over the threshold.
    let light = ledger.log_set(Channel::Back, 60.0, 10, 1, day(1), &config).unwrap();
    assert_eq!(light.new_personal_record, None, "60 × 10 estimates 80, below the record");
    assert_eq!(light.recovery_after, 75);
}

#[test]
fn sets_reject_endurance_and_empty_volume() {
    let (mut ledger, config) = fresh();
    assert!(ledger.log_set(Channel::Endurance, 10.0, 5, 5, day(1), &config).is_err());
    assert!(ledger.log_set(Channel::Chest, 60.0, 0, 5, day(1), &config).is_err());
    assert!(ledger.log_set(Channel::Chest, -60.0, 5, 5, day(1), &config).is_err());
    assert_eq!(ledger.cumulative_totals().sum(), 0.0);
}

#[test]
fn ledger_survives_json_round_trip() {
    let (mut ledger, config) = fresh();
    ledger.log_set(Channel::Back, 80.0, 8, 4, day(2), &config).unwrap();
    ledger.log_effort(Channel::Endurance, 25.0, day(3), &config).unwrap();

    let json = serde_json::to_string(&ledger).unwrap();
    let restored: ChannelLedger = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, ledger);
}

#[test]
fn weekly_volume_covers_the_last_seven_days() {
    let (mut ledger, config) = fresh();
    ledger.log_effort(Channel::Legs, 1000.0, day(1), &config).unwrap();
    ledger.log_effort(Channel::Legs, 2000.0, day(8), &config).unwrap();
    ledger.log_effort(Channel::Legs, 4500.0, day(14), &config).unwrap();
    ledger.log_effort(Channel::Chest, 300.0, day(14), &config).unwrap();

    assert_eq!(ledger.weekly_volume(Channel::Legs, day(14)), 6500.0, "day 7 onwards counts");
    assert_eq!(ledger.weekly_volume(Channel::Legs, day(15)), 6500.0);
    assert_eq!(ledger.weekly_volume(Channel::Legs, day(16)), 4500.0);
    assert_eq!(ledger.weekly_progress(Channel::Legs, day(16), &config), 30.0);
    assert_eq!(ledger.weekly_volume(Channel::Chest, day(14)), 300.0);

    ledger.log_effort(Channel::Legs, 20_000.0, day(16), &config).unwrap();
    assert_eq!(ledger.weekly_progress(Channel::Legs, day(16), &config), 100.0, "progress is capped");
}

#[test]
fn progressive_overload_compares_against_the_week_before() {
    let (mut ledger, config) = fresh();
    ledger.log_effort(Channel::Core, 400.0, day(2), &config).unwrap();
    ledger.log_effort(Channel::Core, 405.0, day(10), &config).unwrap();
    assert!(!ledger.is_progressive_overload(Channel::Core, day(10), &config), "1.25% gain is not enough");

    ledger.log_effort(Channel::Core, 10.0, day(10), &config).unwrap();
    assert!(ledger.is_progressive_overload(Channel::Core, day(10), &config));
}

#[test]
fn history_is_trimmed_but_totals_are_not() {
    let (mut ledger, config) = fresh();
    let start = day(1);
    ledger.log_effort(Channel::Core, 50.0, start, &config).unwrap();
    let later = start + chrono::Days::new(45);
    ledger.log_effort(Channel::Core, 50.0, later, &config).unwrap();

    assert_eq!(ledger.history().count(), 1, "entries older than 30 days are dropped");
    assert_eq!(ledger.cumulative(Channel::Core), 100.0);
}

#[test]
fn loading_rejects_out_of_range_values() {
    let (mut ledger, config) = fresh();
    ledger.log_effort(Channel::Chest, 120.0, day(3), &config).unwrap();
    let good = serde_json::to_value(&ledger).unwrap();

    let mut too_rested = good.clone();
    too_rested["recovery_score"] = serde_json::json!(250);
    assert!(serde_json::from_value::<ChannelLedger>(too_rested).is_err());

    let mut negative = good.clone();
    negative["cumulative"][0] = serde_json::json!(-5.0);
    assert!(serde_json::from_value::<ChannelLedger>(negative).is_err());

    let mut bad_record = good.clone();
    bad_record["personal_records"][2] = serde_json::json!(-1.0);
    assert!(serde_json::from_value::<ChannelLedger>(bad_record).is_err());

    assert_eq!(serde_json::from_value::<ChannelLedger>(good).unwrap(), ledger);
}
