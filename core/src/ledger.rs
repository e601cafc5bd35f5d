//! Channel ledger: a player's effort history, streak and recovery.
//!
//! The ledger is pure state plus mutation rules. It never reads the wall
//! clock; callers pass the player's local day in.
//!
//! Invariants:
//!   - `cumulative` only grows, and only through a log call.
//!   - `today` is zeroed exactly once per calendar-day rollover.
//!   - `recovery_score` stays in [0, 100].
//!   - Totals and records are finite and non-negative, also when loaded.

use crate::{
    channel::{Channel, ChannelTotals},
    config::LedgerConfig,
    error::{CoreError, CoreResult},
};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const MAX_RECOVERY: u8 = 100;

/// Result of a single log call, for events and presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct LogOutcome {
    pub channel:             Channel,
    pub magnitude:           f64,
    pub streak_days:         u32,
    pub recovery_before:     u8,
    pub recovery_after:      u8,
    pub new_personal_record: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStatus {
    Critical,
    Fatigued,
    Recovering,
    Optimal,
}

/// One logged session, kept for weekly reads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffortEntry {
    pub day:       NaiveDate,
    pub channel:   Channel,
    pub magnitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LedgerRecord")]
pub struct ChannelLedger {
    cumulative:        ChannelTotals,
    today:             ChannelTotals,
    streak_days:       u32,
    recovery_score:    u8,
    last_logged_day:   Option<NaiveDate>,
    last_rollover_day: Option<NaiveDate>,
    /// Best estimated one-rep max per channel.
    personal_records:  ChannelTotals,
    /// Oldest first, trimmed to `LedgerConfig::history_days`.
    history:           VecDeque<EffortEntry>,
}

/// Wire form, checked before it becomes a ledger.
#[derive(Deserialize)]
struct LedgerRecord {
    cumulative:        ChannelTotals,
    today:             ChannelTotals,
    streak_days:       u32,
    recovery_score:    u8,
    last_logged_day:   Option<NaiveDate>,
    last_rollover_day: Option<NaiveDate>,
    #[serde(default)]
    personal_records:  ChannelTotals,
    #[serde(default)]
    history:           VecDeque<EffortEntry>,
}

impl TryFrom<LedgerRecord> for ChannelLedger {
    type Error = String;

    fn try_from(r: LedgerRecord) -> Result<Self, Self::Error> {
        if r.recovery_score > MAX_RECOVERY {
            return Err(format!("recovery_score {} above {MAX_RECOVERY}", r.recovery_score));
        }
        for (name, totals) in [
            ("cumulative", &r.cumulative),
            ("today", &r.today),
            ("personal_records", &r.personal_records),
        ] {
            if !totals.is_well_formed() {
                return Err(format!("{name} holds a negative or non-finite value"));
            }
        }
        if let Some(bad) = r.history.iter().find(|e| !(e.magnitude.is_finite() && e.magnitude > 0.0)) {
            return Err(format!("history entry on {} has magnitude {}", bad.day, bad.magnitude));
        }
        Ok(Self {
            cumulative:        r.cumulative,
            today:             r.today,
            streak_days:       r.streak_days,
            recovery_score:    r.recovery_score,
            last_logged_day:   r.last_logged_day,
            last_rollover_day: r.last_rollover_day,
            personal_records:  r.personal_records,
            history:           r.history,
        })
    }
}

impl ChannelLedger {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            cumulative:        ChannelTotals::zeroed(),
            today:             ChannelTotals::zeroed(),
            streak_days:       0,
            recovery_score:    config.initial_recovery.min(MAX_RECOVERY),
            last_logged_day:   None,
            last_rollover_day: None,
            personal_records:  ChannelTotals::zeroed(),
            history:           VecDeque::new(),
        }
    }

    // ── Reads ─────────────────────────────────────────────────────

    pub fn cumulative(&self, channel: Channel) -> f64 { self.cumulative[channel] }
    pub fn today(&self, channel: Channel) -> f64      { self.today[channel] }
    pub fn cumulative_totals(&self) -> &ChannelTotals { &self.cumulative }
    pub fn today_totals(&self) -> &ChannelTotals      { &self.today }
    pub fn streak_days(&self) -> u32                  { self.streak_days }
    pub fn recovery_score(&self) -> u8                { self.recovery_score }
    pub fn last_logged_day(&self) -> Option<NaiveDate> { self.last_logged_day }
    pub fn personal_record(&self, channel: Channel) -> f64 { self.personal_records[channel] }
    pub fn history(&self) -> impl Iterator<Item = &EffortEntry> { self.history.iter() }

    pub fn recovery_status(&self) -> RecoveryStatus {
        match self.recovery_score {
            0..=29  => RecoveryStatus::Critical,
            30..=49 => RecoveryStatus::Fatigued,
            50..=79 => RecoveryStatus::Recovering,
            _       => RecoveryStatus::Optimal,
        }
    }

    // ── Day rollover ──────────────────────────────────────────────

    /// Zero today's totals and grant the overnight bonus if `today` has
    /// not been seen yet. Returns true if a rollover happened.
    /// A second call on the same day is a no-op.
    pub fn rollover_if_new_day(&mut self, today: NaiveDate, config: &LedgerConfig) -> bool {
        if self.last_rollover_day == Some(today) {
            return false;
        }
        self.last_rollover_day = Some(today);

        if self.last_logged_day == Some(today) {
            return false;
        }
        self.today.clear();
        self.adjust_recovery(i32::from(config.overnight_regen));
        log::debug!(
            "ledger rollover to {today}: recovery={} streak={}",
            self.recovery_score,
            self.streak_days
        );
        true
    }

    // ── Logging ───────────────────────────────────────────────────

    /// Record `magnitude` units of effort (minutes for endurance).
    pub fn log_effort(
        &mut self,
        channel: Channel,
        magnitude: f64,
        today: NaiveDate,
        config: &LedgerConfig,
    ) -> CoreResult<LogOutcome> {
        if !(magnitude.is_finite() && magnitude > 0.0) {
            return Err(CoreError::InvalidMagnitude { magnitude });
        }
        self.rollover_if_new_day(today, config);
        let recovery_before = self.recovery_score;
        self.accumulate(channel, magnitude, today, config);

        if channel.is_endurance() {
            let points = (magnitude.floor() as u32) / config.endurance_minutes_per_point.max(1);
            self.adjust_recovery(points.min(u32::from(MAX_RECOVERY)) as i32);
        } else if magnitude > config.high_magnitude_threshold {
            self.adjust_recovery(-i32::from(config.high_magnitude_penalty));
        }

        Ok(self.outcome(channel, magnitude, recovery_before, None))
    }

    /// Record a strength set. Volume is `weight × reps × sets`. The personal
    /// record is updated first; a set above `heavy_set_intensity` of it costs
    /// more recovery than plain volume.
    pub fn log_set(
        &mut self,
        channel: Channel,
        weight: f64,
        reps: u32,
        sets: u32,
        today: NaiveDate,
        config: &LedgerConfig,
    ) -> CoreResult<LogOutcome> {
        let volume = weight * f64::from(reps) * f64::from(sets);
        if channel.is_endurance() || !(weight.is_finite() && weight > 0.0) || volume <= 0.0 {
            return Err(CoreError::InvalidMagnitude { magnitude: volume });
        }
        self.rollover_if_new_day(today, config);
        let recovery_before = self.recovery_score;
        self.accumulate(channel, volume, today, config);

        let estimate = estimated_one_rep_max(weight, reps);
        let new_record = (estimate > self.personal_records[channel]).then(|| {
            self.personal_records[channel] = estimate;
            log::debug!("new {} record: {estimate:.1}", channel.name());
            estimate
        });

        let record = self.personal_records[channel];
        let intensity = if record > 0.0 { weight / record } else { 0.5 };
        if intensity > config.heavy_set_intensity {
            self.adjust_recovery(-i32::from(config.heavy_set_penalty));
        } else if volume > config.high_magnitude_threshold {
            self.adjust_recovery(-i32::from(config.high_magnitude_penalty));
        }

        Ok(self.outcome(channel, volume, recovery_before, new_record))
    }

    fn accumulate(&mut self, channel: Channel, magnitude: f64, today: NaiveDate, config: &LedgerConfig) {
        self.cumulative[channel] += magnitude;
        self.today[channel] += magnitude;

        self.history.push_back(EffortEntry { day: today, channel, magnitude });
        if let Some(cutoff) = today.checked_sub_days(Days::new(u64::from(config.history_days))) {
            while self.history.front().is_some_and(|e| e.day < cutoff) {
                self.history.pop_front();
            }
        }

        match self.last_logged_day {
            Some(last) if last >= today => {}
            Some(last) if today.pred_opt() == Some(last) => {
                self.streak_days += 1;
                self.last_logged_day = Some(today);
            }
            _ => {
                self.streak_days = 1;
                self.last_logged_day = Some(today);
            }
        }
    }

    // ── Weekly reads ──────────────────────────────────────────────

    /// Volume logged on `channel` from seven days before `today` onwards.
    pub fn weekly_volume(&self, channel: Channel, today: NaiveDate) -> f64 {
        self.volume_between(channel, days_before(today, 7), None)
    }

    /// Weekly volume as a percentage of the channel's target, in [0, 100].
    pub fn weekly_progress(&self, channel: Channel, today: NaiveDate, config: &LedgerConfig) -> f64 {
        let target = config.weekly_targets[channel];
        if target <= 0.0 {
            return 100.0;
        }
        (self.weekly_volume(channel, today) / target).clamp(0.0, 1.0) * 100.0
    }

    /// True when this week's volume beats the week before by `overload_factor`.
    pub fn is_progressive_overload(&self, channel: Channel, today: NaiveDate, config: &LedgerConfig) -> bool {
        let week_ago = days_before(today, 7);
        let this_week = self.volume_between(channel, week_ago, None);
        let last_week = self.volume_between(channel, days_before(today, 14), Some(week_ago));
        this_week > last_week * config.overload_factor
    }

    /// Sum over entries with `from <= day < until`.
    fn volume_between(&self, channel: Channel, from: NaiveDate, until: Option<NaiveDate>) -> f64 {
        self.history
            .iter()
            .filter(|e| e.channel == channel && e.day >= from && until.map_or(true, |u| e.day < u))
            .map(|e| e.magnitude)
            .sum()
    }

    fn adjust_recovery(&mut self, delta: i32) {
        let next = (i32::from(self.recovery_score) + delta).clamp(0, i32::from(MAX_RECOVERY));
        self.recovery_score = next as u8;
    }

    fn outcome(
        &self,
        channel: Channel,
        magnitude: f64,
        recovery_before: u8,
        new_personal_record: Option<f64>,
    ) -> LogOutcome {
        LogOutcome {
            channel,
            magnitude,
            streak_days: self.streak_days,
            recovery_before,
            recovery_after: self.recovery_score,
            new_personal_record,
        }
    }
}

fn days_before(day: NaiveDate, n: u64) -> NaiveDate {
    day.checked_sub_days(Days::new(n)).unwrap_or(NaiveDate::MIN)
}

/// Brzycki estimate. Reps beyond 10 are treated as 10.
pub fn estimated_one_rep_max(weight: f64, reps: u32) -> f64 {
    match reps {
        0 => 0.0,
        1 => weight,
        r => weight * (36.0 / (37.0 - f64::from(r.min(10)))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brzycki_matches_reference_points() {
        assert_eq!(estimated_one_rep_max(100.0, 0), 0.0);
        assert_eq!(estimated_one_rep_max(100.0, 1), 100.0);
        assert!((estimated_one_rep_max(100.0, 10) - 133.333).abs() < 0.01);
        assert_eq!(estimated_one_rep_max(100.0, 25), estimated_one_rep_max(100.0, 10));
    }

    #[test]
    fn recovery_status_buckets() {
        let mut ledger = ChannelLedger::new(&LedgerConfig::default());
        assert_eq!(ledger.recovery_status(), RecoveryStatus::Optimal);
        ledger.recovery_score = 29;
        assert_eq!(ledger.recovery_status(), RecoveryStatus::Critical);
        ledger.recovery_score = 49;
        assert_eq!(ledger.recovery_status(), RecoveryStatus::Fatigued);
        ledger.recovery_score = 50;
        assert_eq!(ledger.recovery_status(), RecoveryStatus::Recovering);
    }
}
