//! Day clock: maps UTC instants onto the player's local calendar day.

use crate::types::Timestamp;
use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayClock {
    utc_offset_minutes: i32,
}

impl DayClock {
    /// Offsets outside ±24h are clamped to UTC.
    pub fn new(utc_offset_minutes: i32) -> Self {
        let valid = FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60)).is_some();
        Self { utc_offset_minutes: if valid { utc_offset_minutes } else { 0 } }
    }

    pub fn utc() -> Self {
        Self::new(0)
    }

    fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }

    /// The player's local calendar day at `now`.
    pub fn local_day(&self, now: Timestamp) -> NaiveDate {
        now.with_timezone(&self.offset()).date_naive()
    }
}

impl Default for DayClock {
    fn default() -> Self {
        Self::utc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn offset_moves_day_boundary() {
        let late_utc = Utc.with_ymd_and_hms(2024, 3, 10, 23, 30, 0).unwrap();
        assert_eq!(DayClock::utc().local_day(late_utc), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert_eq!(DayClock::new(60).local_day(late_utc), NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
        assert_eq!(DayClock::new(-600).local_day(late_utc), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
    }

    #[test]
    fn absurd_offset_falls_back_to_utc() {
        assert_eq!(DayClock::new(100_000), DayClock::utc());
    }
}
