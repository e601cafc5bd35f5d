//! Tunable constants for the progression core.
//!
//! Every section has a `Default` carrying the live-game values, so a config
//! file only needs to name what it overrides. Tests use
//! `CoreConfig::default_test()`.

use crate::channel::ChannelTotals;
use serde::{Deserialize, Serialize};

// ── Ledger ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Recovery score of a fresh ledger.
    pub initial_recovery: u8,
    /// Non-endurance sessions above this magnitude cost recovery.
    pub high_magnitude_threshold: f64,
    pub high_magnitude_penalty: u8,
    /// `weight / personal_record` above this marks a heavy set.
    pub heavy_set_intensity: f64,
    pub heavy_set_penalty: u8,
    /// Endurance minutes per recovery point gained.
    pub endurance_minutes_per_point: u32,
    /// Flat recovery regained on the first activation of a new day.
    pub overnight_regen: u8,
    /// Days of effort history kept for weekly reads.
    pub history_days: u32,
    /// Recommended weekly volume per channel (minutes for endurance).
    pub weekly_targets: ChannelTotals,
    /// This week must beat last week by this factor to count as overload.
    pub overload_factor: f64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            initial_recovery:            100,
            high_magnitude_threshold:    500.0,
            high_magnitude_penalty:      10,
            heavy_set_intensity:         0.8,
            heavy_set_penalty:           15,
            endurance_minutes_per_point: 5,
            overnight_regen:             20,
            history_days:                30,
            weekly_targets: ChannelTotals::from_values([
                10_000.0, // chest
                12_000.0, // back
                6_000.0,  // shoulders
                4_000.0,  // biceps
                4_000.0,  // triceps
                15_000.0, // legs
                5_000.0,  // core
                150.0,    // endurance, minutes
            ]),
            overload_factor:             1.025,
        }
    }
}

// ── Economy ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StreakTier {
    pub min_days: u32,
    pub premium:  u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Primary currency per endurance minute.
    pub primary_per_endurance_minute: f64,
    /// Defense power = total cumulative volume / this.
    pub defense_scale: f64,
    /// Premium currency tiers. Order does not matter; the highest
    /// satisfied tier wins.
    pub streak_tiers: Vec<StreakTier>,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            primary_per_endurance_minute: 10.0,
            defense_scale:                10.0,
            streak_tiers: vec![
                StreakTier { min_days: 7,  premium: 10 },
                StreakTier { min_days: 14, premium: 25 },
                StreakTier { min_days: 30, premium: 50 },
            ],
        }
    }
}

// ── Construction ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstructionConfig {
    /// Workers available before any builder hut is counted.
    pub base_workers: usize,
    /// Shortest possible construction, in seconds.
    pub min_duration_secs: i64,
    /// Build time multiplier is `1 - recovery / recovery_divisor`.
    pub recovery_divisor: f64,
    /// Hub upgrades need `current_level × streak_days_per_hub_level` days.
    pub streak_days_per_hub_level: u32,
}

impl Default for ConstructionConfig {
    fn default() -> Self {
        Self {
            base_workers:              2,
            min_duration_secs:         10,
            recovery_divisor:          200.0,
            streak_days_per_hub_level: 7,
        }
    }
}

// ── Grid ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub width:  u32,
    pub height: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { width: 45, height: 45 }
    }
}

// ── Clock / protocol ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Player's local offset from UTC, used for day boundaries.
    pub utc_offset_minutes: i32,
    /// How many handled request ids are remembered for de-duplication.
    pub dedupe_window: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { utc_offset_minutes: 0, dedupe_window: 256 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub ledger:       LedgerConfig,
    pub economy:      EconomyConfig,
    pub construction: ConstructionConfig,
    pub grid:         GridConfig,
    pub session:      SessionConfig,
}

impl CoreConfig {
    /// Load from a JSON file. Missing sections and fields keep their defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: CoreConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Config with hardcoded defaults and a small grid, for tests.
    pub fn default_test() -> Self {
        Self {
            grid: GridConfig { width: 12, height: 12 },
            ..Self::default()
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.grid.width > 0 && self.grid.height > 0, "grid must be non-empty");
        anyhow::ensure!(self.construction.recovery_divisor > 0.0, "recovery_divisor must be positive");
        anyhow::ensure!(self.economy.defense_scale > 0.0, "defense_scale must be positive");
        anyhow::ensure!(self.ledger.endurance_minutes_per_point > 0, "endurance_minutes_per_point must be positive");
        anyhow::ensure!(self.ledger.history_days >= 14, "history_days must cover two weeks");
        anyhow::ensure!(self.ledger.weekly_targets.is_well_formed(), "weekly_targets must be non-negative");
        Ok(())
    }
}
