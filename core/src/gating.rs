//! Gating engine: "may this structure go up a level?" plus the derived
//! economy reads the presentation layer shows next to it.
//!
//! Every function here is pure over a ledger snapshot, so the same call
//! serves the client's optimistic check and the authority's commit-time
//! re-check.

use crate::{
    channel::Channel,
    config::ConstructionConfig,
    error::{CoreError, CoreResult, GateShortfall},
    ledger::ChannelLedger,
    rules::{Currency, ProgressionRules, Requirement, StructureType},
};
use serde::{Deserialize, Serialize};

/// What an upgrade progress bar measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "channel", rename_all = "snake_case")]
pub enum ProgressMetric {
    Volume(Channel),
    StreakDays,
    Ungated,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpgradeProgress {
    pub metric:   ProgressMetric,
    pub current:  f64,
    /// `None` when there is nothing left to reach (ungated or max level).
    pub required: Option<f64>,
    /// `current / required`, clamped to [0, 1].
    pub ratio:    f64,
    pub at_max:   bool,
}

#[derive(Debug, Clone)]
pub struct GatingEngine {
    rules: ProgressionRules,
    streak_days_per_hub_level: u32,
}

impl GatingEngine {
    pub fn new(rules: ProgressionRules, construction: &ConstructionConfig) -> Self {
        Self {
            rules,
            streak_days_per_hub_level: construction.streak_days_per_hub_level,
        }
    }

    pub fn rules(&self) -> &ProgressionRules {
        &self.rules
    }

    pub fn can_upgrade(&self, ledger: &ChannelLedger, structure_type: StructureType, current_level: u32) -> bool {
        self.check_upgrade(ledger, structure_type, current_level).is_ok()
    }

    /// Like `can_upgrade`, but says exactly which gate is closed.
    pub fn check_upgrade(
        &self,
        ledger: &ChannelLedger,
        structure_type: StructureType,
        current_level: u32,
    ) -> CoreResult<()> {
        let target_level = current_level + 1;

        if structure_type.is_hub() {
            let required_days = current_level.saturating_mul(self.streak_days_per_hub_level);
            if ledger.streak_days() >= required_days {
                return Ok(());
            }
            return Err(CoreError::NotEligible {
                structure_type,
                target_level,
                shortfall: GateShortfall::Streak {
                    required_days,
                    current_days: ledger.streak_days(),
                },
            });
        }

        match (self.rules.required_cumulative(structure_type, target_level), structure_type.mapped_channel()) {
            (Requirement::Ungated, _) | (_, None) => Ok(()),
            (Requirement::Max, _) => Err(CoreError::MaxLevelReached {
                structure_type,
                level: current_level,
            }),
            (Requirement::Volume(required), Some(channel)) => {
                let current = ledger.cumulative(channel);
                if current >= required {
                    Ok(())
                } else {
                    Err(CoreError::NotEligible {
                        structure_type,
                        target_level,
                        shortfall: GateShortfall::Volume { channel, required, current },
                    })
                }
            }
        }
    }

    pub fn upgrade_progress(
        &self,
        ledger: &ChannelLedger,
        structure_type: StructureType,
        current_level: u32,
    ) -> UpgradeProgress {
        if structure_type.is_hub() {
            let required = f64::from(current_level.saturating_mul(self.streak_days_per_hub_level));
            let current = f64::from(ledger.streak_days());
            return UpgradeProgress {
                metric:   ProgressMetric::StreakDays,
                current,
                required: Some(required),
                ratio:    clamped_ratio(current, required),
                at_max:   false,
            };
        }

        let Some(channel) = structure_type.mapped_channel() else {
            return UpgradeProgress {
                metric:   ProgressMetric::Ungated,
                current:  0.0,
                required: None,
                ratio:    1.0,
                at_max:   false,
            };
        };

        let current = ledger.cumulative(channel);
        match self.rules.required_cumulative(structure_type, current_level + 1) {
            Requirement::Volume(required) => UpgradeProgress {
                metric:   ProgressMetric::Volume(channel),
                current,
                required: Some(required),
                ratio:    clamped_ratio(current, required),
                at_max:   false,
            },
            Requirement::Max | Requirement::Ungated => UpgradeProgress {
                metric:   ProgressMetric::Volume(channel),
                current,
                required: None,
                ratio:    1.0,
                at_max:   true,
            },
        }
    }

    // ── Derived economy reads ─────────────────────────────────────

    pub fn currency(&self, ledger: &ChannelLedger) -> Currency {
        self.rules.derive_currency(ledger)
    }

    pub fn attack_power(&self, ledger: &ChannelLedger) -> f64 {
        self.rules.attack_power(ledger)
    }

    pub fn defense_power(&self, ledger: &ChannelLedger) -> f64 {
        self.rules.defense_power(ledger)
    }
}

impl Default for GatingEngine {
    fn default() -> Self {
        Self::new(ProgressionRules::default(), &ConstructionConfig::default())
    }
}

fn clamped_ratio(current: f64, required: f64) -> f64 {
    if required <= 0.0 {
        return 1.0;
    }
    (current / required).clamp(0.0, 1.0)
}
