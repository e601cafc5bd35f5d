//! Progression rules: static structure tables and economy formulas.
//!
//! Everything here is a pure function of its inputs. The structure table
//! is an exhaustive `match`, so adding a `StructureType` variant without
//! giving it a footprint, channel and build time is a compile error.

use crate::{
    channel::Channel,
    config::EconomyConfig,
    ledger::ChannelLedger,
    types::Footprint,
};
use serde::{Deserialize, Serialize};

/// Cumulative channel volume needed to reach level `index + 1`.
/// Shared by every channel-mapped structure type.
pub const LEVEL_THRESHOLDS: [f64; 10] = [
    0.0,      // L1
    500.0,    // L2
    1_500.0,  // L3
    3_500.0,  // L4
    7_000.0,  // L5
    12_000.0, // L6
    20_000.0, // L7
    35_000.0, // L8
    55_000.0, // L9
    80_000.0, // L10
];

pub const MIN_LEVEL: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureType {
    /// The hub. Gated by streak length, not by volume.
    TownHall,
    ArcherTower,
    Cannon,
    WizardTower,
    HiddenTesla,
    Mortar,
    InfernoTower,
    Wall,
    XBow,
    AirDefense,
    BombTower,
    AirSweeper,
    GoldMine,
    ElixirCollector,
    ArmyCamp,
    BuilderHut,
}

impl StructureType {
    pub const ALL: [StructureType; 16] = [
        Self::TownHall,
        Self::ArcherTower,
        Self::Cannon,
        Self::WizardTower,
        Self::HiddenTesla,
        Self::Mortar,
        Self::InfernoTower,
        Self::Wall,
        Self::XBow,
        Self::AirDefense,
        Self::BombTower,
        Self::AirSweeper,
        Self::GoldMine,
        Self::ElixirCollector,
        Self::ArmyCamp,
        Self::BuilderHut,
    ];

    pub fn footprint(self) -> Footprint {
        match self {
            Self::TownHall | Self::ArmyCamp => Footprint::new(4, 4),
            Self::ArcherTower
            | Self::Cannon
            | Self::WizardTower
            | Self::Mortar
            | Self::XBow
            | Self::AirDefense
            | Self::BombTower
            | Self::GoldMine
            | Self::ElixirCollector => Footprint::new(3, 3),
            Self::HiddenTesla
            | Self::InfernoTower
            | Self::AirSweeper
            | Self::BuilderHut => Footprint::new(2, 2),
            Self::Wall => Footprint::new(1, 1),
        }
    }

    /// The channel whose cumulative volume gates upgrades, if any.
    pub fn mapped_channel(self) -> Option<Channel> {
        match self {
            Self::ArcherTower  => Some(Channel::Chest),
            Self::Cannon       => Some(Channel::Back),
            Self::WizardTower  => Some(Channel::Shoulders),
            Self::HiddenTesla  => Some(Channel::Biceps),
            Self::Mortar       => Some(Channel::Triceps),
            Self::InfernoTower => Some(Channel::Legs),
            Self::Wall         => Some(Channel::Core),
            Self::XBow         => Some(Channel::Endurance),
            Self::AirDefense   => Some(Channel::Shoulders),
            Self::BombTower    => Some(Channel::Biceps),
            Self::AirSweeper   => Some(Channel::Back),
            Self::TownHall
            | Self::GoldMine
            | Self::ElixirCollector
            | Self::ArmyCamp
            | Self::BuilderHut => None,
        }
    }

    /// Base construction time in seconds, before level and recovery scaling.
    pub fn base_build_seconds(self) -> i64 {
        match self {
            Self::TownHall => 600,
            Self::InfernoTower | Self::XBow => 240,
            Self::ArcherTower
            | Self::Cannon
            | Self::WizardTower
            | Self::HiddenTesla
            | Self::Mortar
            | Self::AirDefense
            | Self::BombTower
            | Self::AirSweeper => 120,
            Self::GoldMine | Self::ElixirCollector | Self::ArmyCamp => 60,
            Self::BuilderHut | Self::Wall => 0,
        }
    }

    /// Streak-gated hub.
    pub fn is_hub(self) -> bool {
        matches!(self, Self::TownHall)
    }

    /// Linear structures are placed in chains.
    pub fn is_linear(self) -> bool {
        matches!(self, Self::Wall)
    }

    /// Each finished builder hut adds one construction worker.
    pub fn provides_worker(self) -> bool {
        matches!(self, Self::BuilderHut)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::TownHall        => "town_hall",
            Self::ArcherTower     => "archer_tower",
            Self::Cannon          => "cannon",
            Self::WizardTower     => "wizard_tower",
            Self::HiddenTesla     => "hidden_tesla",
            Self::Mortar          => "mortar",
            Self::InfernoTower    => "inferno_tower",
            Self::Wall            => "wall",
            Self::XBow            => "x_bow",
            Self::AirDefense      => "air_defense",
            Self::BombTower       => "bomb_tower",
            Self::AirSweeper      => "air_sweeper",
            Self::GoldMine        => "gold_mine",
            Self::ElixirCollector => "elixir_collector",
            Self::ArmyCamp        => "army_camp",
            Self::BuilderHut      => "builder_hut",
        }
    }
}

/// What reaching a level demands of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Requirement {
    /// The type has no volume table.
    Ungated,
    Volume(f64),
    /// No such level exists.
    Max,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub primary:   u64,
    pub secondary: u64,
    pub premium:   u64,
}

/// Pure lookups over the structure table plus the economy formulas.
#[derive(Debug, Clone, Default)]
pub struct ProgressionRules {
    economy: EconomyConfig,
}

impl ProgressionRules {
    pub fn new(economy: EconomyConfig) -> Self {
        Self { economy }
    }

    pub fn mapped_channel(&self, structure_type: StructureType) -> Option<Channel> {
        structure_type.mapped_channel()
    }

    pub fn required_cumulative(&self, structure_type: StructureType, target_level: u32) -> Requirement {
        if structure_type.mapped_channel().is_none() {
            return Requirement::Ungated;
        }
        match target_level {
            0 => Requirement::Volume(0.0),
            level => LEVEL_THRESHOLDS
                .get(level as usize - 1)
                .map_or(Requirement::Max, |v| Requirement::Volume(*v)),
        }
    }

    /// Highest reachable level, or `None` when the type is not level-capped.
    pub fn max_level(&self, structure_type: StructureType) -> Option<u32> {
        structure_type
            .mapped_channel()
            .map(|_| LEVEL_THRESHOLDS.len() as u32)
    }

    /// Level a channel has reached on its own: the highest level whose
    /// threshold the cumulative volume meets. Never below 1.
    pub fn channel_level(&self, ledger: &ChannelLedger, channel: Channel) -> u32 {
        let volume = ledger.cumulative(channel);
        let reached = LEVEL_THRESHOLDS.iter().take_while(|t| volume >= **t).count() as u32;
        reached.max(MIN_LEVEL)
    }

    /// Unscaled seconds to build `target_level`. Higher levels take longer.
    pub fn base_build_seconds(&self, structure_type: StructureType, target_level: u32) -> i64 {
        structure_type.base_build_seconds() * i64::from(target_level.max(MIN_LEVEL))
    }

    pub fn derive_currency(&self, ledger: &ChannelLedger) -> Currency {
        let endurance = ledger.cumulative(Channel::Endurance);
        let strength = ledger.cumulative_totals().strength_sum();
        Currency {
            primary:   (endurance * self.economy.primary_per_endurance_minute).floor() as u64,
            secondary: strength.floor() as u64,
            premium:   self.premium_for_streak(ledger.streak_days()),
        }
    }

    pub fn premium_for_streak(&self, streak_days: u32) -> u64 {
        self.economy
            .streak_tiers
            .iter()
            .filter(|t| streak_days >= t.min_days)
            .map(|t| t.premium)
            .max()
            .unwrap_or(0)
    }

    /// Sum of today's effort across every channel.
    pub fn attack_power(&self, ledger: &ChannelLedger) -> f64 {
        ledger.today_totals().sum()
    }

    /// Lifetime effort, scaled down.
    pub fn defense_power(&self, ledger: &ChannelLedger) -> f64 {
        ledger.cumulative_totals().sum() / self.economy.defense_scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_mapped_type_has_the_shared_table() {
        let rules = ProgressionRules::default();
        for t in StructureType::ALL.iter().filter(|t| t.mapped_channel().is_some()) {
            assert_eq!(rules.required_cumulative(*t, 3), Requirement::Volume(1_500.0));
            assert_eq!(rules.required_cumulative(*t, 11), Requirement::Max);
            assert_eq!(rules.max_level(*t), Some(10));
        }
    }

    #[test]
    fn unmapped_types_are_ungated() {
        let rules = ProgressionRules::default();
        for t in [StructureType::TownHall, StructureType::GoldMine, StructureType::BuilderHut] {
            assert_eq!(rules.required_cumulative(t, 2), Requirement::Ungated);
            assert_eq!(rules.max_level(t), None);
        }
    }

    #[test]
    fn premium_tiers() {
        let rules = ProgressionRules::default();
        assert_eq!(rules.premium_for_streak(6), 0);
        assert_eq!(rules.premium_for_streak(7), 10);
        assert_eq!(rules.premium_for_streak(14), 25);
        assert_eq!(rules.premium_for_streak(29), 25);
        assert_eq!(rules.premium_for_streak(30), 50);
    }
}
