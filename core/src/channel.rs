//! Effort channels: the body regions effort is bucketed into.

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Closed set of effort channels. `Endurance` is measured in minutes,
/// every other channel in mass-equivalent volume (weight × reps × sets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Chest,
    Back,
    Shoulders,
    Biceps,
    Triceps,
    Legs,
    Core,
    Endurance,
}

impl Channel {
    pub const COUNT: usize = 8;

    /// Every channel, in index order.
    pub const ALL: [Channel; Channel::COUNT] = [
        Channel::Chest,
        Channel::Back,
        Channel::Shoulders,
        Channel::Biceps,
        Channel::Triceps,
        Channel::Legs,
        Channel::Core,
        Channel::Endurance,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_endurance(self) -> bool {
        matches!(self, Channel::Endurance)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Chest     => "chest",
            Self::Back      => "back",
            Self::Shoulders => "shoulders",
            Self::Biceps    => "biceps",
            Self::Triceps   => "triceps",
            Self::Legs      => "legs",
            Self::Core      => "core",
            Self::Endurance => "endurance",
        }
    }
}

/// One value per channel. Indexing by `Channel` can never miss.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChannelTotals([f64; Channel::COUNT]);

impl ChannelTotals {
    pub fn zeroed() -> Self {
        Self::default()
    }

    pub const fn from_values(values: [f64; Channel::COUNT]) -> Self {
        Self(values)
    }

    /// Every value finite and non-negative.
    pub fn is_well_formed(&self) -> bool {
        self.0.iter().all(|v| v.is_finite() && *v >= 0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, f64)> + '_ {
        Channel::ALL.iter().map(move |c| (*c, self.0[c.index()]))
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Sum over every channel except endurance.
    pub fn strength_sum(&self) -> f64 {
        self.iter()
            .filter(|(c, _)| !c.is_endurance())
            .map(|(_, v)| v)
            .sum()
    }

    pub fn clear(&mut self) {
        self.0 = [0.0; Channel::COUNT];
    }
}

impl Index<Channel> for ChannelTotals {
    type Output = f64;
    fn index(&self, channel: Channel) -> &f64 {
        &self.0[channel.index()]
    }
}

impl IndexMut<Channel> for ChannelTotals {
    fn index_mut(&mut self, channel: Channel) -> &mut f64 {
        &mut self.0[channel.index()]
    }
}
