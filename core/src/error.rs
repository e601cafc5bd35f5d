use crate::{channel::Channel, rules::StructureType, types::{Cell, StructureId, Timestamp}};
use thiserror::Error;

/// Why a placement could not be resolved to a valid cell.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlacementError {
    #[error("Cell {cell} is occupied by structure {by}")]
    Occupied { cell: Cell, by: StructureId },

    #[error("Footprint at {cell} leaves the grid")]
    OutOfBounds { cell: Cell },

    #[error("No free cell left on the grid")]
    NoFreeCell,
}

/// The specific reason an upgrade gate is closed.
#[derive(Debug, Clone, PartialEq)]
pub enum GateShortfall {
    Volume { channel: Channel, required: f64, current: f64 },
    Streak { required_days: u32, current_days: u32 },
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{structure_type:?} is not eligible for level {target_level}: {shortfall:?}")]
    NotEligible {
        structure_type: StructureType,
        target_level:   u32,
        shortfall:      GateShortfall,
    },

    #[error("{structure_type:?} is already at max level {level}")]
    MaxLevelReached { structure_type: StructureType, level: u32 },

    #[error("Placement failed: {0}")]
    Placement(#[from] PlacementError),

    #[error("All {capacity} workers are busy")]
    NoWorkerAvailable { capacity: usize },

    #[error("Effort magnitude must be a positive number, got {magnitude}")]
    InvalidMagnitude { magnitude: f64 },

    #[error("Structure '{id}' not found")]
    StructureNotFound { id: StructureId },

    #[error("Structure '{id}' cannot {action} while {state}")]
    InvalidTransition { id: StructureId, action: &'static str, state: &'static str },

    #[error("Structure '{id}' is still building until {finishes_at}")]
    ConstructionNotDue { id: StructureId, finishes_at: Timestamp },

    #[error("Cannot roll back '{id}': {reason}")]
    RollbackBlocked { id: StructureId, reason: PlacementError },

    #[error("Unknown exercise '{name}'")]
    UnknownExercise { name: String },

    #[error("'{exercise}' is a {channel:?} exercise and needs a matching amount")]
    ExerciseMismatch { exercise: String, channel: Channel },

    #[error("Unknown pending token '{token}'")]
    UnknownToken { token: String },

    #[error("Request for player '{got}' sent to session of '{expected}'")]
    WrongPlayer { expected: String, got: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CoreError {
    /// Stable machine-readable reason, surfaced to presentation code.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Database(_)                              => "storage_failure",
            Self::Serialization(_)                         => "serialization_failure",
            Self::NotEligible { shortfall: GateShortfall::Volume { .. }, .. } => "needs_more_volume",
            Self::NotEligible { shortfall: GateShortfall::Streak { .. }, .. } => "needs_longer_streak",
            Self::MaxLevelReached { .. }                   => "max_level_reached",
            Self::Placement(PlacementError::Occupied { .. })    => "occupied",
            Self::Placement(PlacementError::OutOfBounds { .. }) => "out_of_bounds",
            Self::Placement(PlacementError::NoFreeCell)         => "grid_full",
            Self::NoWorkerAvailable { .. }                 => "no_worker_available",
            Self::InvalidMagnitude { .. }                  => "invalid_magnitude",
            Self::StructureNotFound { .. }                 => "structure_not_found",
            Self::InvalidTransition { .. }                 => "invalid_transition",
            Self::ConstructionNotDue { .. }                => "construction_not_due",
            Self::RollbackBlocked { .. }                   => "rollback_blocked",
            Self::UnknownExercise { .. }                   => "unknown_exercise",
            Self::ExerciseMismatch { .. }                  => "exercise_mismatch",
            Self::UnknownToken { .. }                      => "unknown_token",
            Self::WrongPlayer { .. }                       => "wrong_player",
            Self::Other(_)                                 => "internal",
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
