//! Transport-facing request and response types.
//!
//! Framing is the transport's job; the core only sees these already
//! deserialized values. Every request carries a `request_id` so the
//! coordinator can recognise a resubmission and replay its first answer.

use crate::{
    channel::Channel,
    error::CoreError,
    grid::StructureInstance,
    planner::PlacementTarget,
    rules::{Currency, StructureType},
    types::{Cell, PlayerId, StructureId, Timestamp},
};
use serde::{Deserialize, Serialize};

/// All player-issued mutations.
/// Variants are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestKind {
    // ── Ledger ────────────────────────────────────
    LogEffort { channel: Channel, magnitude: f64 },
    LogSet { channel: Channel, weight: f64, reps: u32, sets: u32 },

    // ── Structures ────────────────────────────────
    Place { structure_type: StructureType, target: PlacementTarget },
    StartConstruction { structure_id: StructureId },
    Upgrade { structure_id: StructureId },
    Complete { structure_id: StructureId },
    CancelPlacement { structure_id: StructureId },
    Demolish { structure_id: StructureId },
    Move { structure_id: StructureId, to: Cell },

    // ── Ledger, by exercise name ──────────────────
    LogExercise { exercise: String, amount: ExerciseAmount },
}

/// How much of an exercise was done. Endurance exercises take minutes,
/// everything else takes sets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "unit", rename_all = "snake_case")]
pub enum ExerciseAmount {
    Set { weight: f64, reps: u32, sets: u32 },
    Minutes { minutes: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Idempotency key, unique per logical request.
    pub request_id: String,
    pub player_id:  PlayerId,
    #[serde(flatten)]
    pub kind:       RequestKind,
}

/// Proof that a local mutation is awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingToken {
    pub token:        String,
    pub structure_id: StructureId,
    pub issued_at:    Timestamp,
}

/// Ledger figures the presentation layer shows after a log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerView {
    pub streak_days:    u32,
    pub recovery_score: u8,
    pub currency:       Currency,
    pub attack_power:   f64,
    pub defense_power:  f64,
}

/// One channel's standing: level, records and the rolling week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelReport {
    pub channel:              Channel,
    pub level:                u32,
    pub cumulative:           f64,
    pub personal_record:      f64,
    pub weekly_volume:        f64,
    pub weekly_target:        f64,
    /// Percent of the weekly target, in [0, 100].
    pub weekly_progress:      f64,
    pub progressive_overload: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultingState {
    Structure { structure: StructureInstance },
    Removed { structure_id: StructureId },
    Ledger { ledger: LedgerView },
    /// A named exercise was logged against the channel it resolved to.
    Exercise { channel: Channel, matched: String, ledger: LedgerView },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub request_id:      String,
    pub accepted:        bool,
    /// Stable reason code when rejected, e.g. `needs_more_volume`.
    pub reason:          Option<String>,
    /// Human-readable detail for the reason.
    pub message:         Option<String>,
    pub token:           Option<PendingToken>,
    pub resulting_state: Option<ResultingState>,
}

impl Response {
    pub fn accepted(
        request_id: String,
        token: Option<PendingToken>,
        resulting_state: ResultingState,
    ) -> Self {
        Self {
            request_id,
            accepted: true,
            reason: None,
            message: None,
            token,
            resulting_state: Some(resulting_state),
        }
    }

    pub fn rejected(request_id: String, error: &CoreError) -> Self {
        Self {
            request_id,
            accepted: false,
            reason: Some(error.reason_code().to_string()),
            message: Some(error.to_string()),
            token: None,
            resulting_state: None,
        }
    }
}
