//! Core events: a record of every state change the coordinator applies.
//!
//! The coordinator buffers events; callers drain them and hand them to the
//! store's event log. Variants are only ever appended.

use crate::{
    channel::Channel,
    rules::StructureType,
    types::{Cell, PlayerId, StructureId, Timestamp},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoreEvent {
    // ── Ledger ─────────────────────────────────────
    DayRolledOver {
        day: NaiveDate,
        recovery_score: u8,
    },
    EffortLogged {
        at: Timestamp,
        channel: Channel,
        magnitude: f64,
        streak_days: u32,
        recovery_score: u8,
    },
    PersonalRecordSet {
        at: Timestamp,
        channel: Channel,
        estimate: f64,
    },

    // ── Structures ─────────────────────────────────
    StructurePlaced {
        at: Timestamp,
        structure_id: StructureId,
        structure_type: StructureType,
        cell: Cell,
    },
    ConstructionStarted {
        at: Timestamp,
        structure_id: StructureId,
        target_level: u32,
        finishes_at: Timestamp,
    },
    ConstructionCompleted {
        at: Timestamp,
        structure_id: StructureId,
        level: u32,
    },
    PlacementCancelled {
        structure_id: StructureId,
    },
    StructureDemolished {
        structure_id: StructureId,
    },
    StructureMoved {
        at: Timestamp,
        structure_id: StructureId,
        from: Cell,
        to: Cell,
    },

    // ── Sync ───────────────────────────────────────
    RequestRejected {
        request_id: String,
        reason: String,
    },
    MutationAcknowledged {
        token: String,
        structure_id: StructureId,
        accepted: bool,
    },
    SnapshotReconciled {
        last_synced_at: Timestamp,
        overwritten: usize,
        preserved: usize,
        added: usize,
        dropped: usize,
    },
}

impl CoreEvent {
    /// Stable name for the `event_type` column.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::DayRolledOver { .. }        => "day_rolled_over",
            Self::EffortLogged { .. }         => "effort_logged",
            Self::PersonalRecordSet { .. }    => "personal_record_set",
            Self::StructurePlaced { .. }      => "structure_placed",
            Self::ConstructionStarted { .. }  => "construction_started",
            Self::ConstructionCompleted { .. }=> "construction_completed",
            Self::PlacementCancelled { .. }   => "placement_cancelled",
            Self::StructureDemolished { .. }  => "structure_demolished",
            Self::StructureMoved { .. }       => "structure_moved",
            Self::RequestRejected { .. }      => "request_rejected",
            Self::MutationAcknowledged { .. } => "mutation_acknowledged",
            Self::SnapshotReconciled { .. }   => "snapshot_reconciled",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    pub player_id:  PlayerId,
    pub event_type: String,
    pub payload:    String, // JSON-serialized CoreEvent
}
