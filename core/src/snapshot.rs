//! Authoritative snapshots: the remote authority's view of a player,
//! merged into the local optimistic copy by `ProgressionCoordinator::reconcile`.
//!
//! Merge rule: a local value stamped `pending_since = t` survives a snapshot
//! only while `last_synced_at <= t`. Anything older is overwritten.

use crate::{
    grid::StructureInstance,
    ledger::ChannelLedger,
    types::{PlayerId, Timestamp},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthoritativeSnapshot {
    pub player_id:      PlayerId,
    pub last_synced_at: Timestamp,
    /// `None` when the authority only sent structures.
    pub ledger:         Option<ChannelLedger>,
    pub structures:     Vec<StructureInstance>,
}

/// What a reconcile did, per structure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Local copies replaced by the authority's.
    pub overwritten: usize,
    /// Local pending copies kept because they are newer than the snapshot.
    pub preserved:   usize,
    /// Structures only the authority knew about.
    pub added:       usize,
    /// Local structures discarded (stale, or colliding with authority).
    pub dropped:     usize,
    pub ledger_overwritten: bool,
}
