//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The coordinator never touches SQL; callers load state through
//! `PlayerStore`, run the session, and save it back.

use crate::{
    config::CoreConfig,
    coordinator::ProgressionCoordinator,
    error::CoreResult,
    event::{CoreEvent, EventLogEntry},
    grid::GridStore,
    ledger::ChannelLedger,
};
use rusqlite::{params, Connection};

mod player;

/// Whole-value persistence of one player's ledger and grid.
/// Each call is an atomic get or set; there are no partial writes.
pub trait PlayerStore {
    fn load_ledger(&self, player_id: &str) -> CoreResult<Option<ChannelLedger>>;
    fn save_ledger(&self, player_id: &str, ledger: &ChannelLedger) -> CoreResult<()>;
    fn load_grid(&self, player_id: &str) -> CoreResult<Option<GridStore>>;
    fn save_grid(&self, player_id: &str, grid: &GridStore) -> CoreResult<()>;
}

/// Build a coordinator from stored state, or a fresh one for a new player.
pub fn open_session<S: PlayerStore>(
    store: &S,
    player_id: &str,
    config: CoreConfig,
) -> CoreResult<ProgressionCoordinator> {
    let ledger = store
        .load_ledger(player_id)?
        .unwrap_or_else(|| ChannelLedger::new(&config.ledger));
    let grid = store
        .load_grid(player_id)?
        .unwrap_or_else(|| GridStore::new(config.grid.width, config.grid.height));
    Ok(ProgressionCoordinator::new(player_id.to_string(), config, ledger, grid))
}

/// Persist a coordinator's ledger and grid.
pub fn save_session<S: PlayerStore>(store: &S, session: &ProgressionCoordinator) -> CoreResult<()> {
    store.save_ledger(session.player_id(), session.ledger())?;
    store.save_grid(session.player_id(), session.grid())?;
    Ok(())
}

pub struct SqliteStore {
    conn: Connection,
    path: Option<String>, // None for :memory:
}

impl SqliteStore {
    pub fn open(path: &str) -> CoreResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL only matters for real files; :memory: ignores it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self { conn, path: Some(path.to_string()) })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> CoreResult<Self> {
        let conn = Connection::open(":memory:")?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Apply all schema migrations in order. Safe to call repeatedly.
    pub fn migrate(&self) -> CoreResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, player_id: &str, event: &CoreEvent) -> CoreResult<()> {
        let payload = serde_json::to_string(event)?;
        self.conn.execute(
            "INSERT INTO event_log (player_id, event_type, payload, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![player_id, event.type_name(), payload, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Append a batch in one transaction.
    pub fn append_events(&mut self, player_id: &str, events: &[CoreEvent]) -> CoreResult<()> {
        let tx = self.conn.transaction()?;
        let now = chrono::Utc::now().to_rfc3339();
        for event in events {
            tx.execute(
                "INSERT INTO event_log (player_id, event_type, payload, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![player_id, event.type_name(), serde_json::to_string(event)?, now],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn events_for_player(&self, player_id: &str) -> CoreResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, player_id, event_type, payload
             FROM event_log WHERE player_id = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![player_id], |row| {
                Ok(EventLogEntry {
                    id:         Some(row.get(0)?),
                    player_id:  row.get(1)?,
                    event_type: row.get(2)?,
                    payload:    row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Decode the stored payloads back into events.
    pub fn replay_events(&self, player_id: &str) -> CoreResult<Vec<CoreEvent>> {
        self.events_for_player(player_id)?
            .iter()
            .map(|e| serde_json::from_str::<CoreEvent>(&e.payload).map_err(Into::into))
            .collect()
    }
}
