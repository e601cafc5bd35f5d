//! Ledger and grid documents, one row per player.

use crate::{error::CoreResult, grid::GridStore, ledger::ChannelLedger};
use rusqlite::{params, OptionalExtension};

use super::{PlayerStore, SqliteStore};

impl SqliteStore {
    fn load_json(&self, sql: &str, player_id: &str) -> CoreResult<Option<String>> {
        let json = self
            .conn
            .query_row(sql, params![player_id], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(json)
    }

    fn save_json(&self, sql: &str, player_id: &str, json: &str) -> CoreResult<()> {
        self.conn
            .execute(sql, params![player_id, json, chrono::Utc::now().to_rfc3339()])?;
        Ok(())
    }

    /// Players with any stored state.
    pub fn player_ids(&self) -> CoreResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT player_id FROM player_ledger
             UNION SELECT player_id FROM player_grid
             ORDER BY player_id",
        )?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }
}

impl PlayerStore for SqliteStore {
    fn load_ledger(&self, player_id: &str) -> CoreResult<Option<ChannelLedger>> {
        self.load_json("SELECT ledger_json FROM player_ledger WHERE player_id = ?1", player_id)?
            .map(|json| serde_json::from_str::<ChannelLedger>(&json))
            .transpose()
            .map_err(Into::into)
    }

    fn save_ledger(&self, player_id: &str, ledger: &ChannelLedger) -> CoreResult<()> {
        self.save_json(
            "INSERT OR REPLACE INTO player_ledger (player_id, ledger_json, updated_at)
             VALUES (?1, ?2, ?3)",
            player_id,
            &serde_json::to_string(ledger)?,
        )
    }

    fn load_grid(&self, player_id: &str) -> CoreResult<Option<GridStore>> {
        self.load_json("SELECT grid_json FROM player_grid WHERE player_id = ?1", player_id)?
            .map(|json| serde_json::from_str::<GridStore>(&json))
            .transpose()
            .map_err(Into::into)
    }

    fn save_grid(&self, player_id: &str, grid: &GridStore) -> CoreResult<()> {
        self.save_json(
            "INSERT OR REPLACE INTO player_grid (player_id, grid_json, updated_at)
             VALUES (?1, ?2, ?3)",
            player_id,
            &serde_json::to_string(grid)?,
        )
    }
}
