//! Sync state operations - one row per resource type

use super::catalog::parse_column;
use super::{parse_timestamp, timestamp, SqliteStore};
use crate::sync_state::{ResourceType, SyncState};
use crate::Result;
use rusqlite::{params, OptionalExtension, Row};

fn row_to_sync_state(row: &Row) -> rusqlite::Result<SyncState> {
    let last_sync_at: Option<String> = row.get(1)?;
    let records_synced: i64 = row.get(6)?;
    Ok(SyncState {
        resource_type: parse_column(row, 0)?,
        last_sync_at: last_sync_at.as_deref().and_then(parse_timestamp),
        last_etag: row.get(2)?,
        last_cursor: row.get(3)?,
        sync_status: parse_column(row, 4)?,
        error_message: row.get(5)?,
        records_synced: records_synced.max(0) as u64,
    })
}

impl SqliteStore {
    // ========== Sync State Operations ==========

    pub fn get_sync_state(&self, resource: ResourceType) -> Result<Option<SyncState>> {
        self.conn()
            .query_row(
                "SELECT resource_type, last_sync_at, last_etag, last_cursor, sync_status, error_message, records_synced
                 FROM sync_state WHERE resource_type = ?1",
                [resource.as_str()],
                row_to_sync_state,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Stored state, or a fresh `pending` state when the resource was never synced
    pub fn sync_state_or_default(&self, resource: ResourceType) -> Result<SyncState> {
        Ok(self
            .get_sync_state(resource)?
            .unwrap_or_else(|| SyncState::new(resource)))
    }

    pub fn all_sync_states(&self) -> Result<Vec<SyncState>> {
        let mut stmt = self.conn().prepare(
            "SELECT resource_type, last_sync_at, last_etag, last_cursor, sync_status, error_message, records_synced
             FROM sync_state ORDER BY resource_type",
        )?;
        let states = stmt
            .query_map([], row_to_sync_state)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(states)
    }

    /// Insert or overwrite the state row for `state.resource_type`
    pub fn put_sync_state(&self, state: &SyncState) -> Result<()> {
        self.conn().execute(
            r#"
            INSERT INTO sync_state (resource_type, last_sync_at, last_etag, last_cursor, sync_status, error_message, records_synced)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(resource_type) DO UPDATE SET
                last_sync_at = excluded.last_sync_at,
                last_etag = excluded.last_etag,
                last_cursor = excluded.last_cursor,
                sync_status = excluded.sync_status,
                error_message = excluded.error_message,
                records_synced = excluded.records_synced
            "#,
            params![
                state.resource_type.as_str(),
                state.last_sync_at.map(timestamp),
                state.last_etag,
                state.last_cursor,
                state.sync_status.as_str(),
                state.error_message,
                state.records_synced as i64,
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync_state::SyncStatus;
    use chrono::Utc;

    #[test]
    fn test_missing_state_defaults_to_pending() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.get_sync_state(ResourceType::Companies).unwrap().is_none());
        let state = store.sync_state_or_default(ResourceType::Companies).unwrap();
        assert_eq!(state.sync_status, SyncStatus::Pending);
    }

    #[test]
    fn test_put_and_overwrite_state() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut state = SyncState::new(ResourceType::Drift);
        state.sync_status = SyncStatus::Syncing;
        state.last_cursor = Some("page-2".into());
        store.put_sync_state(&state).unwrap();

        state.sync_status = SyncStatus::Success;
        state.last_cursor = None;
        state.last_etag = Some("\"v7\"".into());
        state.records_synced = 42;
        state.last_sync_at = Some(Utc::now());
        store.put_sync_state(&state).unwrap();

        let stored = store.get_sync_state(ResourceType::Drift).unwrap().unwrap();
        assert_eq!(stored.sync_status, SyncStatus::Success);
        assert_eq!(stored.last_cursor, None);
        assert_eq!(stored.last_etag.as_deref(), Some("\"v7\""));
        assert_eq!(stored.records_synced, 42);
        assert!(stored.last_sync_at.is_some());
        assert_eq!(store.all_sync_states().unwrap().len(), 1);
    }
}
