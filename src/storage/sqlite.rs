//! SQLite storage implementation

use super::schema;
use crate::Result;
use rusqlite::{params, Connection, Transaction};
use std::path::Path;

/// SQLite-backed storage for the catalog cache.
///
/// Operations live in per-area `impl` blocks (`catalog`, `facets`,
/// `sync_state`, `workspace`); this file owns the connection, migrations
/// and transactions.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Apply every migration not yet recorded in `schema_migrations`
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute(schema::CREATE_SCHEMA_MIGRATIONS_TABLE, [])?;
        let applied = self.applied_versions()?;

        for migration in schema::migrations() {
            if applied.contains(&migration.version) {
                continue;
            }
            let tx = self.conn.unchecked_transaction()?;
            for stmt in &migration.statements {
                tx.execute(stmt, [])?;
            }
            tx.execute(
                "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
                params![migration.version, migration.name, super::now_timestamp()],
            )?;
            tx.commit()?;
            tracing::debug!("Applied migration {} ({})", migration.version, migration.name);
        }
        Ok(())
    }

    fn applied_versions(&self) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare("SELECT version FROM schema_migrations ORDER BY version")?;
        let versions = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(versions)
    }

    /// Applied and pending migrations, in version order
    pub fn migration_status(&self) -> Result<Vec<MigrationStatus>> {
        let mut stmt = self
            .conn
            .prepare("SELECT version, name, applied_at FROM schema_migrations ORDER BY version")?;
        let mut status = stmt
            .query_map([], |row| {
                Ok(MigrationStatus {
                    version: row.get(0)?,
                    name: row.get(1)?,
                    applied_at: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for migration in schema::migrations() {
            if !status.iter().any(|s| s.version == migration.version) {
                status.push(MigrationStatus {
                    version: migration.version,
                    name: migration.name.to_string(),
                    applied_at: None,
                });
            }
        }
        status.sort_by_key(|s| s.version);
        Ok(status)
    }

    /// Raw connection for read queries assembled elsewhere
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside one transaction; any error rolls the whole unit back
    pub(crate) fn transaction<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    pub(crate) fn count_rows(&self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let active: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM companies WHERE is_active = 1 AND tombstone_at IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(DbStats {
            companies: self.count_rows("companies")?,
            active_companies: active as u64,
            aliases: self.count_rows("company_aliases")?,
            evidence: self.count_rows("evidence")?,
            drift_alerts: self.count_rows("drift_alerts")?,
            facet_buckets: self.count_rows("facet_buckets")?,
            bookmarks: self.count_rows("workspace_bookmarks")?,
            notes: self.count_rows("workspace_notes")?,
        })
    }
}

/// One row of the migration ledger
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MigrationStatus {
    pub version: i64,
    pub name: String,
    /// `None` while pending
    pub applied_at: Option<String>,
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub companies: u64,
    pub active_companies: u64,
    pub aliases: u64,
    pub evidence: u64,
    pub drift_alerts: u64,
    pub facet_buckets: u64,
    pub bookmarks: u64,
    pub notes: u64,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Companies: {} ({} active), Aliases: {}, Evidence: {}, Drift alerts: {}, Facet buckets: {}",
            self.companies,
            self.active_companies,
            self.aliases,
            self.evidence,
            self.drift_alerts,
            self.facet_buckets
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_in_memory_applies_migrations() {
        let store = SqliteStore::open_in_memory().unwrap();
        let status = store.migration_status().unwrap();
        assert_eq!(status.len(), 1);
        assert_eq!(status[0].name, "initial_schema");
        assert!(status[0].applied_at.is_some());
    }

    #[test]
    fn test_reopen_does_not_reapply() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.db");
        drop(SqliteStore::open(&path).unwrap());

        let store = SqliteStore::open(&path).unwrap();
        let count: i64 = store
            .conn()
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result: Result<()> = store.transaction(|tx| {
            tx.execute(
                "INSERT INTO service_stats (stat_name, stat_value, measured_at) VALUES ('x', 1.0, '2024-01-01T00:00:00Z')",
                [],
            )?;
            Err(crate::Error::Decode("boom".into()))
        });
        assert!(result.is_err());
        assert_eq!(store.count_rows("service_stats").unwrap(), 0);
    }

    #[test]
    fn test_stats_on_empty_store() {
        let store = SqliteStore::open_in_memory().unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.companies, 0);
        assert_eq!(stats.facet_buckets, 0);
    }
}
