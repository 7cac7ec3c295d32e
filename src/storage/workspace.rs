//! Workspace overlay operations - user-owned rows, never touched by sync

use super::catalog::{row_to_company, COMPANY_COLUMNS};
use super::SqliteStore;
use crate::catalog::Company;
use crate::workspace::{SearchHistory, WorkspaceBookmark, WorkspaceComparison, WorkspaceNote};
use crate::Result;
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};

fn json_column<T: serde::de::DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_bookmark(row: &Row) -> rusqlite::Result<WorkspaceBookmark> {
    Ok(WorkspaceBookmark {
        user_id: row.get(0)?,
        org_id: row.get(1)?,
        global_company_id: row.get(2)?,
        tags: json_column(row, 3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn row_to_note(row: &Row) -> rusqlite::Result<WorkspaceNote> {
    Ok(WorkspaceNote {
        note_id: row.get(0)?,
        user_id: row.get(1)?,
        org_id: row.get(2)?,
        global_company_id: row.get(3)?,
        content: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn row_to_comparison(row: &Row) -> rusqlite::Result<WorkspaceComparison> {
    Ok(WorkspaceComparison {
        comparison_id: row.get(0)?,
        user_id: row.get(1)?,
        org_id: row.get(2)?,
        name: row.get(3)?,
        company_ids: json_column(row, 4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn row_to_search(row: &Row) -> rusqlite::Result<SearchHistory> {
    let filters: Option<String> = row.get(4)?;
    let filters = match filters {
        Some(raw) => Some(
            serde_json::from_str(&raw)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
        ),
        None => None,
    };
    let result_count: i64 = row.get(5)?;
    Ok(SearchHistory {
        search_id: row.get(0)?,
        user_id: row.get(1)?,
        org_id: row.get(2)?,
        query: row.get(3)?,
        filters,
        result_count: result_count.max(0) as u64,
        executed_at: row.get(6)?,
    })
}

impl SqliteStore {
    // ========== Bookmark Operations ==========

    /// Insert a bookmark, or overwrite tags and `updated_at` of the existing
    /// `(user_id, global_company_id)` row
    pub fn upsert_bookmark(&self, bookmark: &WorkspaceBookmark) -> Result<()> {
        let tags = serde_json::to_string(&bookmark.tags)?;
        self.conn().execute(
            r#"
            INSERT INTO workspace_bookmarks (user_id, org_id, global_company_id, tags, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(user_id, global_company_id) DO UPDATE SET
                tags = excluded.tags,
                updated_at = excluded.updated_at
            "#,
            params![
                bookmark.user_id,
                bookmark.org_id,
                bookmark.global_company_id,
                tags,
                bookmark.created_at,
                bookmark.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn delete_bookmark(&self, user_id: &str, company_id: &str) -> Result<bool> {
        let removed = self.conn().execute(
            "DELETE FROM workspace_bookmarks WHERE user_id = ?1 AND global_company_id = ?2",
            [user_id, company_id],
        )?;
        Ok(removed > 0)
    }

    pub fn get_bookmark(&self, user_id: &str, company_id: &str) -> Result<Option<WorkspaceBookmark>> {
        self.conn()
            .query_row(
                "SELECT user_id, org_id, global_company_id, tags, created_at, updated_at
                 FROM workspace_bookmarks WHERE user_id = ?1 AND global_company_id = ?2",
                [user_id, company_id],
                row_to_bookmark,
            )
            .optional()
            .map_err(Into::into)
    }

    /// A user's bookmarks, most recently touched first
    pub fn list_bookmarks(&self, user_id: &str) -> Result<Vec<WorkspaceBookmark>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id, org_id, global_company_id, tags, created_at, updated_at
             FROM workspace_bookmarks WHERE user_id = ?1 ORDER BY updated_at DESC",
        )?;
        let bookmarks = stmt
            .query_map([user_id], row_to_bookmark)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(bookmarks)
    }

    /// Cached companies a user has bookmarked; bookmarks of uncached companies are skipped
    pub fn bookmarked_companies(&self, user_id: &str) -> Result<Vec<Company>> {
        let sql = format!(
            "SELECT {} FROM companies
             WHERE global_company_id IN (SELECT global_company_id FROM workspace_bookmarks WHERE user_id = ?1)
             ORDER BY name",
            COMPANY_COLUMNS
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let companies = stmt
            .query_map([user_id], row_to_company)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(companies)
    }

    // ========== Note Operations ==========

    pub fn insert_note(&self, note: &WorkspaceNote) -> Result<()> {
        self.conn().execute(
            r#"
            INSERT INTO workspace_notes (note_id, user_id, org_id, global_company_id, content, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                note.note_id,
                note.user_id,
                note.org_id,
                note.global_company_id,
                note.content,
                note.created_at,
                note.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Delete a note owned by `user_id`; false when no such note exists for that user
    pub fn delete_note(&self, user_id: &str, note_id: &str) -> Result<bool> {
        let removed = self.conn().execute(
            "DELETE FROM workspace_notes WHERE note_id = ?1 AND user_id = ?2",
            [note_id, user_id],
        )?;
        Ok(removed > 0)
    }

    /// A user's notes on one company, newest first
    pub fn notes_for(&self, user_id: &str, company_id: &str) -> Result<Vec<WorkspaceNote>> {
        let mut stmt = self.conn().prepare(
            "SELECT note_id, user_id, org_id, global_company_id, content, created_at, updated_at
             FROM workspace_notes WHERE user_id = ?1 AND global_company_id = ?2
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let notes = stmt
            .query_map([user_id, company_id], row_to_note)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notes)
    }

    // ========== Comparison Operations ==========

    pub fn insert_comparison(&self, comparison: &WorkspaceComparison) -> Result<()> {
        let company_ids = serde_json::to_string(&comparison.company_ids)?;
        self.conn().execute(
            r#"
            INSERT INTO workspace_comparisons (comparison_id, user_id, org_id, name, company_ids, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                comparison.comparison_id,
                comparison.user_id,
                comparison.org_id,
                comparison.name,
                company_ids,
                comparison.created_at,
                comparison.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_comparison(&self, comparison_id: &str) -> Result<Option<WorkspaceComparison>> {
        self.conn()
            .query_row(
                "SELECT comparison_id, user_id, org_id, name, company_ids, created_at, updated_at
                 FROM workspace_comparisons WHERE comparison_id = ?1",
                [comparison_id],
                row_to_comparison,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_comparisons(&self, user_id: &str) -> Result<Vec<WorkspaceComparison>> {
        let mut stmt = self.conn().prepare(
            "SELECT comparison_id, user_id, org_id, name, company_ids, created_at, updated_at
             FROM workspace_comparisons WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
        )?;
        let comparisons = stmt
            .query_map([user_id], row_to_comparison)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(comparisons)
    }

    // ========== Search History Operations ==========

    pub fn insert_search(&self, entry: &SearchHistory) -> Result<()> {
        let filters = entry.filters.as_ref().map(serde_json::to_string).transpose()?;
        self.conn().execute(
            r#"
            INSERT INTO search_history (search_id, user_id, org_id, query, filters, result_count, executed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                entry.search_id,
                entry.user_id,
                entry.org_id,
                entry.query,
                filters,
                entry.result_count as i64,
                entry.executed_at,
            ],
        )?;
        Ok(())
    }

    /// A user's searches, newest first
    pub fn search_history(&self, user_id: &str, limit: u32) -> Result<Vec<SearchHistory>> {
        let mut stmt = self.conn().prepare(
            "SELECT search_id, user_id, org_id, query, filters, result_count, executed_at
             FROM search_history WHERE user_id = ?1
             ORDER BY executed_at DESC, rowid DESC LIMIT ?2",
        )?;
        let entries = stmt
            .query_map(params![user_id, limit], row_to_search)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}
