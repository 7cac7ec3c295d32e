//! Workspace overlay operations
//!
//! Every mutation builds the full record, checks it against its contract and
//! writes one row. Sync never reads or writes these tables.

use super::{QueryEngine, SearchOptions, SearchResults};
use crate::catalog::Company;
use crate::parse::validate_strict;
use crate::storage::now_timestamp;
use crate::workspace::{Owner, SearchHistory, WorkspaceBookmark, WorkspaceComparison, WorkspaceNote};
use crate::Result;
use uuid::Uuid;

impl<'a> QueryEngine<'a> {
    // ========== Bookmarks ==========

    /// Bookmark a company. Re-bookmarking keeps the original `created_at`
    /// and replaces the tags.
    pub fn add_bookmark(&self, owner: &Owner, company_id: &str, tags: Vec<String>) -> Result<WorkspaceBookmark> {
        let now = now_timestamp();
        let created_at = self
            .store
            .get_bookmark(&owner.user_id, company_id)?
            .map_or_else(|| now.clone(), |existing| existing.created_at);

        let bookmark = WorkspaceBookmark {
            user_id: owner.user_id.clone(),
            org_id: owner.org_id.clone(),
            global_company_id: company_id.to_string(),
            tags,
            created_at,
            updated_at: now,
        };
        validate_strict(&bookmark)?;
        self.store.upsert_bookmark(&bookmark)?;
        tracing::debug!("Bookmarked {} for {}", company_id, owner.user_id);
        Ok(bookmark)
    }

    pub fn remove_bookmark(&self, user_id: &str, company_id: &str) -> Result<bool> {
        self.store.delete_bookmark(user_id, company_id)
    }

    pub fn list_bookmarks(&self, user_id: &str) -> Result<Vec<WorkspaceBookmark>> {
        self.store.list_bookmarks(user_id)
    }

    pub fn bookmarked_companies(&self, user_id: &str) -> Result<Vec<Company>> {
        self.store.bookmarked_companies(user_id)
    }

    // ========== Notes ==========

    pub fn add_note(&self, owner: &Owner, company_id: &str, content: &str) -> Result<WorkspaceNote> {
        let now = now_timestamp();
        let note = WorkspaceNote {
            note_id: Uuid::new_v4().to_string(),
            user_id: owner.user_id.clone(),
            org_id: owner.org_id.clone(),
            global_company_id: company_id.to_string(),
            content: content.trim().to_string(),
            created_at: now.clone(),
            updated_at: now,
        };
        validate_strict(&note)?;
        self.store.insert_note(&note)?;
        Ok(note)
    }

    pub fn delete_note(&self, user_id: &str, note_id: &str) -> Result<bool> {
        self.store.delete_note(user_id, note_id)
    }

    pub fn notes(&self, user_id: &str, company_id: &str) -> Result<Vec<WorkspaceNote>> {
        self.store.notes_for(user_id, company_id)
    }

    // ========== Comparisons ==========

    /// Save a named comparison. Duplicate IDs collapse, and at least two
    /// distinct companies must remain.
    pub fn create_comparison(&self, owner: &Owner, name: &str, company_ids: &[String]) -> Result<WorkspaceComparison> {
        let mut ids: Vec<String> = Vec::with_capacity(company_ids.len());
        for id in company_ids {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }

        let now = now_timestamp();
        let comparison = WorkspaceComparison {
            comparison_id: Uuid::new_v4().to_string(),
            user_id: owner.user_id.clone(),
            org_id: owner.org_id.clone(),
            name: name.trim().to_string(),
            company_ids: ids,
            created_at: now.clone(),
            updated_at: now,
        };
        validate_strict(&comparison)?;
        self.store.insert_comparison(&comparison)?;
        Ok(comparison)
    }

    pub fn get_comparison(&self, comparison_id: &str) -> Result<Option<WorkspaceComparison>> {
        self.store.get_comparison(comparison_id)
    }

    pub fn list_comparisons(&self, user_id: &str) -> Result<Vec<WorkspaceComparison>> {
        self.store.list_comparisons(user_id)
    }

    // ========== Search history ==========

    /// Record an executed search with its options as the filters object
    pub fn record_search(&self, owner: &Owner, options: &SearchOptions, result_count: u64) -> Result<SearchHistory> {
        let entry = SearchHistory {
            search_id: Uuid::new_v4().to_string(),
            user_id: owner.user_id.clone(),
            org_id: owner.org_id.clone(),
            query: options.query.clone().unwrap_or_default(),
            filters: Some(serde_json::to_value(options)?),
            result_count,
            executed_at: now_timestamp(),
        };
        validate_strict(&entry)?;
        self.store.insert_search(&entry)?;
        Ok(entry)
    }

    /// Run a search and append it to the owner's history
    pub fn search_and_record(&self, owner: &Owner, options: &SearchOptions) -> Result<SearchResults> {
        let results = self.search_companies(options)?;
        self.record_search(owner, options, results.total)?;
        Ok(results)
    }

    pub fn search_history(&self, user_id: &str, limit: u32) -> Result<Vec<SearchHistory>> {
        self.store.search_history(user_id, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures;
    use crate::parse::CompanyRecord;
    use crate::storage::SqliteStore;
    use crate::Error;
    use chrono::Utc;

    fn store_with(ids: &[&str]) -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        let records: Vec<CompanyRecord> = ids
            .iter()
            .map(|id| CompanyRecord {
                company: fixtures::company(id, &format!("Company {}", id), 0.5),
                aliases: None,
                rejected_aliases: 0,
            })
            .collect();
        store.upsert_company_page(&records, Utc::now()).unwrap();
        store
    }

    #[test]
    fn test_rebookmark_keeps_one_row_with_latest_tags() {
        let store = store_with(&["c-1"]);
        let engine = QueryEngine::new(&store);
        let owner = Owner::user("u-1");

        let first = engine.add_bookmark(&owner, "c-1", vec!["a".into()]).unwrap();
        let second = engine.add_bookmark(&owner, "c-1", vec!["b".into()]).unwrap();

        let bookmarks = engine.list_bookmarks("u-1").unwrap();
        assert_eq!(bookmarks.len(), 1);
        assert_eq!(bookmarks[0].tags, vec!["b".to_string()]);
        assert_eq!(bookmarks[0].created_at, first.created_at);
        assert_eq!(second.created_at, first.created_at);

        let detail = engine.company_detail("c-1", Some("u-1")).unwrap().unwrap();
        assert_eq!(detail.is_bookmarked, Some(true));
        let other = engine.company_detail("c-1", Some("u-2")).unwrap().unwrap();
        assert_eq!(other.is_bookmarked, Some(false));
    }

    #[test]
    fn test_remove_bookmark() {
        let store = store_with(&["c-1"]);
        let engine = QueryEngine::new(&store);
        engine.add_bookmark(&Owner::user("u-1"), "c-1", Vec::new()).unwrap();

        assert!(engine.remove_bookmark("u-1", "c-1").unwrap());
        assert!(!engine.remove_bookmark("u-1", "c-1").unwrap());
        assert!(engine.bookmarked_companies("u-1").unwrap().is_empty());
    }

    #[test]
    fn test_bookmark_requires_user() {
        let store = store_with(&["c-1"]);
        let err = QueryEngine::new(&store)
            .add_bookmark(&Owner::user(" "), "c-1", Vec::new())
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_notes_are_scoped_to_their_author() {
        let store = store_with(&["c-1"]);
        let engine = QueryEngine::new(&store);
        let note = engine
            .add_note(&Owner::user("u-1").with_org("org-1"), "c-1", "  follow up in Q3 ")
            .unwrap();
        assert_eq!(note.content, "follow up in Q3");
        assert_eq!(note.org_id.as_deref(), Some("org-1"));

        assert_eq!(engine.notes("u-1", "c-1").unwrap().len(), 1);
        assert!(engine.notes("u-2", "c-1").unwrap().is_empty());

        assert!(!engine.delete_note("u-2", &note.note_id).unwrap());
        assert!(engine.delete_note("u-1", &note.note_id).unwrap());
        assert!(engine.notes("u-1", "c-1").unwrap().is_empty());
    }

    #[test]
    fn test_empty_note_rejected() {
        let store = store_with(&["c-1"]);
        let err = QueryEngine::new(&store)
            .add_note(&Owner::user("u-1"), "c-1", "   ")
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_comparison_needs_two_distinct_companies() {
        let store = store_with(&["c-1", "c-2"]);
        let engine = QueryEngine::new(&store);
        let owner = Owner::user("u-1");

        let err = engine
            .create_comparison(&owner, "dupes", &["c-1".into(), "c-1".into()])
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let saved = engine
            .create_comparison(&owner, "shortlist", &["c-1".into(), "c-2".into()])
            .unwrap();
        let loaded = engine.get_comparison(&saved.comparison_id).unwrap().unwrap();
        assert_eq!(loaded.company_ids, vec!["c-1".to_string(), "c-2".to_string()]);
        assert_eq!(engine.list_comparisons("u-1").unwrap().len(), 1);
    }

    #[test]
    fn test_search_history_round_trips_filters() {
        let store = store_with(&["c-1", "c-2"]);
        let engine = QueryEngine::new(&store);
        let owner = Owner::user("u-1");

        let options = SearchOptions {
            query: Some("company".into()),
            score_min: Some(0.4),
            ..Default::default()
        };
        let results = engine.search_and_record(&owner, &options).unwrap();
        assert_eq!(results.total, 2);
        engine.search_and_record(&owner, &SearchOptions::default()).unwrap();

        let history = engine.search_history("u-1", 10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].query, "");
        assert_eq!(history[1].query, "company");
        assert_eq!(history[1].result_count, 2);

        let filters = history[1].filters.clone().unwrap();
        let restored: SearchOptions = serde_json::from_value(filters).unwrap();
        assert_eq!(restored, options);
    }
}
