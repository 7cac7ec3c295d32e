//! Query engine implementation
//!
//! Provides read operations over the local cache:
//! - Filtered text search with live facet counts
//! - Company detail (row, aliases, evidence, drift, overlays)
//! - Materialized facets and drift alerts

use super::builder::{Dimension, QueryBuilder};
use super::{
    CompanyDetail, SearchOptions, SearchResults, SortField, DEFAULT_SEARCH_LIMIT,
    DETAIL_DRIFT_LIMIT, DETAIL_EVIDENCE_LIMIT,
};
use crate::catalog::DriftAlert;
use crate::facet::{FacetBucket, FacetType};
use crate::storage::catalog::{row_to_company, COMPANY_COLUMNS};
use crate::storage::facets::facet_counts;
use crate::storage::{DriftFilter, SqliteStore};
use crate::Result;
use chrono::Utc;
use rusqlite::params_from_iter;
use rusqlite::types::Value;
use std::collections::BTreeMap;

/// ORDER BY clause and its bound parameters
fn order_by(options: &SearchOptions) -> (String, Vec<Value>) {
    let dir = options.order.as_sql();
    match options.sort {
        SortField::Score => (format!("final_score {}, global_company_id", dir), Vec::new()),
        SortField::Name => (format!("name COLLATE NOCASE {}, global_company_id", dir), Vec::new()),
        SortField::Updated => (format!("updated_at {}, global_company_id", dir), Vec::new()),
        SortField::Relevance => {
            let text = options
                .query
                .as_deref()
                .map(|q| q.trim().to_lowercase())
                .filter(|q| !q.is_empty());
            match text {
                Some(text) => (
                    "CASE WHEN lower(name) = ? THEN 0 \
                     WHEN substr(lower(name), 1, length(?)) = ? THEN 1 \
                     ELSE 2 END, final_score DESC, global_company_id"
                        .to_string(),
                    vec![Value::Text(text.clone()), Value::Text(text.clone()), Value::Text(text)],
                ),
                None => ("final_score DESC, global_company_id".to_string(), Vec::new()),
            }
        }
    }
}

/// Query engine over the local cache
pub struct QueryEngine<'a> {
    pub(super) store: &'a SqliteStore,
}

impl<'a> QueryEngine<'a> {
    /// Create a new query engine
    pub fn new(store: &'a SqliteStore) -> Self {
        Self { store }
    }

    /// Search active companies.
    ///
    /// Text matches company names, domains and aliases by term prefix.
    /// Facet counts cover the whole match set, each computed without the
    /// facet's own filter so sibling buckets stay selectable.
    pub fn search_companies(&self, options: &SearchOptions) -> Result<SearchResults> {
        let builder = QueryBuilder::from_options(options)?;
        let clause = builder.where_clause();
        let conn = self.store.conn();

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM companies WHERE {}", clause.sql),
            params_from_iter(clause.params.iter()),
            |row| row.get(0),
        )?;

        let limit = options.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
        let offset = options.offset.unwrap_or(0);
        let (order_sql, order_params) = order_by(options);
        let sql = format!(
            "SELECT {} FROM companies WHERE {} ORDER BY {} LIMIT ? OFFSET ?",
            COMPANY_COLUMNS, clause.sql, order_sql
        );
        let mut params = clause.params.clone();
        params.extend(order_params);
        params.push(Value::Integer(i64::from(limit)));
        params.push(Value::Integer(i64::from(offset)));

        let mut stmt = conn.prepare(&sql)?;
        let companies = stmt
            .query_map(params_from_iter(params.iter()), row_to_company)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut facets = BTreeMap::new();
        for facet in FacetType::all() {
            let scoped = builder.where_excluding(Dimension::of_facet(*facet));
            facets.insert(*facet, facet_counts(conn, *facet, &scoped.sql, &scoped.params)?);
        }

        tracing::debug!("Search matched {} companies ({} returned)", total, companies.len());
        Ok(SearchResults {
            companies,
            total: total as u64,
            facets,
            limit,
            offset,
        })
    }

    /// Company row plus aliases, recent evidence and drift, and the user's
    /// overlays when `user_id` is given. `None` when the company is not cached.
    pub fn company_detail(&self, company_id: &str, user_id: Option<&str>) -> Result<Option<CompanyDetail>> {
        let Some(company) = self.store.get_company(company_id)? else {
            return Ok(None);
        };

        let (is_bookmarked, notes) = match user_id {
            Some(user) => (
                Some(self.store.get_bookmark(user, company_id)?.is_some()),
                self.store.notes_for(user, company_id)?,
            ),
            None => (None, Vec::new()),
        };

        Ok(Some(CompanyDetail {
            determinism_verified: company.determinism_verified(),
            aliases: self.store.get_company_aliases(company_id)?,
            evidence: self.store.get_company_evidence(company_id, DETAIL_EVIDENCE_LIMIT)?,
            drift_alerts: self.store.get_company_drift(company_id, DETAIL_DRIFT_LIMIT)?,
            company,
            is_bookmarked,
            notes,
        }))
    }

    /// Buckets stored by the last facet rebuild
    pub fn materialized_facets(&self, facet: Option<FacetType>) -> Result<Vec<FacetBucket>> {
        self.store.materialized_facets(facet)
    }

    pub fn list_drift_alerts(&self, filter: &DriftFilter) -> Result<Vec<DriftAlert>> {
        self.store.list_drift_alerts(filter)
    }

    /// Acknowledge an alert locally; false when it is not cached
    pub fn mark_drift_seen(&self, alert_id: &str) -> Result<bool> {
        self.store.mark_drift_seen(alert_id, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{fixtures, AliasType, Company, CompanyAlias};
    use crate::parse::CompanyRecord;
    use crate::query::SortOrder;
    use crate::Error;

    fn company(id: &str, name: &str, industry: &str, score: f64) -> Company {
        let mut company = fixtures::company(id, name, score);
        company.industry = Some(industry.to_string());
        company.region = Some("west".to_string());
        company
    }

    fn seed(store: &SqliteStore, companies: Vec<Company>) {
        let records: Vec<CompanyRecord> = companies
            .into_iter()
            .map(|company| CompanyRecord { company, aliases: None, rejected_aliases: 0 })
            .collect();
        store.upsert_company_page(&records, Utc::now()).unwrap();
    }

    fn catalog() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        seed(
            &store,
            vec![
                company("c-1", "Acme Software", "software", 0.9),
                company("c-2", "Acme Retail", "retail", 0.85),
                company("c-3", "Acme Tiny", "software", 0.3),
                company("c-4", "Beta Systems", "software", 0.95),
            ],
        );
        store
    }

    #[test]
    fn test_facets_ignore_their_own_dimension() {
        let store = catalog();
        let engine = QueryEngine::new(&store);
        let results = engine
            .search_companies(&SearchOptions {
                query: Some("acme".into()),
                score_min: Some(0.8),
                industries: vec!["software".into()],
                ..Default::default()
            })
            .unwrap();

        assert_eq!(results.total, 1);
        assert_eq!(results.companies[0].global_company_id, "c-1");

        // Industry facet: text + score honored, industry ignored
        assert_eq!(results.facet_count(FacetType::Industry, "software"), 1);
        assert_eq!(results.facet_count(FacetType::Industry, "retail"), 1);

        // Score facet: text + industry honored, score ignored
        assert_eq!(results.facet_count(FacetType::ScoreRange, "80-100"), 1);
        assert_eq!(results.facet_count(FacetType::ScoreRange, "20-40"), 1);

        // Region facet honors every filter
        assert_eq!(results.facet_count(FacetType::Region, "west"), 1);
    }

    #[test]
    fn test_alias_text_match() {
        let store = catalog();
        let mut record = CompanyRecord {
            company: company("c-5", "Gamma Holdings", "finance", 0.6),
            aliases: None,
            rejected_aliases: 0,
        };
        record.aliases = Some(vec![CompanyAlias {
            alias_id: "a-1".into(),
            global_company_id: "c-5".into(),
            alias: "Zephyr Capital".into(),
            alias_type: AliasType::Former,
            created_at: "2024-01-01T00:00:00Z".into(),
        }]);
        store.upsert_company_page(&[record], Utc::now()).unwrap();

        let results = QueryEngine::new(&store)
            .search_companies(&SearchOptions { query: Some("zeph".into()), ..Default::default() })
            .unwrap();
        assert_eq!(results.total, 1);
        assert_eq!(results.companies[0].global_company_id, "c-5");
    }

    #[test]
    fn test_relevance_prefers_exact_then_prefix() {
        let store = SqliteStore::open_in_memory().unwrap();
        seed(
            &store,
            vec![
                company("c-1", "Northwind Acme", "software", 0.99),
                company("c-2", "Acme Labs", "software", 0.5),
                company("c-3", "Acme", "software", 0.1),
            ],
        );
        let results = QueryEngine::new(&store)
            .search_companies(&SearchOptions { query: Some("Acme".into()), ..Default::default() })
            .unwrap();
        let ids: Vec<&str> = results.companies.iter().map(|c| c.global_company_id.as_str()).collect();
        assert_eq!(ids, vec!["c-3", "c-2", "c-1"]);
    }

    #[test]
    fn test_sort_and_paging() {
        let store = catalog();
        let engine = QueryEngine::new(&store);
        let options = SearchOptions {
            sort: SortField::Name,
            order: SortOrder::Asc,
            limit: Some(2),
            offset: Some(1),
            ..Default::default()
        };
        let results = engine.search_companies(&options).unwrap();
        assert_eq!(results.total, 4);
        let names: Vec<&str> = results.companies.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Acme Software", "Acme Tiny"]);
    }

    #[test]
    fn test_tombstoned_rows_are_hidden() {
        let store = catalog();
        let mut gone = company("c-9", "Acme Ghost", "software", 0.9);
        gone.is_active = false;
        gone.tombstone_at = Some("2024-05-01T00:00:00Z".into());
        seed(&store, vec![gone]);

        let engine = QueryEngine::new(&store);
        let results = engine
            .search_companies(&SearchOptions { query: Some("ghost".into()), ..Default::default() })
            .unwrap();
        assert_eq!(results.total, 0);
        // Detail still resolves the soft-deleted row
        assert!(engine.company_detail("c-9", None).unwrap().is_some());
    }

    #[test]
    fn test_trusted_only_hides_incomplete_bundle() {
        let store = catalog();
        let mut shaky = company("c-6", "Acme Shaky", "software", 0.9);
        shaky.checksum = "  ".into();
        seed(&store, vec![shaky]);

        let engine = QueryEngine::new(&store);
        let all = engine
            .search_companies(&SearchOptions { query: Some("shaky".into()), ..Default::default() })
            .unwrap();
        assert_eq!(all.total, 1);
        assert!(!all.companies[0].determinism_verified());

        let trusted = engine
            .search_companies(&SearchOptions {
                query: Some("shaky".into()),
                trusted_only: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(trusted.total, 0);
    }

    #[test]
    fn test_invalid_filter_is_reported() {
        let store = catalog();
        let err = QueryEngine::new(&store)
            .search_companies(&SearchOptions { score_max: Some(-0.1), ..Default::default() })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFilter(_)));
    }

    #[test]
    fn test_detail_for_missing_company() {
        let store = catalog();
        assert!(QueryEngine::new(&store).company_detail("nope", Some("u-1")).unwrap().is_none());
    }

    #[test]
    fn test_detail_without_user_has_no_overlays() {
        let store = catalog();
        let detail = QueryEngine::new(&store).company_detail("c-1", None).unwrap().unwrap();
        assert!(detail.determinism_verified);
        assert_eq!(detail.is_bookmarked, None);
        assert!(detail.notes.is_empty());
    }
}
