//! Catalog operations - page upserts from sync and single-record reads

use super::{timestamp, SqliteStore};
use crate::catalog::{Company, CompanyAlias, DriftAlert, Evidence, ScoringRun, ServiceStats};
use crate::parse::CompanyRecord;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::str::FromStr;

/// Column list matching `row_to_company`
pub(crate) const COMPANY_COLUMNS: &str = "global_company_id, dataset_version, name, domain, postal_code, \
     country_code, city, state, region, industry, sector, employee_count, revenue_estimate, \
     final_score, d_score, o_score, i_score, m_score, b_score, confidence_score, \
     norm_context_version, checksum, risk_score, feasibility_score, created_at, updated_at, \
     synced_at, is_active, tombstone_at";

const EVIDENCE_COLUMNS: &str = "evidence_id, global_company_id, type, title, preview, source_url, \
     source_name, relevance_score, created_at, extracted_at";

const DRIFT_COLUMNS: &str = "alert_id, global_company_id, metric, old_value, new_value, \
     drift_percentage, detected_at, run_id, seen_at";

/// Outcome of writing one page of companies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompanyPage {
    pub companies: u64,
    pub aliases: u64,
}

/// Filter for drift alert listings
#[derive(Debug, Clone, Default)]
pub struct DriftFilter {
    pub unseen_only: bool,
    pub company_id: Option<String>,
    pub limit: Option<u32>,
}

/// Decode a text column through the type's `FromStr`
pub(crate) fn parse_column<T: FromStr<Err = Error>>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e: Error| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn row_to_company(row: &Row) -> rusqlite::Result<Company> {
    Ok(Company {
        global_company_id: row.get(0)?,
        dataset_version: row.get(1)?,
        name: row.get(2)?,
        domain: row.get(3)?,
        postal_code: row.get(4)?,
        country_code: row.get(5)?,
        city: row.get(6)?,
        state: row.get(7)?,
        region: row.get(8)?,
        industry: row.get(9)?,
        sector: row.get(10)?,
        employee_count: row.get(11)?,
        revenue_estimate: row.get(12)?,
        final_score: row.get(13)?,
        d_score: row.get(14)?,
        o_score: row.get(15)?,
        i_score: row.get(16)?,
        m_score: row.get(17)?,
        b_score: row.get(18)?,
        confidence_score: row.get(19)?,
        norm_context_version: row.get(20)?,
        checksum: row.get(21)?,
        risk_score: row.get(22)?,
        feasibility_score: row.get(23)?,
        created_at: row.get(24)?,
        updated_at: row.get(25)?,
        synced_at: row.get(26)?,
        is_active: row.get(27)?,
        tombstone_at: row.get(28)?,
    })
}

fn row_to_evidence(row: &Row) -> rusqlite::Result<Evidence> {
    Ok(Evidence {
        evidence_id: row.get(0)?,
        global_company_id: row.get(1)?,
        evidence_type: parse_column(row, 2)?,
        title: row.get(3)?,
        preview: row.get(4)?,
        source_url: row.get(5)?,
        source_name: row.get(6)?,
        relevance_score: row.get(7)?,
        created_at: row.get(8)?,
        extracted_at: row.get(9)?,
    })
}

fn row_to_drift(row: &Row) -> rusqlite::Result<DriftAlert> {
    Ok(DriftAlert {
        alert_id: row.get(0)?,
        global_company_id: row.get(1)?,
        metric: parse_column(row, 2)?,
        old_value: row.get(3)?,
        new_value: row.get(4)?,
        drift_percentage: row.get(5)?,
        detected_at: row.get(6)?,
        run_id: row.get(7)?,
        seen_at: row.get(8)?,
    })
}

fn upsert_company(conn: &Connection, company: &Company, synced_at: &str) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO companies (
            global_company_id, dataset_version, name, domain, postal_code, country_code, city, state,
            region, industry, sector, employee_count, revenue_estimate,
            final_score, d_score, o_score, i_score, m_score, b_score, confidence_score,
            norm_context_version, checksum, risk_score, feasibility_score,
            created_at, updated_at, synced_at, is_active, tombstone_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19,
                ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29)
        ON CONFLICT(global_company_id) DO UPDATE SET
            dataset_version = excluded.dataset_version,
            name = excluded.name,
            domain = excluded.domain,
            postal_code = excluded.postal_code,
            country_code = excluded.country_code,
            city = excluded.city,
            state = excluded.state,
            region = excluded.region,
            industry = excluded.industry,
            sector = excluded.sector,
            employee_count = excluded.employee_count,
            revenue_estimate = excluded.revenue_estimate,
            final_score = excluded.final_score,
            d_score = excluded.d_score,
            o_score = excluded.o_score,
            i_score = excluded.i_score,
            m_score = excluded.m_score,
            b_score = excluded.b_score,
            confidence_score = excluded.confidence_score,
            norm_context_version = excluded.norm_context_version,
            checksum = excluded.checksum,
            risk_score = excluded.risk_score,
            feasibility_score = excluded.feasibility_score,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at,
            synced_at = excluded.synced_at,
            is_active = excluded.is_active,
            tombstone_at = excluded.tombstone_at
        "#,
        params![
            company.global_company_id,
            company.dataset_version,
            company.name,
            company.domain,
            company.postal_code,
            company.country_code,
            company.city,
            company.state,
            company.region,
            company.industry,
            company.sector,
            company.employee_count,
            company.revenue_estimate,
            company.final_score,
            company.d_score,
            company.o_score,
            company.i_score,
            company.m_score,
            company.b_score,
            company.confidence_score,
            company.norm_context_version,
            company.checksum,
            company.risk_score,
            company.feasibility_score,
            company.created_at,
            company.updated_at,
            synced_at,
            company.is_active,
            company.tombstone_at,
        ],
    )?;
    Ok(())
}

fn replace_aliases(conn: &Connection, company_id: &str, aliases: &[CompanyAlias]) -> Result<u64> {
    conn.execute(
        "DELETE FROM company_aliases WHERE global_company_id = ?1",
        [company_id],
    )?;
    let mut stmt = conn.prepare_cached(
        r#"
        INSERT INTO company_aliases (alias_id, global_company_id, alias, alias_type, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(alias_id) DO UPDATE SET
            global_company_id = excluded.global_company_id,
            alias = excluded.alias,
            alias_type = excluded.alias_type,
            created_at = excluded.created_at
        "#,
    )?;
    for alias in aliases {
        stmt.execute(params![
            alias.alias_id,
            alias.global_company_id,
            alias.alias,
            alias.alias_type.as_str(),
            alias.created_at,
        ])?;
    }
    Ok(aliases.len() as u64)
}

impl SqliteStore {
    // ========== Sync Writes ==========

    /// Upsert one page of companies (and their embedded aliases) in a single transaction.
    ///
    /// Every column is overwritten from the payload except `synced_at`, which
    /// is stamped with `synced_at`.
    pub fn upsert_company_page(
        &self,
        records: &[CompanyRecord],
        synced_at: DateTime<Utc>,
    ) -> Result<CompanyPage> {
        let stamp = timestamp(synced_at);
        self.transaction(|tx| {
            let mut page = CompanyPage::default();
            for record in records {
                upsert_company(tx, &record.company, &stamp)?;
                page.companies += 1;
                if let Some(aliases) = &record.aliases {
                    page.aliases += replace_aliases(tx, &record.company.global_company_id, aliases)?;
                }
            }
            Ok(page)
        })
    }

    /// Upsert evidence previews by `evidence_id`
    pub fn upsert_evidence_page(&self, items: &[Evidence]) -> Result<u64> {
        self.transaction(|tx| {
            let mut stmt = tx.prepare_cached(
                r#"
                INSERT INTO evidence (evidence_id, global_company_id, type, title, preview, source_url,
                                      source_name, relevance_score, created_at, extracted_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(evidence_id) DO UPDATE SET
                    global_company_id = excluded.global_company_id,
                    type = excluded.type,
                    title = excluded.title,
                    preview = excluded.preview,
                    source_url = excluded.source_url,
                    source_name = excluded.source_name,
                    relevance_score = excluded.relevance_score,
                    created_at = excluded.created_at,
                    extracted_at = excluded.extracted_at
                "#,
            )?;
            for item in items {
                stmt.execute(params![
                    item.evidence_id,
                    item.global_company_id,
                    item.evidence_type.as_str(),
                    item.title,
                    item.preview,
                    item.source_url,
                    item.source_name,
                    item.relevance_score,
                    item.created_at,
                    item.extracted_at,
                ])?;
            }
            Ok(items.len() as u64)
        })
    }

    /// Upsert drift alerts by `alert_id`.
    /// An existing alert only takes the new `drift_percentage`; local `seen_at` survives.
    pub fn upsert_drift_page(&self, alerts: &[DriftAlert]) -> Result<u64> {
        self.transaction(|tx| {
            let mut stmt = tx.prepare_cached(
                r#"
                INSERT INTO drift_alerts (alert_id, global_company_id, metric, old_value, new_value,
                                          drift_percentage, detected_at, run_id)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(alert_id) DO UPDATE SET
                    drift_percentage = excluded.drift_percentage
                "#,
            )?;
            for alert in alerts {
                stmt.execute(params![
                    alert.alert_id,
                    alert.global_company_id,
                    alert.metric.as_str(),
                    alert.old_value,
                    alert.new_value,
                    alert.drift_percentage,
                    alert.detected_at,
                    alert.run_id,
                ])?;
            }
            Ok(alerts.len() as u64)
        })
    }

    /// Upsert scoring runs by `run_id` (full overwrite)
    pub fn upsert_run_page(&self, runs: &[ScoringRun]) -> Result<u64> {
        self.transaction(|tx| {
            let mut stmt = tx.prepare_cached(
                r#"
                INSERT INTO scoring_runs (run_id, started_at, completed_at, companies_scored,
                                          avg_confidence, norm_context_version, status, error_message)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(run_id) DO UPDATE SET
                    started_at = excluded.started_at,
                    completed_at = excluded.completed_at,
                    companies_scored = excluded.companies_scored,
                    avg_confidence = excluded.avg_confidence,
                    norm_context_version = excluded.norm_context_version,
                    status = excluded.status,
                    error_message = excluded.error_message
                "#,
            )?;
            for run in runs {
                stmt.execute(params![
                    run.run_id,
                    run.started_at,
                    run.completed_at,
                    run.companies_scored,
                    run.avg_confidence,
                    run.norm_context_version,
                    run.status.as_str(),
                    run.error_message,
                ])?;
            }
            Ok(runs.len() as u64)
        })
    }

    /// Upsert service counters by `stat_name`
    pub fn upsert_stats_page(&self, stats: &[ServiceStats]) -> Result<u64> {
        self.transaction(|tx| {
            let mut stmt = tx.prepare_cached(
                r#"
                INSERT INTO service_stats (stat_name, stat_value, unit, measured_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(stat_name) DO UPDATE SET
                    stat_value = excluded.stat_value,
                    unit = excluded.unit,
                    measured_at = excluded.measured_at
                "#,
            )?;
            for stat in stats {
                stmt.execute(params![stat.stat_name, stat.stat_value, stat.unit, stat.measured_at])?;
            }
            Ok(stats.len() as u64)
        })
    }

    // ========== Company Reads ==========

    /// Get a company by ID, tombstoned or not
    pub fn get_company(&self, company_id: &str) -> Result<Option<Company>> {
        let sql = format!("SELECT {} FROM companies WHERE global_company_id = ?1", COMPANY_COLUMNS);
        self.conn()
            .query_row(&sql, [company_id], row_to_company)
            .optional()
            .map_err(Into::into)
    }

    pub fn get_company_aliases(&self, company_id: &str) -> Result<Vec<CompanyAlias>> {
        let mut stmt = self.conn().prepare(
            "SELECT alias_id, global_company_id, alias, alias_type, created_at
             FROM company_aliases WHERE global_company_id = ?1 ORDER BY alias",
        )?;
        let aliases = stmt
            .query_map([company_id], |row| {
                Ok(CompanyAlias {
                    alias_id: row.get(0)?,
                    global_company_id: row.get(1)?,
                    alias: row.get(2)?,
                    alias_type: parse_column(row, 3)?,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(aliases)
    }

    /// Most recent evidence previews for a company
    pub fn get_company_evidence(&self, company_id: &str, limit: u32) -> Result<Vec<Evidence>> {
        let sql = format!(
            "SELECT {} FROM evidence WHERE global_company_id = ?1 ORDER BY created_at DESC LIMIT ?2",
            EVIDENCE_COLUMNS
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let evidence = stmt
            .query_map(params![company_id, limit], row_to_evidence)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(evidence)
    }

    /// Most recent drift alerts for a company
    pub fn get_company_drift(&self, company_id: &str, limit: u32) -> Result<Vec<DriftAlert>> {
        self.list_drift_alerts(&DriftFilter {
            unseen_only: false,
            company_id: Some(company_id.to_string()),
            limit: Some(limit),
        })
    }

    /// Active companies whose rows were written at or after `since`, newest first
    pub fn recently_synced_company_ids(&self, since: DateTime<Utc>, limit: u32) -> Result<Vec<String>> {
        let mut stmt = self.conn().prepare(
            "SELECT global_company_id FROM companies
             WHERE synced_at >= ?1 AND is_active = 1 AND tombstone_at IS NULL
             ORDER BY synced_at DESC LIMIT ?2",
        )?;
        let ids = stmt
            .query_map(params![timestamp(since), limit], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }

    // ========== Drift Operations ==========

    pub fn list_drift_alerts(&self, filter: &DriftFilter) -> Result<Vec<DriftAlert>> {
        let mut sql = format!("SELECT {} FROM drift_alerts WHERE 1 = 1", DRIFT_COLUMNS);
        let mut args: Vec<rusqlite::types::Value> = Vec::new();
        if filter.unseen_only {
            sql.push_str(" AND seen_at IS NULL");
        }
        if let Some(company_id) = &filter.company_id {
            sql.push_str(" AND global_company_id = ?");
            args.push(company_id.clone().into());
        }
        sql.push_str(" ORDER BY detected_at DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            args.push(i64::from(limit).into());
        }

        let mut stmt = self.conn().prepare(&sql)?;
        let alerts = stmt
            .query_map(rusqlite::params_from_iter(args.iter()), row_to_drift)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(alerts)
    }

    /// Stamp `seen_at` on an alert; false when the alert is unknown
    pub fn mark_drift_seen(&self, alert_id: &str, seen_at: DateTime<Utc>) -> Result<bool> {
        let changed = self.conn().execute(
            "UPDATE drift_alerts SET seen_at = ?1 WHERE alert_id = ?2",
            params![timestamp(seen_at), alert_id],
        )?;
        Ok(changed > 0)
    }

    // ========== Run & Stats Reads ==========

    pub fn list_scoring_runs(&self, limit: u32) -> Result<Vec<ScoringRun>> {
        let mut stmt = self.conn().prepare(
            "SELECT run_id, started_at, completed_at, companies_scored, avg_confidence,
                    norm_context_version, status, error_message
             FROM scoring_runs ORDER BY started_at DESC LIMIT ?1",
        )?;
        let runs = stmt
            .query_map([limit], |row| {
                Ok(ScoringRun {
                    run_id: row.get(0)?,
                    started_at: row.get(1)?,
                    completed_at: row.get(2)?,
                    companies_scored: row.get(3)?,
                    avg_confidence: row.get(4)?,
                    norm_context_version: row.get(5)?,
                    status: parse_column(row, 6)?,
                    error_message: row.get(7)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(runs)
    }

    pub fn list_service_stats(&self) -> Result<Vec<ServiceStats>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT stat_name, stat_value, unit, measured_at FROM service_stats ORDER BY stat_name")?;
        let stats = stmt
            .query_map([], |row| {
                Ok(ServiceStats {
                    stat_name: row.get(0)?,
                    stat_value: row.get(1)?,
                    unit: row.get(2)?,
                    measured_at: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures;
    use crate::catalog::{AliasType, DriftMetric, EvidenceType, RunStatus};
    use chrono::Duration;

    fn record(company: Company) -> CompanyRecord {
        CompanyRecord {
            company,
            aliases: None,
            rejected_aliases: 0,
        }
    }

    fn alias(id: &str, company_id: &str, text: &str) -> CompanyAlias {
        CompanyAlias {
            alias_id: id.into(),
            global_company_id: company_id.into(),
            alias: text.into(),
            alias_type: AliasType::Brand,
            created_at: "2024-01-01T00:00:00Z".into(),
        }
    }

    fn drift(id: &str, pct: f64) -> DriftAlert {
        DriftAlert {
            alert_id: id.into(),
            global_company_id: "c-1".into(),
            metric: DriftMetric::FinalScore,
            old_value: 0.4,
            new_value: 0.6,
            drift_percentage: pct,
            detected_at: "2024-03-01T10:00:00Z".into(),
            run_id: "r-1".into(),
            seen_at: None,
        }
    }

    #[test]
    fn test_upsert_and_get_company() {
        let store = SqliteStore::open_in_memory().unwrap();
        let page = store
            .upsert_company_page(&[record(fixtures::company("c-1", "Acme", 0.8))], Utc::now())
            .unwrap();
        assert_eq!(page.companies, 1);

        let company = store.get_company("c-1").unwrap().unwrap();
        assert_eq!(company.name, "Acme");
        assert!(company.synced_at.is_some());
        assert!(store.get_company("missing").unwrap().is_none());
    }

    #[test]
    fn test_second_upsert_wins_synced_at() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = Utc::now() - Duration::minutes(5);
        let second = Utc::now();

        let mut company = fixtures::company("c-1", "Acme", 0.8);
        store.upsert_company_page(&[record(company.clone())], first).unwrap();
        company.name = "Acme Corp".into();
        store.upsert_company_page(&[record(company)], second).unwrap();

        let stored = store.get_company("c-1").unwrap().unwrap();
        assert_eq!(stored.name, "Acme Corp");
        assert_eq!(stored.synced_at.as_deref(), Some(timestamp(second).as_str()));
        assert_eq!(store.count_rows("companies").unwrap(), 1);
    }

    #[test]
    fn test_embedded_aliases_replace_existing() {
        let store = SqliteStore::open_in_memory().unwrap();
        let company = fixtures::company("c-1", "Acme", 0.8);

        let mut first = record(company.clone());
        first.aliases = Some(vec![alias("a-1", "c-1", "ACME"), alias("a-2", "c-1", "Acme Labs")]);
        store.upsert_company_page(&[first], Utc::now()).unwrap();

        let mut second = record(company.clone());
        second.aliases = Some(vec![alias("a-3", "c-1", "Acme Group")]);
        store.upsert_company_page(&[second], Utc::now()).unwrap();
        let aliases = store.get_company_aliases("c-1").unwrap();
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases[0].alias, "Acme Group");

        // No aliases key leaves rows alone
        store.upsert_company_page(&[record(company)], Utc::now()).unwrap();
        assert_eq!(store.get_company_aliases("c-1").unwrap().len(), 1);
    }

    #[test]
    fn test_drift_upsert_only_updates_percentage() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_drift_page(&[drift("d-1", 50.0)]).unwrap();
        assert!(store.mark_drift_seen("d-1", Utc::now()).unwrap());

        let mut updated = drift("d-1", 75.0);
        updated.new_value = 0.9;
        store.upsert_drift_page(&[updated]).unwrap();

        let alerts = store.list_drift_alerts(&DriftFilter::default()).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].drift_percentage, 75.0);
        assert_eq!(alerts[0].new_value, 0.6);
        assert!(alerts[0].seen_at.is_some());
    }

    #[test]
    fn test_unseen_filter() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_drift_page(&[drift("d-1", 10.0), drift("d-2", 20.0)]).unwrap();
        store.mark_drift_seen("d-1", Utc::now()).unwrap();

        let unseen = store
            .list_drift_alerts(&DriftFilter { unseen_only: true, ..Default::default() })
            .unwrap();
        assert_eq!(unseen.len(), 1);
        assert_eq!(unseen[0].alert_id, "d-2");
        assert!(!store.mark_drift_seen("nope", Utc::now()).unwrap());
    }

    #[test]
    fn test_evidence_ordering_and_limit() {
        let store = SqliteStore::open_in_memory().unwrap();
        let items: Vec<Evidence> = (0..5)
            .map(|i| Evidence {
                evidence_id: format!("e-{}", i),
                global_company_id: "c-1".into(),
                evidence_type: EvidenceType::Article,
                title: format!("Story {}", i),
                preview: "...".into(),
                source_url: None,
                source_name: None,
                relevance_score: None,
                created_at: format!("2024-03-0{}T10:00:00Z", i + 1),
                extracted_at: None,
            })
            .collect();
        store.upsert_evidence_page(&items).unwrap();
        store.upsert_evidence_page(&items).unwrap();

        let recent = store.get_company_evidence("c-1", 3).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].evidence_id, "e-4");
        assert_eq!(store.count_rows("evidence").unwrap(), 5);
    }

    #[test]
    fn test_recently_synced_skips_old_and_tombstoned() {
        let store = SqliteStore::open_in_memory().unwrap();
        let now = Utc::now();
        store
            .upsert_company_page(&[record(fixtures::company("old", "Old", 0.5))], now - Duration::hours(3))
            .unwrap();
        let mut gone = fixtures::company("gone", "Gone", 0.5);
        gone.is_active = false;
        gone.tombstone_at = Some("2024-02-01T00:00:00Z".into());
        store
            .upsert_company_page(
                &[record(fixtures::company("new", "New", 0.5)), record(gone)],
                now,
            )
            .unwrap();

        let ids = store
            .recently_synced_company_ids(now - Duration::hours(1), 100)
            .unwrap();
        assert_eq!(ids, vec!["new".to_string()]);
    }

    fn run(id: &str, status: RunStatus, scored: i64) -> ScoringRun {
        ScoringRun {
            run_id: id.into(),
            started_at: "2024-03-01T09:00:00Z".into(),
            completed_at: None,
            companies_scored: scored,
            avg_confidence: 0.8,
            norm_context_version: "norm-v3".into(),
            status,
            error_message: None,
        }
    }

    #[test]
    fn test_run_upsert_overwrites_every_field() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_run_page(&[run("r-1", RunStatus::Running, 10)]).unwrap();

        let mut finished = run("r-1", RunStatus::Failed, 250);
        finished.completed_at = Some("2024-03-01T09:30:00Z".into());
        finished.avg_confidence = 0.65;
        finished.norm_context_version = "norm-v4".into();
        finished.error_message = Some("scorer crashed".into());
        store.upsert_run_page(&[finished.clone()]).unwrap();

        let runs = store.list_scoring_runs(10).unwrap();
        assert_eq!(runs, vec![finished]);
    }

    #[test]
    fn test_stats_upsert_keyed_by_name() {
        let store = SqliteStore::open_in_memory().unwrap();
        let stat = |name: &str, value: f64, at: &str| ServiceStats {
            stat_name: name.into(),
            stat_value: value,
            unit: Some("count".into()),
            measured_at: at.into(),
        };
        store
            .upsert_stats_page(&[
                stat("companies_total", 100.0, "2024-03-01T00:00:00Z"),
                stat("runs_total", 3.0, "2024-03-01T00:00:00Z"),
            ])
            .unwrap();
        store
            .upsert_stats_page(&[stat("companies_total", 140.0, "2024-03-02T00:00:00Z")])
            .unwrap();

        let stats = store.list_service_stats().unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].stat_name, "companies_total");
        assert_eq!(stats[0].stat_value, 140.0);
        assert_eq!(stats[0].measured_at, "2024-03-02T00:00:00Z");
        assert_eq!(stats[1].stat_value, 3.0);
    }
}
