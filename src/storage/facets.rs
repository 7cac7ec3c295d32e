//! Facet operations - materialized buckets and shared counting

use super::catalog::parse_column;
use super::{timestamp, SqliteStore, ACTIVE_COMPANY};
use crate::facet::{FacetBucket, FacetCount, FacetType};
use crate::Result;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

/// Result of a full facet rebuild
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetRebuild {
    pub buckets: u64,
    /// `None` when there were no active companies to aggregate
    pub dataset_version: Option<String>,
}

/// Count companies per bucket of `facet` among rows matching `filter_sql`.
///
/// Range facets always yield every fixed bucket, zero counts included.
/// Categorical facets yield one entry per non-null value, largest first.
pub(crate) fn facet_counts(
    conn: &Connection,
    facet: FacetType,
    filter_sql: &str,
    args: &[Value],
) -> Result<Vec<FacetCount>> {
    let column = facet.column();
    match facet.buckets() {
        Some(buckets) => {
            let mut counts = Vec::with_capacity(buckets.len());
            for bucket in buckets {
                let (predicate, bounds) = bucket.range.sql_predicate(column);
                let sql = format!(
                    "SELECT COUNT(*) FROM companies WHERE {} AND {} IS NOT NULL AND {}",
                    filter_sql, column, predicate
                );
                let mut bound_args = args.to_vec();
                bound_args.extend(bounds.into_iter().map(Value::Real));
                let count: i64 =
                    conn.query_row(&sql, params_from_iter(bound_args.iter()), |row| row.get(0))?;
                counts.push(FacetCount {
                    bucket_value: bucket.label.to_string(),
                    count: count as u64,
                });
            }
            Ok(counts)
        }
        None => {
            let sql = format!(
                "SELECT {col}, COUNT(*) AS n FROM companies WHERE {filter} AND {col} IS NOT NULL
                 GROUP BY {col} ORDER BY n DESC, {col} ASC",
                col = column,
                filter = filter_sql
            );
            let mut stmt = conn.prepare(&sql)?;
            let counts = stmt
                .query_map(params_from_iter(args.iter()), |row| {
                    let count: i64 = row.get(1)?;
                    Ok(FacetCount {
                        bucket_value: row.get(0)?,
                        count: count as u64,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(counts)
        }
    }
}

impl SqliteStore {
    // ========== Facet Operations ==========

    /// Replace every materialized bucket with fresh counts over active companies.
    /// Runs as one transaction; rebuilding twice over unchanged data is a no-op.
    pub fn rebuild_facets(&self, updated_at: DateTime<Utc>) -> Result<FacetRebuild> {
        let stamp = timestamp(updated_at);
        self.transaction(|tx| {
            tx.execute("DELETE FROM facet_buckets", [])?;

            let version_sql = format!("SELECT MAX(dataset_version) FROM companies WHERE {}", ACTIVE_COMPANY);
            let dataset_version: Option<String> = tx
                .query_row(&version_sql, [], |row| row.get(0))
                .optional()?
                .flatten();
            let Some(version) = dataset_version else {
                return Ok(FacetRebuild { buckets: 0, dataset_version: None });
            };

            let mut buckets = 0;
            let mut insert = tx.prepare_cached(
                "INSERT INTO facet_buckets (facet_type, bucket_value, count, dataset_version, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for facet in FacetType::all() {
                for count in facet_counts(tx, *facet, ACTIVE_COMPANY, &[])? {
                    insert.execute(params![
                        facet.as_str(),
                        count.bucket_value,
                        count.count as i64,
                        version,
                        stamp,
                    ])?;
                    buckets += 1;
                }
            }

            Ok(FacetRebuild { buckets, dataset_version: Some(version) })
        })
    }

    /// Materialized buckets, optionally restricted to one facet type
    pub fn materialized_facets(&self, facet: Option<FacetType>) -> Result<Vec<FacetBucket>> {
        let mut stmt = self.conn().prepare(
            "SELECT facet_type, bucket_value, count, dataset_version, updated_at
             FROM facet_buckets
             WHERE ?1 IS NULL OR facet_type = ?1
             ORDER BY facet_type, count DESC, bucket_value",
        )?;
        let buckets = stmt
            .query_map([facet.map(|f| f.as_str())], |row| {
                let count: i64 = row.get(2)?;
                Ok(FacetBucket {
                    facet_type: parse_column(row, 0)?,
                    bucket_value: row.get(1)?,
                    count: count as u64,
                    dataset_version: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(buckets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures;
    use crate::parse::CompanyRecord;

    fn seed(store: &SqliteStore) {
        let mut rows = Vec::new();
        for (i, (region, industry, score, employees)) in [
            ("west", "software", 0.1, Some(5)),
            ("west", "software", 0.85, Some(40)),
            ("east", "retail", 1.0, Some(5000)),
            ("east", "software", 0.45, None),
        ]
        .into_iter()
        .enumerate()
        {
            let mut company = fixtures::company(&format!("c-{}", i), "Co", score);
            company.region = Some(region.into());
            company.industry = Some(industry.into());
            company.employee_count = employees;
            company.risk_score = Some(score);
            rows.push(CompanyRecord { company, aliases: None, rejected_aliases: 0 });
        }
        let mut gone = fixtures::company("c-dead", "Dead", 0.9);
        gone.region = Some("north".into());
        gone.is_active = false;
        gone.tombstone_at = Some("2024-02-01T00:00:00Z".into());
        rows.push(CompanyRecord { company: gone, aliases: None, rejected_aliases: 0 });
        store.upsert_company_page(&rows, Utc::now()).unwrap();
    }

    fn count_of(buckets: &[FacetBucket], value: &str) -> u64 {
        buckets.iter().find(|b| b.bucket_value == value).map(|b| b.count).unwrap_or(0)
    }

    #[test]
    fn test_rebuild_counts_active_rows_only() {
        let store = SqliteStore::open_in_memory().unwrap();
        seed(&store);
        let rebuild = store.rebuild_facets(Utc::now()).unwrap();
        assert_eq!(rebuild.dataset_version.as_deref(), Some("2024.1"));

        let regions = store.materialized_facets(Some(FacetType::Region)).unwrap();
        assert_eq!(count_of(&regions, "west"), 2);
        assert_eq!(count_of(&regions, "east"), 2);
        assert_eq!(count_of(&regions, "north"), 0);

        let scores = store.materialized_facets(Some(FacetType::ScoreRange)).unwrap();
        assert_eq!(scores.len(), 5);
        assert_eq!(scores.iter().map(|b| b.count).sum::<u64>(), 4);
        assert_eq!(count_of(&scores, "80-100"), 2);

        let bands = store.materialized_facets(Some(FacetType::EmployeeCount)).unwrap();
        assert_eq!(count_of(&bands, "0-10"), 1);
        assert_eq!(count_of(&bands, "1000+"), 1);
    }

    #[test]
    fn test_zero_employees_counted_in_first_band() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut company = fixtures::company("c-solo", "Solo", 0.5);
        company.employee_count = Some(0);
        store
            .upsert_company_page(&[CompanyRecord { company, aliases: None, rejected_aliases: 0 }], Utc::now())
            .unwrap();
        store.rebuild_facets(Utc::now()).unwrap();

        let bands = store.materialized_facets(Some(FacetType::EmployeeCount)).unwrap();
        assert_eq!(count_of(&bands, "0-10"), 1);
        assert_eq!(bands.iter().map(|b| b.count).sum::<u64>(), 1);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        seed(&store);
        let now = Utc::now();
        store.rebuild_facets(now).unwrap();
        let first = store.materialized_facets(None).unwrap();
        store.rebuild_facets(now).unwrap();
        assert_eq!(first, store.materialized_facets(None).unwrap());
    }

    #[test]
    fn test_rebuild_on_empty_catalog() {
        let store = SqliteStore::open_in_memory().unwrap();
        let rebuild = store.rebuild_facets(Utc::now()).unwrap();
        assert_eq!(rebuild.buckets, 0);
        assert!(store.materialized_facets(None).unwrap().is_empty());
    }
}
