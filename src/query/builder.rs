//! Search predicate builder
//!
//! Filters become a list of predicates, each tagged with the dimension it
//! constrains. The full list drives the result page; a facet's counts use
//! the list minus that facet's own dimension.

use super::{SearchOptions, MAX_SEARCH_LIMIT};
use crate::facet::{FacetType, RiskLevel};
use crate::storage::ACTIVE_COMPANY;
use crate::{Error, Result};
use rusqlite::types::Value;

/// What a predicate constrains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Active,
    Text,
    Region,
    Industry,
    Score,
    Employees,
    Risk,
    Trusted,
}

impl Dimension {
    /// The filter dimension a facet ignores when counting
    pub fn of_facet(facet: FacetType) -> Self {
        match facet {
            FacetType::Region => Dimension::Region,
            FacetType::Industry => Dimension::Industry,
            FacetType::ScoreRange => Dimension::Score,
            FacetType::EmployeeCount => Dimension::Employees,
            FacetType::RiskLevel => Dimension::Risk,
        }
    }
}

#[derive(Debug, Clone)]
struct Predicate {
    dimension: Dimension,
    sql: String,
    params: Vec<Value>,
}

/// A parameterized WHERE clause
#[derive(Debug, Clone)]
pub struct WhereClause {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    predicates: Vec<Predicate>,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// FTS5 match expression: every term as a quoted prefix, implicitly ANDed.
/// `None` when the text has no searchable terms.
pub fn fts_match_expression(text: &str) -> Option<String> {
    let terms: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{}\"*", t.to_lowercase()))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn check_unit(name: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if !v.is_finite() || !(0.0..=1.0).contains(&v) => {
            Err(Error::InvalidFilter(format!("{} must be within [0, 1], got {}", name, v)))
        }
        _ => Ok(()),
    }
}

fn check_values(name: &str, values: &[String]) -> Result<()> {
    if values.iter().any(|v| v.trim().is_empty()) {
        return Err(Error::InvalidFilter(format!("{} must not contain empty values", name)));
    }
    Ok(())
}

impl QueryBuilder {
    /// Builder that already restricts to active, non-tombstoned companies
    pub fn new() -> Self {
        Self {
            predicates: vec![Predicate {
                dimension: Dimension::Active,
                sql: ACTIVE_COMPANY.to_string(),
                params: Vec::new(),
            }],
        }
    }

    pub fn push(&mut self, dimension: Dimension, sql: impl Into<String>, params: Vec<Value>) {
        self.predicates.push(Predicate {
            dimension,
            sql: sql.into(),
            params,
        });
    }

    pub fn has(&self, dimension: Dimension) -> bool {
        self.predicates.iter().any(|p| p.dimension == dimension)
    }

    fn build(&self, skip: Option<Dimension>) -> WhereClause {
        let mut parts = Vec::new();
        let mut params = Vec::new();
        for predicate in &self.predicates {
            if Some(predicate.dimension) == skip {
                continue;
            }
            parts.push(format!("({})", predicate.sql));
            params.extend(predicate.params.iter().cloned());
        }
        WhereClause {
            sql: parts.join(" AND "),
            params,
        }
    }

    pub fn where_clause(&self) -> WhereClause {
        self.build(None)
    }

    /// Every predicate except those on `dimension`
    pub fn where_excluding(&self, dimension: Dimension) -> WhereClause {
        self.build(Some(dimension))
    }

    /// Validate `options` and translate them into predicates
    pub fn from_options(options: &SearchOptions) -> Result<Self> {
        check_unit("score_min", options.score_min)?;
        check_unit("score_max", options.score_max)?;
        if let (Some(min), Some(max)) = (options.score_min, options.score_max) {
            if min > max {
                return Err(Error::InvalidFilter(format!("score_min {} exceeds score_max {}", min, max)));
            }
        }
        if options.employee_min.is_some_and(|n| n < 0) || options.employee_max.is_some_and(|n| n < 0) {
            return Err(Error::InvalidFilter("employee range must be non-negative".to_string()));
        }
        if let (Some(min), Some(max)) = (options.employee_min, options.employee_max) {
            if min > max {
                return Err(Error::InvalidFilter(format!("employee_min {} exceeds employee_max {}", min, max)));
            }
        }
        if let Some(limit) = options.limit {
            if limit == 0 || limit > MAX_SEARCH_LIMIT {
                return Err(Error::InvalidFilter(format!(
                    "limit must be between 1 and {}, got {}",
                    MAX_SEARCH_LIMIT, limit
                )));
            }
        }
        check_values("regions", &options.regions)?;
        check_values("industries", &options.industries)?;

        let mut builder = Self::new();

        if let Some(expr) = options.query.as_deref().and_then(fts_match_expression) {
            builder.push(
                Dimension::Text,
                "companies.id IN (SELECT rowid FROM companies_fts WHERE companies_fts MATCH ?)
                 OR global_company_id IN (
                     SELECT a.global_company_id FROM company_aliases a
                     WHERE a.id IN (SELECT rowid FROM aliases_fts WHERE aliases_fts MATCH ?))",
                vec![Value::Text(expr.clone()), Value::Text(expr)],
            );
        }

        if !options.regions.is_empty() {
            builder.push(
                Dimension::Region,
                format!("region IN ({})", placeholders(options.regions.len())),
                options.regions.iter().cloned().map(Value::Text).collect(),
            );
        }
        if !options.industries.is_empty() {
            builder.push(
                Dimension::Industry,
                format!("industry IN ({})", placeholders(options.industries.len())),
                options.industries.iter().cloned().map(Value::Text).collect(),
            );
        }

        if let Some(min) = options.score_min {
            builder.push(Dimension::Score, "final_score >= ?", vec![Value::Real(min)]);
        }
        if let Some(max) = options.score_max {
            builder.push(Dimension::Score, "final_score <= ?", vec![Value::Real(max)]);
        }

        if let Some(min) = options.employee_min {
            builder.push(Dimension::Employees, "employee_count >= ?", vec![Value::Integer(min)]);
        }
        if let Some(max) = options.employee_max {
            builder.push(Dimension::Employees, "employee_count <= ?", vec![Value::Integer(max)]);
        }

        if !options.risk_levels.is_empty() {
            let mut levels: Vec<RiskLevel> = options.risk_levels.clone();
            levels.sort();
            levels.dedup();
            let mut parts = Vec::new();
            let mut params = Vec::new();
            for level in levels {
                let (sql, bounds) = level.bounds().sql_predicate("risk_score");
                parts.push(format!("({})", sql));
                params.extend(bounds.into_iter().map(Value::Real));
            }
            builder.push(Dimension::Risk, parts.join(" OR "), params);
        }

        if options.trusted_only {
            builder.push(
                Dimension::Trusted,
                "trim(norm_context_version) <> '' AND trim(checksum) <> ''",
                Vec::new(),
            );
        }

        Ok(builder)
    }
}
