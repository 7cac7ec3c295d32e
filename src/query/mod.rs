//! Query Engine - local reads and overlay writes
//!
//! - Filtered full-text search with per-dimension facet counts
//! - Company detail assembly
//! - Drift alert listing and acknowledgement
//! - Workspace overlays (bookmarks, notes, comparisons, search history)

pub mod builder;
pub mod engine;
pub mod workspace;

pub use builder::{Dimension, QueryBuilder, WhereClause};
pub use engine::QueryEngine;

use crate::catalog::{Company, CompanyAlias, DriftAlert, Evidence};
use crate::facet::{FacetCount, FacetType, RiskLevel};
use crate::workspace::WorkspaceNote;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_SEARCH_LIMIT: u32 = 20;
pub const MAX_SEARCH_LIMIT: u32 = 500;

/// Evidence previews included in a company detail
pub const DETAIL_EVIDENCE_LIMIT: u32 = 50;
/// Drift alerts included in a company detail
pub const DETAIL_DRIFT_LIMIT: u32 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Score,
    Name,
    Updated,
    /// Exact name match, then prefix match, then score
    #[default]
    Relevance,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Search request. Empty lists and `None` mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub query: Option<String>,
    pub regions: Vec<String>,
    pub industries: Vec<String>,
    pub score_min: Option<f64>,
    pub score_max: Option<f64>,
    pub employee_min: Option<i64>,
    pub employee_max: Option<i64>,
    pub risk_levels: Vec<RiskLevel>,
    /// Hide companies failing the determinism check
    pub trusted_only: bool,
    pub sort: SortField,
    pub order: SortOrder,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// One page of search results plus facets over the whole match set
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub companies: Vec<Company>,
    /// Matches across all pages
    pub total: u64,
    /// Each facet ignores its own filter dimension
    pub facets: BTreeMap<FacetType, Vec<FacetCount>>,
    pub limit: u32,
    pub offset: u32,
}

impl SearchResults {
    pub fn facet(&self, facet: FacetType) -> &[FacetCount] {
        self.facets.get(&facet).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn facet_count(&self, facet: FacetType, bucket: &str) -> u64 {
        self.facet(facet)
            .iter()
            .find(|c| c.bucket_value == bucket)
            .map_or(0, |c| c.count)
    }
}

/// Everything known locally about one company
#[derive(Debug, Clone, Serialize)]
pub struct CompanyDetail {
    pub company: Company,
    pub determinism_verified: bool,
    pub aliases: Vec<CompanyAlias>,
    /// Newest first
    pub evidence: Vec<Evidence>,
    /// Newest first
    pub drift_alerts: Vec<DriftAlert>,
    /// `None` without a user
    pub is_bookmarked: Option<bool>,
    pub notes: Vec<WorkspaceNote>,
}
