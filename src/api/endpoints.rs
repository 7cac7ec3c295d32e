//! Catalog endpoints and the `CatalogApi` seam used by the sync engine

use super::client::{ClientConfig, HttpClient};
use crate::sync_state::ResourceType;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Server-side filters forwarded on list requests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogFilters {
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub score_min: Option<f64>,
    #[serde(default)]
    pub score_max: Option<f64>,
}

/// Request parameters for one page of a resource
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListParams {
    pub cursor: Option<String>,
    /// Sent as `If-None-Match`
    pub etag: Option<String>,
    /// Only records changed since this instant (ISO-8601)
    pub since: Option<String>,
    pub filters: CatalogFilters,
    pub limit: Option<u32>,
    /// Required for evidence
    pub company_id: Option<String>,
}

/// One page of raw records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    pub next_cursor: Option<String>,
    pub etag: Option<String>,
    /// The server answered 304; `items` is empty and nothing changed
    pub not_modified: bool,
    pub total: Option<u64>,
}

impl Page {
    pub fn not_modified(etag: Option<String>) -> Self {
        Self {
            etag,
            not_modified: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self.status.as_str(), "ok" | "healthy")
    }
}

/// Path and envelope key for each remote resource
pub fn endpoint(resource: ResourceType) -> Option<(&'static str, &'static str)> {
    match resource {
        ResourceType::Companies => Some(("/v1/catalog/companies", "companies")),
        ResourceType::Evidence => Some(("/v1/catalog/evidence", "evidence")),
        ResourceType::Drift => Some(("/v1/catalog/drift", "alerts")),
        ResourceType::Runs => Some(("/v1/catalog/runs", "runs")),
        ResourceType::Stats => Some(("/v1/catalog/stats", "stats")),
        // Scores arrive inside company payloads
        ResourceType::Scores => None,
    }
}

/// Query string for a list request. `since` is `updated_since` everywhere except drift.
pub fn query_pairs(resource: ResourceType, params: &ListParams) -> Vec<(String, String)> {
    let mut query = Vec::new();
    if let Some(cursor) = &params.cursor {
        query.push(("cursor".to_string(), cursor.clone()));
    }
    if let Some(since) = &params.since {
        let key = if resource == ResourceType::Drift { "since" } else { "updated_since" };
        query.push((key.to_string(), since.clone()));
    }
    if let Some(limit) = params.limit {
        query.push(("limit".to_string(), limit.to_string()));
    }
    if let Some(company_id) = &params.company_id {
        query.push(("company_id".to_string(), company_id.clone()));
    }
    for region in &params.filters.regions {
        query.push(("region".to_string(), region.clone()));
    }
    for industry in &params.filters.industries {
        query.push(("industry".to_string(), industry.clone()));
    }
    if let Some(min) = params.filters.score_min {
        query.push(("score_min".to_string(), min.to_string()));
    }
    if let Some(max) = params.filters.score_max {
        query.push(("score_max".to_string(), max.to_string()));
    }
    query
}

/// Remote catalog as seen by the sync engine
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Fetch one page of `resource`
    async fn fetch_page(&self, resource: ResourceType, params: &ListParams) -> Result<Page>;

    async fn health(&self) -> Result<HealthStatus>;
}

/// `CatalogApi` over HTTP
#[derive(Debug, Clone)]
pub struct HttpCatalogApi {
    http: HttpClient,
}

impl HttpCatalogApi {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(config)?,
        })
    }
}

fn take_items(body: &mut Value, key: &str, path: &str) -> Result<Vec<Value>> {
    match body.get_mut(key).map(Value::take) {
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(Error::Decode(format!(
            "GET {}: expected array at `{}`, got {}",
            path, key, other
        ))),
        None => Err(Error::Decode(format!("GET {}: missing `{}`", path, key))),
    }
}

#[async_trait]
impl CatalogApi for HttpCatalogApi {
    async fn fetch_page(&self, resource: ResourceType, params: &ListParams) -> Result<Page> {
        let (path, key) = endpoint(resource)
            .ok_or_else(|| Error::Config(format!("no remote endpoint for {}", resource)))?;
        if resource == ResourceType::Evidence && params.company_id.is_none() {
            return Err(Error::InvalidFilter("evidence requests need a company_id".to_string()));
        }

        let query = query_pairs(resource, params);
        let raw = self.http.get(path, &query, params.etag.as_deref()).await?;
        if raw.not_modified {
            return Ok(Page::not_modified(raw.etag));
        }

        let mut body = raw.body.unwrap_or(Value::Null);
        let items = take_items(&mut body, key, path)?;
        let next_cursor = raw.next_cursor.or_else(|| {
            body.get("next_cursor")
                .and_then(Value::as_str)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
        });

        Ok(Page {
            items,
            next_cursor,
            etag: raw.etag,
            not_modified: false,
            total: body.get("total").and_then(Value::as_u64),
        })
    }

    async fn health(&self) -> Result<HealthStatus> {
        let raw = self.http.get("/health", &[], None).await?;
        let body = raw
            .body
            .ok_or_else(|| Error::Decode("GET /health: empty body".to_string()))?;
        Ok(serde_json::from_value(body)?)
    }
}
