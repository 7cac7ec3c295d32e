//! Workspace overlay types - user-owned data layered over the catalog
//!
//! Overlay rows are owned by `(user_id, org_id?)` and never touched by sync.

use serde::{Deserialize, Serialize};

/// Minimum number of companies in a comparison
pub const MIN_COMPARISON_COMPANIES: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceBookmark {
    pub user_id: String,
    #[serde(default)]
    pub org_id: Option<String>,
    pub global_company_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceComparison {
    pub comparison_id: String,
    pub user_id: String,
    #[serde(default)]
    pub org_id: Option<String>,
    pub name: String,
    pub company_ids: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceNote {
    pub note_id: String,
    pub user_id: String,
    #[serde(default)]
    pub org_id: Option<String>,
    pub global_company_id: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHistory {
    pub search_id: String,
    pub user_id: String,
    #[serde(default)]
    pub org_id: Option<String>,
    pub query: String,
    #[serde(default)]
    pub filters: Option<serde_json::Value>,
    pub result_count: u64,
    pub executed_at: String,
}

/// Caller identity for overlay operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub user_id: String,
    pub org_id: Option<String>,
}

impl Owner {
    pub fn user(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), org_id: None }
    }

    pub fn with_org(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }
}
