//! Catalog types - the read-only records synced from the remote catalog
//!
//! Every synced record maps onto one of these shapes:
//! - `Company`: the scored catalog entry, keyed by `global_company_id`
//! - `CompanyAlias`: alternate names used by text search
//! - `Evidence`: lightweight previews of supporting documents
//! - `DriftAlert`: score movements between scoring runs
//! - `ScoringRun`: upstream scoring batch metadata
//! - `ServiceStats`: upstream service counters

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Maximum number of characters of evidence content kept locally.
pub const EVIDENCE_PREVIEW_MAX_CHARS: usize = 500;

fn default_active() -> bool {
    true
}

/// A scored company from the universal catalog.
///
/// The client never edits these rows; they are replaced wholesale by sync
/// upserts and soft-deleted through `tombstone_at` + `is_active = false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub global_company_id: String,
    pub dataset_version: String,
    pub name: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub employee_count: Option<i64>,
    #[serde(default)]
    pub revenue_estimate: Option<f64>,

    // Determinism bundle
    pub final_score: f64,
    pub d_score: f64,
    pub o_score: f64,
    pub i_score: f64,
    pub m_score: f64,
    pub b_score: f64,
    pub confidence_score: f64,
    pub norm_context_version: String,
    pub checksum: String,

    #[serde(default)]
    pub risk_score: Option<f64>,
    #[serde(default)]
    pub feasibility_score: Option<f64>,

    pub created_at: String,
    pub updated_at: String,
    /// Local-only; refreshed on every upsert
    #[serde(default)]
    pub synced_at: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub tombstone_at: Option<String>,
}

impl Company {
    /// The six normalized scores, in storage order
    pub fn scores(&self) -> [(&'static str, f64); 6] {
        [
            ("final_score", self.final_score),
            ("d_score", self.d_score),
            ("o_score", self.o_score),
            ("i_score", self.i_score),
            ("m_score", self.m_score),
            ("b_score", self.b_score),
        ]
    }

    /// Whether this record carries a complete determinism bundle
    pub fn determinism_verified(&self) -> bool {
        crate::parse::validate_determinism_fields(self)
    }

    /// Soft-deleted rows stay in the store but drop out of search and facets
    pub fn is_tombstoned(&self) -> bool {
        !self.is_active || self.tombstone_at.is_some()
    }
}

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn all() -> &'static [$name] {
                &[$($name::$variant),+]
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(Error::Decode(format!(
                        "Unknown {}: {}",
                        stringify!($name),
                        s
                    ))),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }
    };
}

pub(crate) use string_enum;

string_enum! {
    /// How an alias relates to the company's primary name
    AliasType {
        Legal => "legal",
        Dba => "dba",
        Brand => "brand",
        Former => "former",
        Other => "other",
    }
}

string_enum! {
    /// Kind of document an evidence preview was extracted from
    EvidenceType {
        Article => "article",
        Report => "report",
        Filing => "filing",
        Website => "website",
        Social => "social",
        Other => "other",
    }
}

string_enum! {
    /// Score tracked by drift detection
    DriftMetric {
        DScore => "d_score",
        OScore => "o_score",
        IScore => "i_score",
        MScore => "m_score",
        BScore => "b_score",
        FinalScore => "final_score",
    }
}

string_enum! {
    /// Lifecycle of an upstream scoring run
    RunStatus {
        Running => "running",
        Completed => "completed",
        Failed => "failed",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyAlias {
    pub alias_id: String,
    pub global_company_id: String,
    pub alias: String,
    pub alias_type: AliasType,
    pub created_at: String,
}

/// Preview of a supporting document. Full content is never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub evidence_id: String,
    pub global_company_id: String,
    #[serde(rename = "type")]
    pub evidence_type: EvidenceType,
    pub title: String,
    pub preview: String,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub relevance_score: Option<f64>,
    pub created_at: String,
    #[serde(default)]
    pub extracted_at: Option<String>,
}

impl Evidence {
    /// Clamp the preview to `EVIDENCE_PREVIEW_MAX_CHARS`, cutting on a char boundary
    pub fn truncate_preview(&mut self) {
        if let Some((idx, _)) = self.preview.char_indices().nth(EVIDENCE_PREVIEW_MAX_CHARS) {
            self.preview.truncate(idx);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftAlert {
    pub alert_id: String,
    pub global_company_id: String,
    pub metric: DriftMetric,
    pub old_value: f64,
    pub new_value: f64,
    pub drift_percentage: f64,
    pub detected_at: String,
    pub run_id: String,
    /// Local-only acknowledgement timestamp
    #[serde(default)]
    pub seen_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRun {
    pub run_id: String,
    pub started_at: String,
    #[serde(default)]
    pub completed_at: Option<String>,
    pub companies_scored: i64,
    pub avg_confidence: f64,
    pub norm_context_version: String,
    pub status: RunStatus,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStats {
    pub stat_name: String,
    pub stat_value: f64,
    #[serde(default)]
    pub unit: Option<String>,
    pub measured_at: String,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn company(id: &str, name: &str, score: f64) -> Company {
        Company {
            global_company_id: id.to_string(),
            dataset_version: "2024.1".to_string(),
            name: name.to_string(),
            domain: None,
            postal_code: None,
            country_code: Some("US".to_string()),
            city: None,
            state: None,
            region: None,
            industry: None,
            sector: None,
            employee_count: None,
            revenue_estimate: None,
            final_score: score,
            d_score: 0.5,
            o_score: 0.5,
            i_score: 0.5,
            m_score: 0.5,
            b_score: 0.5,
            confidence_score: 0.9,
            norm_context_version: "norm-v3".to_string(),
            checksum: format!("sha256:{}", id),
            risk_score: None,
            feasibility_score: None,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-02T00:00:00Z".to_string(),
            synced_at: None,
            is_active: true,
            tombstone_at: None,
        }
    }

    pub fn company_json(id: &str, name: &str, score: f64) -> serde_json::Value {
        serde_json::to_value(company(id, name, score)).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_roundtrip() {
        for kind in DriftMetric::all() {
            let parsed: DriftMetric = kind.as_str().parse().unwrap();
            assert_eq!(*kind, parsed);
        }
        assert!(AliasType::from_str("nickname").is_err());
    }

    #[test]
    fn test_company_defaults_active() {
        let mut value = fixtures::company_json("c-1", "Acme", 0.4);
        value.as_object_mut().unwrap().remove("is_active");
        let company: Company = serde_json::from_value(value).unwrap();
        assert!(company.is_active);
        assert!(!company.is_tombstoned());
    }

    #[test]
    fn test_evidence_type_field_name() {
        let evidence: Evidence = serde_json::from_value(serde_json::json!({
            "evidence_id": "e-1",
            "global_company_id": "c-1",
            "type": "filing",
            "title": "10-K",
            "preview": "Annual report",
            "created_at": "2024-03-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(evidence.evidence_type, EvidenceType::Filing);
    }

    #[test]
    fn test_truncate_preview_on_char_boundary() {
        let mut evidence = Evidence {
            evidence_id: "e-1".into(),
            global_company_id: "c-1".into(),
            evidence_type: EvidenceType::Article,
            title: "t".into(),
            preview: "é".repeat(600),
            source_url: None,
            source_name: None,
            relevance_score: None,
            created_at: "2024-03-01T10:00:00Z".into(),
            extracted_at: None,
        };
        evidence.truncate_preview();
        assert_eq!(evidence.preview.chars().count(), EVIDENCE_PREVIEW_MAX_CHARS);
    }
}
