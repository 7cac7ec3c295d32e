//! Per-entity schema contracts

use super::rules::Rules;
use super::ValidationError;
use crate::catalog::{
    Company, CompanyAlias, DriftAlert, Evidence, ScoringRun, ServiceStats,
    EVIDENCE_PREVIEW_MAX_CHARS,
};
use crate::workspace::{
    SearchHistory, WorkspaceBookmark, WorkspaceComparison, WorkspaceNote,
    MIN_COMPARISON_COMPANIES,
};
use serde::de::DeserializeOwned;

type Check = std::result::Result<(), ValidationError>;

/// Schema contract for a record type.
///
/// Shape (required keys, JSON types, enum tags) is enforced by serde during
/// decoding; `validate` covers the value-level rules serde cannot express.
pub trait Contract: DeserializeOwned {
    /// Entity name used in validation errors
    const ENTITY: &'static str;

    fn validate(&self) -> Check;

    /// Upstream quirks fixed before validation
    fn normalize(&mut self) {}
}

impl Contract for Company {
    const ENTITY: &'static str = "company";

    fn validate(&self) -> Check {
        let r = Rules::new(Self::ENTITY);
        r.non_empty("global_company_id", &self.global_company_id)?;
        r.non_empty("dataset_version", &self.dataset_version)?;
        r.non_empty("name", &self.name)?;
        r.country_code("country_code", self.country_code.as_deref())?;
        if let Some(count) = self.employee_count {
            if count < 0 {
                return Err(r.fail("employee_count", "must be non-negative"));
            }
        }
        r.optional_non_negative("revenue_estimate", self.revenue_estimate)?;
        for (field, score) in self.scores() {
            r.unit_score(field, score)?;
        }
        r.unit_score("confidence_score", self.confidence_score)?;
        r.non_empty("norm_context_version", &self.norm_context_version)?;
        r.non_empty("checksum", &self.checksum)?;
        r.optional_unit_score("risk_score", self.risk_score)?;
        r.optional_unit_score("feasibility_score", self.feasibility_score)?;
        r.iso_datetime("created_at", &self.created_at)?;
        r.iso_datetime("updated_at", &self.updated_at)?;
        r.optional_iso_datetime("synced_at", self.synced_at.as_deref())?;
        r.optional_iso_datetime("tombstone_at", self.tombstone_at.as_deref())
    }

    fn normalize(&mut self) {
        // A tombstone always implies inactive
        if self.tombstone_at.is_some() {
            self.is_active = false;
        }
    }
}

impl Contract for CompanyAlias {
    const ENTITY: &'static str = "company_alias";

    fn validate(&self) -> Check {
        let r = Rules::new(Self::ENTITY);
        r.non_empty("alias_id", &self.alias_id)?;
        r.non_empty("global_company_id", &self.global_company_id)?;
        r.non_empty("alias", &self.alias)?;
        r.iso_datetime("created_at", &self.created_at)
    }
}

impl Contract for Evidence {
    const ENTITY: &'static str = "evidence";

    fn validate(&self) -> Check {
        let r = Rules::new(Self::ENTITY);
        r.non_empty("evidence_id", &self.evidence_id)?;
        r.non_empty("global_company_id", &self.global_company_id)?;
        r.non_empty("title", &self.title)?;
        r.non_empty("preview", &self.preview)?;
        r.max_chars("preview", &self.preview, EVIDENCE_PREVIEW_MAX_CHARS)?;
        r.optional_url("source_url", self.source_url.as_deref())?;
        r.optional_unit_score("relevance_score", self.relevance_score)?;
        r.iso_datetime("created_at", &self.created_at)?;
        r.optional_iso_datetime("extracted_at", self.extracted_at.as_deref())
    }

    fn normalize(&mut self) {
        self.truncate_preview();
    }
}

impl Contract for DriftAlert {
    const ENTITY: &'static str = "drift_alert";

    fn validate(&self) -> Check {
        let r = Rules::new(Self::ENTITY);
        r.non_empty("alert_id", &self.alert_id)?;
        r.non_empty("global_company_id", &self.global_company_id)?;
        r.unit_score("old_value", self.old_value)?;
        r.unit_score("new_value", self.new_value)?;
        r.finite("drift_percentage", self.drift_percentage)?;
        r.iso_datetime("detected_at", &self.detected_at)?;
        r.non_empty("run_id", &self.run_id)?;
        r.optional_iso_datetime("seen_at", self.seen_at.as_deref())
    }
}

impl Contract for ScoringRun {
    const ENTITY: &'static str = "scoring_run";

    fn validate(&self) -> Check {
        let r = Rules::new(Self::ENTITY);
        r.non_empty("run_id", &self.run_id)?;
        r.iso_datetime("started_at", &self.started_at)?;
        r.optional_iso_datetime("completed_at", self.completed_at.as_deref())?;
        if self.companies_scored < 0 {
            return Err(r.fail("companies_scored", "must be non-negative"));
        }
        r.unit_score("avg_confidence", self.avg_confidence)?;
        r.non_empty("norm_context_version", &self.norm_context_version)
    }
}

impl Contract for ServiceStats {
    const ENTITY: &'static str = "service_stats";

    fn validate(&self) -> Check {
        let r = Rules::new(Self::ENTITY);
        r.non_empty("stat_name", &self.stat_name)?;
        r.finite("stat_value", self.stat_value)?;
        r.iso_datetime("measured_at", &self.measured_at)
    }
}

impl Contract for WorkspaceBookmark {
    const ENTITY: &'static str = "workspace_bookmark";

    fn validate(&self) -> Check {
        let r = Rules::new(Self::ENTITY);
        r.non_empty("user_id", &self.user_id)?;
        r.optional_non_empty("org_id", self.org_id.as_deref())?;
        r.non_empty("global_company_id", &self.global_company_id)?;
        r.iso_datetime("created_at", &self.created_at)?;
        r.iso_datetime("updated_at", &self.updated_at)
    }
}

impl Contract for WorkspaceComparison {
    const ENTITY: &'static str = "workspace_comparison";

    fn validate(&self) -> Check {
        let r = Rules::new(Self::ENTITY);
        r.uuid("comparison_id", &self.comparison_id)?;
        r.non_empty("user_id", &self.user_id)?;
        r.optional_non_empty("org_id", self.org_id.as_deref())?;
        r.non_empty("name", &self.name)?;
        r.min_items("company_ids", &self.company_ids, MIN_COMPARISON_COMPANIES)?;
        for id in &self.company_ids {
            r.non_empty("company_ids", id)?;
        }
        r.iso_datetime("created_at", &self.created_at)?;
        r.iso_datetime("updated_at", &self.updated_at)
    }
}

impl Contract for WorkspaceNote {
    const ENTITY: &'static str = "workspace_note";

    fn validate(&self) -> Check {
        let r = Rules::new(Self::ENTITY);
        r.uuid("note_id", &self.note_id)?;
        r.non_empty("user_id", &self.user_id)?;
        r.optional_non_empty("org_id", self.org_id.as_deref())?;
        r.non_empty("global_company_id", &self.global_company_id)?;
        r.non_empty("content", &self.content)?;
        r.iso_datetime("created_at", &self.created_at)?;
        r.iso_datetime("updated_at", &self.updated_at)
    }
}

impl Contract for SearchHistory {
    const ENTITY: &'static str = "search_history";

    fn validate(&self) -> Check {
        let r = Rules::new(Self::ENTITY);
        r.uuid("search_id", &self.search_id)?;
        r.non_empty("user_id", &self.user_id)?;
        r.optional_non_empty("org_id", self.org_id.as_deref())?;
        if let Some(filters) = &self.filters {
            if !filters.is_object() {
                return Err(r.fail("filters", "must be an object"));
            }
        }
        r.iso_datetime("executed_at", &self.executed_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures;
    use crate::parse::{parse_strict, validate_strict};
    use serde_json::json;

    #[test]
    fn test_company_contract_accepts_fixture() {
        assert!(validate_strict(&fixtures::company("c-1", "Acme", 0.8)).is_ok());
    }

    #[test]
    fn test_company_contract_rejects_country_code() {
        let mut company = fixtures::company("c-1", "Acme", 0.8);
        company.country_code = Some("USA".to_string());
        assert_eq!(validate_strict(&company).unwrap_err().field, "country_code");
    }

    #[test]
    fn test_tombstone_forces_inactive() {
        let mut value = fixtures::company_json("c-1", "Acme", 0.8);
        value["tombstone_at"] = json!("2024-06-01T00:00:00Z");
        value["is_active"] = json!(true);
        let company: Company = parse_strict(value).unwrap();
        assert!(!company.is_active);
    }

    #[test]
    fn test_evidence_long_preview_is_truncated_not_rejected() {
        let value = json!({
            "evidence_id": "e-1",
            "global_company_id": "c-1",
            "type": "report",
            "title": "Quarterly",
            "preview": "x".repeat(900),
            "source_url": "https://example.com/q3",
            "created_at": "2024-03-01T10:00:00Z"
        });
        let evidence: Evidence = parse_strict(value).unwrap();
        assert_eq!(evidence.preview.len(), EVIDENCE_PREVIEW_MAX_CHARS);
    }

    #[test]
    fn test_evidence_rejects_relative_url() {
        let value = json!({
            "evidence_id": "e-1",
            "global_company_id": "c-1",
            "type": "report",
            "title": "Quarterly",
            "preview": "text",
            "source_url": "/reports/q3",
            "created_at": "2024-03-01T10:00:00Z"
        });
        let err = parse_strict::<Evidence>(value).unwrap_err();
        assert_eq!(err.field, "source_url");
    }

    #[test]
    fn test_comparison_needs_two_companies() {
        let comparison = WorkspaceComparison {
            comparison_id: uuid::Uuid::new_v4().to_string(),
            user_id: "u-1".into(),
            org_id: None,
            name: "Shortlist".into(),
            company_ids: vec!["c-1".into()],
            created_at: "2024-01-01T00:00:00Z".into(),
            updated_at: "2024-01-01T00:00:00Z".into(),
        };
        assert_eq!(validate_strict(&comparison).unwrap_err().field, "company_ids");
    }

    #[test]
    fn test_note_requires_uuid() {
        let note = WorkspaceNote {
            note_id: "note-1".into(),
            user_id: "u-1".into(),
            org_id: None,
            global_company_id: "c-1".into(),
            content: "Call back".into(),
            created_at: "2024-01-01T00:00:00Z".into(),
            updated_at: "2024-01-01T00:00:00Z".into(),
        };
        assert_eq!(validate_strict(&note).unwrap_err().field, "note_id");
    }

    #[test]
    fn test_drift_alert_value_bounds() {
        let value = json!({
            "alert_id": "d-1",
            "global_company_id": "c-1",
            "metric": "o_score",
            "old_value": 0.4,
            "new_value": 1.2,
            "drift_percentage": 200.0,
            "detected_at": "2024-03-01T10:00:00Z",
            "run_id": "r-1"
        });
        assert_eq!(parse_strict::<DriftAlert>(value).unwrap_err().field, "new_value");
    }
}
