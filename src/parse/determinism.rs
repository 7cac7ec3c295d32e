//! Determinism check - the gate for showing a company's scores as trustworthy
//!
//! Independent of the full contract: a record can be well-formed and still
//! fail here if an upstream producer dropped part of the scoring bundle.

use crate::catalog::Company;
use serde_json::Value;

/// Fields that together make a score reproducible
pub const DETERMINISM_FIELDS: [&str; 9] = [
    "norm_context_version",
    "checksum",
    "final_score",
    "d_score",
    "o_score",
    "i_score",
    "m_score",
    "b_score",
    "confidence_score",
];

/// All bundle fields present and non-empty on a typed company
pub fn validate_determinism_fields(company: &Company) -> bool {
    !company.norm_context_version.trim().is_empty()
        && !company.checksum.trim().is_empty()
        && company.scores().iter().all(|(_, score)| score.is_finite())
        && company.confidence_score.is_finite()
}

/// All bundle fields present and non-empty on a raw payload
pub fn has_determinism_bundle(raw: &Value) -> bool {
    DETERMINISM_FIELDS.iter().all(|field| match raw.get(field) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Number(_)) => true,
        Some(_) => false,
    })
}
