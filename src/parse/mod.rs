//! Validation Layer - schema contracts for synced and overlay records
//!
//! Inbound payloads are decoded into their typed shape with serde and then
//! checked against the entity's contract. Two modes:
//! - strict: returns the first violation (locally authored writes)
//! - safe: logs and returns `None` (network data, so one bad record never
//!   aborts a batch)
//!
//! The determinism check is separate and only looks at the scoring bundle.

pub mod contracts;
pub mod determinism;
pub mod rules;

pub use contracts::Contract;
pub use determinism::{has_determinism_bundle, validate_determinism_fields};

use crate::catalog::{Company, CompanyAlias};
use serde_json::Value;

/// A record that broke its schema contract
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Invalid {entity}.{field}: {message}")]
pub struct ValidationError {
    pub entity: &'static str,
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(entity: &'static str, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            entity,
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Decode and validate, returning the first violation
pub fn parse_strict<T: Contract>(value: Value) -> std::result::Result<T, ValidationError> {
    let mut record: T = serde_json::from_value(value)
        .map_err(|e| ValidationError::new(T::ENTITY, "$", e.to_string()))?;
    record.normalize();
    record.validate()?;
    Ok(record)
}

/// Decode and validate, dropping the record on any violation
pub fn parse_safe<T: Contract>(value: Value) -> Option<T> {
    match parse_strict::<T>(value) {
        Ok(record) => Some(record),
        Err(err) => {
            tracing::warn!("Skipping malformed record: {}", err);
            None
        }
    }
}

/// Validate an already-typed record built locally
pub fn validate_strict<T: Contract>(record: &T) -> std::result::Result<(), ValidationError> {
    record.validate()
}

/// A company payload plus the aliases embedded in it
#[derive(Debug, Clone)]
pub struct CompanyRecord {
    pub company: Company,
    /// `None` when the payload carried no `aliases` key; existing aliases are kept
    pub aliases: Option<Vec<CompanyAlias>>,
    /// Embedded aliases that failed their contract
    pub rejected_aliases: usize,
}

/// Safe-parse a company payload together with its optional embedded `aliases`
pub fn parse_company_record(mut value: Value) -> Option<CompanyRecord> {
    let raw_aliases = value.as_object_mut().and_then(|obj| obj.remove("aliases"));
    let company = parse_safe::<Company>(value)?;

    let mut rejected_aliases = 0;
    let aliases = match raw_aliases {
        Some(Value::Array(items)) => {
            let mut parsed = Vec::with_capacity(items.len());
            for mut item in items {
                if let Some(obj) = item.as_object_mut() {
                    obj.entry("global_company_id")
                        .or_insert_with(|| Value::String(company.global_company_id.clone()));
                }
                match parse_safe::<CompanyAlias>(item) {
                    Some(alias) if alias.global_company_id == company.global_company_id => {
                        parsed.push(alias)
                    }
                    _ => rejected_aliases += 1,
                }
            }
            Some(parsed)
        }
        Some(Value::Null) | None => None,
        Some(_) => {
            tracing::warn!(
                "Ignoring non-array aliases for company {}",
                company.global_company_id
            );
            None
        }
    };

    Some(CompanyRecord {
        company,
        aliases,
        rejected_aliases,
    })
}
