//! Field-level checks shared by every contract

use super::ValidationError;
use regex::Regex;
use std::sync::OnceLock;

type Check = std::result::Result<(), ValidationError>;

static ISO_DATETIME: OnceLock<Regex> = OnceLock::new();

fn iso_datetime_pattern() -> &'static Regex {
    ISO_DATETIME.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}").expect("static datetime pattern")
    })
}

/// Checks bound to one entity name, so failures report `entity.field`
#[derive(Debug, Clone, Copy)]
pub struct Rules {
    entity: &'static str,
}

impl Rules {
    pub fn new(entity: &'static str) -> Self {
        Self { entity }
    }

    pub fn fail(&self, field: &str, message: impl Into<String>) -> ValidationError {
        ValidationError::new(self.entity, field, message)
    }

    pub fn non_empty(&self, field: &str, value: &str) -> Check {
        if value.trim().is_empty() {
            return Err(self.fail(field, "must not be empty"));
        }
        Ok(())
    }

    pub fn optional_non_empty(&self, field: &str, value: Option<&str>) -> Check {
        value.map_or(Ok(()), |v| self.non_empty(field, v))
    }

    /// Normalized scores live in [0, 1]
    pub fn unit_score(&self, field: &str, value: f64) -> Check {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(self.fail(field, format!("must be within [0, 1], got {}", value)));
        }
        Ok(())
    }

    pub fn optional_unit_score(&self, field: &str, value: Option<f64>) -> Check {
        value.map_or(Ok(()), |v| self.unit_score(field, v))
    }

    pub fn finite(&self, field: &str, value: f64) -> Check {
        if !value.is_finite() {
            return Err(self.fail(field, "must be a finite number"));
        }
        Ok(())
    }

    pub fn non_negative(&self, field: &str, value: f64) -> Check {
        if !value.is_finite() || value < 0.0 {
            return Err(self.fail(field, format!("must be non-negative, got {}", value)));
        }
        Ok(())
    }

    pub fn optional_non_negative(&self, field: &str, value: Option<f64>) -> Check {
        value.map_or(Ok(()), |v| self.non_negative(field, v))
    }

    pub fn iso_datetime(&self, field: &str, value: &str) -> Check {
        if !iso_datetime_pattern().is_match(value) {
            return Err(self.fail(field, format!("expected ISO-8601 datetime, got {:?}", value)));
        }
        Ok(())
    }

    pub fn optional_iso_datetime(&self, field: &str, value: Option<&str>) -> Check {
        value.map_or(Ok(()), |v| self.iso_datetime(field, v))
    }

    pub fn uuid(&self, field: &str, value: &str) -> Check {
        uuid::Uuid::parse_str(value)
            .map(|_| ())
            .map_err(|_| self.fail(field, format!("expected UUID, got {:?}", value)))
    }

    pub fn max_chars(&self, field: &str, value: &str, max: usize) -> Check {
        if value.chars().count() > max {
            return Err(self.fail(field, format!("must be at most {} characters", max)));
        }
        Ok(())
    }

    pub fn country_code(&self, field: &str, value: Option<&str>) -> Check {
        match value {
            Some(code) if code.chars().count() != 2 => {
                Err(self.fail(field, format!("expected 2-letter country code, got {:?}", code)))
            }
            _ => Ok(()),
        }
    }

    pub fn optional_url(&self, field: &str, value: Option<&str>) -> Check {
        match value {
            Some(raw) => url::Url::parse(raw)
                .map(|_| ())
                .map_err(|e| self.fail(field, format!("invalid URL: {}", e))),
            None => Ok(()),
        }
    }

    pub fn min_items<T>(&self, field: &str, items: &[T], min: usize) -> Check {
        if items.len() < min {
            return Err(self.fail(field, format!("needs at least {} entries, got {}", min, items.len())));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_datetime_shape() {
        let rules = Rules::new("company");
        assert!(rules.iso_datetime("created_at", "2024-05-01T12:30:00Z").is_ok());
        assert!(rules.iso_datetime("created_at", "2024-05-01T12:30:00.123+02:00").is_ok());
        assert!(rules.iso_datetime("created_at", "2024-05-01").is_err());
        assert!(rules.iso_datetime("created_at", "yesterday").is_err());
    }

    #[test]
    fn test_unit_score_bounds() {
        let rules = Rules::new("company");
        assert!(rules.unit_score("final_score", 0.0).is_ok());
        assert!(rules.unit_score("final_score", 1.0).is_ok());
        assert!(rules.unit_score("final_score", 1.01).is_err());
        assert!(rules.unit_score("final_score", f64::NAN).is_err());
    }

    #[test]
    fn test_error_names_field() {
        let err = Rules::new("evidence").non_empty("title", "  ").unwrap_err();
        assert_eq!(err.entity, "evidence");
        assert_eq!(err.field, "title");
    }
}
