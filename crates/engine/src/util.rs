//! Internal helpers for input validation.
//!
//! These utilities are **not** part of the public API. They run before any
//! database call so that a rejected request has no side effects.

use crate::{EngineError, ResultEngine};

pub(crate) const TITLE_MAX_CHARS: usize = 50;
pub(crate) const DESCRIPTION_MAX_CHARS: usize = 20;
pub(crate) const IDEMPOTENCY_KEY_MAX_CHARS: usize = 128;

pub(crate) fn require_user_id(user_id: &str) -> ResultEngine<()> {
    if user_id.trim().is_empty() {
        return Err(EngineError::Validation(
            "user id must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Trims a required text field and checks its length in characters.
pub(crate) fn normalize_required_text(value: &str, label: &str, max: usize) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!("{label} must not be empty")));
    }
    if trimmed.chars().count() > max {
        return Err(EngineError::Validation(format!(
            "{label} must be at most {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Trims an optional text field; blank values become `None`.
pub(crate) fn normalize_optional_text(
    value: Option<&str>,
    label: &str,
    max: usize,
) -> ResultEngine<Option<String>> {
    let Some(trimmed) = value.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if trimmed.chars().count() > max {
        return Err(EngineError::Validation(format!(
            "{label} must be at most {max} characters"
        )));
    }
    Ok(Some(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_is_trimmed_and_bounded() {
        assert_eq!(
            normalize_required_text("  Salary ", "title", TITLE_MAX_CHARS).unwrap(),
            "Salary"
        );
        assert!(normalize_required_text("   ", "title", TITLE_MAX_CHARS).is_err());
        assert!(normalize_required_text(&"x".repeat(51), "title", TITLE_MAX_CHARS).is_err());
    }

    #[test]
    fn optional_text_blank_is_none() {
        assert_eq!(
            normalize_optional_text(Some("  "), "description", DESCRIPTION_MAX_CHARS).unwrap(),
            None
        );
        assert_eq!(
            normalize_optional_text(None, "description", DESCRIPTION_MAX_CHARS).unwrap(),
            None
        );
        assert!(
            normalize_optional_text(Some(&"é".repeat(21)), "description", DESCRIPTION_MAX_CHARS)
                .is_err()
        );
    }
}
