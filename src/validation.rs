//! Input validation for review operations
//!
//! Free text from clients is trimmed once at the boundary; the stored value
//! is always the trimmed one.

use crate::constants::{MAX_TASK_NAME_LENGTH, MAX_TEXT_LENGTH};
use crate::error::{ReviewError, ReviewResult};

/// Trim a task name and check it is non-empty and within length
pub fn validate_task_name(name: &str) -> ReviewResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ReviewError::validation("name", "must not be blank"));
    }
    if trimmed.chars().count() > MAX_TASK_NAME_LENGTH {
        return Err(ReviewError::validation(
            "name",
            format!("must be at most {MAX_TASK_NAME_LENGTH} characters"),
        ));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(ReviewError::validation(
            "name",
            "must not contain control characters",
        ));
    }
    Ok(trimmed.to_string())
}

/// Trim optional free text (descriptions, comments).
///
/// Blank input becomes `None`.
pub fn normalize_text(field: &str, text: Option<String>) -> ReviewResult<Option<String>> {
    let Some(text) = text else {
        return Ok(None);
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_TEXT_LENGTH {
        return Err(ReviewError::validation(
            field,
            format!("must be at most {MAX_TEXT_LENGTH} characters"),
        ));
    }
    Ok(Some(trimmed.to_string()))
}
