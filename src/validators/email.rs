use regex::Regex;
use std::sync::LazyLock;

use crate::ActionError;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});

/// Validates the standard `local@domain` shape and length cap.
///
/// Checked before any I/O; the message is surfaced verbatim to the caller.
pub fn validate_email(email: &str) -> Result<(), ActionError> {
    if email.is_empty() {
        return Err(ActionError::Validation("Email cannot be empty".to_owned()));
    }

    if email.len() > 254 {
        return Err(ActionError::Validation(
            "Email is too long (max 254 characters)".to_owned(),
        ));
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err(ActionError::Validation("Invalid email format".to_owned()));
    }

    Ok(())
}
