use crate::ActionError;

/// Maximum stored length of a practice name.
pub const PRACTICE_NAME_MAX: usize = 120;

/// Trims and caps free-text input, optionally lowercasing it.
///
/// Mirrors what every form field goes through before persistence; `None`
/// and empty input both come out as an empty string.
pub fn sanitize(value: Option<&str>, max_length: usize, to_lowercase: bool) -> String {
    let trimmed = value.unwrap_or_default().trim();
    let limited: String = trimmed.chars().take(max_length).collect();
    if to_lowercase {
        limited.to_lowercase()
    } else {
        limited
    }
}

/// Sanitizes a practice name and rejects the empty result.
pub fn validate_practice_name(name: &str) -> Result<String, ActionError> {
    let name = sanitize(Some(name), PRACTICE_NAME_MAX, false);
    if name.is_empty() {
        return Err(ActionError::Validation(
            "Practice name is required".to_owned(),
        ));
    }
    Ok(name)
}
